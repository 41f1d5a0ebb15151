//! Account registration.

use axum::{
    extract::Extension,
    http::{HeaderName, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use std::sync::Arc;
use tracing::{debug, info, instrument};

use super::credential::CREDENTIAL_HEADER;
use super::password::hash_password;
use super::state::AuthState;
use super::types::{MessageResponse, SignupRequest};
use super::validation::validate_signup;
use super::verification::send_verification;
use crate::api::email::Mailer;
use crate::api::error::{ApiError, ErrorResponse};
use crate::store::{AccountStore, NewAccount, TokenStore};

/// Register an account, mail a verification link, and return a credential.
#[utoipa::path(
    post,
    path = "/users/signup",
    request_body = SignupRequest,
    responses(
        (status = 201, description = "Account created", body = MessageResponse,
            headers(("x-auth-token" = String, description = "Signed credential"))),
        (status = 400, description = "Username or email taken, passwords differ, or invalid payload", body = ErrorResponse),
        (status = 422, description = "Field validation failed; the body maps each field to its message"),
        (status = 500, description = "Store or mail delivery failure", body = ErrorResponse)
    ),
    tag = "auth"
)]
#[instrument(skip(accounts, tokens, mailer, auth_state, payload))]
pub async fn signup(
    accounts: Extension<Arc<dyn AccountStore>>,
    tokens: Extension<Arc<dyn TokenStore>>,
    mailer: Extension<Arc<dyn Mailer>>,
    auth_state: Extension<Arc<AuthState>>,
    payload: Option<Json<SignupRequest>>,
) -> Result<Response, ApiError> {
    let request: SignupRequest = match payload {
        Some(Json(payload)) => payload,
        None => return Err(ApiError::InvalidPayload),
    };

    debug!("signup request: {:?}", request);
    let input = validate_signup(&request).map_err(ApiError::Validation)?;

    if accounts.account_by_username(&input.username).await?.is_some() {
        return Err(ApiError::Conflict("username"));
    }

    // Compared only after the uniqueness check, byte for byte.
    if input.pw1 != input.pw2 {
        return Err(ApiError::PasswordMismatch);
    }

    let password_hash = hash_password(input.pw1, auth_state.config().bcrypt_cost())
        .await
        .map_err(ApiError::Dependency)?;

    let account = accounts
        .create_account(NewAccount {
            username: input.username,
            email: input.email,
            password_hash,
            age: input.age,
            phone: input.phone,
            role: input.role,
        })
        .await?;

    info!(username = %account.username, "account created");

    // A delivery failure leaves the account and token in place.
    send_verification(&**tokens, &**mailer, auth_state.config(), &account)
        .await
        .map_err(ApiError::Dependency)?;

    let credential = auth_state
        .signer()
        .issue(&account.email, &account.username)
        .map_err(ApiError::dependency)?;

    credential_response(StatusCode::CREATED, &credential, "user created successfully")
}

/// Response carrying a fresh credential in `x-auth-token`.
pub(super) fn credential_response(
    status: StatusCode,
    credential: &str,
    message: &str,
) -> Result<Response, ApiError> {
    let value = HeaderValue::from_str(credential).map_err(ApiError::dependency)?;
    Ok((
        status,
        [(HeaderName::from_static(CREDENTIAL_HEADER), value)],
        Json(MessageResponse::new(message)),
    )
        .into_response())
}
