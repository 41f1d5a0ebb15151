use axum::{
    extract::Extension,
    http::StatusCode,
    response::Response,
    Json,
};
use std::sync::Arc;
use tracing::{debug, instrument};

use super::password::verify_password;
use super::signup::credential_response;
use super::state::AuthState;
use super::types::{MessageResponse, SigninRequest};
use super::validation::validate_signin;
use crate::api::error::{ApiError, ErrorResponse};
use crate::store::AccountStore;

/// Check email and password and return a fresh credential.
#[utoipa::path(
    post,
    path = "/users/signin",
    request_body = SigninRequest,
    responses(
        (status = 200, description = "Signed in", body = MessageResponse,
            headers(("x-auth-token" = String, description = "Signed credential"))),
        (status = 400, description = "Invalid email or password", body = ErrorResponse),
        (status = 422, description = "Field validation failed; the body maps each field to its message"),
        (status = 500, description = "Store failure or malformed stored hash", body = ErrorResponse)
    ),
    tag = "auth"
)]
#[instrument(skip(accounts, auth_state, payload))]
pub async fn signin(
    accounts: Extension<Arc<dyn AccountStore>>,
    auth_state: Extension<Arc<AuthState>>,
    payload: Option<Json<SigninRequest>>,
) -> Result<Response, ApiError> {
    let request: SigninRequest = match payload {
        Some(Json(payload)) => payload,
        None => return Err(ApiError::InvalidPayload),
    };

    let input = validate_signin(&request).map_err(ApiError::Validation)?;

    let Some(account) = accounts.account_by_email(&input.email).await? else {
        debug!("signin for unknown email");
        return Err(ApiError::InvalidCredentials);
    };

    let matches = verify_password(input.password, account.password_hash.clone())
        .await
        .map_err(ApiError::Dependency)?;
    if !matches {
        debug!(username = %account.username, "password mismatch");
        return Err(ApiError::InvalidCredentials);
    }

    let credential = auth_state
        .signer()
        .issue(&account.email, &account.username)
        .map_err(ApiError::dependency)?;

    credential_response(StatusCode::OK, &credential, "sign in successfully")
}
