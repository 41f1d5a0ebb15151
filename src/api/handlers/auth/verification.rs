//! Email verification endpoints.

use anyhow::{Context, Result};
use axum::{
    extract::{Extension, Path},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use std::sync::Arc;
use tracing::{error, info, instrument};

use super::state::{AuthConfig, AuthState};
use super::types::{MessageResponse, ResendVerificationRequest};
use super::utils::{
    build_verify_url, generate_verification_token, hash_verification_token, normalize_email,
    valid_email,
};
use crate::api::email::{verification_message, Mailer};
use crate::api::error::{ApiError, ErrorResponse};
use crate::store::{Account, AccountStore, TokenStore};

/// Issue a fresh token for `account` and mail the verification link.
///
/// The token digest is persisted before the mail goes out.
pub(super) async fn send_verification(
    tokens: &dyn TokenStore,
    mailer: &dyn Mailer,
    config: &AuthConfig,
    account: &Account,
) -> Result<()> {
    let token = generate_verification_token()?;
    tokens
        .insert_token(&account.username, &hash_verification_token(&token))
        .await
        .context("failed to store verification token")?;

    let link = build_verify_url(config.base_url(), &account.username, &token)?;
    mailer
        .send(&verification_message(&account.email, &link))
        .await
        .context("failed to send verification email")?;

    Ok(())
}

/// Consume the (username, token) pair from a verification link.
#[utoipa::path(
    get,
    path = "/users/verify/{username}/{token}",
    params(
        ("username" = String, Path, description = "Account username"),
        ("token" = String, Path, description = "Verification token from the mailed link")
    ),
    responses(
        (status = 200, description = "Account verified", body = MessageResponse),
        (status = 400, description = "Unknown user or token", body = ErrorResponse)
    ),
    tag = "auth"
)]
#[instrument(skip(accounts, tokens, token))]
pub async fn verify_email(
    accounts: Extension<Arc<dyn AccountStore>>,
    tokens: Extension<Arc<dyn TokenStore>>,
    Path((username, token)): Path<(String, String)>,
) -> Result<Json<MessageResponse>, ApiError> {
    if accounts.account_by_username(&username).await?.is_none() {
        return Err(ApiError::InvalidToken);
    }

    // Hash before lookup; raw tokens are never stored.
    if !tokens
        .consume_token(&username, &hash_verification_token(&token))
        .await?
    {
        return Err(ApiError::InvalidToken);
    }

    // False when deleted or verified by another link in the meantime.
    let verified = accounts.mark_verified(&username).await?;
    tokens.delete_tokens_for(&username).await?;
    if !verified {
        return Err(ApiError::InvalidToken);
    }

    info!("account verified");
    Ok(Json(MessageResponse::new("User verified successfully")))
}

/// Resend a verification link (always returns 202 to avoid account probing).
#[utoipa::path(
    post,
    path = "/users/verify/resend",
    request_body = ResendVerificationRequest,
    responses(
        (status = 202, description = "Resend accepted", body = MessageResponse),
        (status = 400, description = "Invalid payload", body = ErrorResponse)
    ),
    tag = "auth"
)]
#[instrument(skip(accounts, tokens, mailer, auth_state, payload))]
pub async fn resend_verification(
    accounts: Extension<Arc<dyn AccountStore>>,
    tokens: Extension<Arc<dyn TokenStore>>,
    mailer: Extension<Arc<dyn Mailer>>,
    auth_state: Extension<Arc<AuthState>>,
    payload: Option<Json<ResendVerificationRequest>>,
) -> Result<Response, ApiError> {
    let request: ResendVerificationRequest = match payload {
        Some(Json(payload)) => payload,
        None => return Err(ApiError::InvalidPayload),
    };

    let accepted = (
        StatusCode::ACCEPTED,
        Json(MessageResponse::new(
            "If the account exists and is not verified, a new link has been sent",
        )),
    )
        .into_response();

    let email = normalize_email(&request.email);
    if !valid_email(&email) {
        return Ok(accepted);
    }

    match accounts.account_by_email(&email).await {
        Ok(Some(account)) if !account.verified => {
            if let Err(err) =
                send_verification(&**tokens, &**mailer, auth_state.config(), &account).await
            {
                error!("Failed to resend verification: {err:#}");
            }
        }
        Ok(_) => (),
        Err(err) => error!("Failed to look up account for resend: {err}"),
    }

    Ok(accepted)
}
