//! Account listing and profile management.
//!
//! `GET /users/{username}` is the only protected route: the caller's
//! credential must name the requested account. Update and delete follow the
//! public contract of the service and do not require a credential.

use axum::{
    extract::{Extension, Path},
    http::StatusCode,
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, info, instrument};
use utoipa::ToSchema;
use uuid::Uuid;

use super::auth::types::MessageResponse;
use super::auth::validation::validate_update;
use super::auth::Authenticated;
use crate::api::error::{ApiError, ErrorResponse};
use crate::store::{Account, AccountStore};

/// Public view of an account. The password hash never leaves the store.
#[derive(ToSchema, Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct UserProfile {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub age: i32,
    pub phone: String,
    pub role: String,
    pub verified: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Account> for UserProfile {
    fn from(account: Account) -> Self {
        Self {
            id: account.id,
            username: account.username,
            email: account.email,
            age: account.age,
            phone: account.phone,
            role: account.role,
            verified: account.verified,
            created_at: account.created_at,
            updated_at: account.updated_at,
        }
    }
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct UsersResponse {
    pub users: Vec<UserProfile>,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct UserResponse {
    pub user: UserProfile,
}

/// Allow-listed profile changes; any other field rejects the payload.
#[derive(ToSchema, Serialize, Deserialize, Debug, Default)]
#[serde(default, deny_unknown_fields)]
pub struct UpdateUserRequest {
    pub email: Option<String>,
    #[schema(value_type = Option<i32>)]
    pub age: Option<Value>,
    #[schema(value_type = Option<String>)]
    pub phone: Option<Value>,
    pub role: Option<String>,
}

#[utoipa::path(
    get,
    path = "/users",
    responses(
        (status = 200, description = "Every account", body = UsersResponse),
        (status = 500, description = "Store failure", body = ErrorResponse)
    ),
    tag = "users"
)]
#[instrument(skip(accounts))]
pub async fn list_users(
    accounts: Extension<Arc<dyn AccountStore>>,
) -> Result<Json<UsersResponse>, ApiError> {
    let users = accounts
        .list_accounts()
        .await?
        .into_iter()
        .map(UserProfile::from)
        .collect();

    Ok(Json(UsersResponse { users }))
}

#[utoipa::path(
    get,
    path = "/users/{username}",
    params(
        ("username" = String, Path, description = "Account username"),
        ("x-auth-token" = String, Header, description = "Signed credential for the same username")
    ),
    responses(
        (status = 200, description = "The caller's account", body = UserResponse),
        (status = 401, description = "Missing or invalid credential", body = ErrorResponse),
        (status = 404, description = "Unknown user or not the caller's account", body = ErrorResponse)
    ),
    tag = "users"
)]
#[instrument(skip(accounts, claims))]
pub async fn get_user(
    Authenticated(claims): Authenticated,
    accounts: Extension<Arc<dyn AccountStore>>,
    Path(username): Path<String>,
) -> Result<Json<UserResponse>, ApiError> {
    match accounts.account_by_username(&username).await? {
        Some(account) if account.username == claims.username => Ok(Json(UserResponse {
            user: account.into(),
        })),
        Some(_) => {
            debug!(caller = %claims.username, "credential does not own the account");
            Err(ApiError::NotFound)
        }
        None => Err(ApiError::NotFound),
    }
}

#[utoipa::path(
    put,
    path = "/users/{username}",
    request_body = UpdateUserRequest,
    params(("username" = String, Path, description = "Account username")),
    responses(
        (status = 201, description = "Account updated", body = MessageResponse),
        (status = 400, description = "Invalid payload, no changes, or email taken", body = ErrorResponse),
        (status = 404, description = "Unknown user", body = ErrorResponse),
        (status = 422, description = "Field validation failed; the body maps each field to its message")
    ),
    tag = "users"
)]
#[instrument(skip(accounts, payload))]
pub async fn update_user(
    accounts: Extension<Arc<dyn AccountStore>>,
    Path(username): Path<String>,
    payload: Option<Json<UpdateUserRequest>>,
) -> Result<(StatusCode, Json<MessageResponse>), ApiError> {
    let request: UpdateUserRequest = match payload {
        Some(Json(payload)) => payload,
        None => return Err(ApiError::InvalidPayload),
    };

    let changes = validate_update(&request).map_err(ApiError::Validation)?;
    if changes.is_empty() {
        return Err(ApiError::BadRequest("No updates provided"));
    }

    if accounts.update_account(&username, &changes).await?.is_none() {
        return Err(ApiError::NotFound);
    }

    info!("account updated");
    Ok((
        StatusCode::CREATED,
        Json(MessageResponse::new("User updated successfully")),
    ))
}

#[utoipa::path(
    delete,
    path = "/users/{username}",
    params(("username" = String, Path, description = "Account username")),
    responses(
        (status = 200, description = "Account deleted", body = MessageResponse),
        (status = 400, description = "No user with that username", body = ErrorResponse)
    ),
    tag = "users"
)]
#[instrument(skip(accounts))]
pub async fn delete_user(
    accounts: Extension<Arc<dyn AccountStore>>,
    Path(username): Path<String>,
) -> Result<Json<MessageResponse>, ApiError> {
    match accounts.delete_account(&username).await? {
        0 => Err(ApiError::NoSuchUser),
        _ => {
            info!("account deleted");
            Ok(Json(MessageResponse::new("User deleted")))
        }
    }
}
