use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;
use tracing::error;
use utoipa::ToSchema;

use crate::store::StoreError;

/// Field name to validation message, returned as the 422 body.
pub type FieldErrors = BTreeMap<&'static str, String>;

/// Body of every non-validation error response.
#[derive(ToSchema, Serialize, Deserialize, Debug, PartialEq, Eq)]
pub struct ErrorResponse {
    pub error: String,
}

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Invalid payload")]
    InvalidPayload,
    #[error("{0}")]
    BadRequest(&'static str),
    #[error("validation failed")]
    Validation(FieldErrors),
    #[error("{0} is taken")]
    Conflict(&'static str),
    #[error("passwords doesn't match")]
    PasswordMismatch,
    #[error("Invalid email or password")]
    InvalidCredentials,
    #[error("Invalid token")]
    InvalidToken,
    #[error("Access denied")]
    Unauthorized,
    #[error("Not Found")]
    NotFound,
    #[error("No user with that username")]
    NoSuchUser,
    #[error("Internal server error")]
    Dependency(#[source] anyhow::Error),
}

impl ApiError {
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::InvalidPayload
            | Self::BadRequest(_)
            | Self::Conflict(_)
            | Self::PasswordMismatch
            | Self::InvalidCredentials
            | Self::InvalidToken
            | Self::NoSuchUser => StatusCode::BAD_REQUEST,
            Self::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            Self::Unauthorized => StatusCode::UNAUTHORIZED,
            Self::NotFound => StatusCode::NOT_FOUND,
            Self::Dependency(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn dependency(err: impl Into<anyhow::Error>) -> Self {
        Self::Dependency(err.into())
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Conflict(field) => Self::Conflict(field.as_str()),
            StoreError::Database(err) => Self::Dependency(err.into()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        match self {
            Self::Validation(fields) => (status, Json(fields)).into_response(),
            Self::Dependency(err) => {
                // Details stay in the log; callers only get the generic message.
                error!("Dependency failure: {err:#}");
                (
                    status,
                    Json(ErrorResponse {
                        error: "Internal server error".to_string(),
                    }),
                )
                    .into_response()
            }
            other => (
                status,
                Json(ErrorResponse {
                    error: other.to_string(),
                }),
            )
                .into_response(),
        }
    }
}
