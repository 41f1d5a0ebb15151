//! Request/response types for auth endpoints.
//!
//! Request fields are optional so that missing values surface as per-field
//! validation messages (422) instead of a deserialization failure. `age` and
//! `phone` accept either a JSON number or a string and are checked by
//! [`super::validation`].

use serde::{Deserialize, Serialize};
use serde_json::Value;
use utoipa::ToSchema;

#[derive(ToSchema, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct SignupRequest {
    pub email: Option<String>,
    pub pw1: Option<String>,
    pub pw2: Option<String>,
    pub username: Option<String>,
    #[schema(value_type = Option<i32>)]
    pub age: Option<Value>,
    #[schema(value_type = Option<String>)]
    pub phone: Option<Value>,
    pub role: Option<String>,
}

impl std::fmt::Debug for SignupRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SignupRequest")
            .field("email", &self.email)
            .field("username", &self.username)
            .field("age", &self.age)
            .field("phone", &self.phone)
            .field("role", &self.role)
            .finish_non_exhaustive()
    }
}

#[derive(ToSchema, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct SigninRequest {
    pub email: Option<String>,
    pub password: Option<String>,
}

impl std::fmt::Debug for SigninRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SigninRequest")
            .field("email", &self.email)
            .finish_non_exhaustive()
    }
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct ResendVerificationRequest {
    pub email: String,
}

#[derive(ToSchema, Serialize, Deserialize, Debug, PartialEq, Eq)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}
