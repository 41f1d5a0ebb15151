use crate::store::AccountStore;
use crate::GIT_COMMIT_HASH;
use axum::{
    body::Body,
    extract::Extension,
    http::{HeaderMap, HeaderValue, Method, StatusCode},
    response::{IntoResponse, Json, Response},
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, error};
use utoipa::ToSchema;

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct Health {
    commit: String,
    name: String,
    version: String,
    database: String,
}

impl Health {
    fn new(database_ok: bool) -> Self {
        Self {
            commit: GIT_COMMIT_HASH.to_string(),
            name: env!("CARGO_PKG_NAME").to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            database: if database_ok { "ok" } else { "error" }.to_string(),
        }
    }

    /// `X-App: name:version:short-commit`
    fn x_app(&self) -> HeaderMap {
        let short_hash = self.commit.get(..7).unwrap_or_default();
        let mut headers = HeaderMap::new();
        match HeaderValue::from_str(&format!("{}:{}:{short_hash}", self.name, self.version)) {
            Ok(value) => {
                headers.insert("X-App", value);
            }
            Err(err) => error!("Failed to build X-App header: {}", err),
        }
        headers
    }
}

#[utoipa::path(
    get,
    path= "/health",
    responses (
        (status = 200, description = "Database is healthy", body = Health),
        (status = 503, description = "Database is unhealthy", body = Health)
    ),
    tag= "health"
)]
// GET returns the report, OPTIONS only the status and X-App header
pub async fn health(method: Method, accounts: Extension<Arc<dyn AccountStore>>) -> Response {
    let database_ok = match accounts.ping().await {
        Ok(()) => true,
        Err(err) => {
            error!("Failed to ping database: {}", err);
            false
        }
    };
    debug!(database_ok, "health check");

    let health = Health::new(database_ok);
    let status = if database_ok {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    let headers = health.x_app();

    if method == Method::GET {
        (status, headers, Json(health)).into_response()
    } else {
        (status, headers, Body::empty()).into_response()
    }
}
