//! Router fixtures shared by handler tests.

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use axum::{
    body::{to_bytes, Body},
    http::{HeaderMap, Method, Request, StatusCode},
    Router,
};
use secrecy::SecretString;
use serde_json::Value;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tower::ServiceExt;

use super::email::{EmailMessage, MailError, Mailer};
use super::handlers::auth::{AuthConfig, AuthState, CredentialSigner, CREDENTIAL_HEADER};
use super::{router, Services};
use crate::store::MemoryStore;

pub const TEST_SECRET: &str = "test-secret-test-secret-test-secret";
pub const BASE_URL: &str = "http://localhost:3000";
/// Cheapest cost bcrypt accepts.
pub const TEST_BCRYPT_COST: u32 = 4;

#[derive(Default)]
pub struct RecordingMailer {
    sent: Mutex<Vec<EmailMessage>>,
    fail: bool,
}

impl RecordingMailer {
    pub fn failing() -> Self {
        Self {
            sent: Mutex::new(Vec::new()),
            fail: true,
        }
    }

    pub fn sent(&self) -> Vec<EmailMessage> {
        self.sent.lock().map(|sent| sent.clone()).unwrap_or_default()
    }

    /// Raw token from the most recent verification link.
    pub fn last_token(&self) -> Result<String> {
        let message = self.sent().pop().context("no mail sent")?;
        message
            .body
            .rsplit('/')
            .next()
            .map(|token| token.trim().to_string())
            .context("no token in mail body")
    }
}

#[async_trait]
impl Mailer for RecordingMailer {
    async fn send(&self, message: &EmailMessage) -> Result<(), MailError> {
        if self.fail {
            return Err(MailError::Address("relay unavailable".to_string()));
        }
        if let Ok(mut sent) = self.sent.lock() {
            sent.push(message.clone());
        }
        Ok(())
    }
}

/// Handles over `store` and `mailer` with the test signing secret.
pub fn services(store: Arc<MemoryStore>, mailer: Arc<RecordingMailer>) -> Result<Services> {
    let signer = CredentialSigner::new(SecretString::from(TEST_SECRET.to_string()), 3600)?;
    let config = AuthConfig::new(BASE_URL)?.with_bcrypt_cost(TEST_BCRYPT_COST);

    Ok(Services {
        accounts: store.clone(),
        tokens: store,
        mailer,
        auth: Arc::new(AuthState::new(config, signer)),
    })
}

pub struct TestApp {
    pub router: Router,
    pub store: Arc<MemoryStore>,
    pub mailer: Arc<RecordingMailer>,
    pub auth: Arc<AuthState>,
}

pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Value,
}

impl TestResponse {
    pub fn credential(&self) -> Result<String> {
        self.headers
            .get(CREDENTIAL_HEADER)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string)
            .ok_or_else(|| anyhow!("missing {CREDENTIAL_HEADER} header"))
    }
}

impl TestApp {
    pub fn new() -> Result<Self> {
        Self::with_mailer(RecordingMailer::default())
    }

    pub fn with_mailer(mailer: RecordingMailer) -> Result<Self> {
        let store = Arc::new(MemoryStore::new());
        let mailer = Arc::new(mailer);
        let services = services(store.clone(), mailer.clone())?;
        let auth = services.auth.clone();

        Ok(Self {
            router: router(services, Duration::from_secs(5)),
            store,
            mailer,
            auth,
        })
    }

    pub async fn send(
        &self,
        method: Method,
        uri: &str,
        body: Option<&Value>,
        credential: Option<&str>,
    ) -> Result<TestResponse> {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(credential) = credential {
            builder = builder.header(CREDENTIAL_HEADER, credential);
        }
        let request = match body {
            Some(body) => builder
                .header("content-type", "application/json")
                .body(Body::from(serde_json::to_vec(body)?))?,
            None => builder.body(Body::empty())?,
        };

        let response = self.router.clone().oneshot(request).await?;
        let status = response.status();
        let headers = response.headers().clone();
        let bytes = to_bytes(response.into_body(), usize::MAX).await?;
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or_else(|_| {
                Value::String(String::from_utf8_lossy(&bytes).into_owned())
            })
        };

        Ok(TestResponse {
            status,
            headers,
            body,
        })
    }

    /// Sign up `username` with a valid body and return the response.
    pub async fn signup(&self, username: &str, email: &str) -> Result<TestResponse> {
        let body = serde_json::json!({
            "email": email,
            "pw1": "secret123",
            "pw2": "secret123",
            "username": username,
            "age": 21,
            "phone": "5551234",
            "role": "user"
        });
        self.send(Method::POST, "/users/signup", Some(&body), None)
            .await
    }
}
