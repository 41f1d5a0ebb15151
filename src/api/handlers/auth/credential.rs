//! Signed credentials (compact HS256 JWT) and the extractor that enforces them.
//!
//! A credential is minted at signup and signin and returned in the
//! `x-auth-token` response header. Protected handlers take [`Authenticated`]
//! as an argument; the extractor rejects the request with 401 before the
//! handler body runs when the header is missing or the token fails to verify.

use async_trait::async_trait;
use axum::{extract::FromRequestParts, http::request::Parts};
use base64ct::{Base64UrlUnpadded, Encoding};
use chrono::Utc;
use hmac::{Hmac, Mac};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use std::sync::Arc;
use thiserror::Error;
use tracing::debug;

use super::state::AuthState;
use crate::api::error::ApiError;

pub const CREDENTIAL_HEADER: &str = "x-auth-token";

/// HMAC keys shorter than this are refused at startup.
pub const MIN_SECRET_LEN: usize = 32;

type HmacSha256 = Hmac<Sha256>;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
struct CredentialHeader {
    alg: String,
    typ: String,
}

impl CredentialHeader {
    fn hs256() -> Self {
        Self {
            alg: "HS256".to_string(),
            typ: "JWT".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Claims {
    pub email: String,
    pub username: String,
    pub iat: i64,
    pub exp: i64,
}

#[derive(Debug, Error)]
pub enum CredentialError {
    #[error("invalid token format")]
    TokenFormat,
    #[error("invalid base64url encoding")]
    Base64,
    #[error("invalid json")]
    Json(#[from] serde_json::Error),
    #[error("unsupported algorithm: {0}")]
    UnsupportedAlg(String),
    #[error("invalid signature")]
    InvalidSignature,
    #[error("token expired")]
    Expired,
    #[error("signing secret must be at least {MIN_SECRET_LEN} bytes")]
    WeakSecret,
}

fn b64e_json<T: Serialize>(value: &T) -> Result<String, CredentialError> {
    let json = serde_json::to_vec(value)?;
    Ok(Base64UrlUnpadded::encode_string(&json))
}

fn b64d_json<T: for<'de> Deserialize<'de>>(s: &str) -> Result<T, CredentialError> {
    let bytes = Base64UrlUnpadded::decode_vec(s).map_err(|_| CredentialError::Base64)?;
    Ok(serde_json::from_slice(&bytes)?)
}

/// Issues and verifies credentials with a server-held HMAC secret.
#[derive(Clone)]
pub struct CredentialSigner {
    secret: SecretString,
    ttl_seconds: i64,
}

impl std::fmt::Debug for CredentialSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialSigner")
            .field("secret", &"***")
            .field("ttl_seconds", &self.ttl_seconds)
            .finish()
    }
}

impl CredentialSigner {
    /// # Errors
    /// Returns [`CredentialError::WeakSecret`] if the secret is shorter than [`MIN_SECRET_LEN`].
    pub fn new(secret: SecretString, ttl_seconds: i64) -> Result<Self, CredentialError> {
        if secret.expose_secret().len() < MIN_SECRET_LEN {
            return Err(CredentialError::WeakSecret);
        }
        Ok(Self {
            secret,
            ttl_seconds,
        })
    }

    #[must_use]
    pub fn ttl_seconds(&self) -> i64 {
        self.ttl_seconds
    }

    fn mac(&self) -> Result<HmacSha256, CredentialError> {
        HmacSha256::new_from_slice(self.secret.expose_secret().as_bytes())
            .map_err(|_| CredentialError::WeakSecret)
    }

    /// Mint a credential for (email, username) valid from now.
    ///
    /// # Errors
    /// Returns an error if the header or claims cannot be encoded.
    pub fn issue(&self, email: &str, username: &str) -> Result<String, CredentialError> {
        self.issue_at(email, username, Utc::now().timestamp())
    }

    /// Mint a credential as if the current time were `now_unix_seconds`.
    ///
    /// # Errors
    /// Returns an error if the header or claims cannot be encoded.
    pub fn issue_at(
        &self,
        email: &str,
        username: &str,
        now_unix_seconds: i64,
    ) -> Result<String, CredentialError> {
        let claims = Claims {
            email: email.to_string(),
            username: username.to_string(),
            iat: now_unix_seconds,
            exp: now_unix_seconds.saturating_add(self.ttl_seconds),
        };

        let header_b64 = b64e_json(&CredentialHeader::hs256())?;
        let claims_b64 = b64e_json(&claims)?;
        let signing_input = format!("{header_b64}.{claims_b64}");

        let mut mac = self.mac()?;
        mac.update(signing_input.as_bytes());
        let signature_b64 = Base64UrlUnpadded::encode_string(&mac.finalize().into_bytes());

        Ok(format!("{signing_input}.{signature_b64}"))
    }

    /// Verify a credential and return its claims.
    ///
    /// # Errors
    /// Returns an error if the token is malformed, not HS256, carries a bad
    /// signature, or has expired.
    pub fn verify(&self, token: &str) -> Result<Claims, CredentialError> {
        self.verify_at(token, Utc::now().timestamp())
    }

    /// Verify a credential against an explicit clock.
    ///
    /// # Errors
    /// Same as [`CredentialSigner::verify`].
    pub fn verify_at(&self, token: &str, now_unix_seconds: i64) -> Result<Claims, CredentialError> {
        let mut parts = token.split('.');
        let header_b64 = parts.next().ok_or(CredentialError::TokenFormat)?;
        let claims_b64 = parts.next().ok_or(CredentialError::TokenFormat)?;
        let sig_b64 = parts.next().ok_or(CredentialError::TokenFormat)?;
        if parts.next().is_some() {
            return Err(CredentialError::TokenFormat);
        }

        let header: CredentialHeader = b64d_json(header_b64)?;
        if header.alg != "HS256" {
            return Err(CredentialError::UnsupportedAlg(header.alg));
        }

        let signature =
            Base64UrlUnpadded::decode_vec(sig_b64).map_err(|_| CredentialError::Base64)?;
        let mut mac = self.mac()?;
        mac.update(header_b64.as_bytes());
        mac.update(b".");
        mac.update(claims_b64.as_bytes());
        mac.verify_slice(&signature)
            .map_err(|_| CredentialError::InvalidSignature)?;

        let claims: Claims = b64d_json(claims_b64)?;
        if claims.exp <= now_unix_seconds {
            return Err(CredentialError::Expired);
        }

        Ok(claims)
    }
}

/// Claims of a request that carried a valid `x-auth-token`.
#[derive(Debug, Clone)]
pub struct Authenticated(pub Claims);

#[async_trait]
impl<S> FromRequestParts<S> for Authenticated
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let auth_state = parts
            .extensions
            .get::<Arc<AuthState>>()
            .cloned()
            .ok_or_else(|| ApiError::dependency(anyhow::anyhow!("auth state not configured")))?;

        let token = parts
            .headers
            .get(CREDENTIAL_HEADER)
            .and_then(|value| value.to_str().ok())
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .ok_or(ApiError::Unauthorized)?;

        auth_state
            .signer()
            .verify(token)
            .map(Self)
            .map_err(|err| {
                debug!("Rejected credential: {err}");
                ApiError::Unauthorized
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;

    const SECRET: &str = "0123456789abcdef0123456789abcdef";

    fn signer() -> Result<CredentialSigner> {
        Ok(CredentialSigner::new(
            SecretString::from(SECRET.to_string()),
            86_400,
        )?)
    }

    #[test]
    fn issue_then_verify() -> Result<()> {
        let signer = signer()?;
        let token = signer.issue_at("a@x.com", "alice", 1_700_000_000)?;
        assert_eq!(token.split('.').count(), 3);

        let claims = signer.verify_at(&token, 1_700_000_001)?;
        assert_eq!(claims.email, "a@x.com");
        assert_eq!(claims.username, "alice");
        assert_eq!(claims.iat, 1_700_000_000);
        assert_eq!(claims.exp, 1_700_086_400);
        Ok(())
    }

    #[test]
    fn expired_credential_is_rejected() -> Result<()> {
        let signer = signer()?;
        let token = signer.issue_at("a@x.com", "alice", 1_700_000_000)?;
        assert!(matches!(
            signer.verify_at(&token, 1_700_086_400),
            Err(CredentialError::Expired)
        ));
        Ok(())
    }

    #[test]
    fn tampered_claims_are_rejected() -> Result<()> {
        let signer = signer()?;
        let token = signer.issue_at("a@x.com", "alice", 1_700_000_000)?;
        let mut parts: Vec<&str> = token.split('.').collect();

        let forged = b64e_json(&Claims {
            email: "b@x.com".to_string(),
            username: "bob".to_string(),
            iat: 1_700_000_000,
            exp: 1_700_086_400,
        })?;
        parts[1] = &forged;
        let forged_token = parts.join(".");

        assert!(matches!(
            signer.verify_at(&forged_token, 1_700_000_001),
            Err(CredentialError::InvalidSignature)
        ));
        Ok(())
    }

    #[test]
    fn other_secret_is_rejected() -> Result<()> {
        let token = signer()?.issue_at("a@x.com", "alice", 1_700_000_000)?;
        let other = CredentialSigner::new(
            SecretString::from("fedcba9876543210fedcba9876543210".to_string()),
            86_400,
        )?;
        assert!(matches!(
            other.verify_at(&token, 1_700_000_001),
            Err(CredentialError::InvalidSignature)
        ));
        Ok(())
    }

    #[test]
    fn alg_none_is_rejected() -> Result<()> {
        let signer = signer()?;
        let header = b64e_json(&CredentialHeader {
            alg: "none".to_string(),
            typ: "JWT".to_string(),
        })?;
        let claims = b64e_json(&Claims {
            email: "a@x.com".to_string(),
            username: "alice".to_string(),
            iat: 1_700_000_000,
            exp: 1_800_000_000,
        })?;
        let token = format!("{header}.{claims}.");
        assert!(matches!(
            signer.verify_at(&token, 1_700_000_001),
            Err(CredentialError::UnsupportedAlg(alg)) if alg == "none"
        ));
        Ok(())
    }

    #[test]
    fn malformed_tokens_are_rejected() -> Result<()> {
        let signer = signer()?;
        assert!(matches!(
            signer.verify("garbage"),
            Err(CredentialError::TokenFormat)
        ));
        assert!(matches!(
            signer.verify("a.b.c.d"),
            Err(CredentialError::TokenFormat)
        ));
        assert!(matches!(
            signer.verify("!!.??.**"),
            Err(CredentialError::Base64)
        ));
        Ok(())
    }

    #[test]
    fn short_secret_is_refused() {
        assert!(matches!(
            CredentialSigner::new(SecretString::from("short".to_string()), 60),
            Err(CredentialError::WeakSecret)
        ));
    }

    #[test]
    fn debug_redacts_secret() -> Result<()> {
        let debug = format!("{:?}", signer()?);
        assert!(!debug.contains(SECRET));
        Ok(())
    }
}
