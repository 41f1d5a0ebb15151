//! Small helpers for email normalization and verification token handling.

use anyhow::{anyhow, Context, Result};
use rand::{rngs::OsRng, RngCore};
use regex::Regex;
use sha2::{Digest, Sha256};
use url::Url;

/// Normalize an email for lookup/uniqueness checks.
pub(super) fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Basic email format check on already-normalized input.
pub(super) fn valid_email(email_normalized: &str) -> bool {
    Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").is_ok_and(|regex| regex.is_match(email_normalized))
}

/// Create a new verification token for email links: 32 random bytes, hex.
///
/// The raw token only travels in the mail; the store keeps its digest.
pub(super) fn generate_verification_token() -> Result<String> {
    let mut bytes = [0u8; 32];
    OsRng
        .try_fill_bytes(&mut bytes)
        .context("failed to generate verification token")?;
    Ok(hex::encode(bytes))
}

/// Hex SHA-256 digest of a verification token, the form kept in the store.
pub(super) fn hash_verification_token(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    hex::encode(hasher.finalize())
}

/// Build `{base_url}/users/verify/{username}/{token}`, percent-encoding the
/// username segment.
pub(super) fn build_verify_url(base_url: &str, username: &str, token: &str) -> Result<String> {
    let mut url = Url::parse(base_url).with_context(|| format!("Invalid base URL: {base_url}"))?;
    url.path_segments_mut()
        .map_err(|()| anyhow!("Base URL cannot carry a path: {base_url}"))?
        .pop_if_empty()
        .extend(["users", "verify", username, token]);
    Ok(url.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_email_trims_and_lowercases() {
        assert_eq!(normalize_email(" Alice@Example.COM "), "alice@example.com");
    }

    #[test]
    fn valid_email_accepts_basic_format() {
        assert!(valid_email("a@example.com"));
        assert!(valid_email("name.surname@example.co"));
    }

    #[test]
    fn valid_email_rejects_malformed() {
        assert!(!valid_email("no-at-sign.com"));
        assert!(!valid_email("a@b"));
        assert!(!valid_email("a b@example.com"));
        assert!(!valid_email(""));
    }

    #[test]
    fn verification_token_is_64_hex() -> Result<()> {
        let token = generate_verification_token()?;
        assert_eq!(token.len(), 64);
        assert!(token.chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(token, generate_verification_token()?);
        Ok(())
    }

    #[test]
    fn hash_is_stable_and_differs_from_token() {
        let digest = hash_verification_token("abc");
        assert_eq!(
            digest,
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
        assert_eq!(digest, hash_verification_token("abc"));
        assert_ne!(digest, hash_verification_token("abd"));
    }

    #[test]
    fn verify_url_shape() -> Result<()> {
        assert_eq!(
            build_verify_url("http://localhost:3000", "alice", "deadbeef")?,
            "http://localhost:3000/users/verify/alice/deadbeef"
        );
        assert_eq!(
            build_verify_url("https://energia.dev/api/", "alice", "deadbeef")?,
            "https://energia.dev/api/users/verify/alice/deadbeef"
        );
        Ok(())
    }

    #[test]
    fn verify_url_encodes_username() -> Result<()> {
        let url = build_verify_url("http://localhost:3000", "al ice/x", "t")?;
        assert_eq!(url, "http://localhost:3000/users/verify/al%20ice%2Fx/t");
        Ok(())
    }
}
