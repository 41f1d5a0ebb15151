//! Auth configuration and shared state.

use anyhow::{anyhow, Context, Result};
use url::Url;

use super::credential::CredentialSigner;

pub const DEFAULT_TOKEN_TTL_SECONDS: i64 = 24 * 60 * 60;
pub const DEFAULT_BCRYPT_COST: u32 = 10;

#[derive(Clone, Debug)]
pub struct AuthConfig {
    base_url: String,
    bcrypt_cost: u32,
}

impl AuthConfig {
    /// `base_url` is the public origin used to build verification links.
    ///
    /// # Errors
    /// Returns an error if `base_url` is not an absolute http(s) URL.
    pub fn new(base_url: &str) -> Result<Self> {
        let parsed =
            Url::parse(base_url).with_context(|| format!("Invalid base URL: {base_url}"))?;
        if !matches!(parsed.scheme(), "http" | "https") || parsed.host_str().is_none() {
            return Err(anyhow!("Base URL must be an http(s) URL with a host: {base_url}"));
        }

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            bcrypt_cost: DEFAULT_BCRYPT_COST,
        })
    }

    #[must_use]
    pub fn with_bcrypt_cost(mut self, cost: u32) -> Self {
        self.bcrypt_cost = cost;
        self
    }

    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    #[must_use]
    pub fn bcrypt_cost(&self) -> u32 {
        self.bcrypt_cost
    }
}

/// Immutable auth state shared by every request.
#[derive(Debug)]
pub struct AuthState {
    config: AuthConfig,
    signer: CredentialSigner,
}

impl AuthState {
    #[must_use]
    pub fn new(config: AuthConfig, signer: CredentialSigner) -> Self {
        Self { config, signer }
    }

    #[must_use]
    pub fn config(&self) -> &AuthConfig {
        &self.config
    }

    #[must_use]
    pub fn signer(&self) -> &CredentialSigner {
        &self.signer
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_url_is_trimmed() -> Result<()> {
        let config = AuthConfig::new("https://api.energia.dev/")?;
        assert_eq!(config.base_url(), "https://api.energia.dev");
        assert_eq!(config.bcrypt_cost(), 10);
        Ok(())
    }

    #[test]
    fn base_url_must_be_http() {
        assert!(AuthConfig::new("ftp://files.energia.dev").is_err());
        assert!(AuthConfig::new("not a url").is_err());
        assert!(AuthConfig::new("http://localhost:3000").is_ok());
    }

    #[test]
    fn bcrypt_cost_override() -> Result<()> {
        let config = AuthConfig::new("http://localhost:3000")?.with_bcrypt_cost(4);
        assert_eq!(config.bcrypt_cost(), 4);
        Ok(())
    }
}
