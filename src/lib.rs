//! # Energia (user accounts)
//!
//! `energia` is a small account service: signup with email verification,
//! password sign-in, and profile management.
//!
//! ## Signup & verification
//!
//! Passwords are hashed with bcrypt (cost 10) before they reach the store. Each
//! signup issues a one-time verification token that is mailed to the account's
//! address as a link; only the SHA-256 digest of the token is persisted. The
//! link flips the account to `verified` and consumes the token.
//!
//! ## Signed credentials
//!
//! Signup and signin return an HS256 JWT in the `x-auth-token` response header.
//! Protected routes read it back from the same request header and enforce that
//! the embedded username owns the requested resource. Credentials expire after
//! a configurable TTL.
//!
//! ## Storage
//!
//! Accounts and verification tokens live behind the [`store::AccountStore`] and
//! [`store::TokenStore`] traits. [`store::PgStore`] is the production backend;
//! [`store::MemoryStore`] backs the test suite.

pub mod api;
pub mod cli;
pub mod store;

#[allow(clippy::doc_markdown, clippy::needless_raw_string_hashes)]
pub mod built_info {
    include!(concat!(env!("OUT_DIR"), "/built.rs"));
}

pub const GIT_COMMIT_HASH: &str = match built_info::GIT_COMMIT_HASH {
    Some(hash) => hash,
    None => "unknown",
};

pub const APP_USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"),);
