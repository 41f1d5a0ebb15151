//! Account and verification token persistence.
//!
//! Handlers only see the [`AccountStore`] and [`TokenStore`] traits. Uniqueness
//! of usernames and emails is the store's job: concurrent signups racing past
//! the handler's existence check are rejected here with
//! [`StoreError::Conflict`].

pub mod memory;
pub mod models;
pub mod postgres;

pub use memory::MemoryStore;
pub use models::{Account, AccountUpdate, NewAccount, VerificationToken};
pub use postgres::PgStore;

use async_trait::async_trait;
use thiserror::Error;

/// Which unique field a write collided on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UniqueField {
    Username,
    Email,
}

impl UniqueField {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Username => "username",
            Self::Email => "email",
        }
    }
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("{} is taken", .0.as_str())]
    Conflict(UniqueField),
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

#[async_trait]
pub trait AccountStore: Send + Sync {
    async fn account_by_username(&self, username: &str) -> Result<Option<Account>, StoreError>;

    async fn account_by_email(&self, email: &str) -> Result<Option<Account>, StoreError>;

    async fn list_accounts(&self) -> Result<Vec<Account>, StoreError>;

    /// Persist a new, unverified account.
    async fn create_account(&self, account: NewAccount) -> Result<Account, StoreError>;

    /// Flip `verified` to true. Returns false when the username does not exist
    /// or is already verified.
    async fn mark_verified(&self, username: &str) -> Result<bool, StoreError>;

    /// Apply the allow-listed changes and return the updated account, or `None`
    /// when the username does not exist.
    async fn update_account(
        &self,
        username: &str,
        changes: &AccountUpdate,
    ) -> Result<Option<Account>, StoreError>;

    /// Remove the account and return the number of rows deleted (0 or 1).
    async fn delete_account(&self, username: &str) -> Result<u64, StoreError>;

    /// Cheap liveness probe used by `/health`.
    async fn ping(&self) -> Result<(), StoreError>;
}

#[async_trait]
pub trait TokenStore: Send + Sync {
    async fn insert_token(&self, username: &str, token_hash: &str) -> Result<(), StoreError>;

    /// Remove the exact (username, digest) pair. Returns false when no such
    /// token exists, so concurrent callers cannot both consume it.
    async fn consume_token(&self, username: &str, token_hash: &str) -> Result<bool, StoreError>;

    /// Drop every outstanding token for `username` and return how many went.
    async fn delete_tokens_for(&self, username: &str) -> Result<u64, StoreError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn conflict_message_names_field() {
        assert_eq!(
            StoreError::Conflict(UniqueField::Username).to_string(),
            "username is taken"
        );
        assert_eq!(
            StoreError::Conflict(UniqueField::Email).to_string(),
            "email is taken"
        );
    }
}
