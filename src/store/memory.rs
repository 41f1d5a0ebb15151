//! In-process store backing the test suite.

use async_trait::async_trait;
use chrono::Utc;
use std::collections::BTreeMap;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{
    Account, AccountStore, AccountUpdate, NewAccount, StoreError, TokenStore, UniqueField,
    VerificationToken,
};

#[derive(Debug, Default)]
struct State {
    // keyed by username
    accounts: BTreeMap<String, Account>,
    tokens: Vec<VerificationToken>,
}

/// Both stores behind a single lock, so uniqueness checks and writes are atomic.
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: RwLock<State>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Tokens currently stored for `username`.
    pub async fn tokens_for(&self, username: &str) -> Vec<VerificationToken> {
        self.state
            .read()
            .await
            .tokens
            .iter()
            .filter(|token| token.username == username)
            .cloned()
            .collect()
    }

    pub async fn account_count(&self) -> usize {
        self.state.read().await.accounts.len()
    }
}

fn email_taken(state: &State, email: &str, except: Option<&str>) -> bool {
    state
        .accounts
        .values()
        .any(|account| account.email == email && Some(account.username.as_str()) != except)
}

#[async_trait]
impl AccountStore for MemoryStore {
    async fn account_by_username(&self, username: &str) -> Result<Option<Account>, StoreError> {
        Ok(self.state.read().await.accounts.get(username).cloned())
    }

    async fn account_by_email(&self, email: &str) -> Result<Option<Account>, StoreError> {
        Ok(self
            .state
            .read()
            .await
            .accounts
            .values()
            .find(|account| account.email == email)
            .cloned())
    }

    async fn list_accounts(&self) -> Result<Vec<Account>, StoreError> {
        let state = self.state.read().await;
        let mut accounts: Vec<Account> = state.accounts.values().cloned().collect();
        accounts.sort_by_key(|account| account.created_at);
        Ok(accounts)
    }

    async fn create_account(&self, account: NewAccount) -> Result<Account, StoreError> {
        let mut state = self.state.write().await;

        if state.accounts.contains_key(&account.username) {
            return Err(StoreError::Conflict(UniqueField::Username));
        }
        if email_taken(&state, &account.email, None) {
            return Err(StoreError::Conflict(UniqueField::Email));
        }

        let now = Utc::now();
        let record = Account {
            id: Uuid::new_v4(),
            username: account.username,
            email: account.email,
            password_hash: account.password_hash,
            age: account.age,
            phone: account.phone,
            role: account.role,
            verified: false,
            created_at: now,
            updated_at: now,
        };
        state
            .accounts
            .insert(record.username.clone(), record.clone());

        Ok(record)
    }

    async fn mark_verified(&self, username: &str) -> Result<bool, StoreError> {
        let mut state = self.state.write().await;
        match state.accounts.get_mut(username) {
            Some(account) if !account.verified => {
                account.verified = true;
                account.updated_at = Utc::now();
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn update_account(
        &self,
        username: &str,
        changes: &AccountUpdate,
    ) -> Result<Option<Account>, StoreError> {
        let mut state = self.state.write().await;

        if !state.accounts.contains_key(username) {
            return Ok(None);
        }
        if let Some(email) = &changes.email {
            if email_taken(&state, email, Some(username)) {
                return Err(StoreError::Conflict(UniqueField::Email));
            }
        }

        let Some(account) = state.accounts.get_mut(username) else {
            return Ok(None);
        };
        if let Some(email) = &changes.email {
            account.email.clone_from(email);
        }
        if let Some(age) = changes.age {
            account.age = age;
        }
        if let Some(phone) = &changes.phone {
            account.phone.clone_from(phone);
        }
        if let Some(role) = &changes.role {
            account.role.clone_from(role);
        }
        account.updated_at = Utc::now();

        Ok(Some(account.clone()))
    }

    async fn delete_account(&self, username: &str) -> Result<u64, StoreError> {
        let mut state = self.state.write().await;
        let removed = state.accounts.remove(username).is_some();
        if removed {
            state.tokens.retain(|token| token.username != username);
        }
        Ok(u64::from(removed))
    }

    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }
}

#[async_trait]
impl TokenStore for MemoryStore {
    async fn insert_token(&self, username: &str, token_hash: &str) -> Result<(), StoreError> {
        self.state.write().await.tokens.push(VerificationToken {
            id: Uuid::new_v4(),
            username: username.to_string(),
            token_hash: token_hash.to_string(),
            created_at: Utc::now(),
        });
        Ok(())
    }

    async fn consume_token(&self, username: &str, token_hash: &str) -> Result<bool, StoreError> {
        let mut state = self.state.write().await;
        let position = state
            .tokens
            .iter()
            .position(|token| token.username == username && token.token_hash == token_hash);
        Ok(position.map(|index| state.tokens.remove(index)).is_some())
    }

    async fn delete_tokens_for(&self, username: &str) -> Result<u64, StoreError> {
        let mut state = self.state.write().await;
        let before = state.tokens.len();
        state.tokens.retain(|token| token.username != username);
        Ok((before - state.tokens.len()) as u64)
    }
}
