//! Postgres backend for accounts and verification tokens.

use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::{postgres::PgPoolOptions, PgPool};
use std::time::Duration;
use tracing::{info_span, Instrument, Span};
use uuid::Uuid;

use super::{
    Account, AccountStore, AccountUpdate, NewAccount, StoreError, TokenStore, UniqueField,
};

const SCHEMA_SQL: &str = include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/sql/schema.sql"));

#[derive(Clone, Debug)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Connect to Postgres with the service's pool settings.
    ///
    /// # Errors
    /// Returns an error if the database is unreachable.
    pub async fn connect(dsn: &str) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .min_connections(1)
            .max_connections(5)
            .max_lifetime(Duration::from_secs(60 * 2))
            .test_before_acquire(true)
            .connect(dsn)
            .await
            .context("Failed to connect to database")?;

        Ok(Self::new(pool))
    }

    /// Apply `sql/schema.sql`. Every statement is idempotent.
    ///
    /// # Errors
    /// Returns an error if any schema statement fails.
    pub async fn migrate(&self) -> Result<()> {
        sqlx::raw_sql(SCHEMA_SQL)
            .execute(&self.pool)
            .instrument(db_span("MIGRATE", "sql/schema.sql"))
            .await
            .context("Failed to apply database schema")?;

        Ok(())
    }
}

fn db_span(operation: &str, statement: &str) -> Span {
    info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = operation,
        db.statement = statement
    )
}

/// Map SQLSTATE 23505 onto the column whose constraint fired.
fn map_unique_violation(err: sqlx::Error) -> StoreError {
    if let sqlx::Error::Database(db_err) = &err {
        if db_err.code().is_some_and(|code| code.as_ref() == "23505") {
            return match db_err.constraint() {
                Some("users_email_key") => StoreError::Conflict(UniqueField::Email),
                _ => StoreError::Conflict(UniqueField::Username),
            };
        }
    }
    StoreError::Database(err)
}

#[async_trait]
impl AccountStore for PgStore {
    async fn account_by_username(&self, username: &str) -> Result<Option<Account>, StoreError> {
        let query = "SELECT * FROM users WHERE username = $1";
        let account = sqlx::query_as::<_, Account>(query)
            .bind(username)
            .fetch_optional(&self.pool)
            .instrument(db_span("SELECT", query))
            .await?;

        Ok(account)
    }

    async fn account_by_email(&self, email: &str) -> Result<Option<Account>, StoreError> {
        let query = "SELECT * FROM users WHERE email = $1";
        let account = sqlx::query_as::<_, Account>(query)
            .bind(email)
            .fetch_optional(&self.pool)
            .instrument(db_span("SELECT", query))
            .await?;

        Ok(account)
    }

    async fn list_accounts(&self) -> Result<Vec<Account>, StoreError> {
        let query = "SELECT * FROM users ORDER BY created_at ASC";
        let accounts = sqlx::query_as::<_, Account>(query)
            .fetch_all(&self.pool)
            .instrument(db_span("SELECT", query))
            .await?;

        Ok(accounts)
    }

    async fn create_account(&self, account: NewAccount) -> Result<Account, StoreError> {
        let query = r"
            INSERT INTO users
                (id, username, email, password_hash, age, phone, role, verified)
            VALUES ($1, $2, $3, $4, $5, $6, $7, FALSE)
            RETURNING *
        ";
        sqlx::query_as::<_, Account>(query)
            .bind(Uuid::new_v4())
            .bind(&account.username)
            .bind(&account.email)
            .bind(&account.password_hash)
            .bind(account.age)
            .bind(&account.phone)
            .bind(&account.role)
            .fetch_one(&self.pool)
            .instrument(db_span("INSERT", query))
            .await
            .map_err(map_unique_violation)
    }

    async fn mark_verified(&self, username: &str) -> Result<bool, StoreError> {
        let query = r"
            UPDATE users
            SET verified = TRUE, updated_at = NOW()
            WHERE username = $1 AND verified = FALSE
        ";
        let result = sqlx::query(query)
            .bind(username)
            .execute(&self.pool)
            .instrument(db_span("UPDATE", query))
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn update_account(
        &self,
        username: &str,
        changes: &AccountUpdate,
    ) -> Result<Option<Account>, StoreError> {
        let query = r"
            UPDATE users
            SET email = COALESCE($2, email),
                age = COALESCE($3, age),
                phone = COALESCE($4, phone),
                role = COALESCE($5, role),
                updated_at = NOW()
            WHERE username = $1
            RETURNING *
        ";
        sqlx::query_as::<_, Account>(query)
            .bind(username)
            .bind(changes.email.as_deref())
            .bind(changes.age)
            .bind(changes.phone.as_deref())
            .bind(changes.role.as_deref())
            .fetch_optional(&self.pool)
            .instrument(db_span("UPDATE", query))
            .await
            .map_err(map_unique_violation)
    }

    async fn delete_account(&self, username: &str) -> Result<u64, StoreError> {
        let mut tx = self.pool.begin().await?;

        let query = "DELETE FROM users WHERE username = $1";
        let deleted = sqlx::query(query)
            .bind(username)
            .execute(&mut *tx)
            .instrument(db_span("DELETE", query))
            .await?
            .rows_affected();

        // Tokens never outlive their account.
        let query = "DELETE FROM verification_tokens WHERE username = $1";
        sqlx::query(query)
            .bind(username)
            .execute(&mut *tx)
            .instrument(db_span("DELETE", query))
            .await?;

        tx.commit().await?;

        Ok(deleted)
    }

    async fn ping(&self) -> Result<(), StoreError> {
        let query = "SELECT 1";
        sqlx::query(query)
            .execute(&self.pool)
            .instrument(db_span("SELECT", query))
            .await?;

        Ok(())
    }
}

#[async_trait]
impl TokenStore for PgStore {
    async fn insert_token(&self, username: &str, token_hash: &str) -> Result<(), StoreError> {
        let query = r"
            INSERT INTO verification_tokens (id, username, token_hash)
            VALUES ($1, $2, $3)
        ";
        sqlx::query(query)
            .bind(Uuid::new_v4())
            .bind(username)
            .bind(token_hash)
            .execute(&self.pool)
            .instrument(db_span("INSERT", query))
            .await?;

        Ok(())
    }

    async fn consume_token(&self, username: &str, token_hash: &str) -> Result<bool, StoreError> {
        let query = r"
            DELETE FROM verification_tokens
            WHERE username = $1 AND token_hash = $2
            RETURNING id
        ";
        let consumed: Option<Uuid> = sqlx::query_scalar(query)
            .bind(username)
            .bind(token_hash)
            .fetch_optional(&self.pool)
            .instrument(db_span("DELETE", query))
            .await?;

        Ok(consumed.is_some())
    }

    async fn delete_tokens_for(&self, username: &str) -> Result<u64, StoreError> {
        let query = "DELETE FROM verification_tokens WHERE username = $1";
        let result = sqlx::query(query)
            .bind(username)
            .execute(&self.pool)
            .instrument(db_span("DELETE", query))
            .await?;

        Ok(result.rows_affected())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlx::error::{DatabaseError, ErrorKind};
    use std::borrow::Cow;
    use std::error::Error as StdError;
    use std::fmt;

    #[derive(Debug)]
    struct TestDbError {
        code: Option<&'static str>,
        constraint: Option<&'static str>,
    }

    impl fmt::Display for TestDbError {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            write!(f, "test database error")
        }
    }

    impl StdError for TestDbError {}

    impl DatabaseError for TestDbError {
        fn message(&self) -> &str {
            "test database error"
        }

        fn code(&self) -> Option<Cow<'_, str>> {
            self.code.map(Cow::Borrowed)
        }

        fn constraint(&self) -> Option<&str> {
            self.constraint
        }

        fn as_error(&self) -> &(dyn StdError + Send + Sync + 'static) {
            self
        }

        fn as_error_mut(&mut self) -> &mut (dyn StdError + Send + Sync + 'static) {
            self
        }

        fn into_error(self: Box<Self>) -> Box<dyn StdError + Send + Sync + 'static> {
            self
        }

        fn kind(&self) -> ErrorKind {
            ErrorKind::UniqueViolation
        }
    }

    fn db_error(code: &'static str, constraint: Option<&'static str>) -> sqlx::Error {
        sqlx::Error::Database(Box::new(TestDbError {
            code: Some(code),
            constraint,
        }))
    }

    #[test]
    fn unique_violation_on_email_constraint() {
        let err = map_unique_violation(db_error("23505", Some("users_email_key")));
        assert!(matches!(err, StoreError::Conflict(UniqueField::Email)));
    }

    #[test]
    fn unique_violation_on_username_constraint() {
        let err = map_unique_violation(db_error("23505", Some("users_username_key")));
        assert!(matches!(err, StoreError::Conflict(UniqueField::Username)));
    }

    #[test]
    fn other_errors_stay_database_errors() {
        let err = map_unique_violation(db_error("99999", None));
        assert!(matches!(err, StoreError::Database(_)));

        let err = map_unique_violation(sqlx::Error::RowNotFound);
        assert!(matches!(err, StoreError::Database(_)));
    }

    #[test]
    fn schema_declares_unique_constraints() {
        assert!(SCHEMA_SQL.contains("CONSTRAINT users_username_key UNIQUE (username)"));
        assert!(SCHEMA_SQL.contains("CONSTRAINT users_email_key UNIQUE (email)"));
    }
}
