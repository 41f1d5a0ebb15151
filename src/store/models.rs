use chrono::{DateTime, Utc};
use sqlx::{postgres::PgRow, FromRow, Row};
use uuid::Uuid;

/// A registered account as persisted in `users`.
///
/// `password_hash` is the bcrypt hash; it is redacted from `Debug` output and
/// has no public representation.
#[derive(Clone)]
pub struct Account {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub age: i32,
    pub phone: String,
    pub role: String,
    pub verified: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl std::fmt::Debug for Account {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Account")
            .field("id", &self.id)
            .field("username", &self.username)
            .field("email", &self.email)
            .field("password_hash", &"***")
            .field("age", &self.age)
            .field("phone", &self.phone)
            .field("role", &self.role)
            .field("verified", &self.verified)
            .field("created_at", &self.created_at)
            .field("updated_at", &self.updated_at)
            .finish()
    }
}

impl<'r> FromRow<'r, PgRow> for Account {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            id: row.try_get("id")?,
            username: row.try_get("username")?,
            email: row.try_get("email")?,
            password_hash: row.try_get("password_hash")?,
            age: row.try_get("age")?,
            phone: row.try_get("phone")?,
            role: row.try_get("role")?,
            verified: row.try_get("verified")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }
}

/// Fields required to create an account; `verified` always starts false.
#[derive(Clone)]
pub struct NewAccount {
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub age: i32,
    pub phone: String,
    pub role: String,
}

/// Allow-listed profile changes. `None` leaves the column untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AccountUpdate {
    pub email: Option<String>,
    pub age: Option<i32>,
    pub phone: Option<String>,
    pub role: Option<String>,
}

impl AccountUpdate {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.email.is_none() && self.age.is_none() && self.phone.is_none() && self.role.is_none()
    }
}

/// One-time email verification token. Only the SHA-256 digest is stored.
#[derive(Debug, Clone)]
pub struct VerificationToken {
    pub id: Uuid,
    pub username: String,
    pub token_hash: String,
    pub created_at: DateTime<Utc>,
}
