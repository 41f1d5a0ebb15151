//! bcrypt hashing, off the async executor.

use anyhow::{Context, Result};
use tokio::task;

/// Hash `password` with bcrypt at `cost`.
///
/// # Errors
/// Returns an error if the blocking task panics or bcrypt rejects the cost.
pub(super) async fn hash_password(password: String, cost: u32) -> Result<String> {
    task::spawn_blocking(move || bcrypt::hash(password, cost))
        .await
        .context("password hashing task failed")?
        .context("failed to hash password")
}

/// Compare `password` with a stored bcrypt hash.
///
/// # Errors
/// Returns an error if the stored hash is malformed or the blocking task panics.
pub(super) async fn verify_password(password: String, hash: String) -> Result<bool> {
    task::spawn_blocking(move || bcrypt::verify(password, &hash))
        .await
        .context("password verification task failed")?
        .context("stored password hash is malformed")
}
