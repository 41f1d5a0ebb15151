//! API handlers for energia.
//!
//! `auth` owns signup, verification, signin and credentials; `users` owns
//! listing and profile management on top of the same store handles.

pub mod auth;
pub mod health;
pub mod root;
pub mod users;
