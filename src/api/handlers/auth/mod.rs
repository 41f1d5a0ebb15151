//! Signup, email verification, signin and the signed credentials they mint.

pub mod credential;
mod password;
pub mod signin;
pub mod signup;
pub mod state;
pub mod types;
mod utils;
pub mod validation;
pub mod verification;

pub use credential::{Authenticated, Claims, CredentialError, CredentialSigner, CREDENTIAL_HEADER};
pub use state::{AuthConfig, AuthState};
