//! Authentication error types.

use thiserror::Error;

use crate::store::SnapshotError;

/// Errors that can occur during authentication operations.
#[derive(Debug, Error)]
pub enum AuthError {
    /// A required field was missing or blank. Carries the client message.
    #[error("{0}")]
    MissingFields(&'static str),

    /// Invalid email format.
    #[error("invalid email: {0}")]
    InvalidEmail(#[from] bestmarket_core::EmailError),

    /// Invalid credentials (wrong password or user not found).
    #[error("invalid credentials")]
    InvalidCredentials,

    /// The current password given for a password change is wrong.
    #[error("current password is incorrect")]
    IncorrectPassword,

    /// User not found.
    #[error("user not found")]
    UserNotFound,

    /// User already exists.
    #[error("user already exists")]
    UserAlreadyExists,

    /// Password too weak or invalid.
    #[error("password validation failed: {0}")]
    WeakPassword(String),

    /// Local users snapshot could not be written.
    #[error("users snapshot error: {0}")]
    Snapshot(#[from] SnapshotError),

    /// Password hashing error.
    #[error("password hashing error")]
    PasswordHash,
}
