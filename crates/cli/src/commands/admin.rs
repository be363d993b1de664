//! Admin user management.
//!
//! # Usage
//!
//! ```bash
//! bm-cli admin promote -e admin@example.com
//! bm-cli admin promote -e admin@example.com --revoke
//! ```

use bestmarket_core::Email;
use bestmarket_storefront::db::{RepositoryError, UserRepository};

use super::{CommandError, connect};

/// Set the admin flag on an existing remote user.
///
/// # Errors
///
/// Returns an error if the email is invalid, the user does not exist, or
/// the update fails.
pub async fn promote(email: &str, is_admin: bool) -> Result<(), CommandError> {
    let email = Email::parse(email).map_err(|e| CommandError::InvalidEmail(e.to_string()))?;
    let pool = connect().await?;

    match UserRepository::new(&pool).set_admin(&email, is_admin).await {
        Ok(()) => {
            tracing::info!(%email, is_admin, "Admin flag updated");
            Ok(())
        }
        Err(RepositoryError::NotFound) => Err(CommandError::UserNotFound(email.into_inner())),
        Err(e) => Err(e.into()),
    }
}
