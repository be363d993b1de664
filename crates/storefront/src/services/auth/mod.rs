//! Authentication service.
//!
//! Password accounts held in both stores. The remote record is consulted
//! first; the local record (and its JSON snapshot) is always kept in step.

mod error;

pub use error::AuthError;

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use tracing::instrument;

use bestmarket_core::Email;

use crate::db::{RepositoryError, UserRepository};
use crate::models::{User, UserProfile, UserRecord, UserSource, UserSummary};
use crate::store::{Durability, Store, log_remote_failure};

/// Minimum password length.
const MIN_PASSWORD_LENGTH: usize = 8;

/// Authentication service.
///
/// Handles registration, login, password changes, and admin user management.
pub struct AuthService<'a> {
    store: &'a Store,
}

impl<'a> AuthService<'a> {
    /// Create a new authentication service.
    #[must_use]
    pub const fn new(store: &'a Store) -> Self {
        Self { store }
    }

    /// Register a new user with name, email, and password.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::MissingFields` if any field is blank.
    /// Returns `AuthError::InvalidEmail` if the email format is invalid.
    /// Returns `AuthError::WeakPassword` if the password doesn't meet requirements.
    /// Returns `AuthError::UserAlreadyExists` if either store has the email.
    #[instrument(skip_all)]
    pub async fn register(
        &self,
        name: &str,
        email: &str,
        password: &str,
    ) -> Result<(UserProfile, Durability), AuthError> {
        let name = name.trim();
        if name.is_empty() || email.trim().is_empty() || password.is_empty() {
            return Err(AuthError::MissingFields("Missing required fields"));
        }
        let email = Email::parse(email)?;
        let email = &email;
        validate_password(password)?;

        if self.remote_user(email).await.is_some() || self.store.local().user(email).await.is_some()
        {
            return Err(AuthError::UserAlreadyExists);
        }

        let password_hash = hash_password(password)?;

        let remote = match self.store.remote() {
            Some(pool) => match UserRepository::new(pool)
                .create(name, email, &password_hash)
                .await
            {
                Ok(user) => Some(user),
                Err(RepositoryError::Conflict(_)) => return Err(AuthError::UserAlreadyExists),
                Err(err) => {
                    log_remote_failure("users.create", &err);
                    None
                }
            },
            None => None,
        };
        let durability = Durability::from_remote(remote.is_some());

        let record = remote.map_or_else(
            || UserRecord::new(name.to_owned(), email.clone(), password_hash),
            UserRecord::from,
        );
        let profile = record.profile();
        let inserted = match self.store.local().insert_user(record).await {
            Ok(inserted) => inserted,
            // The remote account exists, so the registration stands
            Err(err) if durability == Durability::Remote => {
                tracing::error!(error = %err, %email, "Users snapshot not written");
                true
            }
            Err(err) => return Err(err.into()),
        };
        if !inserted && durability == Durability::LocalOnly {
            return Err(AuthError::UserAlreadyExists);
        }

        tracing::info!(%email, %durability, "User registered");
        Ok((profile, durability))
    }

    /// Login with email and password.
    ///
    /// Accepts the Argon2 hash, or a legacy plain-text password on local
    /// records that predate hashing.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::MissingFields` if either field is blank.
    /// Returns `AuthError::InvalidCredentials` if the email/password is wrong.
    #[instrument(skip_all)]
    pub async fn login(&self, email: &str, password: &str) -> Result<UserProfile, AuthError> {
        if email.trim().is_empty() || password.is_empty() {
            return Err(AuthError::MissingFields("Missing email or password"));
        }
        let email = Email::parse(email).map_err(|_| AuthError::InvalidCredentials)?;
        let email = &email;

        if let Some(user) = self.remote_user(email).await
            && password_matches(user.password_hash.as_deref(), None, password)
        {
            return Ok(user.profile());
        }

        let record = self
            .store
            .local()
            .user(email)
            .await
            .ok_or(AuthError::InvalidCredentials)?;
        if password_matches(
            record.password_hash.as_deref(),
            record.legacy_password.as_deref(),
            password,
        ) {
            Ok(record.profile())
        } else {
            Err(AuthError::InvalidCredentials)
        }
    }

    /// Change a user's password after checking the current one.
    ///
    /// The remote record, when present, decides whether the current password
    /// is correct. Both stores receive the new hash; a user known only
    /// remotely is copied into the local store.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::MissingFields` if any field is blank.
    /// Returns `AuthError::WeakPassword` if the new password is too short.
    /// Returns `AuthError::UserNotFound` if neither store has the user.
    /// Returns `AuthError::IncorrectPassword` if the current password is wrong.
    #[instrument(skip_all)]
    pub async fn change_password(
        &self,
        email: &str,
        current_password: &str,
        new_password: &str,
    ) -> Result<Durability, AuthError> {
        if email.trim().is_empty() || current_password.is_empty() || new_password.is_empty() {
            return Err(AuthError::MissingFields("Missing required fields"));
        }
        if !long_enough(new_password) {
            return Err(AuthError::WeakPassword(format!(
                "New password must be at least {MIN_PASSWORD_LENGTH} characters long"
            )));
        }
        let email = Email::parse(email).map_err(|_| AuthError::UserNotFound)?;
        let email = &email;

        let remote_user = self.remote_user(email).await;
        let local_user = self.store.local().user(email).await;

        let verified = match (&remote_user, &local_user) {
            (None, None) => return Err(AuthError::UserNotFound),
            (Some(remote), _) => {
                password_matches(remote.password_hash.as_deref(), None, current_password)
            }
            (None, Some(local)) => password_matches(
                local.password_hash.as_deref(),
                local.legacy_password.as_deref(),
                current_password,
            ),
        };
        if !verified {
            return Err(AuthError::IncorrectPassword);
        }

        let new_hash = hash_password(new_password)?;

        let remote_updated = if remote_user.is_some() {
            let hash = new_hash.as_str();
            self.store
                .attempt("users.update_password_hash", |pool| async move {
                    UserRepository::new(pool)
                        .update_password_hash(email, hash)
                        .await
                })
                .await
                .is_some()
        } else {
            false
        };

        let local = self.store.local();
        match (local_user, remote_user) {
            (Some(_), _) => {
                local.set_password_hash(email, new_hash).await?;
            }
            (None, Some(user)) => {
                let mut record = UserRecord::from(user);
                record.password_hash = Some(new_hash);
                local.upsert_user(record).await?;
            }
            (None, None) => {}
        }

        let durability = Durability::from_remote(remote_updated);
        tracing::info!(%email, %durability, "Password changed");
        Ok(durability)
    }

    /// List users for the admin view: remote rows if any, else local.
    pub async fn list_users(&self) -> Vec<UserSummary> {
        let remote = self
            .store
            .attempt("users.list", |pool| async move {
                UserRepository::new(pool).list().await
            })
            .await
            .filter(|users| !users.is_empty());

        if let Some(users) = remote {
            return users
                .iter()
                .map(|u| UserSummary {
                    profile: u.profile(),
                    source: UserSource::Database,
                })
                .collect();
        }

        self.store
            .local()
            .users()
            .await
            .iter()
            .map(|u| UserSummary {
                profile: u.profile(),
                source: UserSource::Local,
            })
            .collect()
    }

    /// Delete a user from both stores.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::UserNotFound` if neither store had the user.
    #[instrument(skip_all)]
    pub async fn delete_user(&self, email: &str) -> Result<Durability, AuthError> {
        let email = Email::parse(email).map_err(|_| AuthError::UserNotFound)?;
        let email = &email;

        let remote_deleted = self
            .store
            .attempt("users.delete", |pool| async move {
                UserRepository::new(pool).delete(email).await
            })
            .await;
        let local_deleted = self.store.local().remove_user(email).await?;

        if !remote_deleted.unwrap_or(false) && !local_deleted {
            return Err(AuthError::UserNotFound);
        }

        let durability = Durability::from_remote(remote_deleted.is_some());
        tracing::info!(%email, %durability, "User deleted");
        Ok(durability)
    }

    async fn remote_user(&self, email: &Email) -> Option<User> {
        self.store
            .attempt("users.get_by_email", |pool| async move {
                UserRepository::new(pool).get_by_email(email).await
            })
            .await
            .flatten()
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Validate password meets requirements.
fn validate_password(password: &str) -> Result<(), AuthError> {
    if !long_enough(password) {
        return Err(AuthError::WeakPassword(format!(
            "Password must be at least {MIN_PASSWORD_LENGTH} characters long"
        )));
    }

    Ok(())
}

/// Length is counted in characters, not bytes.
fn long_enough(password: &str) -> bool {
    password.chars().count() >= MIN_PASSWORD_LENGTH
}

/// Hash a password using Argon2id.
fn hash_password(password: &str) -> Result<String, AuthError> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();

    argon2
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|_| AuthError::PasswordHash)
}

/// Verify a password against a hash.
fn verify_password(password: &str, hash: &str) -> Result<(), AuthError> {
    let parsed_hash = PasswordHash::new(hash).map_err(|_| AuthError::InvalidCredentials)?;
    let argon2 = Argon2::default();

    argon2
        .verify_password(password.as_bytes(), &parsed_hash)
        .map_err(|_| AuthError::InvalidCredentials)
}

/// Check a password against a stored hash, or the legacy plain-text
/// password when there is no hash.
fn password_matches(hash: Option<&str>, legacy: Option<&str>, password: &str) -> bool {
    match (hash, legacy) {
        (Some(hash), _) => verify_password(password, hash).is_ok(),
        (None, Some(legacy)) => legacy == password,
        (None, None) => false,
    }
}
