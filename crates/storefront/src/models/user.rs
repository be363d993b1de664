//! User domain types.
//!
//! `User` is the remote store's account row; `UserRecord` is the local
//! store's copy, which is also the shape of the JSON users snapshot.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use bestmarket_core::{Email, UserId};

/// A customer account in the remote store (domain type).
#[derive(Debug, Clone)]
pub struct User {
    /// Unique user ID.
    pub id: UserId,
    /// Display name.
    pub name: String,
    /// User's email address.
    pub email: Email,
    /// Argon2 PHC string.
    pub password_hash: Option<String>,
    /// Whether the user can use the admin endpoints' UI.
    pub is_admin: bool,
    /// When the user was created.
    pub created_at: DateTime<Utc>,
}

/// A customer account in the local store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRecord {
    pub name: String,
    pub email: Email,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password_hash: Option<String>,
    /// Plain-text password from before hashing was introduced. Accepted at
    /// login and cleared on the next password change.
    #[serde(default, rename = "password", skip_serializing_if = "Option::is_none")]
    pub legacy_password: Option<String>,
    #[serde(default)]
    pub is_admin: bool,
    #[serde(rename = "registrationDate", default = "today")]
    pub registration_date: NaiveDate,
}

fn today() -> NaiveDate {
    Utc::now().date_naive()
}

impl UserRecord {
    /// A new local account with a hashed password.
    #[must_use]
    pub fn new(name: String, email: Email, password_hash: String) -> Self {
        Self {
            name,
            email,
            password_hash: Some(password_hash),
            legacy_password: None,
            is_admin: false,
            registration_date: today(),
        }
    }

    /// Public view of the account.
    #[must_use]
    pub fn profile(&self) -> UserProfile {
        UserProfile {
            name: self.name.clone(),
            email: self.email.clone(),
            registration_date: self.registration_date,
        }
    }
}

impl From<User> for UserRecord {
    fn from(user: User) -> Self {
        Self {
            name: user.name,
            email: user.email,
            password_hash: user.password_hash,
            legacy_password: None,
            is_admin: user.is_admin,
            registration_date: user.created_at.date_naive(),
        }
    }
}

impl User {
    /// Public view of the account.
    #[must_use]
    pub fn profile(&self) -> UserProfile {
        UserProfile {
            name: self.name.clone(),
            email: self.email.clone(),
            registration_date: self.created_at.date_naive(),
        }
    }
}

/// Account details returned to the account owner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UserProfile {
    pub name: String,
    pub email: Email,
    #[serde(rename = "registrationDate")]
    pub registration_date: NaiveDate,
}

/// Which store an admin user listing came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum UserSource {
    Database,
    Local,
}

/// One row of the admin user listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UserSummary {
    #[serde(flatten)]
    pub profile: UserProfile,
    pub source: UserSource,
}
