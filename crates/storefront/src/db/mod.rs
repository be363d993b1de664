//! Remote store: `PostgreSQL` repositories.
//!
//! # Schema: `storefront`
//!
//! - `products` - Catalog, seeded with `bm-cli seed products`
//! - `cart_items` - One row per (session, item key)
//! - `orders` - Placed orders with a JSONB line-item snapshot
//! - `users` - Customer accounts (Argon2 password hashes)
//! - `newsletter_subscribers`
//!
//! Queries are built at runtime with `sqlx::query_as` and `FromRow` rows so
//! the crate compiles without a live database.
//!
//! # Migrations
//!
//! Migrations are stored in `crates/storefront/migrations/` and run via:
//! ```bash
//! cargo run -p bestmarket-cli -- migrate
//! ```

pub mod cart;
pub mod newsletter;
pub mod orders;
pub mod products;
pub mod users;

use std::time::Duration;

use secrecy::ExposeSecret;
use sqlx::PgPool;
use sqlx::postgres::{PgConnectOptions, PgPoolOptions};
use thiserror::Error;

pub use users::UserRepository;

/// Errors that can occur during repository operations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Database error from sqlx.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Data in the database is corrupted or invalid.
    #[error("data corruption: {0}")]
    DataCorruption(String),

    /// Requested entity was not found.
    #[error("not found")]
    NotFound,

    /// Constraint violation (e.g., unique email).
    #[error("constraint violation: {0}")]
    Conflict(String),
}

/// Acquire timeout used by the service pool.
pub const ACQUIRE_TIMEOUT: Duration = Duration::from_secs(10);

/// Create a lazily connecting `PostgreSQL` connection pool.
///
/// No connection is opened here, so a database that is down at start-up is
/// picked up as soon as it comes back. Each query waits at most
/// [`ACQUIRE_TIMEOUT`] for a connection.
///
/// # Arguments
///
/// * `database_url` - `PostgreSQL` connection string (wrapped in `SecretString`)
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection string is invalid.
pub fn create_pool(database_url: &secrecy::SecretString) -> Result<PgPool, sqlx::Error> {
    create_pool_with_timeout(database_url, ACQUIRE_TIMEOUT)
}

/// [`create_pool`] with a custom acquire timeout.
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection string is invalid.
pub fn create_pool_with_timeout(
    database_url: &secrecy::SecretString,
    acquire_timeout: Duration,
) -> Result<PgPool, sqlx::Error> {
    let options = database_url.expose_secret().parse::<PgConnectOptions>()?;
    Ok(PgPoolOptions::new()
        .max_connections(10)
        .acquire_timeout(acquire_timeout)
        .connect_lazy_with(options))
}

/// Check that the remote store answers a trivial query.
///
/// # Errors
///
/// Returns `sqlx::Error` if the database is unreachable.
pub async fn ping(pool: &PgPool) -> Result<(), sqlx::Error> {
    sqlx::query("SELECT 1").execute(pool).await.map(|_| ())
}

/// Map a unique-constraint violation to `RepositoryError::Conflict`.
fn conflict_on_unique(err: sqlx::Error, what: &str) -> RepositoryError {
    if let sqlx::Error::Database(ref db_err) = err
        && db_err.is_unique_violation()
    {
        return RepositoryError::Conflict(format!("{what} already exists"));
    }
    RepositoryError::Database(err)
}

/// Convert a database integer column to an unsigned count.
fn non_negative(value: i32, column: &str) -> Result<u32, RepositoryError> {
    u32::try_from(value)
        .map_err(|_| RepositoryError::DataCorruption(format!("negative {column}: {value}")))
}

/// Convert an unsigned count to a database integer, saturating.
fn to_db_count(value: u32) -> i32 {
    i32::try_from(value).unwrap_or(i32::MAX)
}

/// A pool pointed at a closed local port, for exercising remote failures.
///
/// Must be called inside a Tokio runtime.
#[cfg(test)]
#[allow(clippy::unwrap_used)]
pub(crate) fn unreachable_pool() -> PgPool {
    let url = secrecy::SecretString::from("postgres://bm:bm@127.0.0.1:1/bm".to_owned());
    create_pool_with_timeout(&url, Duration::from_millis(300)).unwrap()
}

#[cfg(test)]
mod tests {
    use secrecy::SecretString;

    use super::*;

    #[tokio::test]
    async fn test_pool_connects_lazily() {
        // Building the pool must not need the database to be up
        let pool = unreachable_pool();
        assert!(ping(&pool).await.is_err());

        let bad = SecretString::from("not a url".to_owned());
        assert!(create_pool(&bad).is_err());
    }

    #[test]
    fn test_count_conversions() {
        assert_eq!(to_db_count(7), 7);
        assert_eq!(to_db_count(u32::MAX), i32::MAX);
        assert_eq!(non_negative(3, "stock").unwrap_or_default(), 3);
        assert!(matches!(
            non_negative(-1, "stock"),
            Err(RepositoryError::DataCorruption(_))
        ));
    }
}
