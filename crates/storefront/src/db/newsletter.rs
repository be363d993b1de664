//! Newsletter subscriber queries.

use sqlx::PgPool;

use bestmarket_core::Email;

use super::RepositoryError;

/// Record a subscription.
///
/// Returns `false` if the address was already subscribed.
///
/// # Errors
///
/// Returns error if the database insert fails.
pub async fn subscribe(pool: &PgPool, email: &Email) -> Result<bool, RepositoryError> {
    let result = sqlx::query(
        "INSERT INTO storefront.newsletter_subscribers (email) VALUES ($1) ON CONFLICT DO NOTHING",
    )
    .bind(email.as_str())
    .execute(pool)
    .await?;

    Ok(result.rows_affected() > 0)
}
