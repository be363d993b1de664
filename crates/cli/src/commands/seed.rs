//! Seed the remote store with the bundled catalog.

use bestmarket_storefront::db::products::upsert_product;
use bestmarket_storefront::store::bundled_catalog;

use super::{CommandError, connect};

/// Upsert every bundled product. Returns how many were written.
///
/// Existing rows with the same ID are overwritten, so re-running restores
/// the stock catalog.
///
/// # Errors
///
/// Returns an error if the catalog is invalid or any upsert fails.
pub async fn products() -> Result<usize, CommandError> {
    let catalog = bundled_catalog()?;
    let pool = connect().await?;

    for product in &catalog {
        upsert_product(&pool, product).await?;
        tracing::debug!(id = %product.id, "Seeded product");
    }

    tracing::info!(count = catalog.len(), "Catalog seeded");
    Ok(catalog.len())
}
