//! Cart item queries.
//!
//! Rows are keyed by (session, item key); product details are joined in on
//! read so remote carts always show current prices.

use sqlx::PgPool;

use bestmarket_core::{ItemKey, ProductId, SessionId};

use super::{RepositoryError, non_negative, to_db_count};
use crate::models::CartLine;

#[derive(Debug, sqlx::FromRow)]
struct CartRow {
    item_key: String,
    product_id: String,
    color: Option<String>,
    size: Option<String>,
    quantity: i32,
    name: String,
    brand: String,
    price: i64,
    original_price: Option<i64>,
    image: String,
    stock: i32,
}

impl TryFrom<CartRow> for CartLine {
    type Error = RepositoryError;

    fn try_from(row: CartRow) -> Result<Self, Self::Error> {
        let item_key = ItemKey::parse(&row.item_key)
            .map_err(|e| RepositoryError::DataCorruption(e.to_string()))?;

        Ok(Self {
            item_key,
            product_id: ProductId::new(row.product_id),
            name: row.name,
            brand: row.brand,
            price: row.price,
            original_price: row.original_price,
            image: row.image,
            quantity: non_negative(row.quantity, "quantity")?,
            size: row.size,
            color: row.color,
            stock: non_negative(row.stock, "stock")?,
        })
    }
}

/// Get the cart lines for a session, oldest first.
///
/// # Errors
///
/// Returns error if the database query fails.
pub async fn get_cart(pool: &PgPool, session: &SessionId) -> Result<Vec<CartLine>, RepositoryError> {
    sqlx::query_as::<_, CartRow>(
        r"
        SELECT c.item_key, c.product_id, c.color, c.size, c.quantity,
               p.name, p.brand, p.price, p.original_price, p.image, p.stock
        FROM storefront.cart_items c
        JOIN storefront.products p ON p.id = c.product_id
        WHERE c.session_id = $1
        ORDER BY c.id
        ",
    )
    .bind(session.as_str())
    .fetch_all(pool)
    .await?
    .into_iter()
    .map(CartLine::try_from)
    .collect()
}

/// Add `quantity` of an item, merging with an existing row.
///
/// # Errors
///
/// Returns error if the database write fails.
pub async fn add_item(
    pool: &PgPool,
    session: &SessionId,
    key: &ItemKey,
    quantity: u32,
) -> Result<(), RepositoryError> {
    sqlx::query(
        r"
        INSERT INTO storefront.cart_items (session_id, item_key, product_id, color, size, quantity)
        VALUES ($1, $2, $3, $4, $5, $6)
        ON CONFLICT (session_id, item_key)
        DO UPDATE SET quantity = storefront.cart_items.quantity + EXCLUDED.quantity
        ",
    )
    .bind(session.as_str())
    .bind(key.to_string())
    .bind(key.product_id.as_str())
    .bind(key.color.as_deref())
    .bind(key.size.as_deref())
    .bind(to_db_count(quantity))
    .execute(pool)
    .await?;

    Ok(())
}

/// Set the quantity of an existing item.
///
/// # Errors
///
/// Returns error if the database write fails.
pub async fn set_quantity(
    pool: &PgPool,
    session: &SessionId,
    key: &ItemKey,
    quantity: u32,
) -> Result<(), RepositoryError> {
    sqlx::query(
        "UPDATE storefront.cart_items SET quantity = $3 WHERE session_id = $1 AND item_key = $2",
    )
    .bind(session.as_str())
    .bind(key.to_string())
    .bind(to_db_count(quantity))
    .execute(pool)
    .await?;

    Ok(())
}

/// Remove one item from a cart.
///
/// # Errors
///
/// Returns error if the database delete fails.
pub async fn remove_item(
    pool: &PgPool,
    session: &SessionId,
    key: &ItemKey,
) -> Result<(), RepositoryError> {
    sqlx::query("DELETE FROM storefront.cart_items WHERE session_id = $1 AND item_key = $2")
        .bind(session.as_str())
        .bind(key.to_string())
        .execute(pool)
        .await?;

    Ok(())
}

/// Remove every item from a cart.
///
/// # Errors
///
/// Returns error if the database delete fails.
pub async fn clear_cart(pool: &PgPool, session: &SessionId) -> Result<(), RepositoryError> {
    sqlx::query("DELETE FROM storefront.cart_items WHERE session_id = $1")
        .bind(session.as_str())
        .execute(pool)
        .await?;

    Ok(())
}
