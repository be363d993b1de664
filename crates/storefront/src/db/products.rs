//! Product queries.

use sqlx::{PgPool, Postgres, QueryBuilder};

use bestmarket_core::ProductId;

use super::{RepositoryError, conflict_on_unique, non_negative, to_db_count};
use crate::models::{Product, ProductFilter};

const PRODUCT_COLUMNS: &str = "id, name, brand, price, original_price, image, category, \
     rating, reviews, colors, sizes, stock, is_new, on_sale";

#[derive(Debug, sqlx::FromRow)]
struct ProductRow {
    id: String,
    name: String,
    brand: String,
    price: i64,
    original_price: Option<i64>,
    image: String,
    category: String,
    rating: f64,
    reviews: i32,
    colors: Vec<String>,
    sizes: Vec<String>,
    stock: i32,
    is_new: bool,
    on_sale: bool,
}

impl TryFrom<ProductRow> for Product {
    type Error = RepositoryError;

    fn try_from(row: ProductRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: ProductId::new(row.id),
            name: row.name,
            brand: row.brand,
            price: row.price,
            original_price: row.original_price,
            image: row.image,
            category: row.category,
            rating: row.rating,
            reviews: non_negative(row.reviews, "reviews")?,
            colors: row.colors,
            sizes: row.sizes,
            stock: non_negative(row.stock, "stock")?,
            is_new: row.is_new,
            on_sale: row.on_sale,
        })
    }
}

/// List products matching `filter`.
///
/// Category and brand match as case-insensitive substrings; the search term
/// matches name or brand.
///
/// # Errors
///
/// Returns error if the database query fails.
pub async fn list_products(
    pool: &PgPool,
    filter: &ProductFilter,
) -> Result<Vec<Product>, RepositoryError> {
    let mut query = QueryBuilder::<Postgres>::new(format!(
        "SELECT {PRODUCT_COLUMNS} FROM storefront.products WHERE TRUE"
    ));

    if let Some(category) = filter.category() {
        query
            .push(" AND category ILIKE ")
            .push_bind(like_pattern(category));
    }
    if let Some(brand) = filter.brand() {
        query.push(" AND brand ILIKE ").push_bind(like_pattern(brand));
    }
    if let Some(min) = filter.min_price {
        query.push(" AND price >= ").push_bind(min);
    }
    if let Some(max) = filter.max_price {
        query.push(" AND price <= ").push_bind(max);
    }
    if let Some(term) = filter.search() {
        let pattern = like_pattern(term);
        query
            .push(" AND (name ILIKE ")
            .push_bind(pattern.clone())
            .push(" OR brand ILIKE ")
            .push_bind(pattern)
            .push(")");
    }
    query.push(" ORDER BY length(id), id");

    query
        .build_query_as::<ProductRow>()
        .fetch_all(pool)
        .await?
        .into_iter()
        .map(Product::try_from)
        .collect()
}

/// Get a product by ID.
///
/// # Errors
///
/// Returns error if the database query fails.
pub async fn get_product(
    pool: &PgPool,
    id: &ProductId,
) -> Result<Option<Product>, RepositoryError> {
    let row = sqlx::query_as::<_, ProductRow>(&format!(
        "SELECT {PRODUCT_COLUMNS} FROM storefront.products WHERE id = $1"
    ))
    .bind(id.as_str())
    .fetch_optional(pool)
    .await?;

    row.map(Product::try_from).transpose()
}

const INSERT_PRODUCT: &str = r"
    INSERT INTO storefront.products (
        id, name, brand, price, original_price, image, category,
        rating, reviews, colors, sizes, stock, is_new, on_sale
    )
    VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)
";

const UPSERT_SUFFIX: &str = r"
    ON CONFLICT (id) DO UPDATE SET
        name = EXCLUDED.name,
        brand = EXCLUDED.brand,
        price = EXCLUDED.price,
        original_price = EXCLUDED.original_price,
        image = EXCLUDED.image,
        category = EXCLUDED.category,
        rating = EXCLUDED.rating,
        reviews = EXCLUDED.reviews,
        colors = EXCLUDED.colors,
        sizes = EXCLUDED.sizes,
        stock = EXCLUDED.stock,
        is_new = EXCLUDED.is_new,
        on_sale = EXCLUDED.on_sale,
        updated_at = NOW()
";

fn bind_product<'q>(
    query: sqlx::query::Query<'q, Postgres, sqlx::postgres::PgArguments>,
    product: &'q Product,
) -> sqlx::query::Query<'q, Postgres, sqlx::postgres::PgArguments> {
    query
        .bind(product.id.as_str())
        .bind(&product.name)
        .bind(&product.brand)
        .bind(product.price)
        .bind(product.original_price)
        .bind(&product.image)
        .bind(&product.category)
        .bind(product.rating)
        .bind(to_db_count(product.reviews))
        .bind(&product.colors)
        .bind(&product.sizes)
        .bind(to_db_count(product.stock))
        .bind(product.is_new)
        .bind(product.on_sale)
}

/// Insert a new product.
///
/// # Errors
///
/// Returns `RepositoryError::Conflict` if a product with the same ID exists.
pub async fn insert_product(pool: &PgPool, product: &Product) -> Result<(), RepositoryError> {
    bind_product(sqlx::query(INSERT_PRODUCT), product)
        .execute(pool)
        .await
        .map_err(|e| conflict_on_unique(e, &format!("product {}", product.id)))?;

    Ok(())
}

/// Insert a product, or replace every field of an existing one.
///
/// Used for seeding; admin additions go through [`insert_product`].
///
/// # Errors
///
/// Returns error if the database write fails.
pub async fn upsert_product(pool: &PgPool, product: &Product) -> Result<(), RepositoryError> {
    let sql = format!("{INSERT_PRODUCT}{UPSERT_SUFFIX}");
    bind_product(sqlx::query(&sql), product).execute(pool).await?;

    Ok(())
}

/// IDs of every remote product.
///
/// # Errors
///
/// Returns error if the database query fails.
pub async fn product_ids(pool: &PgPool) -> Result<Vec<ProductId>, RepositoryError> {
    let ids: Vec<String> = sqlx::query_scalar("SELECT id FROM storefront.products")
        .fetch_all(pool)
        .await?;

    Ok(ids.into_iter().map(ProductId::new).collect())
}

/// Update the admin-editable fields of a product.
///
/// Returns `true` if a row was updated.
///
/// # Errors
///
/// Returns error if the database update fails.
pub async fn update_product(pool: &PgPool, product: &Product) -> Result<bool, RepositoryError> {
    let result = sqlx::query(
        r"
        UPDATE storefront.products
        SET name = $2, brand = $3, price = $4, image = $5, category = $6,
            colors = $7, sizes = $8, stock = $9, updated_at = NOW()
        WHERE id = $1
        ",
    )
    .bind(product.id.as_str())
    .bind(&product.name)
    .bind(&product.brand)
    .bind(product.price)
    .bind(&product.image)
    .bind(&product.category)
    .bind(&product.colors)
    .bind(&product.sizes)
    .bind(to_db_count(product.stock))
    .execute(pool)
    .await?;

    Ok(result.rows_affected() > 0)
}

/// Delete a product. Its cart rows go with it.
///
/// Returns `true` if a row was deleted.
///
/// # Errors
///
/// Returns error if the database delete fails.
pub async fn delete_product(pool: &PgPool, id: &ProductId) -> Result<bool, RepositoryError> {
    let result = sqlx::query("DELETE FROM storefront.products WHERE id = $1")
        .bind(id.as_str())
        .execute(pool)
        .await?;

    Ok(result.rows_affected() > 0)
}

/// Escape LIKE metacharacters and wrap in `%` for a substring match.
fn like_pattern(term: &str) -> String {
    let escaped = term
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{escaped}%")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_like_pattern_escapes_wildcards() {
        assert_eq!(like_pattern("jeans"), "%jeans%");
        assert_eq!(like_pattern("50%_off"), "%50\\%\\_off%");
    }
}
