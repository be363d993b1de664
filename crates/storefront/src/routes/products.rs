//! Catalog route handlers.

use axum::{
    Json,
    extract::{Path, Query, State, rejection::QueryRejection},
};
use serde::Deserialize;

use bestmarket_core::ProductId;

use crate::error::{AppError, Result};
use crate::models::{Product, ProductFilter};
use crate::state::AppState;

/// Raw listing query. Prices arrive as text so bad values get a JSON error.
#[derive(Debug, Default, Deserialize)]
pub struct ProductQuery {
    pub category: Option<String>,
    pub brand: Option<String>,
    pub min_price: Option<String>,
    pub max_price: Option<String>,
    pub search: Option<String>,
}

impl TryFrom<ProductQuery> for ProductFilter {
    type Error = AppError;

    fn try_from(query: ProductQuery) -> Result<Self> {
        Ok(Self {
            min_price: parse_price("min_price", query.min_price.as_deref(), f64::ceil)?,
            max_price: parse_price("max_price", query.max_price.as_deref(), f64::floor)?,
            category: query.category,
            brand: query.brand,
            search: query.search,
        })
    }
}

/// Parse a price bound. Prices are whole units, so a fractional bound is
/// moved inward with `round` (`ceil` for minimums, `floor` for maximums).
fn parse_price(name: &str, raw: Option<&str>, round: fn(f64) -> f64) -> Result<Option<i64>> {
    let Some(raw) = raw.map(str::trim).filter(|v| !v.is_empty()) else {
        return Ok(None);
    };
    if let Ok(value) = raw.parse::<i64>() {
        return Ok(Some(value));
    }
    match raw.parse::<f64>() {
        #[allow(clippy::cast_possible_truncation)]
        Ok(value) if value.is_finite() => Ok(Some(round(value) as i64)),
        _ => Err(AppError::bad_request(format!("Invalid {name}: {raw}"))),
    }
}

/// `GET /api/products`
pub async fn index(
    State(state): State<AppState>,
    query: std::result::Result<Query<ProductQuery>, QueryRejection>,
) -> Result<Json<Vec<Product>>> {
    let Query(query) = query?;
    let filter = ProductFilter::try_from(query)?;
    Ok(Json(state.catalog().list(&filter).await))
}

/// `GET /api/products/{id}`
pub async fn show(State(state): State<AppState>, Path(id): Path<String>) -> Result<Json<Product>> {
    let product = state.catalog().get(&ProductId::new(id)).await?;
    Ok(Json(product))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_price() {
        assert_eq!(parse_price("min_price", None, f64::ceil).unwrap(), None);
        assert_eq!(parse_price("min_price", Some("  "), f64::ceil).unwrap(), None);
        assert_eq!(
            parse_price("min_price", Some("20000"), f64::ceil).unwrap(),
            Some(20_000)
        );
        assert!(parse_price("min_price", Some("cheap"), f64::ceil).is_err());
    }

    #[test]
    fn test_fractional_bounds_round_inward() {
        let filter = ProductFilter::try_from(ProductQuery {
            min_price: Some("18000.5".to_owned()),
            max_price: Some("28000.9".to_owned()),
            ..ProductQuery::default()
        })
        .unwrap();
        assert_eq!(filter.min_price, Some(18_001));
        assert_eq!(filter.max_price, Some(28_000));
    }
}
