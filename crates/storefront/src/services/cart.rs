//! Shopping carts keyed by a client-chosen session ID.
//!
//! Stock is checked against the local catalog only, and never reserved.

use serde::Serialize;
use tracing::instrument;

use bestmarket_core::{ItemKey, ProductId, Promo, SessionId, Totals};

use crate::db;
use crate::error::AppError;
use crate::models::CartLine;
use crate::store::{Durability, Store};

const INSUFFICIENT_STOCK: &str = "Insufficient stock";

/// Priced view of a cart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CartSummary {
    pub item_count: u32,
    #[serde(flatten)]
    pub totals: Totals,
    /// The promo code that was applied, if it was valid.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub promo_code: Option<String>,
}

/// Outcome of clearing a cart.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CartCleared {
    /// Every configured store was cleared.
    pub complete: bool,
    pub durability: Durability,
}

/// Cart service.
pub struct CartService<'a> {
    store: &'a Store,
}

impl<'a> CartService<'a> {
    #[must_use]
    pub const fn new(store: &'a Store) -> Self {
        Self { store }
    }

    /// Lines in the cart: remote rows when non-empty, else local.
    pub async fn get(&self, session: &SessionId) -> Vec<CartLine> {
        let remote = self
            .store
            .attempt("cart.get", |pool| db::cart::get_cart(pool, session))
            .await
            .filter(|lines| !lines.is_empty());

        match remote {
            Some(lines) => lines,
            None => self.store.local().cart(session).await,
        }
    }

    /// Add `quantity` of a product variant to the cart.
    ///
    /// # Errors
    ///
    /// Returns `AppError::NotFound` if the product is not in the local
    /// catalog and `AppError::BadRequest` if stock would be exceeded.
    #[instrument(skip_all, fields(session = %session, product_id = %product_id))]
    pub async fn add(
        &self,
        session: &SessionId,
        product_id: &ProductId,
        quantity: u32,
        color: Option<&str>,
        size: Option<&str>,
    ) -> Result<(Vec<CartLine>, Durability), AppError> {
        if quantity == 0 {
            return Err(AppError::bad_request("Quantity must be at least 1"));
        }

        let local = self.store.local();
        let product = local
            .product(product_id)
            .await
            .ok_or_else(|| AppError::not_found("Product not found"))?;

        let key = ItemKey::new(product.id.clone(), color, size);
        let in_cart = local.cart_quantity(session, &key).await;
        if quantity > product.stock || in_cart.saturating_add(quantity) > product.stock {
            return Err(AppError::bad_request(INSUFFICIENT_STOCK));
        }

        let remote = self
            .store
            .attempt("cart.add_item", |pool| {
                db::cart::add_item(pool, session, &key, quantity)
            })
            .await
            .is_some();
        let lines = local
            .add_to_cart(session, CartLine::new(&product, key, quantity))
            .await;

        Ok(self.respond(session, lines, remote).await)
    }

    /// Set the quantity of a line. Zero or less removes it.
    ///
    /// # Errors
    ///
    /// Returns `AppError::BadRequest` if the quantity exceeds the product's stock.
    #[instrument(skip_all, fields(session = %session, item_key = %key))]
    pub async fn update(
        &self,
        session: &SessionId,
        key: &ItemKey,
        quantity: i64,
    ) -> Result<(Vec<CartLine>, Durability), AppError> {
        let Ok(quantity) = u32::try_from(quantity.max(0)) else {
            return Err(AppError::bad_request(INSUFFICIENT_STOCK));
        };

        if quantity == 0 {
            return Ok(self.remove(session, key).await);
        }

        if let Some(product) = self.store.local().product(&key.product_id).await
            && quantity > product.stock
        {
            return Err(AppError::bad_request(INSUFFICIENT_STOCK));
        }

        let remote = self
            .store
            .attempt("cart.set_quantity", |pool| {
                db::cart::set_quantity(pool, session, key, quantity)
            })
            .await
            .is_some();
        let lines = self
            .store
            .local()
            .set_cart_quantity(session, key, quantity)
            .await;

        Ok(self.respond(session, lines, remote).await)
    }

    /// Remove a line from both stores. Succeeds even if it was absent.
    pub async fn remove(&self, session: &SessionId, key: &ItemKey) -> (Vec<CartLine>, Durability) {
        let remote = self
            .store
            .attempt("cart.remove_item", |pool| {
                db::cart::remove_item(pool, session, key)
            })
            .await
            .is_some();
        let lines = self.store.local().remove_from_cart(session, key).await;

        (lines, Durability::from_remote(remote))
    }

    /// Empty the cart in both stores.
    pub async fn clear(&self, session: &SessionId) -> CartCleared {
        let remote = self
            .store
            .attempt("cart.clear", |pool| db::cart::clear_cart(pool, session))
            .await
            .is_some();
        self.store.local().clear_cart(session).await;

        CartCleared {
            complete: remote || !self.store.has_remote(),
            durability: Durability::from_remote(remote),
        }
    }

    /// Price the cart, applying `promo` if it is a known code.
    pub async fn summary(&self, session: &SessionId, promo: Option<&str>) -> CartSummary {
        let lines = self.get(session).await;
        let promo = promo.and_then(Promo::lookup);

        CartSummary {
            item_count: lines.iter().map(|l| l.quantity).sum(),
            totals: Totals::from_lines(lines.iter().map(CartLine::priced), promo.as_ref()),
            promo_code: promo.map(|p| p.code),
        }
    }

    /// Prefer the remote cart in the response when the remote write succeeded.
    async fn respond(
        &self,
        session: &SessionId,
        local_lines: Vec<CartLine>,
        remote: bool,
    ) -> (Vec<CartLine>, Durability) {
        let lines = if remote {
            self.store
                .attempt("cart.get", |pool| db::cart::get_cart(pool, session))
                .await
                .unwrap_or(local_lines)
        } else {
            local_lines
        };
        (lines, Durability::from_remote(remote))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use bestmarket_core::pricing::FLAT_SHIPPING_FEE;

    use super::*;
    use crate::store::{LocalStore, bundled_catalog};

    fn store() -> Store {
        Store::new(None, LocalStore::in_memory(bundled_catalog().unwrap()))
    }

    fn session() -> SessionId {
        SessionId::parse("session-1").unwrap()
    }

    #[tokio::test]
    async fn test_add_merges_same_variant() {
        let store = store();
        let cart = CartService::new(&store);
        let id = ProductId::new("1");

        cart.add(&session(), &id, 2, Some("White"), Some("M"))
            .await
            .unwrap();
        let (lines, durability) = cart
            .add(&session(), &id, 1, Some("White"), Some("M"))
            .await
            .unwrap();
        assert_eq!(durability, Durability::LocalOnly);
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].quantity, 3);
        assert_eq!(lines[0].item_key.to_string(), "1_White_M");

        let (lines, _) = cart
            .add(&session(), &id, 1, Some("Black"), Some("M"))
            .await
            .unwrap();
        assert_eq!(lines.len(), 2);
    }

    #[tokio::test]
    async fn test_add_rejects_stock_overflow() {
        let store = store();
        let cart = CartService::new(&store);
        // Product 7 has 8 in stock
        let id = ProductId::new("7");

        assert!(matches!(
            cart.add(&session(), &id, 9, None, None).await,
            Err(AppError::BadRequest(_))
        ));

        cart.add(&session(), &id, 6, None, None).await.unwrap();
        assert!(matches!(
            cart.add(&session(), &id, 3, None, None).await,
            Err(AppError::BadRequest(_))
        ));
        cart.add(&session(), &id, 2, None, None).await.unwrap();
        assert_eq!(cart.get(&session()).await[0].quantity, 8);
    }

    #[tokio::test]
    async fn test_add_unknown_product() {
        let store = store();
        let cart = CartService::new(&store);
        assert!(matches!(
            cart.add(&session(), &ProductId::new("404"), 1, None, None).await,
            Err(AppError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_update_and_remove() {
        let store = store();
        let cart = CartService::new(&store);
        let id = ProductId::new("3");
        let (lines, _) = cart
            .add(&session(), &id, 1, Some("Tan"), None)
            .await
            .unwrap();
        let key = lines[0].item_key.clone();

        let (lines, _) = cart.update(&session(), &key, 5).await.unwrap();
        assert_eq!(lines[0].quantity, 5);

        // Product 3 has 18 in stock
        assert!(matches!(
            cart.update(&session(), &key, 19).await,
            Err(AppError::BadRequest(_))
        ));

        let (lines, _) = cart.update(&session(), &key, 0).await.unwrap();
        assert!(lines.is_empty());

        cart.add(&session(), &id, 1, Some("Tan"), None)
            .await
            .unwrap();
        let (lines, _) = cart.remove(&session(), &key).await;
        assert!(lines.is_empty());
    }

    #[tokio::test]
    async fn test_clear_without_remote_is_complete() {
        let store = store();
        let cart = CartService::new(&store);
        cart.add(&session(), &ProductId::new("1"), 1, None, None)
            .await
            .unwrap();

        let cleared = cart.clear(&session()).await;
        assert!(cleared.complete);
        assert_eq!(cleared.durability, Durability::LocalOnly);
        assert!(cart.get(&session()).await.is_empty());
    }

    #[tokio::test]
    async fn test_unreachable_remote_falls_back_to_local_cart() {
        let store = Store::new(
            Some(crate::db::unreachable_pool()),
            LocalStore::in_memory(bundled_catalog().unwrap()),
        );
        let cart = CartService::new(&store);

        let (lines, durability) = cart
            .add(&session(), &ProductId::new("1"), 2, None, None)
            .await
            .unwrap();
        assert_eq!(durability, Durability::LocalOnly);
        assert_eq!(lines.len(), 1);
        assert_eq!(cart.get(&session()).await.len(), 1);

        let cleared = cart.clear(&session()).await;
        assert!(!cleared.complete);
        assert_eq!(cleared.durability, Durability::LocalOnly);
        assert!(cart.get(&session()).await.is_empty());
    }

    #[tokio::test]
    async fn test_summary_totals() {
        let store = store();
        let cart = CartService::new(&store);
        // 2 x 18000 = 36000, under the free shipping threshold
        cart.add(&session(), &ProductId::new("1"), 2, None, None)
            .await
            .unwrap();

        let summary = cart.summary(&session(), None).await;
        assert_eq!(summary.item_count, 2);
        assert_eq!(summary.totals.subtotal, 36_000);
        assert_eq!(summary.totals.tax, 2_700);
        assert_eq!(summary.totals.shipping, FLAT_SHIPPING_FEE);
        assert_eq!(summary.totals.total, 41_200);

        let summary = cart.summary(&session(), Some("234567")).await;
        assert_eq!(summary.totals.discount, 3_600);
        assert_eq!(summary.promo_code.as_deref(), Some("234567"));

        let summary = cart.summary(&session(), Some("BOGUS")).await;
        assert_eq!(summary.totals.discount, 0);
        assert!(summary.promo_code.is_none());
    }
}
