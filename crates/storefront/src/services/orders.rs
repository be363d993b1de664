//! Order placement and lifecycle.
//!
//! Remote and local order IDs come from independent counters. Listings merge
//! both stores, de-duplicated by ID with the remote copy winning.

use std::collections::HashSet;

use tracing::instrument;

use bestmarket_core::{OrderId, OrderStatus, Promo, SessionId, Totals};

use crate::db;
use crate::error::AppError;
use crate::models::{CartLine, CustomerInfo, NewOrder, Order};
use crate::services::cart::CartService;
use crate::store::{Durability, Store};

const ORDER_NOT_FOUND: &str = "Order not found";

/// Order service.
pub struct OrderService<'a> {
    store: &'a Store,
}

impl<'a> OrderService<'a> {
    #[must_use]
    pub const fn new(store: &'a Store) -> Self {
        Self { store }
    }

    /// Place an order for everything in the session's cart, then empty it.
    ///
    /// # Errors
    ///
    /// Returns `AppError::BadRequest` if the cart is empty.
    #[instrument(skip_all, fields(session = %session))]
    pub async fn create(
        &self,
        session: &SessionId,
        customer: CustomerInfo,
        delivery_address: serde_json::Value,
        promo: Option<&str>,
    ) -> Result<(Order, Durability), AppError> {
        let lines = CartService::new(self.store).get(session).await;
        if lines.is_empty() {
            return Err(AppError::bad_request("Cart is empty"));
        }

        let promo = promo.and_then(Promo::lookup);
        let totals = Totals::from_lines(lines.iter().map(CartLine::priced), promo.as_ref());
        let (order, durability) = self
            .place(NewOrder::checkout(customer, delivery_address, lines, totals))
            .await;

        if durability == Durability::Remote {
            self.store
                .attempt("cart.clear", |pool| db::cart::clear_cart(pool, session))
                .await;
        }
        self.store.local().clear_cart(session).await;

        tracing::info!(order_id = %order.id, total = order.total, %durability, "Order created");
        Ok((order, durability))
    }

    /// Record an order placed by the payment gateway.
    pub async fn record_payment(&self, order: NewOrder) -> (Order, Durability) {
        self.place(order).await
    }

    /// Every order: remote (newest first) followed by local-only orders.
    pub async fn list_all(&self) -> Vec<Order> {
        let remote = self
            .store
            .attempt("orders.list", db::orders::list_orders)
            .await
            .unwrap_or_default();
        merge(remote, self.store.local().orders().await)
    }

    /// Orders placed with `email`, newest first.
    pub async fn list_for_user(&self, email: &str) -> Vec<Order> {
        let remote = self
            .store
            .attempt("orders.list_for_email", |pool| {
                db::orders::list_orders_for_email(pool, email)
            })
            .await
            .unwrap_or_default();
        let local = self
            .store
            .local()
            .orders()
            .await
            .into_iter()
            .filter(|o| o.is_for(email))
            .collect();

        let mut orders = merge(remote, local);
        orders.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        orders
    }

    /// Set an order's status.
    ///
    /// # Errors
    ///
    /// Returns `AppError::NotFound` if neither store has the order.
    #[instrument(skip(self))]
    pub async fn update_status(
        &self,
        id: OrderId,
        status: OrderStatus,
    ) -> Result<Durability, AppError> {
        let remote = self.set_status(id, status).await;
        let local = self.store.local().update_order_status(id, status).await;

        if !remote && local.is_none() {
            return Err(AppError::not_found(ORDER_NOT_FOUND));
        }
        Ok(Durability::from_remote(remote))
    }

    /// Cancel an order unless it was already delivered or cancelled.
    ///
    /// # Errors
    ///
    /// Returns `AppError::NotFound` for unknown orders and
    /// `AppError::BadRequest` for orders that can no longer be cancelled.
    #[instrument(skip(self))]
    pub async fn cancel(&self, id: OrderId) -> Result<(Order, Durability), AppError> {
        let local = self.store.local();
        let mut order = match local.order(id).await {
            Some(order) => order,
            None => self
                .store
                .attempt("orders.get", |pool| db::orders::get_order(pool, id))
                .await
                .flatten()
                .ok_or_else(|| AppError::not_found(ORDER_NOT_FOUND))?,
        };

        if !order.status.is_cancellable() {
            return Err(AppError::bad_request("Cannot cancel this order"));
        }

        let remote = self.set_status(id, OrderStatus::Cancelled).await;
        order.status = OrderStatus::Cancelled;
        local.record_order(order.clone()).await;

        let durability = Durability::from_remote(remote);
        tracing::info!(order_id = %id, %durability, "Order cancelled");
        Ok((order, durability))
    }

    /// Confirm the orders carrying `reference` as paid.
    ///
    /// Returns whether either store had a matching order.
    pub async fn mark_paid(&self, reference: &str) -> bool {
        let remote = self
            .store
            .attempt("orders.mark_paid", |pool| db::orders::mark_paid(pool, reference))
            .await
            .unwrap_or(false);
        let local = self.store.local().mark_paid(reference).await;
        remote || local
    }

    /// Copy remote orders into the local store so the local counter
    /// continues after them. Returns how many were loaded.
    pub async fn preload(&self) -> usize {
        let Some(orders) = self
            .store
            .attempt("orders.preload", db::orders::list_orders)
            .await
        else {
            return 0;
        };
        let count = orders.len();
        self.store.local().preload_orders(orders).await;
        count
    }

    /// Insert remotely if possible; the local store records the order under
    /// the remote ID, or its own next ID when the remote insert failed.
    async fn place(&self, new_order: NewOrder) -> (Order, Durability) {
        let remote = self
            .store
            .attempt("orders.insert", |pool| {
                db::orders::insert_order(pool, &new_order)
            })
            .await;

        let local = self.store.local();
        match remote {
            Some(order) => {
                local.record_order(order.clone()).await;
                (order, Durability::Remote)
            }
            None => (local.insert_order(new_order).await, Durability::LocalOnly),
        }
    }

    async fn set_status(&self, id: OrderId, status: OrderStatus) -> bool {
        self.store
            .attempt("orders.update_status", |pool| {
                db::orders::update_status(pool, id, status)
            })
            .await
            .unwrap_or(false)
    }
}

/// Remote orders, then local orders whose ID the remote list lacks.
fn merge(remote: Vec<Order>, local: Vec<Order>) -> Vec<Order> {
    let seen: HashSet<OrderId> = remote.iter().map(|o| o.id).collect();
    let mut orders = remote;
    orders.extend(local.into_iter().filter(|o| !seen.contains(&o.id)));
    orders
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use bestmarket_core::ProductId;

    use super::*;
    use crate::store::{LocalStore, bundled_catalog};

    fn store() -> Store {
        Store::new(None, LocalStore::in_memory(bundled_catalog().unwrap()))
    }

    fn customer(email: &str) -> CustomerInfo {
        CustomerInfo {
            name: Some("Ada".to_owned()),
            email: Some(email.to_owned()),
            phone: Some("08012345678".to_owned()),
        }
    }

    async fn fill_cart(store: &Store, session: &SessionId) {
        CartService::new(store)
            .add(session, &ProductId::new("2"), 2, Some("Black"), Some("32"))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_create_empties_cart() {
        let store = store();
        let session = SessionId::parse("s1").unwrap();
        fill_cart(&store, &session).await;

        let orders = OrderService::new(&store);
        let (order, durability) = orders
            .create(
                &session,
                customer("ada@example.com"),
                serde_json::json!({"city": "Lagos"}),
                None,
            )
            .await
            .unwrap();

        assert_eq!(durability, Durability::LocalOnly);
        assert_eq!(order.id, OrderId::new(1));
        assert_eq!(order.status, OrderStatus::Confirmed);
        assert_eq!(order.items.len(), 1);
        // 56000 subtotal: 4200 tax, free shipping
        assert_eq!(order.subtotal, 56_000);
        assert_eq!(order.tax, 4_200);
        assert_eq!(order.shipping, 0);
        assert_eq!(order.total, 60_200);

        assert!(CartService::new(&store).get(&session).await.is_empty());
        assert!(matches!(
            orders
                .create(&session, customer("ada@example.com"), serde_json::Value::Null, None)
                .await,
            Err(AppError::BadRequest(_))
        ));
    }

    #[tokio::test]
    async fn test_list_for_user_filters_by_email() {
        let store = store();
        let orders = OrderService::new(&store);
        for (session, email) in [("a", "ada@example.com"), ("b", "bo@example.com")] {
            let session = SessionId::parse(session).unwrap();
            fill_cart(&store, &session).await;
            orders
                .create(&session, customer(email), serde_json::Value::Null, None)
                .await
                .unwrap();
        }

        assert_eq!(orders.list_all().await.len(), 2);
        let mine = orders.list_for_user("ADA@example.com").await;
        assert_eq!(mine.len(), 1);
        assert_eq!(mine[0].customer_email.as_deref(), Some("ada@example.com"));
    }

    #[tokio::test]
    async fn test_cancel_rules() {
        let store = store();
        let session = SessionId::parse("s1").unwrap();
        fill_cart(&store, &session).await;
        let orders = OrderService::new(&store);
        let (order, _) = orders
            .create(&session, customer("ada@example.com"), serde_json::Value::Null, None)
            .await
            .unwrap();

        let (cancelled, _) = orders.cancel(order.id).await.unwrap();
        assert_eq!(cancelled.status, OrderStatus::Cancelled);
        assert!(matches!(
            orders.cancel(order.id).await,
            Err(AppError::BadRequest(_))
        ));
        assert!(matches!(
            orders.cancel(OrderId::new(99)).await,
            Err(AppError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_update_status() {
        let store = store();
        let orders = OrderService::new(&store);
        let (order, _) = orders
            .record_payment(NewOrder::from_payment(
                "BMP_1",
                "ada@example.com".to_owned(),
                10_000,
                OrderStatus::Paid,
            ))
            .await;

        orders
            .update_status(order.id, OrderStatus::Delivered)
            .await
            .unwrap();
        assert!(matches!(
            orders.cancel(order.id).await,
            Err(AppError::BadRequest(_))
        ));
        assert!(matches!(
            orders.update_status(OrderId::new(42), OrderStatus::Shipped).await,
            Err(AppError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_mark_paid_by_reference() {
        let store = store();
        let orders = OrderService::new(&store);
        let mut pending = NewOrder::from_payment(
            "BMP_7",
            "ada@example.com".to_owned(),
            5_000,
            OrderStatus::Pending,
        );
        pending.payment_status = None;
        let (order, _) = orders.record_payment(pending).await;

        assert!(orders.mark_paid("BMP_7").await);
        assert!(!orders.mark_paid("BMP_8").await);

        let order = store.local().order(order.id).await.unwrap();
        assert_eq!(order.status, OrderStatus::Confirmed);
    }

    #[tokio::test]
    async fn test_preload_without_remote() {
        let store = store();
        assert_eq!(OrderService::new(&store).preload().await, 0);
    }
}
