//! Application state shared across handlers.

use std::sync::Arc;

use sqlx::PgPool;

use crate::config::StorefrontConfig;
use crate::services::auth::AuthService;
use crate::services::cart::CartService;
use crate::services::catalog::CatalogService;
use crate::services::newsletter::NewsletterService;
use crate::services::orders::OrderService;
use crate::services::payments::PaymentService;
use crate::services::paystack::{PaystackClient, PaystackError};
use crate::store::{LocalStore, SnapshotError, Store, bundled_catalog};

/// Error building the application state.
#[derive(Debug, thiserror::Error)]
pub enum StateError {
    #[error("bundled catalog is invalid: {0}")]
    Catalog(#[from] serde_json::Error),
    #[error(transparent)]
    Snapshot(#[from] SnapshotError),
    #[error("invalid Paystack configuration: {0}")]
    Paystack(#[from] PaystackError),
}

/// Application state shared across all handlers.
///
/// This struct is cheaply cloneable via `Arc` and provides access to
/// the dual-write store, the payment gateway client and configuration.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: StorefrontConfig,
    store: Store,
    paystack: PaystackClient,
}

impl AppState {
    /// Create a new application state.
    ///
    /// Seeds the local catalog from the bundled products and reloads users
    /// from the configured snapshot file.
    ///
    /// # Arguments
    ///
    /// * `config` - Storefront configuration
    /// * `pool` - `PostgreSQL` connection pool, or `None` to run local-only
    ///
    /// # Errors
    ///
    /// Returns an error if the bundled catalog or users snapshot cannot be
    /// read, or the Paystack client cannot be built.
    pub async fn new(config: StorefrontConfig, pool: Option<PgPool>) -> Result<Self, StateError> {
        let local = LocalStore::open(bundled_catalog()?, config.users_file.clone()).await?;
        let paystack = PaystackClient::new(&config.paystack)?;

        Ok(Self {
            inner: Arc::new(AppStateInner {
                store: Store::new(pool, local),
                config,
                paystack,
            }),
        })
    }

    /// Get a reference to the storefront configuration.
    #[must_use]
    pub fn config(&self) -> &StorefrontConfig {
        &self.inner.config
    }

    /// Get a reference to the dual-write store.
    #[must_use]
    pub fn store(&self) -> &Store {
        &self.inner.store
    }

    #[must_use]
    pub fn auth(&self) -> AuthService<'_> {
        AuthService::new(self.store())
    }

    #[must_use]
    pub fn catalog(&self) -> CatalogService<'_> {
        CatalogService::new(self.store())
    }

    #[must_use]
    pub fn cart(&self) -> CartService<'_> {
        CartService::new(self.store())
    }

    #[must_use]
    pub fn orders(&self) -> OrderService<'_> {
        OrderService::new(self.store())
    }

    #[must_use]
    pub fn newsletter(&self) -> NewsletterService<'_> {
        NewsletterService::new(self.store())
    }

    #[must_use]
    pub fn payments(&self) -> PaymentService<'_> {
        PaymentService::new(
            self.store(),
            &self.inner.paystack,
            self.inner.config.paystack.accept_test_references,
        )
    }
}
