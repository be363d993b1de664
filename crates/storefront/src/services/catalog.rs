//! Product catalog: reads with remote-first fallback, admin edits dual-written.

use tracing::instrument;

use bestmarket_core::ProductId;

use crate::db;
use crate::error::AppError;
use crate::models::{Product, ProductFilter, ProductInput};
use crate::store::{Durability, Store};

const PRODUCT_NOT_FOUND: &str = "Product not found";

/// Catalog service.
pub struct CatalogService<'a> {
    store: &'a Store,
}

impl<'a> CatalogService<'a> {
    #[must_use]
    pub const fn new(store: &'a Store) -> Self {
        Self { store }
    }

    /// Products matching `filter`. Remote results are used only when non-empty.
    pub async fn list(&self, filter: &ProductFilter) -> Vec<Product> {
        let remote = self
            .store
            .attempt("products.list", |pool| db::products::list_products(pool, filter))
            .await
            .filter(|products| !products.is_empty());

        match remote {
            Some(products) => products,
            None => self.store.local().filter_products(filter).await,
        }
    }

    /// Look up one product, remote first.
    ///
    /// # Errors
    ///
    /// Returns `AppError::NotFound` if neither store has it.
    pub async fn get(&self, id: &ProductId) -> Result<Product, AppError> {
        if let Some(product) = self.remote_product(id).await {
            return Ok(product);
        }
        self.store
            .local()
            .product(id)
            .await
            .ok_or_else(|| AppError::not_found(PRODUCT_NOT_FOUND))
    }

    /// Add a product under the next numeric ID unused in either store.
    ///
    /// The remote write is a plain insert; if the ID is taken remotely the
    /// product stays local-only rather than replacing the remote row.
    ///
    /// # Errors
    ///
    /// Returns `AppError::BadRequest` if the input is invalid.
    #[instrument(skip_all)]
    pub async fn add(&self, input: ProductInput) -> Result<(Product, Durability), AppError> {
        input.validate().map_err(AppError::BadRequest)?;

        let remote_ids = self
            .store
            .attempt("products.ids", db::products::product_ids)
            .await
            .unwrap_or_default();
        let product = self.store.local().add_product(input, &remote_ids).await;
        let remote = self
            .store
            .attempt("products.insert", |pool| {
                db::products::insert_product(pool, &product)
            })
            .await
            .is_some();

        let durability = Durability::from_remote(remote);
        tracing::info!(product_id = %product.id, %durability, "Product added");
        Ok((product, durability))
    }

    /// Apply an admin edit.
    ///
    /// A product known only to the remote store is copied into the local
    /// catalog so stock checks see it.
    ///
    /// # Errors
    ///
    /// Returns `AppError::BadRequest` if the input is invalid and
    /// `AppError::NotFound` if neither store has the product.
    #[instrument(skip(self, input))]
    pub async fn update(
        &self,
        id: &ProductId,
        input: ProductInput,
    ) -> Result<(Product, Durability), AppError> {
        input.validate().map_err(AppError::BadRequest)?;

        let local = self.store.local();
        let product = match local.update_product(id, &input).await {
            Some(product) => product,
            None => {
                let mut product = self
                    .remote_product(id)
                    .await
                    .ok_or_else(|| AppError::not_found(PRODUCT_NOT_FOUND))?;
                input.apply_to(&mut product);
                local.upsert_product(product.clone()).await;
                product
            }
        };

        let remote = self
            .store
            .attempt("products.update", |pool| {
                db::products::update_product(pool, &product)
            })
            .await
            .unwrap_or(false);

        Ok((product, Durability::from_remote(remote)))
    }

    /// Remove a product from both stores. Succeeds even if it did not exist.
    #[instrument(skip(self))]
    pub async fn delete(&self, id: &ProductId) -> Durability {
        let remote = self
            .store
            .attempt("products.delete", |pool| db::products::delete_product(pool, id))
            .await
            .is_some();
        self.store.local().remove_product(id).await;
        Durability::from_remote(remote)
    }

    async fn remote_product(&self, id: &ProductId) -> Option<Product> {
        self.store
            .attempt("products.get", |pool| db::products::get_product(pool, id))
            .await
            .flatten()
    }
}
