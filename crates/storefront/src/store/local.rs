//! In-process fallback store.
//!
//! Every map sits behind its own `tokio::sync::RwLock`. Data lives for the
//! process lifetime, except users: each user mutation rewrites a JSON
//! snapshot, which is reloaded on start.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::path::{Path, PathBuf};

use thiserror::Error;
use tokio::sync::RwLock;

use bestmarket_core::{Email, ItemKey, OrderId, OrderStatus, PaymentStatus, ProductId, SessionId};

use crate::models::{CartLine, NewOrder, Order, Product, ProductFilter, ProductInput, UserRecord};

/// Sample catalog shipped with the binary.
const BUNDLED_CATALOG: &str = include_str!("../../data/products.json");

/// Parse the bundled sample catalog.
///
/// # Errors
///
/// Returns an error if the bundled JSON does not match [`Product`].
pub fn bundled_catalog() -> Result<Vec<Product>, serde_json::Error> {
    serde_json::from_str(BUNDLED_CATALOG)
}

/// Errors reading or writing the users snapshot.
#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("users file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("users file {path} is not valid JSON: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// In-process fallback store.
pub struct LocalStore {
    products: RwLock<Vec<Product>>,
    carts: RwLock<HashMap<SessionId, Vec<CartLine>>>,
    orders: RwLock<Vec<Order>>,
    users: RwLock<BTreeMap<Email, UserRecord>>,
    subscribers: RwLock<BTreeSet<Email>>,
    users_file: Option<PathBuf>,
}

impl LocalStore {
    /// A store seeded with `catalog` whose users are never written to disk.
    #[must_use]
    pub fn in_memory(catalog: Vec<Product>) -> Self {
        Self::with_users(catalog, BTreeMap::new(), None)
    }

    /// A store seeded with `catalog` and the users snapshot at `users_file`.
    ///
    /// A missing file starts with no users.
    ///
    /// # Errors
    ///
    /// Returns `SnapshotError` if the file exists but cannot be read or parsed.
    pub async fn open(
        catalog: Vec<Product>,
        users_file: impl Into<PathBuf>,
    ) -> Result<Self, SnapshotError> {
        let path = users_file.into();
        let users = read_snapshot(&path).await?;
        tracing::info!(path = %path.display(), users = users.len(), "Loaded local users");
        Ok(Self::with_users(catalog, users, Some(path)))
    }

    fn with_users(
        catalog: Vec<Product>,
        users: BTreeMap<Email, UserRecord>,
        users_file: Option<PathBuf>,
    ) -> Self {
        Self {
            products: RwLock::new(catalog),
            carts: RwLock::new(HashMap::new()),
            orders: RwLock::new(Vec::new()),
            users: RwLock::new(users),
            subscribers: RwLock::new(BTreeSet::new()),
            users_file,
        }
    }

    // =========================================================================
    // Products
    // =========================================================================

    /// Every product, in catalog order.
    pub async fn products(&self) -> Vec<Product> {
        self.products.read().await.clone()
    }

    /// Products matching `filter`, in catalog order.
    pub async fn filter_products(&self, filter: &ProductFilter) -> Vec<Product> {
        self.products
            .read()
            .await
            .iter()
            .filter(|p| filter.matches(p))
            .cloned()
            .collect()
    }

    /// Look up a product.
    pub async fn product(&self, id: &ProductId) -> Option<Product> {
        self.products.read().await.iter().find(|p| &p.id == id).cloned()
    }

    /// Add a product under the next numeric ID free both locally and in
    /// `taken`.
    pub async fn add_product(&self, input: ProductInput, taken: &[ProductId]) -> Product {
        let mut products = self.products.write().await;
        let id = ProductId::next_after(products.iter().map(|p| &p.id).chain(taken));
        let product = input.into_product(id);
        products.push(product.clone());
        product
    }

    /// Insert a product, replacing one with the same ID.
    pub async fn upsert_product(&self, product: Product) {
        let mut products = self.products.write().await;
        match products.iter_mut().find(|p| p.id == product.id) {
            Some(existing) => *existing = product,
            None => products.push(product),
        }
    }

    /// Apply an admin edit. Returns the updated product if it exists.
    pub async fn update_product(&self, id: &ProductId, input: &ProductInput) -> Option<Product> {
        let mut products = self.products.write().await;
        let product = products.iter_mut().find(|p| &p.id == id)?;
        input.apply_to(product);
        Some(product.clone())
    }

    /// Remove a product. Returns `true` if it existed.
    pub async fn remove_product(&self, id: &ProductId) -> bool {
        let mut products = self.products.write().await;
        let before = products.len();
        products.retain(|p| &p.id != id);
        products.len() != before
    }

    // =========================================================================
    // Carts
    // =========================================================================

    /// Lines in a session's cart.
    pub async fn cart(&self, session: &SessionId) -> Vec<CartLine> {
        self.carts
            .read()
            .await
            .get(session)
            .cloned()
            .unwrap_or_default()
    }

    /// Quantity of `key` already in the cart (0 if absent).
    pub async fn cart_quantity(&self, session: &SessionId, key: &ItemKey) -> u32 {
        self.carts
            .read()
            .await
            .get(session)
            .and_then(|lines| lines.iter().find(|l| &l.item_key == key))
            .map_or(0, |l| l.quantity)
    }

    /// Add a line, merging its quantity into an existing line with the same key.
    pub async fn add_to_cart(&self, session: &SessionId, line: CartLine) -> Vec<CartLine> {
        let mut carts = self.carts.write().await;
        let lines = carts.entry(session.clone()).or_default();
        match lines.iter_mut().find(|l| l.item_key == line.item_key) {
            Some(existing) => existing.quantity = existing.quantity.saturating_add(line.quantity),
            None => lines.push(line),
        }
        lines.clone()
    }

    /// Set the quantity of a line; zero removes it.
    pub async fn set_cart_quantity(
        &self,
        session: &SessionId,
        key: &ItemKey,
        quantity: u32,
    ) -> Vec<CartLine> {
        let mut carts = self.carts.write().await;
        let Some(lines) = carts.get_mut(session) else {
            return Vec::new();
        };
        if quantity == 0 {
            lines.retain(|l| &l.item_key != key);
        } else if let Some(line) = lines.iter_mut().find(|l| &l.item_key == key) {
            line.quantity = quantity;
        }
        lines.clone()
    }

    /// Remove a line from a cart.
    pub async fn remove_from_cart(&self, session: &SessionId, key: &ItemKey) -> Vec<CartLine> {
        self.set_cart_quantity(session, key, 0).await
    }

    /// Empty a cart.
    pub async fn clear_cart(&self, session: &SessionId) {
        self.carts.write().await.remove(session);
    }

    // =========================================================================
    // Orders
    // =========================================================================

    /// Every order, in insertion order.
    pub async fn orders(&self) -> Vec<Order> {
        self.orders.read().await.clone()
    }

    /// Look up an order.
    pub async fn order(&self, id: OrderId) -> Option<Order> {
        self.orders.read().await.iter().find(|o| o.id == id).cloned()
    }

    /// Record an order under the next local ID: one past the highest known.
    pub async fn insert_order(&self, order: NewOrder) -> Order {
        let mut orders = self.orders.write().await;
        let id = orders
            .iter()
            .map(|o| o.id)
            .max()
            .map_or(OrderId::new(1), |max| max.next());
        let order = order.with_id(id);
        orders.push(order.clone());
        order
    }

    /// Record an order that already has an ID, replacing one with the same ID.
    pub async fn record_order(&self, order: Order) {
        let mut orders = self.orders.write().await;
        match orders.iter_mut().find(|o| o.id == order.id) {
            Some(existing) => *existing = order,
            None => orders.push(order),
        }
    }

    /// Record a batch of remote orders, e.g. at start-up.
    pub async fn preload_orders(&self, remote: Vec<Order>) {
        for order in remote {
            self.record_order(order).await;
        }
    }

    /// Set an order's status. Returns the updated order if it exists.
    pub async fn update_order_status(&self, id: OrderId, status: OrderStatus) -> Option<Order> {
        let mut orders = self.orders.write().await;
        let order = orders.iter_mut().find(|o| o.id == id)?;
        order.status = status;
        Some(order.clone())
    }

    /// Mark the first order carrying `reference` as confirmed and paid.
    pub async fn mark_paid(&self, reference: &str) -> bool {
        let mut orders = self.orders.write().await;
        let Some(order) = orders
            .iter_mut()
            .find(|o| o.payment_reference.as_deref() == Some(reference))
        else {
            return false;
        };
        order.status = OrderStatus::Confirmed;
        order.payment_status = Some(PaymentStatus::Completed);
        true
    }

    // =========================================================================
    // Users
    // =========================================================================

    /// Look up a user.
    pub async fn user(&self, email: &Email) -> Option<UserRecord> {
        self.users.read().await.get(email).cloned()
    }

    /// Every user, ordered by email.
    pub async fn users(&self) -> Vec<UserRecord> {
        self.users.read().await.values().cloned().collect()
    }

    /// Add a user unless the email is taken. Returns `false` if it was.
    ///
    /// # Errors
    ///
    /// Returns `SnapshotError` if the snapshot cannot be written.
    pub async fn insert_user(&self, record: UserRecord) -> Result<bool, SnapshotError> {
        let mut users = self.users.write().await;
        if users.contains_key(&record.email) {
            return Ok(false);
        }
        let mut next = users.clone();
        next.insert(record.email.clone(), record);
        self.commit(&mut users, next).await?;
        Ok(true)
    }

    /// Add or replace a user.
    ///
    /// # Errors
    ///
    /// Returns `SnapshotError` if the snapshot cannot be written.
    pub async fn upsert_user(&self, record: UserRecord) -> Result<(), SnapshotError> {
        let mut users = self.users.write().await;
        let mut next = users.clone();
        next.insert(record.email.clone(), record);
        self.commit(&mut users, next).await
    }

    /// Replace a user's password hash, dropping any legacy plain-text
    /// password. Returns `false` if the user does not exist.
    ///
    /// # Errors
    ///
    /// Returns `SnapshotError` if the snapshot cannot be written.
    pub async fn set_password_hash(
        &self,
        email: &Email,
        password_hash: String,
    ) -> Result<bool, SnapshotError> {
        let mut users = self.users.write().await;
        let mut next = users.clone();
        let Some(user) = next.get_mut(email) else {
            return Ok(false);
        };
        user.password_hash = Some(password_hash);
        user.legacy_password = None;
        self.commit(&mut users, next).await?;
        Ok(true)
    }

    /// Remove a user. Returns `true` if it existed.
    ///
    /// # Errors
    ///
    /// Returns `SnapshotError` if the snapshot cannot be written.
    pub async fn remove_user(&self, email: &Email) -> Result<bool, SnapshotError> {
        let mut users = self.users.write().await;
        let mut next = users.clone();
        if next.remove(email).is_none() {
            return Ok(false);
        }
        self.commit(&mut users, next).await?;
        Ok(true)
    }

    /// Write `next` to the snapshot, then make it the live map. The live map
    /// is left untouched when the write fails. Called with the write lock
    /// held so snapshots land in mutation order.
    async fn commit(
        &self,
        users: &mut BTreeMap<Email, UserRecord>,
        next: BTreeMap<Email, UserRecord>,
    ) -> Result<(), SnapshotError> {
        if let Some(path) = &self.users_file {
            write_snapshot(path, &next).await?;
        }
        *users = next;
        Ok(())
    }

    // =========================================================================
    // Newsletter
    // =========================================================================

    /// Add a subscriber. Returns `false` if already subscribed.
    pub async fn subscribe(&self, email: Email) -> bool {
        self.subscribers.write().await.insert(email)
    }

    /// Whether `email` is subscribed.
    pub async fn is_subscribed(&self, email: &Email) -> bool {
        self.subscribers.read().await.contains(email)
    }
}

async fn read_snapshot(path: &Path) -> Result<BTreeMap<Email, UserRecord>, SnapshotError> {
    let bytes = match tokio::fs::read(path).await {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(BTreeMap::new()),
        Err(source) => {
            return Err(SnapshotError::Io {
                path: path.to_owned(),
                source,
            });
        }
    };

    serde_json::from_slice(&bytes).map_err(|source| SnapshotError::Json {
        path: path.to_owned(),
        source,
    })
}

/// Write to a sibling temp file, then rename over the snapshot.
async fn write_snapshot(
    path: &Path,
    users: &BTreeMap<Email, UserRecord>,
) -> Result<(), SnapshotError> {
    let io_err = |source: std::io::Error| SnapshotError::Io {
        path: path.to_owned(),
        source,
    };

    let json = serde_json::to_vec_pretty(users).map_err(|source| SnapshotError::Json {
        path: path.to_owned(),
        source,
    })?;

    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(dir).await.map_err(io_err)?;
    }
    let tmp = path.with_extension("json.tmp");
    tokio::fs::write(&tmp, json).await.map_err(io_err)?;
    tokio::fs::rename(&tmp, path).await.map_err(io_err)
}
