//! Domain models for the storefront.
//!
//! These are the shapes shared by both stores and serialized to clients.
//! Database row types live next to their queries in `crate::db`.

pub mod cart;
pub mod order;
pub mod product;
pub mod user;

pub use cart::CartLine;
pub use order::{CustomerInfo, NewOrder, Order};
pub use product::{Product, ProductFilter, ProductInput};
pub use user::{User, UserProfile, UserRecord, UserSource, UserSummary};
