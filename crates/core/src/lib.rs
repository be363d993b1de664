//! Best Market Place Core - Shared domain types.
//!
//! This crate provides the types used across the Best Market Place components:
//! - `storefront` - JSON API serving the catalog, carts, orders and payments
//! - `cli` - Command-line tools for migrations and catalog seeding
//!
//! # Architecture
//!
//! The core crate contains only types and pure functions - no I/O, no database
//! access, no HTTP clients. Pricing rules live here so both storage backends
//! and the API agree on totals.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for IDs, emails, cart item keys and statuses
//! - [`pricing`] - Subtotal, promo discount, VAT and shipping calculation

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod pricing;
pub mod types;

pub use pricing::{Promo, PromoKind, Totals};
pub use types::*;
