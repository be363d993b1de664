//! Business logic services for the storefront.
//!
//! Each service borrows the [`Store`](crate::store::Store) and performs one
//! logical operation per method, dual-writing mutations.
//!
//! # Services
//!
//! - `auth` - Registration, login, password changes, admin user management
//! - `catalog` - Product listing and admin product edits
//! - `cart` - Session carts with stock checks and priced summaries
//! - `orders` - Checkout, cancellation and admin status updates
//! - `payments` - Paystack verification, webhooks and payment history
//! - `paystack` - Paystack HTTP client
//! - `newsletter` - Newsletter subscriptions

pub mod auth;
pub mod cart;
pub mod catalog;
pub mod newsletter;
pub mod orders;
pub mod payments;
pub mod paystack;
