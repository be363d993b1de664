//! HTTP middleware stack for the storefront.
//!
//! # Middleware Order (outermost first)
//!
//! 1. Sentry layers (added by the binary)
//! 2. CORS (permissive)
//! 3. `TraceLayer` (opens the `request` span)
//! 4. Request ID (fills the span's `request_id` field)

pub mod request_id;

pub use request_id::request_id_middleware;
