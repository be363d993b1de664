//! HTTP route handlers for the storefront API.
//!
//! # Route Structure
//!
//! ```text
//! GET    /                                  - Service banner
//! GET    /health                            - Liveness
//! GET    /health/ready                      - Readiness (remote store status)
//!
//! # Catalog
//! GET    /api/products                      - ?category&brand&min_price&max_price&search
//! GET    /api/products/{id}
//!
//! # Cart
//! GET    /api/cart/{session_id}
//! GET    /api/cart/{session_id}/summary     - ?promo
//! POST   /api/cart/{session_id}/add
//! PUT    /api/cart/{session_id}/update
//! DELETE /api/cart/{session_id}/remove
//! DELETE /api/cart/{session_id}/clear
//!
//! # Orders
//! POST   /api/orders
//! GET    /api/orders/user/{email}
//! PUT    /api/orders/{id}/cancel
//!
//! # Auth
//! POST   /api/auth/register
//! POST   /api/auth/login
//! POST   /api/auth/change-password
//!
//! # Admin
//! GET    /api/admin/users
//! DELETE /api/admin/users/{email}
//! GET    /api/admin/orders
//! PUT    /api/admin/orders/{id}
//! POST   /api/admin/products
//! PUT    /api/admin/products/{id}
//! DELETE /api/admin/products/{id}
//!
//! # Payments
//! POST   /api/payment/verify
//! POST   /api/payment/webhook
//! GET    /api/payments/history/all
//! GET    /api/payments/history/{email}
//!
//! # Misc
//! POST   /api/newsletter/subscribe
//! POST   /api/promo/validate
//! ```
//!
//! Mutations answer with [`Persisted`], which reports which stores took the
//! write in both the body and the `x-storage-durability` header.

pub mod admin;
pub mod auth;
pub mod cart;
pub mod newsletter;
pub mod orders;
pub mod payments;
pub mod products;
pub mod promo;

use axum::{
    Json, Router,
    extract::{Request, State},
    http::HeaderValue,
    middleware,
    response::{IntoResponse, Response},
    routing::{delete, get, post, put},
};
use serde::Serialize;
use serde_json::{Value, json};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::db;
use crate::middleware::request_id_middleware;
use crate::state::AppState;
use crate::store::Durability;

/// Response header carrying the write durability.
pub const DURABILITY_HEADER: &str = "x-storage-durability";

/// A JSON response for a write, tagged with where the write landed.
///
/// `body` must serialize to a JSON object; `durability` is added to it.
#[derive(Debug)]
pub struct Persisted<T> {
    pub body: T,
    pub durability: Durability,
}

impl<T> Persisted<T> {
    pub const fn new(body: T, durability: Durability) -> Self {
        Self { body, durability }
    }
}

#[derive(Serialize)]
struct PersistedBody<T> {
    #[serde(flatten)]
    body: T,
    durability: Durability,
}

impl<T: Serialize> IntoResponse for Persisted<T> {
    fn into_response(self) -> Response {
        let mut response = Json(PersistedBody {
            body: self.body,
            durability: self.durability,
        })
        .into_response();
        response.headers_mut().insert(
            DURABILITY_HEADER,
            HeaderValue::from_static(self.durability.as_str()),
        );
        response
    }
}

/// Create the cart routes router.
fn cart_routes() -> Router<AppState> {
    Router::new()
        .route("/{session_id}", get(cart::show))
        .route("/{session_id}/summary", get(cart::summary))
        .route("/{session_id}/add", post(cart::add))
        .route("/{session_id}/update", put(cart::update))
        .route("/{session_id}/remove", delete(cart::remove))
        .route("/{session_id}/clear", delete(cart::clear))
}

/// Create the admin routes router.
fn admin_routes() -> Router<AppState> {
    Router::new()
        .route("/users", get(admin::users))
        .route("/users/{email}", delete(admin::delete_user))
        .route("/orders", get(admin::orders))
        .route("/orders/{id}", put(admin::update_order))
        .route("/products", post(admin::add_product))
        .route(
            "/products/{id}",
            put(admin::update_product).delete(admin::delete_product),
        )
}

/// Create all `/api` routes.
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/products", get(products::index))
        .route("/products/{id}", get(products::show))
        .nest("/cart", cart_routes())
        .route("/orders", post(orders::create))
        .route("/orders/user/{email}", get(orders::for_user))
        .route("/orders/{id}/cancel", put(orders::cancel))
        .route("/auth/register", post(auth::register))
        .route("/auth/login", post(auth::login))
        .route("/auth/change-password", post(auth::change_password))
        .nest("/admin", admin_routes())
        .route("/payment/verify", post(payments::verify))
        .route("/payment/webhook", post(payments::webhook))
        .route("/payments/history/all", get(payments::history_all))
        .route("/payments/history/{email}", get(payments::history_for))
        .route("/newsletter/subscribe", post(newsletter::subscribe))
        .route("/promo/validate", post(promo::validate))
}

/// Build the full application router with its middleware.
///
/// Sentry layers are added by the binary so tests can drive this router
/// without a Sentry client.
pub fn app(state: AppState) -> Router {
    Router::new()
        .route("/", get(banner))
        .route("/health", get(health))
        .route("/health/ready", get(readiness))
        .nest("/api", api_routes())
        .with_state(state)
        .layer(middleware::from_fn(request_id_middleware))
        .layer(
            TraceLayer::new_for_http().make_span_with(|request: &Request| {
                tracing::info_span!(
                    "request",
                    method = %request.method(),
                    uri = %request.uri(),
                    request_id = tracing::field::Empty,
                )
            }),
        )
        .layer(CorsLayer::permissive())
}

/// Service banner.
async fn banner() -> Json<Value> {
    Json(json!({
        "message": "Best Market Place API",
        "status": "running",
    }))
}

/// Liveness health check endpoint.
///
/// Returns "ok" if the server is running. Does not check dependencies.
async fn health() -> &'static str {
    "ok"
}

/// Readiness health check endpoint.
///
/// Always 200: the service keeps serving from the local store when the
/// remote store is down. The body reports the remote store's state.
async fn readiness(State(state): State<AppState>) -> Json<Value> {
    let remote_store = match state.store().remote() {
        None => "disabled",
        Some(pool) => match db::ping(pool).await {
            Ok(()) => "connected",
            Err(err) => {
                tracing::warn!(error = %err, "Remote store readiness check failed");
                "unreachable"
            }
        },
    };

    Json(json!({
        "status": "ok",
        "remote_store": remote_store,
    }))
}
