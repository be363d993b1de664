//! Integration test harness for the Best Market Place API.
//!
//! Tests drive the full router through `tower::ServiceExt::oneshot`, with the
//! users snapshot in a temp dir. The remote store is either absent or points
//! at a closed port; no live `PostgreSQL` is needed.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p bestmarket-integration-tests
//! ```

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::time::Duration;

use axum::Router;
use axum::body::Body;
use axum::http::{HeaderMap, Method, Request, StatusCode, header};
use secrecy::SecretString;
use serde_json::Value;
use sqlx::PgPool;
use tempfile::TempDir;
use tower::ServiceExt;

use bestmarket_storefront::config::StorefrontConfig;
use bestmarket_storefront::{db, routes};
use bestmarket_storefront::state::AppState;

/// Nothing listens on port 1, so connections are refused immediately.
const UNREACHABLE_DATABASE_URL: &str = "postgres://bm:bm@127.0.0.1:1/bm";

/// A decoded response.
#[derive(Debug)]
pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Value,
}

impl TestResponse {
    /// Value of a response header, if present and valid UTF-8.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }
}

/// An application plus the temp dir holding its users snapshot.
pub struct TestApp {
    router: Router,
    dir: TempDir,
}

impl TestApp {
    /// Build a fresh local-only app.
    ///
    /// # Panics
    ///
    /// Panics if the temp dir or application state cannot be created.
    pub async fn new() -> Self {
        Self::build(None).await
    }

    /// Build an app whose remote store is configured but refuses
    /// connections, so every remote write falls back to the local store.
    ///
    /// # Panics
    ///
    /// Panics if the pool, temp dir or application state cannot be created.
    #[allow(clippy::expect_used)]
    pub async fn with_unreachable_remote() -> Self {
        let url = SecretString::from(UNREACHABLE_DATABASE_URL.to_owned());
        let pool = db::create_pool_with_timeout(&url, Duration::from_millis(300))
            .expect("Failed to build lazy pool");
        Self::build(Some(pool)).await
    }

    #[allow(clippy::expect_used)]
    async fn build(pool: Option<PgPool>) -> Self {
        let dir = tempfile::tempdir().expect("Failed to create temp dir");
        let config = StorefrontConfig::local(dir.path().join("users.json"));
        let state = AppState::new(config, pool)
            .await
            .expect("Failed to build application state");

        Self {
            router: routes::app(state),
            dir,
        }
    }

    /// Path of the users snapshot file.
    #[must_use]
    pub fn users_file(&self) -> std::path::PathBuf {
        self.dir.path().join("users.json")
    }

    /// Send a request with an optional JSON body.
    ///
    /// # Panics
    ///
    /// Panics if the request cannot be built or the body is not JSON.
    #[allow(clippy::expect_used)]
    pub async fn send(&self, method: Method, uri: &str, body: Option<Value>) -> TestResponse {
        let builder = Request::builder().method(method).uri(uri);
        let request = match body {
            Some(json) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(json.to_string())),
            None => builder.body(Body::empty()),
        }
        .expect("Failed to build request");

        self.send_request(request).await
    }

    /// Send a prebuilt request.
    ///
    /// # Panics
    ///
    /// Panics if the router fails or the body is not JSON.
    #[allow(clippy::expect_used)]
    pub async fn send_request(&self, request: Request<Body>) -> TestResponse {
        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("Router is infallible");

        let status = response.status();
        let headers = response.headers().clone();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("Failed to read body");
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes)
                .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()))
        };

        TestResponse {
            status,
            headers,
            body,
        }
    }

    pub async fn get(&self, uri: &str) -> TestResponse {
        self.send(Method::GET, uri, None).await
    }

    pub async fn post(&self, uri: &str, body: Value) -> TestResponse {
        self.send(Method::POST, uri, Some(body)).await
    }

    pub async fn put(&self, uri: &str, body: Value) -> TestResponse {
        self.send(Method::PUT, uri, Some(body)).await
    }

    pub async fn delete(&self, uri: &str, body: Option<Value>) -> TestResponse {
        self.send(Method::DELETE, uri, body).await
    }
}
