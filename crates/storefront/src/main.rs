//! Best Market Place storefront API.
//!
//! Serves the JSON API consumed by the storefront and admin frontends.
//!
//! # Storage
//!
//! - `PostgreSQL` is the remote store, used when `DATABASE_URL` is set; the
//!   pool connects lazily, so a database that comes up late is picked up
//! - Every write is mirrored into an in-process local store; users are also
//!   snapshotted to a JSON file so accounts survive restarts without a
//!   database
//!
//! Responses to mutating requests report which store accepted the write via
//! the `durability` field and the `x-storage-durability` header.

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::time::Duration;

use bestmarket_storefront::config::{LogFormat, StorefrontConfig};
use bestmarket_storefront::state::AppState;
use bestmarket_storefront::{db, routes};
use sentry::integrations::tracing as sentry_tracing;
use tracing_subscriber::{Layer, layer::SubscriberExt, util::SubscriberInitExt};

/// How long start-up waits to report whether the remote store answers.
const STARTUP_PING_TIMEOUT: Duration = Duration::from_secs(2);

/// Initialize Sentry error tracking and return guard that must be kept alive.
fn init_sentry(config: &StorefrontConfig) -> Option<sentry::ClientInitGuard> {
    let dsn = config.sentry_dsn.as_ref()?;

    let guard = sentry::init((
        dsn.as_str(),
        sentry::ClientOptions {
            release: sentry::release_name!(),
            environment: config
                .sentry_environment
                .clone()
                .map(std::borrow::Cow::Owned),
            attach_stacktrace: true,
            ..Default::default()
        },
    ));

    tracing::info!("Sentry initialized");
    Some(guard)
}

/// Filter tracing events to Sentry event types.
fn sentry_event_filter(metadata: &tracing::Metadata<'_>) -> sentry_tracing::EventFilter {
    match *metadata.level() {
        tracing::Level::ERROR => sentry_tracing::EventFilter::Event,
        tracing::Level::WARN | tracing::Level::INFO => sentry_tracing::EventFilter::Breadcrumb,
        _ => sentry_tracing::EventFilter::Ignore,
    }
}

fn init_tracing(format: LogFormat) {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "bestmarket_storefront=info,tower_http=debug".into());

    let fmt_layer = match format {
        LogFormat::Pretty => tracing_subscriber::fmt::layer().boxed(),
        LogFormat::Json => tracing_subscriber::fmt::layer()
            .json()
            .with_current_span(true)
            .boxed(),
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .with(sentry_tracing::layer().event_filter(sentry_event_filter))
        .init();
}

#[tokio::main]
async fn main() {
    let config = StorefrontConfig::from_env().expect("Failed to load configuration");

    // Sentry must be initialized before the tracing subscriber
    let _sentry_guard = init_sentry(&config);
    init_tracing(config.log_format);

    let pool = match &config.database_url {
        Some(url) => match db::create_pool(url) {
            Ok(pool) => {
                // Only decides the log line; the pool keeps reconnecting per request
                match tokio::time::timeout(STARTUP_PING_TIMEOUT, db::ping(&pool)).await {
                    Ok(Ok(())) => tracing::info!("Remote store connected"),
                    Ok(Err(e)) => tracing::warn!(error = %e, "Remote store unreachable at start-up"),
                    Err(_) => tracing::warn!("Remote store did not answer at start-up"),
                }
                Some(pool)
            }
            Err(e) => {
                tracing::warn!(error = %e, "Invalid database URL, running local-only");
                None
            }
        },
        None => {
            tracing::info!("DATABASE_URL not set, running local-only");
            None
        }
    };

    // NOTE: Migrations are NOT run automatically on startup.
    // Run them explicitly via: cargo run -p bestmarket-cli -- migrate

    let state = AppState::new(config.clone(), pool)
        .await
        .expect("Failed to initialize application state");

    let preloaded = state.orders().preload().await;
    tracing::info!(orders = preloaded, "Order history preloaded");

    let app = routes::app(state)
        // Sentry layers (outermost for full request coverage)
        .layer(sentry_tower::NewSentryLayer::new_from_top())
        .layer(sentry_tower::SentryHttpLayer::new().enable_transaction());

    let addr = config.socket_addr();
    tracing::info!("storefront listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind to address");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("Server error");
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    tracing::info!("Shutdown signal received, starting graceful shutdown");
}
