//! Dual-write storage coordinator.
//!
//! Writes are attempted against the remote store and always applied to the
//! local store. Remote failures are logged and swallowed; callers learn what
//! happened through [`Durability`]. Reads try remote first and fall back to
//! local. The two stores are never reconciled.

pub mod local;

use std::future::Future;

use serde::Serialize;
use sqlx::PgPool;

pub use local::{LocalStore, SnapshotError, bundled_catalog};

use crate::db::RepositoryError;

/// Which stores acknowledged a write.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Durability {
    /// The remote store accepted the write (the local store did too).
    Remote,
    /// Only the local store has the write; it is lost on restart unless it
    /// is a user record.
    LocalOnly,
}

impl Durability {
    /// `Remote` if the remote write succeeded.
    #[must_use]
    pub const fn from_remote(acknowledged: bool) -> Self {
        if acknowledged {
            Self::Remote
        } else {
            Self::LocalOnly
        }
    }

    /// Wire name, as used in the `x-storage-durability` header.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Remote => "remote",
            Self::LocalOnly => "local_only",
        }
    }
}

impl std::fmt::Display for Durability {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The remote store (optional) paired with the local fallback store.
pub struct Store {
    remote: Option<PgPool>,
    local: LocalStore,
}

impl Store {
    /// Pair a remote pool, if any, with a local store.
    #[must_use]
    pub const fn new(remote: Option<PgPool>, local: LocalStore) -> Self {
        Self { remote, local }
    }

    /// The remote pool, if one is configured.
    #[must_use]
    pub const fn remote(&self) -> Option<&PgPool> {
        self.remote.as_ref()
    }

    /// Whether a remote store is configured.
    #[must_use]
    pub const fn has_remote(&self) -> bool {
        self.remote.is_some()
    }

    /// The local fallback store.
    #[must_use]
    pub const fn local(&self) -> &LocalStore {
        &self.local
    }

    /// Run `op` against the remote store.
    ///
    /// Returns `None` when no remote is configured or the operation failed;
    /// failures are logged under `operation`.
    pub async fn attempt<'a, T, F, Fut>(&'a self, operation: &'static str, op: F) -> Option<T>
    where
        F: FnOnce(&'a PgPool) -> Fut,
        Fut: Future<Output = Result<T, RepositoryError>>,
    {
        let pool = self.remote.as_ref()?;
        match op(pool).await {
            Ok(value) => Some(value),
            Err(err) => {
                log_remote_failure(operation, &err);
                None
            }
        }
    }
}

/// Log a swallowed remote store failure.
pub fn log_remote_failure(operation: &str, err: &RepositoryError) {
    tracing::warn!(
        operation,
        error = %err,
        "Remote store operation failed, continuing with local store"
    );
}
