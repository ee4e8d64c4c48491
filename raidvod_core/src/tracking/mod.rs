//! Durable record of recordings that have already been handled
//!
//! Records are partitioned by [`Scope`], one per watched directory. Marking
//! and unmarking are idempotent, and uniqueness of a path within a scope is
//! enforced by the backing store itself rather than checked at runtime.

mod memory;
mod scope;
#[cfg(feature = "database")]
mod sqlite;

pub use memory::MemoryTrackingStore;
pub use scope::{Scope, WatchedDirectory, is_valid_scope_key};
#[cfg(feature = "database")]
pub use sqlite::SqliteTrackingStore;

use crate::Result;
use crate::error::TrackingError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::path::{Path, PathBuf};

/// A path marked as handled within a scope
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TrackingRecord {
    pub file_path: String,
    pub tracked_at: DateTime<Utc>,
}

/// A registered scope
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScopeRecord {
    pub scope_key: String,
    pub directory: PathBuf,
    pub created_at: DateTime<Utc>,
}

/// Storage for tracking records
///
/// Scopes passed to the record operations must come from
/// [`ensure_scope`](TrackingStore::ensure_scope) on the same store.
#[async_trait]
pub trait TrackingStore: Send + Sync {
    /// Register the directory's scope if needed and return it
    async fn ensure_scope(&self, directory: &WatchedDirectory) -> Result<Scope>;

    /// Whether `path` is tracked in `scope`
    async fn is_tracked(&self, scope: &Scope, path: &Path) -> Result<bool>;

    /// Mark `path` as handled; marking twice is a no-op
    async fn track(&self, scope: &Scope, path: &Path) -> Result<()>;

    /// Remove the mark for `path`; removing an unknown path is a no-op
    async fn untrack(&self, scope: &Scope, path: &Path) -> Result<()>;

    /// All records in a scope, oldest first
    async fn tracked_files(&self, scope: &Scope) -> Result<Vec<TrackingRecord>>;

    /// All registered scopes
    async fn scopes(&self) -> Result<Vec<ScopeRecord>>;
}

/// The string stored for a path
///
/// Non UTF-8 paths are refused rather than mapped lossily, which could make
/// two distinct files share a record.
pub(crate) fn path_key(path: &Path) -> Result<&str> {
    path.to_str()
        .ok_or_else(|| TrackingError::non_utf8_path(path).into())
}
