//! In-memory tracking store

use super::{Scope, ScopeRecord, TrackingRecord, TrackingStore, WatchedDirectory, path_key};
use crate::Result;
use crate::error::TrackingError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::path::Path;
use std::sync::Mutex;

#[derive(Debug, Default)]
struct ScopeEntries {
    created_at: DateTime<Utc>,
    directory: std::path::PathBuf,
    records: Vec<TrackingRecord>,
}

/// Tracking store that forgets everything on drop
///
/// Used for dry runs and tests. Semantics match the SQLite store.
#[derive(Debug, Default)]
pub struct MemoryTrackingStore {
    scopes: Mutex<HashMap<String, ScopeEntries>>,
}

impl MemoryTrackingStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn with_scope<T>(
        &self,
        scope: &Scope,
        f: impl FnOnce(&mut ScopeEntries) -> T,
    ) -> Result<T> {
        let mut scopes = self
            .scopes
            .lock()
            .map_err(|e| TrackingError::storage("lock", e.to_string()))?;
        let entries = scopes
            .get_mut(scope.key())
            .ok_or_else(|| TrackingError::invalid_scope(scope.key()))?;
        Ok(f(entries))
    }
}

#[async_trait]
impl TrackingStore for MemoryTrackingStore {
    async fn ensure_scope(&self, directory: &WatchedDirectory) -> Result<Scope> {
        let scope = Scope::for_directory(directory);
        path_key(directory.path())?;
        let mut scopes = self
            .scopes
            .lock()
            .map_err(|e| TrackingError::storage("lock", e.to_string()))?;
        let entries = scopes
            .entry(scope.key().to_string())
            .or_insert_with(|| ScopeEntries {
                created_at: Utc::now(),
                directory: directory.path().to_path_buf(),
                records: Vec::new(),
            });
        if entries.directory != directory.path() {
            return Err(TrackingError::scope_collision(
                scope.key(),
                &entries.directory,
                directory.path(),
            )
            .into());
        }
        Ok(scope)
    }

    async fn is_tracked(&self, scope: &Scope, path: &Path) -> Result<bool> {
        let key = path_key(path)?;
        self.with_scope(scope, |entries| {
            entries.records.iter().any(|r| r.file_path == key)
        })
    }

    async fn track(&self, scope: &Scope, path: &Path) -> Result<()> {
        let key = path_key(path)?;
        self.with_scope(scope, |entries| {
            if !entries.records.iter().any(|r| r.file_path == key) {
                entries.records.push(TrackingRecord {
                    file_path: key.to_string(),
                    tracked_at: Utc::now(),
                });
            }
        })
    }

    async fn untrack(&self, scope: &Scope, path: &Path) -> Result<()> {
        let key = path_key(path)?;
        self.with_scope(scope, |entries| {
            entries.records.retain(|r| r.file_path != key);
        })
    }

    async fn tracked_files(&self, scope: &Scope) -> Result<Vec<TrackingRecord>> {
        self.with_scope(scope, |entries| entries.records.clone())
    }

    async fn scopes(&self) -> Result<Vec<ScopeRecord>> {
        let scopes = self
            .scopes
            .lock()
            .map_err(|e| TrackingError::storage("lock", e.to_string()))?;
        let mut records: Vec<ScopeRecord> = scopes
            .iter()
            .map(|(key, entries)| ScopeRecord {
                scope_key: key.clone(),
                directory: entries.directory.clone(),
                created_at: entries.created_at,
            })
            .collect();
        records.sort_by(|a, b| {
            a.created_at
                .cmp(&b.created_at)
                .then_with(|| a.scope_key.cmp(&b.scope_key))
        });
        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_unregistered_scope_is_rejected() {
        let store = MemoryTrackingStore::new();
        let dir = TempDir::new().unwrap();
        let scope = Scope::for_directory(&WatchedDirectory::new(dir.path()).unwrap());

        let err = store.track(&scope, Path::new("kill.mp4")).await.unwrap_err();
        assert!(matches!(
            err,
            crate::Error::Tracking(TrackingError::InvalidScope { .. })
        ));
    }

    #[tokio::test]
    async fn test_track_is_idempotent() {
        let store = MemoryTrackingStore::new();
        let dir = TempDir::new().unwrap();
        let scope = store
            .ensure_scope(&WatchedDirectory::new(dir.path()).unwrap())
            .await
            .unwrap();
        let path = dir.path().join("kill.mp4");

        store.track(&scope, &path).await.unwrap();
        store.track(&scope, &path).await.unwrap();

        assert!(store.is_tracked(&scope, &path).await.unwrap());
        assert_eq!(store.tracked_files(&scope).await.unwrap().len(), 1);
    }
}
