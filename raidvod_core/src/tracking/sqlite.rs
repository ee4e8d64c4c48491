//! SQLite-backed tracking store

use super::{
    Scope, ScopeRecord, TrackingRecord, TrackingStore, WatchedDirectory, is_valid_scope_key,
    path_key,
};
use crate::database::{Database, schema::scope_table_sql};
use crate::error::TrackingError;
use crate::{Error, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::Row;
use std::path::{Path, PathBuf};

/// Tracking store persisted in a SQLite database file
pub struct SqliteTrackingStore {
    db: Database,
}

impl SqliteTrackingStore {
    /// Open the store at `db_path`, creating it if missing
    pub async fn open(db_path: &Path) -> Result<Self> {
        log::debug!("Opening tracking database at {}", db_path.display());
        Ok(Self {
            db: Database::new(db_path).await?,
        })
    }

    /// Non-durable store for tests
    pub async fn in_memory() -> Result<Self> {
        Ok(Self {
            db: Database::in_memory().await?,
        })
    }

    pub async fn close(&self) {
        self.db.close().await;
    }
}

fn storage_error(operation: &str) -> impl FnOnce(sqlx::Error) -> Error + '_ {
    move |e| Error::Tracking(TrackingError::storage(operation, e.to_string()))
}

/// Table name for `scope`; keys are interpolated into SQL
fn table(scope: &Scope) -> Result<&str> {
    if is_valid_scope_key(scope.key()) {
        Ok(scope.key())
    } else {
        Err(TrackingError::invalid_scope(scope.key()).into())
    }
}

fn from_millis(millis: i64) -> DateTime<Utc> {
    DateTime::from_timestamp_millis(millis).unwrap_or_default()
}

#[async_trait]
impl TrackingStore for SqliteTrackingStore {
    async fn ensure_scope(&self, directory: &WatchedDirectory) -> Result<Scope> {
        let scope = Scope::for_directory(directory);
        let requested = path_key(scope.directory())?;
        let now = Utc::now().timestamp_millis();

        let mut tx = self
            .db
            .pool()
            .begin()
            .await
            .map_err(storage_error("ensure_scope"))?;

        let registered: Option<String> =
            sqlx::query_scalar("SELECT directory FROM watch_scopes WHERE scope_key = ?")
                .bind(scope.key())
                .fetch_optional(&mut *tx)
                .await
                .map_err(storage_error("ensure_scope"))?;
        if let Some(registered) = registered {
            if registered != requested {
                return Err(TrackingError::scope_collision(
                    scope.key(),
                    Path::new(&registered),
                    scope.directory(),
                )
                .into());
            }
            return Ok(scope);
        }

        sqlx::query(&scope_table_sql(table(&scope)?))
            .execute(&mut *tx)
            .await
            .map_err(storage_error("ensure_scope"))?;

        sqlx::query("INSERT INTO watch_scopes (scope_key, directory, created_at) VALUES (?, ?, ?)")
            .bind(scope.key())
            .bind(requested)
            .bind(now)
            .execute(&mut *tx)
            .await
            .map_err(storage_error("ensure_scope"))?;

        tx.commit().await.map_err(storage_error("ensure_scope"))?;

        log::info!("Created tracking scope {scope} for {directory}");
        Ok(scope)
    }

    async fn is_tracked(&self, scope: &Scope, path: &Path) -> Result<bool> {
        let sql = format!(r#"SELECT COUNT(*) FROM "{}" WHERE file_path = ?"#, table(scope)?);
        let count = sqlx::query_scalar::<_, i64>(&sql)
            .bind(path_key(path)?)
            .fetch_one(self.db.pool())
            .await
            .map_err(storage_error("is_tracked"))?;
        Ok(count > 0)
    }

    async fn track(&self, scope: &Scope, path: &Path) -> Result<()> {
        let sql = format!(
            r#"INSERT OR IGNORE INTO "{}" (file_path, tracked_at) VALUES (?, ?)"#,
            table(scope)?
        );
        sqlx::query(&sql)
            .bind(path_key(path)?)
            .bind(Utc::now().timestamp_millis())
            .execute(self.db.pool())
            .await
            .map_err(storage_error("track"))?;
        Ok(())
    }

    async fn untrack(&self, scope: &Scope, path: &Path) -> Result<()> {
        let sql = format!(r#"DELETE FROM "{}" WHERE file_path = ?"#, table(scope)?);
        sqlx::query(&sql)
            .bind(path_key(path)?)
            .execute(self.db.pool())
            .await
            .map_err(storage_error("untrack"))?;
        Ok(())
    }

    async fn tracked_files(&self, scope: &Scope) -> Result<Vec<TrackingRecord>> {
        let sql = format!(
            r#"SELECT file_path, tracked_at FROM "{}" ORDER BY id ASC"#,
            table(scope)?
        );
        let rows = sqlx::query(&sql)
            .fetch_all(self.db.pool())
            .await
            .map_err(storage_error("tracked_files"))?;

        let mut records = Vec::with_capacity(rows.len());
        for row in rows {
            records.push(TrackingRecord {
                file_path: row.try_get("file_path")?,
                tracked_at: from_millis(row.try_get("tracked_at")?),
            });
        }
        Ok(records)
    }

    async fn scopes(&self) -> Result<Vec<ScopeRecord>> {
        let rows = sqlx::query(
            "SELECT scope_key, directory, created_at FROM watch_scopes ORDER BY created_at ASC, scope_key ASC",
        )
        .fetch_all(self.db.pool())
        .await
        .map_err(storage_error("scopes"))?;

        let mut records = Vec::with_capacity(rows.len());
        for row in rows {
            let directory: String = row.try_get("directory")?;
            records.push(ScopeRecord {
                scope_key: row.try_get("scope_key")?,
                directory: PathBuf::from(directory),
                created_at: from_millis(row.try_get("created_at")?),
            });
        }
        Ok(records)
    }
}
