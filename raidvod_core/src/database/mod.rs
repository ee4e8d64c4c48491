//! SQLite connection management for the tracking store
//!
//! The database file holds a registry of watched-directory scopes plus one
//! table per scope. Only the tracking store talks to it.

pub mod migrations;
pub mod schema;

use crate::{
    Error, Result,
    error::{IoError, TrackingError},
};
use sqlx::SqlitePool;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use std::path::Path;
use std::str::FromStr;

/// Database connection manager with connection pooling
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// Open (or create) the database file and bring its schema up to date
    pub async fn new(db_path: &Path) -> Result<Self> {
        if let Some(parent) = db_path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| Error::Io(IoError::from_std(e).with_path(parent)))?;
        }

        let connect_options =
            SqliteConnectOptions::from_str(&format!("sqlite://{}", db_path.display()))?
                .create_if_missing(true)
                .journal_mode(SqliteJournalMode::Wal);

        Self::connect(connect_options, 4).await
    }

    /// Private in-memory database, used by tests and dry runs
    pub async fn in_memory() -> Result<Self> {
        let connect_options = SqliteConnectOptions::from_str("sqlite::memory:")?;
        // Every connection to :memory: is a separate database
        Self::connect(connect_options, 1).await
    }

    async fn connect(options: SqliteConnectOptions, max_connections: u32) -> Result<Self> {
        let pool = SqlitePoolOptions::new()
            .min_connections(1)
            .max_connections(max_connections)
            .connect_with(options)
            .await
            .map_err(|e| {
                Error::Tracking(TrackingError::storage(
                    "connect",
                    format!("Failed to connect to database: {e}"),
                ))
            })?;

        let db = Self { pool };
        db.migrate().await?;
        Ok(db)
    }

    /// Get a reference to the connection pool
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    async fn migrate(&self) -> Result<()> {
        migrations::run_migrations(&self.pool).await
    }

    /// Close all pooled connections
    pub async fn close(&self) {
        self.pool.close().await;
    }
}
