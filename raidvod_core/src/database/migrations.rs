//! Database migration system
//!
//! Migrations are applied in order inside a transaction each and recorded in
//! `schema_version`, so re-running them on an up-to-date database is a no-op.

use crate::{Error, Result, error::TrackingError};
use sqlx::SqlitePool;
use std::time::{SystemTime, UNIX_EPOCH};

use super::schema::SCHEMA_V1;

/// Run all necessary migrations
pub async fn run_migrations(pool: &SqlitePool) -> Result<()> {
    let current_version = get_current_version(pool).await?;

    if current_version < 1 {
        log::debug!("Applying tracking schema v1");
        apply_migration(pool, 1, SCHEMA_V1).await?;
    }

    Ok(())
}

/// Get the current schema version from the database
async fn get_current_version(pool: &SqlitePool) -> Result<i32> {
    if !table_exists(pool, "schema_version").await? {
        return Ok(0);
    }

    let version = sqlx::query_scalar::<_, Option<i32>>("SELECT MAX(version) FROM schema_version")
        .fetch_one(pool)
        .await?;

    Ok(version.unwrap_or(0))
}

fn migration_error(operation: &str, version: i32, e: sqlx::Error) -> Error {
    Error::Tracking(TrackingError::storage(
        "migrate",
        format!("Failed to {operation} migration {version}: {e}"),
    ))
}

/// Apply a single migration
async fn apply_migration(pool: &SqlitePool, version: i32, sql: &str) -> Result<()> {
    let mut tx = pool
        .begin()
        .await
        .map_err(|e| migration_error("start", version, e))?;

    sqlx::raw_sql(sql)
        .execute(&mut *tx)
        .await
        .map_err(|e| migration_error("apply", version, e))?;

    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as i64;

    sqlx::query("INSERT INTO schema_version (version, applied_at) VALUES (?, ?)")
        .bind(version)
        .bind(now)
        .execute(&mut *tx)
        .await
        .map_err(|e| migration_error("record", version, e))?;

    tx.commit()
        .await
        .map_err(|e| migration_error("commit", version, e))?;

    Ok(())
}

/// Check if a table exists
pub(crate) async fn table_exists(pool: &SqlitePool, table_name: &str) -> Result<bool> {
    let count = sqlx::query_scalar::<_, i64>(
        "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name=?",
    )
    .bind(table_name)
    .fetch_one(pool)
    .await?;

    Ok(count > 0)
}

#[cfg(test)]
mod tests {
    use super::super::schema::CURRENT_SCHEMA_VERSION;
    use super::*;
    use std::str::FromStr;
    use tempfile::TempDir;

    async fn create_test_pool() -> (SqlitePool, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let db_path = temp_dir.path().join("test.db");

        let connect_options = sqlx::sqlite::SqliteConnectOptions::from_str(&format!(
            "sqlite://{}",
            db_path.display()
        ))
        .unwrap()
        .create_if_missing(true)
        .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal);

        let pool = sqlx::sqlite::SqlitePoolOptions::new()
            .min_connections(1)
            .max_connections(2)
            .connect_with(connect_options)
            .await
            .unwrap();

        (pool, temp_dir)
    }

    #[tokio::test]
    async fn test_migrations_fresh_database() {
        let (pool, _temp_dir) = create_test_pool().await;

        assert_eq!(get_current_version(&pool).await.unwrap(), 0);

        run_migrations(&pool).await.unwrap();

        assert_eq!(
            get_current_version(&pool).await.unwrap(),
            CURRENT_SCHEMA_VERSION
        );
        assert!(table_exists(&pool, "watch_scopes").await.unwrap());
    }

    #[tokio::test]
    async fn test_migrations_idempotent() {
        let (pool, _temp_dir) = create_test_pool().await;

        run_migrations(&pool).await.unwrap();
        run_migrations(&pool).await.unwrap();

        let applied = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM schema_version")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(applied, CURRENT_SCHEMA_VERSION as i64);
    }
}
