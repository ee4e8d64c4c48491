//! Database schema definitions

/// Current schema version
pub const CURRENT_SCHEMA_VERSION: i32 = 1;

/// Registry of watched-directory scopes
pub const SCHEMA_V1: &str = r#"
-- Schema version tracking
CREATE TABLE IF NOT EXISTS schema_version (
    version INTEGER PRIMARY KEY,
    applied_at INTEGER NOT NULL
);

-- One row per watched directory, naming its tracking table
CREATE TABLE IF NOT EXISTS watch_scopes (
    scope_key TEXT PRIMARY KEY,
    directory TEXT NOT NULL UNIQUE,
    created_at INTEGER NOT NULL
);
"#;

/// Per-scope table of tracked file paths
///
/// `table` must already be validated as a scope key; identifiers cannot be
/// bound as parameters.
pub fn scope_table_sql(table: &str) -> String {
    format!(
        r#"CREATE TABLE IF NOT EXISTS "{table}" (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    file_path TEXT NOT NULL UNIQUE,
    tracked_at INTEGER NOT NULL
)"#
    )
}
