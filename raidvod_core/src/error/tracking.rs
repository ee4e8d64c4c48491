//! Tracking store error types

use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors raised by the durable store of processed files
#[derive(Error, Debug)]
pub enum TrackingError {
    /// The backing storage failed
    #[error("Tracking store {operation} failed: {message}")]
    Storage { operation: String, message: String },

    /// A scope key that cannot be used as a table name
    #[error("Invalid tracking scope '{key}'")]
    InvalidScope { key: String },

    /// Two directories derived the same scope key
    #[error(
        "Tracking scope '{key}' already belongs to {}; refusing to share it with {}",
        registered.display(),
        requested.display()
    )]
    ScopeCollision {
        key: String,
        registered: PathBuf,
        requested: PathBuf,
    },

    /// Paths are stored as text
    #[error("Cannot track non UTF-8 path {}", path.display())]
    NonUtf8Path { path: PathBuf },
}

impl TrackingError {
    /// Create a storage failure error
    pub fn storage(operation: &str, message: impl Into<String>) -> Self {
        Self::Storage {
            operation: operation.to_string(),
            message: message.into(),
        }
    }

    /// Create an invalid scope error
    pub fn invalid_scope(key: &str) -> Self {
        Self::InvalidScope {
            key: key.to_string(),
        }
    }

    pub fn scope_collision(key: &str, registered: &Path, requested: &Path) -> Self {
        Self::ScopeCollision {
            key: key.to_string(),
            registered: registered.to_path_buf(),
            requested: requested.to_path_buf(),
        }
    }

    pub fn non_utf8_path(path: &Path) -> Self {
        Self::NonUtf8Path {
            path: path.to_path_buf(),
        }
    }
}
