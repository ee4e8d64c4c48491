//! Error types for the raid VOD uploader core library
//!
//! Errors are grouped by the component that raises them so callers can tell a
//! malformed filename apart from a broken upload or a failing tracking store.

use thiserror::Error;

pub mod io;
pub mod metadata;
pub mod tracking;
pub mod upload;
pub mod validation;

pub use self::io::{IoError, IoErrorKind};
pub use self::metadata::MetadataError;
pub use self::tracking::TrackingError;
pub use self::upload::UploadError;
pub use self::validation::ValidationError;

/// Result type alias for the library
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the core library
///
/// - I/O errors: filesystem operations on the watched directory and recordings
/// - Metadata errors: filename parsing and template rendering
/// - Upload errors: anything raised while talking to the video host
/// - Tracking errors: the durable store of already processed files
/// - Validation errors: configuration and parameter checks
#[derive(Error, Debug)]
pub enum Error {
    /// I/O related errors
    #[error(transparent)]
    Io(#[from] IoError),

    /// Filename metadata errors
    #[error(transparent)]
    Metadata(#[from] MetadataError),

    /// Upload gateway errors
    #[error(transparent)]
    Upload(#[from] UploadError),

    /// Tracking store errors
    #[error(transparent)]
    Tracking(#[from] TrackingError),

    /// Validation related errors
    #[error(transparent)]
    Validation(#[from] ValidationError),
}

impl Error {
    /// Whether the process must stop because exactly-once guarantees are gone
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Tracking(_))
    }
}

// Conversions from external error types

impl From<std::io::Error> for Error {
    fn from(source: std::io::Error) -> Self {
        Self::Io(IoError::from_std(source))
    }
}

#[cfg(feature = "database")]
impl From<sqlx::Error> for Error {
    fn from(err: sqlx::Error) -> Self {
        Self::Tracking(TrackingError::storage("query", err.to_string()))
    }
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        Self::Upload(UploadError::from(err))
    }
}
