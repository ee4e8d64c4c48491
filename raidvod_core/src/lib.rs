//! Raid VOD uploader core library
//!
//! Turns raid recording filenames into upload metadata, decides which
//! recordings qualify, polls a directory for new ones, remembers which were
//! already handled and uploads them to YouTube.

#[cfg(feature = "database")]
pub mod database;
pub mod discovery;
pub mod eligibility;
pub mod error;
pub mod metadata;
pub mod progress;
pub mod tracking;
pub mod upload;

// Mock implementations and test builders live in the raidvod-test-utils crate

#[cfg(feature = "database")]
pub use database::Database;
pub use discovery::{DEFAULT_POLL_INTERVAL, DirectoryWatcher, Sleeper, TokioSleeper, VideoFile};
pub use eligibility::{Eligibility, EligibilityConfig, EligibilityFilter, IneligibleReason};
pub use error::{Error, Result};
pub use metadata::{Difficulty, MetadataExtractor, VideoMetadata, VideoTemplate};
pub use progress::{LogProvider, NullProvider, ProgressProvider, ProgressUpdate};
#[cfg(feature = "database")]
pub use tracking::SqliteTrackingStore;
pub use tracking::{
    MemoryTrackingStore, Scope, ScopeRecord, TrackingRecord, TrackingStore, WatchedDirectory,
};
pub use upload::{UploadGateway, UploadRequest, VideoId, Visibility, YouTubeUploader};
