//! Test utilities for the raid VOD uploader
//!
//! Mock collaborators, a fake resumable-upload server and builders for
//! recording files named the way recording tools name them.

pub mod builders;
pub mod mocks;

// Re-export commonly used types
pub use builders::RecordingBuilder;
pub use mocks::{FakeYouTubeServer, ManualSleeper, MockUploadGateway};
