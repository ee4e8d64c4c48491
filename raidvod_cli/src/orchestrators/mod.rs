//! Command orchestrators for business logic
//!
//! Orchestrators coordinate between the CLI layer and the core library
//! services.

pub mod upload_orchestrator;

pub use upload_orchestrator::{UploadOrchestrator, UploadedVideo, WatchSummary};
