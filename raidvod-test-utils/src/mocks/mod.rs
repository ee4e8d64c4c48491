//! Mock implementations for testing

mod gateway;
mod sleeper;
mod youtube_server;

pub use gateway::MockUploadGateway;
pub use sleeper::ManualSleeper;
pub use youtube_server::{FakeYouTubeServer, RecordedRequest};
