//! Test data builders

mod recording;

pub use recording::RecordingBuilder;
