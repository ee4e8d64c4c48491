//! Progress reporting abstractions
//!
//! The upload gateway reports through a [`ProgressProvider`] so the core
//! never depends on how progress is shown. The CLI renders bars; headless
//! runs log percentages.

use std::path::PathBuf;
use std::sync::Mutex;

/// Core trait for progress reporting
pub trait ProgressProvider: Send + Sync {
    /// Report a progress update
    fn report(&self, update: ProgressUpdate);

    /// Create a child provider for nested operations
    fn create_child(&self, name: &str) -> Box<dyn ProgressProvider>;

    /// Signal that the operation is complete
    fn complete(&self);
}

/// Unified progress update type
#[derive(Debug, Clone, PartialEq)]
pub enum ProgressUpdate {
    /// Bytes of a recording accepted by the video host
    UploadProgress {
        path: PathBuf,
        bytes_sent: u64,
        total_bytes: u64,
    },

    /// Generic status message
    Status { message: String },
}

impl ProgressUpdate {
    /// Whole percent for upload updates, `None` for anything else
    pub fn percent(&self) -> Option<u64> {
        match self {
            Self::UploadProgress {
                bytes_sent,
                total_bytes,
                ..
            } => Some(if *total_bytes == 0 {
                100
            } else {
                bytes_sent.saturating_mul(100) / total_bytes
            }),
            Self::Status { .. } => None,
        }
    }
}

/// Null implementation for when no progress is needed
pub struct NullProvider;

impl ProgressProvider for NullProvider {
    fn report(&self, _update: ProgressUpdate) {}

    fn create_child(&self, _name: &str) -> Box<dyn ProgressProvider> {
        Box::new(NullProvider)
    }

    fn complete(&self) {}
}

/// Logs `Uploaded N%` at info level, once per whole percent
pub struct LogProvider {
    last_percent: Mutex<Option<u64>>,
}

impl LogProvider {
    pub fn new() -> Self {
        Self {
            last_percent: Mutex::new(None),
        }
    }
}

impl Default for LogProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgressProvider for LogProvider {
    fn report(&self, update: ProgressUpdate) {
        match &update {
            ProgressUpdate::UploadProgress { .. } => {
                let Some(percent) = update.percent() else {
                    return;
                };
                let Ok(mut last) = self.last_percent.lock() else {
                    return;
                };
                if *last != Some(percent) {
                    *last = Some(percent);
                    log::info!("Uploaded {percent}%");
                }
            }
            ProgressUpdate::Status { message } => log::info!("{message}"),
        }
    }

    fn create_child(&self, _name: &str) -> Box<dyn ProgressProvider> {
        Box::new(LogProvider::new())
    }

    fn complete(&self) {
        if let Ok(mut last) = self.last_percent.lock() {
            *last = None;
        }
    }
}
