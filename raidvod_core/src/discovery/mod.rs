//! Poll-based discovery of new recordings
//!
//! Each pass lists the watched directory, yields the untracked files oldest
//! first and then sleeps. Files yielded but not tracked before the next pass
//! are yielded again, so exactly-once handling depends on the caller marking
//! each file before asking for the next pass.

mod listing;
mod sleeper;
mod watcher;

pub use listing::list_directory;
pub use sleeper::{Sleeper, TokioSleeper};
pub use watcher::{DEFAULT_POLL_INTERVAL, DirectoryWatcher};

use std::path::PathBuf;
use std::time::SystemTime;

/// A file seen in one listing pass
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VideoFile {
    pub path: PathBuf,
    pub modified: SystemTime,
}
