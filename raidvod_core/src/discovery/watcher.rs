//! The polling loop

use super::{Sleeper, VideoFile, list_directory};
use crate::Result;
use crate::tracking::{Scope, TrackingStore, WatchedDirectory};
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Pause between passes unless configured otherwise
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(15);

/// Endless sequence of untracked files in a watched directory
///
/// Only cancellation ends the sequence; [`next`](Self::next) then returns
/// `Ok(None)`.
pub struct DirectoryWatcher {
    directory: WatchedDirectory,
    scope: Scope,
    store: Arc<dyn TrackingStore>,
    sleeper: Arc<dyn Sleeper>,
    poll_interval: Duration,
    cancel: CancellationToken,
    pending: VecDeque<VideoFile>,
    passes: u64,
}

impl DirectoryWatcher {
    pub fn new(
        directory: WatchedDirectory,
        scope: Scope,
        store: Arc<dyn TrackingStore>,
        sleeper: Arc<dyn Sleeper>,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            directory,
            scope,
            store,
            sleeper,
            poll_interval: DEFAULT_POLL_INTERVAL,
            cancel,
            pending: VecDeque::new(),
            passes: 0,
        }
    }

    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.set_poll_interval(poll_interval);
        self
    }

    /// Takes effect from the next pause on
    pub fn set_poll_interval(&mut self, poll_interval: Duration) {
        self.poll_interval = poll_interval;
    }

    pub fn directory(&self) -> &WatchedDirectory {
        &self.directory
    }

    pub fn scope(&self) -> &Scope {
        &self.scope
    }

    /// Listing passes started so far
    pub fn passes(&self) -> u64 {
        self.passes
    }

    /// Next untracked file, waiting for new passes as long as needed
    ///
    /// Tracking is checked when a file is about to be yielded, not when the
    /// pass is listed, so files tracked mid-pass are skipped.
    pub async fn next(&mut self) -> Result<Option<VideoFile>> {
        loop {
            if self.cancel.is_cancelled() {
                return Ok(None);
            }

            while let Some(file) = self.pending.pop_front() {
                if self.store.is_tracked(&self.scope, &file.path).await? {
                    continue;
                }
                log::debug!("Discovered {}", file.path.display());
                return Ok(Some(file));
            }

            if self.passes > 0 {
                log::info!(
                    "Sleeping for {} seconds before checking {} again",
                    self.poll_interval.as_secs(),
                    self.directory
                );
                tokio::select! {
                    _ = self.cancel.cancelled() => return Ok(None),
                    _ = self.sleeper.sleep(self.poll_interval) => {}
                }
                if self.cancel.is_cancelled() {
                    return Ok(None);
                }
            }

            self.pending = list_directory(self.directory.path())?.into();
            self.passes += 1;
            log::debug!(
                "Pass {} listed {} file(s) in {}",
                self.passes,
                self.pending.len(),
                self.directory
            );
        }
    }
}
