//! Watch command orchestrator
//!
//! Drives the discovery loop and, for each new recording, runs the
//! eligibility check, metadata extraction, upload and tracking in order.
//! A file is tracked only after its upload succeeded.

use crate::config::{AppConfig, ConfigManager};
use anyhow::{Context, Result};
use log::{debug, error, info, warn};
use raidvod_core::{
    DirectoryWatcher, Eligibility, EligibilityFilter, MetadataExtractor, NullProvider,
    ProgressProvider, Sleeper, TokioSleeper, TrackingStore, UploadGateway, UploadRequest, VideoId,
    WatchedDirectory,
};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;

/// A recording that made it to YouTube during a watch run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadedVideo {
    pub path: PathBuf,
    pub title: String,
    pub video_id: VideoId,
}

/// What a watch run did before it stopped
#[derive(Debug, Default)]
pub struct WatchSummary {
    /// Untracked files handed out by discovery, ineligible repeats included
    pub discovered: usize,
    pub ineligible: usize,
    pub uploaded: Vec<UploadedVideo>,
    /// An upload was abandoned because of shutdown
    pub interrupted: bool,
    pub passes: u64,
    pub elapsed: Duration,
}

/// Orchestrator for the watch command
pub struct UploadOrchestrator {
    config: AppConfig,
    config_manager: Option<ConfigManager>,
    store: Arc<dyn TrackingStore>,
    gateway: Arc<dyn UploadGateway>,
    progress: Arc<dyn ProgressProvider>,
    sleeper: Arc<dyn Sleeper>,
    cancel: CancellationToken,
    reload_requested: Arc<AtomicBool>,
}

impl UploadOrchestrator {
    pub fn new(
        config: AppConfig,
        store: Arc<dyn TrackingStore>,
        gateway: Arc<dyn UploadGateway>,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            config,
            config_manager: None,
            store,
            gateway,
            progress: Arc::new(NullProvider),
            sleeper: Arc::new(TokioSleeper),
            cancel,
            reload_requested: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Source for configuration reloads; without one reload requests are ignored
    pub fn with_config_manager(mut self, manager: ConfigManager) -> Self {
        self.config_manager = Some(manager);
        self
    }

    pub fn with_progress(mut self, progress: Arc<dyn ProgressProvider>) -> Self {
        self.progress = progress;
        self
    }

    pub fn with_sleeper(mut self, sleeper: Arc<dyn Sleeper>) -> Self {
        self.sleeper = sleeper;
        self
    }

    /// Flag that makes the loop reload its configuration before the next file
    ///
    /// Signal handlers keep a clone and set it.
    pub fn reload_handle(&self) -> Arc<AtomicBool> {
        self.reload_requested.clone()
    }

    pub fn request_reload(&self) {
        self.reload_requested.store(true, Ordering::SeqCst);
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Watch `directory` until cancelled
    ///
    /// Returns normally on cancellation. Upload, metadata and tracking
    /// failures end the run with an error and leave the file untracked.
    pub async fn run(&mut self, directory: &Path) -> Result<WatchSummary> {
        let start = Instant::now();
        let watched = WatchedDirectory::new(directory)?;
        let scope = self.store.ensure_scope(&watched).await?;
        info!("Watching {watched} for new recordings (scope {scope})");

        let mut watcher = DirectoryWatcher::new(
            watched,
            scope,
            self.store.clone(),
            self.sleeper.clone(),
            self.cancel.clone(),
        )
        .with_poll_interval(self.config.poll_interval());
        let mut filter = EligibilityFilter::new(self.config.eligibility());
        let mut extractor = MetadataExtractor::new(self.config.video_template());
        let mut summary = WatchSummary::default();

        while let Some(file) = watcher.next().await? {
            summary.discovered += 1;

            if self.reload_requested.swap(false, Ordering::SeqCst) {
                self.apply_reload(&mut watcher, &mut filter, &mut extractor);
            }

            debug!("Found new video: {}", file.path.display());
            if let Eligibility::Ineligible(reason) = filter.evaluate(&file.path) {
                debug!("Skipping {}: {reason}", file.path.display());
                summary.ineligible += 1;
                continue;
            }

            let metadata = extractor
                .extract_path(&file.path)
                .map_err(raidvod_core::Error::from)
                .with_context(|| format!("Failed to build metadata for {}", file.path.display()))?;
            let request = UploadRequest::from_metadata(
                &file.path,
                &metadata,
                self.config.youtube_video.visibility,
                &self.config.youtube_video.category_id,
            );

            info!("Uploading video: {}", metadata.title);
            let name = file
                .path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| metadata.title.clone());
            let progress = self.progress.create_child(&name);

            let outcome = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => None,
                result = self.gateway.upload(&request, progress.as_ref()) => Some(result),
            };
            let Some(result) = outcome else {
                warn!(
                    "Upload of {} interrupted by shutdown; it stays untracked",
                    file.path.display()
                );
                summary.interrupted = true;
                break;
            };

            let video_id = match result {
                Ok(video_id) => video_id,
                Err(e) => {
                    error!("Failed to upload video {}: {e}", metadata.title);
                    return Err(anyhow::Error::new(e)
                        .context(format!("Failed to upload {}", file.path.display())));
                }
            };
            info!("Successfully uploaded video: {} ({video_id})", metadata.title);

            self.store.track(watcher.scope(), &file.path).await?;
            info!("Tracked {}", file.path.display());
            summary.uploaded.push(UploadedVideo {
                path: file.path,
                title: metadata.title,
                video_id,
            });
        }

        summary.passes = watcher.passes();
        summary.elapsed = start.elapsed();
        info!(
            "Stopped watching {} after {} pass(es), {} upload(s)",
            watcher.directory(),
            summary.passes,
            summary.uploaded.len()
        );
        Ok(summary)
    }

    /// Swap in freshly loaded settings, keeping the old ones on failure
    fn apply_reload(
        &mut self,
        watcher: &mut DirectoryWatcher,
        filter: &mut EligibilityFilter,
        extractor: &mut MetadataExtractor,
    ) {
        let Some(manager) = &self.config_manager else {
            debug!("Reload requested without a configuration source");
            return;
        };

        let config = match manager.reload() {
            Ok(config) => config,
            Err(e) => {
                warn!("Keeping previous configuration, reload failed: {e:#}");
                return;
            }
        };

        if let Some(directory) = &config.watch.directory {
            let unchanged = WatchedDirectory::new(directory)
                .map(|d| d.path() == watcher.directory().path())
                .unwrap_or(false);
            if !unchanged {
                warn!(
                    "watch.directory changed to {}; still watching {} until restart",
                    directory.display(),
                    watcher.directory()
                );
            }
        }
        if config.log_level != self.config.log_level {
            warn!("log_level changes take effect after restart");
        }

        *filter = EligibilityFilter::new(config.eligibility());
        *extractor = MetadataExtractor::new(config.video_template());
        watcher.set_poll_interval(config.poll_interval());
        self.config = config;
    }
}
