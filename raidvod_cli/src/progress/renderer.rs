//! Progress rendering for the CLI

use super::utils::format_bytes;
use colored::*;
use indicatif::{ProgressBar, ProgressStyle};
use raidvod_core::progress::ProgressUpdate;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tokio::sync::mpsc;

const UPLOAD_TEMPLATE: &str = "{msg}\n{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] \
     {percent}% | {bytes}/{total_bytes} | {bytes_per_sec} | ETA: {eta}";

/// Render progress updates until every sender is gone
pub async fn render_progress(mut rx: mpsc::Receiver<ProgressUpdate>) {
    let mut renderer = ProgressRenderer::new();

    while let Some(update) = rx.recv().await {
        renderer.handle_update(update);
    }

    renderer.finish();
}

/// One bar per file being uploaded
pub struct ProgressRenderer {
    upload_bars: HashMap<PathBuf, ProgressBar>,
}

impl ProgressRenderer {
    pub fn new() -> Self {
        Self {
            upload_bars: HashMap::new(),
        }
    }

    pub fn handle_update(&mut self, update: ProgressUpdate) {
        match update {
            ProgressUpdate::UploadProgress {
                path,
                bytes_sent,
                total_bytes,
            } => self.update_upload(path, bytes_sent, total_bytes),
            ProgressUpdate::Status { message } => show_status(&message),
        }
    }

    /// Bars still being drawn
    pub fn active_bars(&self) -> usize {
        self.upload_bars.len()
    }

    fn update_upload(&mut self, path: PathBuf, bytes_sent: u64, total_bytes: u64) {
        let pb = self
            .upload_bars
            .entry(path.clone())
            .or_insert_with(|| new_upload_bar(&path, total_bytes));
        pb.set_position(bytes_sent);

        if bytes_sent >= total_bytes {
            pb.finish_with_message(format!(
                "{} {} ({})",
                "✓ Uploaded".green(),
                display_name(&path).cyan(),
                format_bytes(total_bytes)
            ));
            self.upload_bars.remove(&path);
        }
    }

    /// Leave interrupted uploads visibly unfinished
    pub fn finish(self) {
        for (_, pb) in self.upload_bars {
            pb.abandon_with_message("✗ Upload interrupted".yellow().to_string());
        }
    }
}

impl Default for ProgressRenderer {
    fn default() -> Self {
        Self::new()
    }
}

fn new_upload_bar(path: &Path, total_bytes: u64) -> ProgressBar {
    let pb = ProgressBar::new(total_bytes);
    if let Ok(style) = ProgressStyle::default_bar().template(UPLOAD_TEMPLATE) {
        pb.set_style(style.progress_chars("#>-"));
    }
    pb.set_message(format!(
        "{}: {}",
        "Uploading".bold(),
        display_name(path).cyan()
    ));
    pb
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

fn show_status(message: &str) {
    eprintln!("{} {}", "→".green(), message);
}
