//! Channel-backed [`ProgressProvider`] for the CLI
//!
//! Bridges the core library's progress reports to the renderer task.

use raidvod_core::progress::{ProgressProvider, ProgressUpdate};
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;

/// Sends progress updates to a separate rendering task
///
/// The renderer exits once every provider sharing the channel has
/// completed, so the watch loop hands each upload a child and completes the
/// root only at shutdown.
pub struct ChannelProvider {
    tx: Mutex<Option<mpsc::Sender<ProgressUpdate>>>,
    name: Option<String>,
}

impl ChannelProvider {
    pub fn new(tx: mpsc::Sender<ProgressUpdate>) -> Self {
        Self {
            tx: Mutex::new(Some(tx)),
            name: None,
        }
    }

    pub fn with_name(tx: mpsc::Sender<ProgressUpdate>, name: String) -> Self {
        Self {
            tx: Mutex::new(Some(tx)),
            name: Some(name),
        }
    }

    fn sender(&self) -> Option<mpsc::Sender<ProgressUpdate>> {
        self.tx.lock().ok().and_then(|guard| guard.clone())
    }
}

impl ProgressProvider for ChannelProvider {
    fn report(&self, update: ProgressUpdate) {
        let update = match (&self.name, update) {
            (Some(name), ProgressUpdate::Status { message }) => ProgressUpdate::Status {
                message: format!("[{name}] {message}"),
            },
            (_, other) => other,
        };

        // Never block the upload on a slow or finished renderer
        if let Some(tx) = self.sender() {
            let _ = tx.try_send(update);
        }
    }

    fn create_child(&self, name: &str) -> Box<dyn ProgressProvider> {
        let child_name = match &self.name {
            Some(parent_name) => format!("{parent_name}/{name}"),
            None => name.to_string(),
        };
        match self.sender() {
            Some(tx) => Box::new(ChannelProvider::with_name(tx, child_name)),
            None => Box::new(ChannelProvider {
                tx: Mutex::new(None),
                name: Some(child_name),
            }),
        }
    }

    fn complete(&self) {
        if let Ok(mut guard) = self.tx.lock() {
            *guard = None;
        }
    }
}

/// Create a provider and the receiving end for [`render_progress`](super::render_progress)
pub fn create_progress_infrastructure()
-> (Arc<dyn ProgressProvider>, mpsc::Receiver<ProgressUpdate>) {
    let (tx, rx) = mpsc::channel(100);
    let provider = Arc::new(ChannelProvider::new(tx)) as Arc<dyn ProgressProvider>;
    (provider, rx)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[tokio::test]
    async fn test_child_prefixes_status_and_completes_independently() {
        let (provider, mut rx) = create_progress_infrastructure();
        let child = provider.create_child("kill.mp4");

        child.report(ProgressUpdate::Status {
            message: "Uploading".to_string(),
        });
        child.complete();
        child.report(ProgressUpdate::Status {
            message: "dropped".to_string(),
        });
        provider.report(ProgressUpdate::UploadProgress {
            path: PathBuf::from("kill.mp4"),
            bytes_sent: 1,
            total_bytes: 2,
        });
        provider.complete();

        let mut received = Vec::new();
        while let Some(update) = rx.recv().await {
            received.push(update);
        }

        assert_eq!(received.len(), 2);
        assert!(matches!(
            &received[0],
            ProgressUpdate::Status { message } if message == "[kill.mp4] Uploading"
        ));
    }
}
