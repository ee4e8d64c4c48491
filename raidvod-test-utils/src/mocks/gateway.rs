//! Mock upload gateway

use async_trait::async_trait;
use raidvod_core::error::UploadError;
use raidvod_core::progress::{ProgressProvider, ProgressUpdate};
use raidvod_core::upload::{UploadGateway, UploadRequest, VideoId};
use raidvod_core::Result;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

/// Upload gateway that records requests instead of uploading
///
/// Successful uploads return ids `mock-video-1`, `mock-video-2`, ... and
/// report a half-way and a final progress update. Clones share state.
#[derive(Clone, Default)]
pub struct MockUploadGateway {
    state: Arc<Mutex<GatewayState>>,
}

#[derive(Default)]
struct GatewayState {
    requests: Vec<UploadRequest>,
    failing_paths: Vec<(PathBuf, u16)>,
    fail_all: Option<u16>,
    hang: bool,
    uploaded: usize,
}

impl MockUploadGateway {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail every upload with the given HTTP status
    pub fn fail_with_status(&self, status: u16) {
        self.state.lock().unwrap().fail_all = Some(status);
    }

    /// Fail uploads of one file with the given HTTP status
    pub fn fail_for(&self, path: &Path, status: u16) {
        self.state
            .lock()
            .unwrap()
            .failing_paths
            .push((path.to_path_buf(), status));
    }

    /// Never finish any upload; useful to test cancellation mid-upload
    pub fn hang_forever(&self) {
        self.state.lock().unwrap().hang = true;
    }

    /// Every request received, including failed ones
    pub fn requests(&self) -> Vec<UploadRequest> {
        self.state.lock().unwrap().requests.clone()
    }

    /// Paths of every request received, in order
    pub fn uploaded_paths(&self) -> Vec<PathBuf> {
        self.requests()
            .into_iter()
            .map(|request| request.file_path)
            .collect()
    }

    /// Number of uploads that succeeded
    pub fn success_count(&self) -> usize {
        self.state.lock().unwrap().uploaded
    }
}

#[async_trait]
impl UploadGateway for MockUploadGateway {
    async fn upload(
        &self,
        request: &UploadRequest,
        progress: &dyn ProgressProvider,
    ) -> Result<VideoId> {
        let hang = {
            let mut state = self.state.lock().unwrap();
            state.requests.push(request.clone());

            let failure = state.fail_all.or_else(|| {
                state
                    .failing_paths
                    .iter()
                    .find(|(path, _)| path == &request.file_path)
                    .map(|(_, status)| *status)
            });
            if let Some(status) = failure {
                return Err(UploadError::server(status, "mock upload failure").into());
            }
            state.hang
        };

        if hang {
            std::future::pending::<()>().await;
        }

        for bytes_sent in [50, 100] {
            progress.report(ProgressUpdate::UploadProgress {
                path: request.file_path.clone(),
                bytes_sent,
                total_bytes: 100,
            });
        }
        progress.complete();

        let mut state = self.state.lock().unwrap();
        state.uploaded += 1;
        Ok(format!("mock-video-{}", state.uploaded))
    }
}
