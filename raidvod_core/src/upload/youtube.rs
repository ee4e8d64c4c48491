//! Resumable uploads to the YouTube Data API v3
//!
//! A session is opened with the video resource as JSON, then the file is
//! sent in chunks. The server answers `308` with the bytes it has so far
//! until the last chunk, which is answered with the created video.

use super::{AccessTokenSource, UploadGateway, UploadRequest, VideoId};
use crate::error::{IoError, UploadError, ValidationError};
use crate::progress::{ProgressProvider, ProgressUpdate};
use crate::Result;
use async_trait::async_trait;
use reqwest::StatusCode;
use reqwest::header::{CONTENT_RANGE, LOCATION, RANGE};
use serde::Deserialize;
use serde_json::json;
use std::io::SeekFrom;
use std::path::Path;
use std::sync::Arc;
use tokio::io::{AsyncReadExt, AsyncSeekExt};

/// Videos insert endpoint for media uploads
pub const UPLOAD_ENDPOINT: &str = "https://www.googleapis.com/upload/youtube/v3/videos";

/// Chunk sizes must be a multiple of this
pub const CHUNK_GRANULARITY: usize = 256 * 1024;

/// 8 MiB
pub const DEFAULT_CHUNK_SIZE: usize = 32 * CHUNK_GRANULARITY;

#[derive(Debug, Deserialize)]
struct InsertedVideo {
    id: String,
}

/// [`UploadGateway`] for YouTube
pub struct YouTubeUploader {
    http: reqwest::Client,
    tokens: Arc<dyn AccessTokenSource>,
    endpoint: String,
    chunk_size: usize,
}

impl YouTubeUploader {
    pub fn new(tokens: Arc<dyn AccessTokenSource>) -> Self {
        // 308 means "resume incomplete" here, never a redirect to follow
        let http = reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .unwrap_or_default();
        Self {
            http,
            tokens,
            endpoint: UPLOAD_ENDPOINT.to_string(),
            chunk_size: DEFAULT_CHUNK_SIZE,
        }
    }

    /// Point the uploader at a different host
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    /// Set the chunk size, a non-zero multiple of [`CHUNK_GRANULARITY`]
    pub fn with_chunk_size(mut self, chunk_size: usize) -> Result<Self> {
        if chunk_size == 0 || chunk_size % CHUNK_GRANULARITY != 0 {
            return Err(ValidationError::invalid_parameter(
                "chunk_size",
                &format!("must be a non-zero multiple of {CHUNK_GRANULARITY} bytes"),
            )
            .into());
        }
        self.chunk_size = chunk_size;
        Ok(self)
    }

    async fn open_session(
        &self,
        request: &UploadRequest,
        total_bytes: u64,
        token: &str,
    ) -> Result<String> {
        let response = self
            .http
            .post(&self.endpoint)
            .query(&[("uploadType", "resumable"), ("part", "snippet,status")])
            .bearer_auth(token)
            .header("X-Upload-Content-Length", total_bytes)
            .header("X-Upload-Content-Type", content_type(&request.file_path))
            .json(&video_resource(request))
            .send()
            .await
            .map_err(UploadError::from)?;

        let status = response.status();
        if !status.is_success() {
            return Err(error_for(status, response).await.into());
        }

        response
            .headers()
            .get(LOCATION)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
            .ok_or_else(|| UploadError::MissingSessionUri.into())
    }
}

#[async_trait]
impl UploadGateway for YouTubeUploader {
    async fn upload(
        &self,
        request: &UploadRequest,
        progress: &dyn ProgressProvider,
    ) -> Result<VideoId> {
        let path = request.file_path.as_path();
        let mut file = tokio::fs::File::open(path)
            .await
            .map_err(|e| io_error(e, path))?;
        let total_bytes = file.metadata().await.map_err(|e| io_error(e, path))?.len();
        if total_bytes == 0 {
            return Err(ValidationError::invalid_parameter(
                "file_path",
                &format!("{} is empty", path.display()),
            )
            .into());
        }

        let token = self.tokens.access_token().await?;
        let session = self.open_session(request, total_bytes, &token).await?;
        log::debug!("Opened upload session for {}", path.display());

        let mut offset = 0u64;
        loop {
            let len = (self.chunk_size as u64).min(total_bytes - offset);
            let mut chunk = vec![0u8; len as usize];
            file.seek(SeekFrom::Start(offset))
                .await
                .map_err(|e| io_error(e, path))?;
            file.read_exact(&mut chunk)
                .await
                .map_err(|e| io_error(e, path))?;

            let response = self
                .http
                .put(&session)
                .bearer_auth(&token)
                .header(CONTENT_RANGE, content_range(offset, len, total_bytes))
                .body(chunk)
                .send()
                .await
                .map_err(UploadError::from)?;

            let status = response.status();
            match status.as_u16() {
                200 | 201 => {
                    let video: InsertedVideo = response
                        .json()
                        .await
                        .map_err(|e| UploadError::malformed(format!("upload response: {e}")))?;
                    report(progress, path, total_bytes, total_bytes);
                    progress.complete();
                    return Ok(video.id);
                }
                308 => {
                    let next = response
                        .headers()
                        .get(RANGE)
                        .and_then(|v| v.to_str().ok())
                        .map_or(Some(0), next_offset)
                        .ok_or_else(|| UploadError::malformed("unparseable Range header"))?;
                    if next <= offset || next > total_bytes {
                        return Err(UploadError::malformed(format!(
                            "server acknowledged {next} of {total_bytes} bytes after sending from {offset}"
                        ))
                        .into());
                    }
                    offset = next;
                    report(progress, path, offset, total_bytes);
                }
                _ => return Err(error_for(status, response).await.into()),
            }
        }
    }
}

fn io_error(e: std::io::Error, path: &Path) -> crate::Error {
    IoError::from_std(e).with_path(path).into()
}

fn report(progress: &dyn ProgressProvider, path: &Path, bytes_sent: u64, total_bytes: u64) {
    progress.report(ProgressUpdate::UploadProgress {
        path: path.to_path_buf(),
        bytes_sent,
        total_bytes,
    });
}

async fn error_for(status: StatusCode, response: reqwest::Response) -> UploadError {
    let body = response.text().await.unwrap_or_default();
    if status == StatusCode::UNAUTHORIZED {
        UploadError::auth(format!("upload rejected the access token: {body}"))
    } else {
        UploadError::server(status.as_u16(), &body)
    }
}

fn video_resource(request: &UploadRequest) -> serde_json::Value {
    json!({
        "snippet": {
            "title": request.title,
            "description": request.description,
            "tags": request.tags,
            "categoryId": request.category_id,
        },
        "status": {
            "privacyStatus": request.visibility.as_str(),
        },
    })
}

fn content_type(path: &Path) -> &'static str {
    match path
        .extension()
        .map(|e| e.to_string_lossy().to_ascii_lowercase())
        .as_deref()
    {
        Some("mp4") => "video/mp4",
        Some("mkv") => "video/x-matroska",
        Some("webm") => "video/webm",
        Some("mov") => "video/quicktime",
        Some("avi") => "video/x-msvideo",
        Some("flv") => "video/x-flv",
        _ => "application/octet-stream",
    }
}

fn content_range(offset: u64, len: u64, total_bytes: u64) -> String {
    format!("bytes {offset}-{}/{total_bytes}", offset + len - 1)
}

/// Offset to continue from given a `Range: bytes=0-N` header
fn next_offset(range: &str) -> Option<u64> {
    let (_, last) = range.trim().strip_prefix("bytes=")?.split_once('-')?;
    last.trim().parse::<u64>().ok().map(|n| n + 1)
}
