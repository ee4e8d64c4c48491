//! Upload gateway contract and its YouTube implementation
//!
//! The orchestrator only sees [`UploadGateway`]: hand it a file and its
//! metadata, get back the id the host assigned. Chunking, authentication
//! and progress reporting live behind that call. A failed chunk fails the
//! whole upload; nothing is retried here.

pub mod oauth;
mod youtube;

pub use oauth::{
    AccessTokenSource, AuthorizationResponse, ClientSecrets, OAuthClient, StaticToken, StoredToken,
    parse_redirect,
};
pub use youtube::{CHUNK_GRANULARITY, DEFAULT_CHUNK_SIZE, UPLOAD_ENDPOINT, YouTubeUploader};

use crate::Result;
use crate::metadata::VideoMetadata;
use crate::progress::ProgressProvider;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Identifier the video host assigned to an upload
pub type VideoId = String;

/// Default YouTube category for uploads
pub const DEFAULT_CATEGORY_ID: &str = "22";

/// Who can watch the uploaded video
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Visibility {
    Public,
    #[default]
    Private,
    Unlisted,
}

impl Visibility {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Public => "public",
            Self::Private => "private",
            Self::Unlisted => "unlisted",
        }
    }
}

impl fmt::Display for Visibility {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Visibility {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "public" => Ok(Self::Public),
            "private" => Ok(Self::Private),
            "unlisted" => Ok(Self::Unlisted),
            other => Err(format!(
                "unknown visibility '{other}' (expected public, private or unlisted)"
            )),
        }
    }
}

/// Everything needed to upload one recording
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadRequest {
    pub file_path: PathBuf,
    pub title: String,
    pub description: String,
    pub tags: Vec<String>,
    pub visibility: Visibility,
    pub category_id: String,
}

impl UploadRequest {
    pub fn from_metadata(
        file_path: &Path,
        metadata: &VideoMetadata,
        visibility: Visibility,
        category_id: &str,
    ) -> Self {
        Self {
            file_path: file_path.to_path_buf(),
            title: metadata.title.clone(),
            description: metadata.description.clone(),
            tags: metadata.tags.clone(),
            visibility,
            category_id: category_id.to_string(),
        }
    }
}

/// The video host
#[async_trait]
pub trait UploadGateway: Send + Sync {
    /// Upload a recording, reporting progress as chunks are accepted
    async fn upload(
        &self,
        request: &UploadRequest,
        progress: &dyn ProgressProvider,
    ) -> Result<VideoId>;
}
