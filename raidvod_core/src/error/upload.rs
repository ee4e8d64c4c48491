//! Upload gateway error types

use thiserror::Error;

/// Errors raised while uploading a recording to the video host
#[derive(Error, Debug)]
pub enum UploadError {
    /// Missing, expired or rejected credentials
    #[error("Authentication failed: {message}")]
    Auth { message: String },

    /// Connection, TLS or timeout failure
    #[error("Transport error: {message}")]
    Transport { message: String },

    /// The host answered with an unexpected status
    #[error("Upload rejected with HTTP {status}: {message}")]
    Server { status: u16, message: String },

    /// The resumable session was not opened
    #[error("Upload session URI missing from response")]
    MissingSessionUri,

    /// The host answered with something we could not parse
    #[error("Malformed response: {message}")]
    MalformedResponse { message: String },
}

impl UploadError {
    /// Create an authentication error
    pub fn auth(message: impl Into<String>) -> Self {
        Self::Auth {
            message: message.into(),
        }
    }

    /// Create a server error with status code and body
    pub fn server(status: u16, message: &str) -> Self {
        Self::Server {
            status,
            message: message.to_string(),
        }
    }

    /// Create a malformed response error
    pub fn malformed(message: impl Into<String>) -> Self {
        Self::MalformedResponse {
            message: message.into(),
        }
    }

    /// Quota or permission problems will not go away on the next poll pass
    pub fn is_permanent(&self) -> bool {
        match self {
            Self::Auth { .. } => true,
            Self::Server { status, .. } => matches!(status, 400..=499),
            _ => false,
        }
    }
}

impl From<reqwest::Error> for UploadError {
    fn from(err: reqwest::Error) -> Self {
        if let Some(status) = err.status() {
            Self::server(status.as_u16(), &err.to_string())
        } else if err.is_decode() {
            Self::malformed(err.to_string())
        } else {
            Self::Transport {
                message: err.to_string(),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_server_error() {
        let error = UploadError::server(503, "backendError");
        assert!(error.to_string().contains("503"));
        assert!(error.to_string().contains("backendError"));
        assert!(!error.is_permanent());
    }

    #[test]
    fn test_permanent_errors() {
        assert!(UploadError::server(403, "quotaExceeded").is_permanent());
        assert!(UploadError::auth("token revoked").is_permanent());
        assert!(!UploadError::MissingSessionUri.is_permanent());
    }
}
