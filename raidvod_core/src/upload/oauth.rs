//! OAuth 2.0 installed-application flow for the YouTube Data API
//!
//! Client secrets come from the JSON file Google's console hands out. The
//! token is persisted as JSON next to it and refreshed transparently once it
//! is within a minute of expiring.

use crate::error::{IoError, UploadError, ValidationError};
use crate::{Error, Result};
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;

/// Permission to upload videos, nothing else
pub const UPLOAD_SCOPE: &str = "https://www.googleapis.com/auth/youtube.upload";

const DEFAULT_AUTH_URI: &str = "https://accounts.google.com/o/oauth2/auth";
const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";
const REVOKE_URI: &str = "https://oauth2.googleapis.com/revoke";

/// Refresh this long before the reported expiry
const EXPIRY_SKEW_SECS: i64 = 60;

/// Something that can hand out a bearer token
#[async_trait]
pub trait AccessTokenSource: Send + Sync {
    async fn access_token(&self) -> Result<String>;
}

/// A fixed bearer token
#[derive(Debug, Clone)]
pub struct StaticToken(pub String);

#[async_trait]
impl AccessTokenSource for StaticToken {
    async fn access_token(&self) -> Result<String> {
        Ok(self.0.clone())
    }
}

fn default_auth_uri() -> String {
    DEFAULT_AUTH_URI.to_string()
}

fn default_token_uri() -> String {
    DEFAULT_TOKEN_URI.to_string()
}

/// OAuth client registration
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ClientSecrets {
    pub client_id: String,
    pub client_secret: String,
    #[serde(default = "default_auth_uri")]
    pub auth_uri: String,
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
}

#[derive(Deserialize)]
struct ClientSecretsFile {
    installed: Option<ClientSecrets>,
    web: Option<ClientSecrets>,
}

impl ClientSecrets {
    /// Parse a client secrets document (`installed` or `web` application)
    pub fn from_json(json: &str) -> Result<Self> {
        let file: ClientSecretsFile = serde_json::from_str(json).map_err(|e| {
            ValidationError::invalid_configuration(&format!("Invalid client secrets file: {e}"))
        })?;
        file.installed
            .or(file.web)
            .ok_or_else(|| ValidationError::missing_field("installed").into())
    }

    pub async fn load(path: &Path) -> Result<Self> {
        let json = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| IoError::from_std(e).with_path(path))?;
        Self::from_json(&json)
    }
}

/// Persisted credentials
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredToken {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    pub expires_at: DateTime<Utc>,
    #[serde(default)]
    pub scope: Option<String>,
    pub token_type: String,
}

impl StoredToken {
    /// Whether the token is expired or about to be at `now`
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now + Duration::seconds(EXPIRY_SKEW_SECS) >= self.expires_at
    }

    /// Read a token file; a missing file is `Ok(None)`
    pub async fn load(path: &Path) -> Result<Option<Self>> {
        match tokio::fs::read_to_string(path).await {
            Ok(json) => serde_json::from_str(&json).map(Some).map_err(|e| {
                UploadError::auth(format!("Unreadable token file {}: {e}", path.display())).into()
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(IoError::from_std(e).with_path(path).into()),
        }
    }

    pub async fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| IoError::from_std(e).with_path(parent))?;
        }
        let json = serde_json::to_string_pretty(self)
            .map_err(|e| UploadError::malformed(e.to_string()))?;
        tokio::fs::write(path, json)
            .await
            .map_err(|e| IoError::from_std(e).with_path(path))?;
        Ok(())
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: i64,
    #[serde(default)]
    refresh_token: Option<String>,
    #[serde(default)]
    scope: Option<String>,
    token_type: String,
}

#[derive(Debug, Deserialize)]
struct TokenErrorResponse {
    error: String,
    #[serde(default)]
    error_description: Option<String>,
}

impl TokenResponse {
    fn into_stored(self, previous_refresh: Option<String>) -> StoredToken {
        StoredToken {
            access_token: self.access_token,
            refresh_token: self.refresh_token.or(previous_refresh),
            expires_at: Utc::now() + Duration::seconds(self.expires_in),
            scope: self.scope,
            token_type: self.token_type,
        }
    }
}

/// Token lifecycle for one client registration and token file
pub struct OAuthClient {
    secrets: ClientSecrets,
    token_path: PathBuf,
    http: reqwest::Client,
    cached: Mutex<Option<StoredToken>>,
}

impl OAuthClient {
    pub fn new(secrets: ClientSecrets, token_path: PathBuf) -> Self {
        Self {
            secrets,
            token_path,
            http: reqwest::Client::new(),
            cached: Mutex::new(None),
        }
    }

    pub fn token_path(&self) -> &Path {
        &self.token_path
    }

    /// Consent page URL for the upload scope
    pub fn authorization_url(&self, redirect_uri: &str, state: &str) -> Result<String> {
        let url = reqwest::Url::parse_with_params(
            &self.secrets.auth_uri,
            &[
                ("client_id", self.secrets.client_id.as_str()),
                ("redirect_uri", redirect_uri),
                ("response_type", "code"),
                ("scope", UPLOAD_SCOPE),
                ("access_type", "offline"),
                ("prompt", "consent"),
                ("state", state),
            ],
        )
        .map_err(|e| {
            ValidationError::invalid_configuration(&format!(
                "Invalid auth_uri '{}': {e}",
                self.secrets.auth_uri
            ))
        })?;
        Ok(url.into())
    }

    /// Trade an authorization code for tokens and persist them
    pub async fn exchange_code(&self, code: &str, redirect_uri: &str) -> Result<StoredToken> {
        let form = [
            ("code", code),
            ("client_id", self.secrets.client_id.as_str()),
            ("client_secret", self.secrets.client_secret.as_str()),
            ("redirect_uri", redirect_uri),
            ("grant_type", "authorization_code"),
        ];
        let token = self.request_token(&form).await?.into_stored(None);
        self.store(token.clone()).await?;
        log::info!("Saved credentials to {}", self.token_path.display());
        Ok(token)
    }

    /// Exchange the refresh token for a new access token and persist it
    pub async fn refresh(&self, token: &StoredToken) -> Result<StoredToken> {
        let refresh_token = token
            .refresh_token
            .as_deref()
            .ok_or_else(|| UploadError::auth("token expired and has no refresh token"))?;
        let form = [
            ("refresh_token", refresh_token),
            ("client_id", self.secrets.client_id.as_str()),
            ("client_secret", self.secrets.client_secret.as_str()),
            ("grant_type", "refresh_token"),
        ];
        log::debug!("Refreshing access token");
        let refreshed = self
            .request_token(&form)
            .await?
            .into_stored(token.refresh_token.clone());
        self.store(refreshed.clone()).await?;
        Ok(refreshed)
    }

    /// Current credentials, if any were saved
    pub async fn stored_token(&self) -> Result<Option<StoredToken>> {
        let mut cached = self.cached.lock().await;
        if cached.is_none() {
            *cached = StoredToken::load(&self.token_path).await?;
        }
        Ok(cached.clone())
    }

    /// Revoke the saved token and delete the token file
    ///
    /// Returns `false` when there was nothing to revoke.
    pub async fn revoke(&self) -> Result<bool> {
        let Some(token) = self.stored_token().await? else {
            return Ok(false);
        };
        let revoked = token.refresh_token.as_deref().unwrap_or(&token.access_token);

        let response = self
            .http
            .post(REVOKE_URI)
            .form(&[("token", revoked)])
            .send()
            .await
            .map_err(UploadError::from)?;
        if !response.status().is_success() {
            // Already revoked or expired tokens are rejected; the local copy goes either way
            log::warn!("Token revocation returned HTTP {}", response.status());
        }

        *self.cached.lock().await = None;
        match tokio::fs::remove_file(&self.token_path).await {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(IoError::from_std(e).with_path(&self.token_path).into()),
        }
        Ok(true)
    }

    async fn store(&self, token: StoredToken) -> Result<()> {
        token.save(&self.token_path).await?;
        *self.cached.lock().await = Some(token);
        Ok(())
    }

    async fn request_token(&self, form: &[(&str, &str)]) -> Result<TokenResponse> {
        let response = self
            .http
            .post(&self.secrets.token_uri)
            .form(form)
            .send()
            .await
            .map_err(UploadError::from)?;

        let status = response.status();
        let body = response.text().await.map_err(UploadError::from)?;
        if !status.is_success() {
            let message = match serde_json::from_str::<TokenErrorResponse>(&body) {
                Ok(err) => match err.error_description {
                    Some(description) => format!("{}: {description}", err.error),
                    None => err.error,
                },
                Err(_) => format!("HTTP {status}: {body}"),
            };
            return Err(UploadError::auth(message).into());
        }

        serde_json::from_str(&body)
            .map_err(|e| Error::from(UploadError::malformed(format!("token response: {e}"))))
    }
}

/// What the consent page sent back to the redirect URI
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthorizationResponse {
    pub code: String,
    pub state: Option<String>,
}

/// Read the redirect's request target, e.g. `/?code=4/0A..&state=xyz`
pub fn parse_redirect(target: &str) -> Result<AuthorizationResponse> {
    let url = reqwest::Url::parse("http://127.0.0.1")
        .and_then(|base| base.join(target))
        .map_err(|e| UploadError::malformed(format!("redirect target '{target}': {e}")))?;

    let mut code = None;
    let mut state = None;
    for (key, value) in url.query_pairs() {
        match key.as_ref() {
            "code" => code = Some(value.into_owned()),
            "state" => state = Some(value.into_owned()),
            "error" => {
                return Err(UploadError::auth(format!("authorization denied: {value}")).into());
            }
            _ => {}
        }
    }

    let code = code.ok_or_else(|| UploadError::auth("redirect carried no authorization code"))?;
    Ok(AuthorizationResponse { code, state })
}

#[async_trait]
impl AccessTokenSource for OAuthClient {
    async fn access_token(&self) -> Result<String> {
        let token = self.stored_token().await?.ok_or_else(|| {
            UploadError::auth("not authenticated, run `raidvod auth login` first")
        })?;

        if token.is_expired(Utc::now()) {
            Ok(self.refresh(&token).await?.access_token)
        } else {
            Ok(token.access_token)
        }
    }
}
