//! Authentication commands
//!
//! `login` runs the OAuth installed-app flow against a loopback redirect,
//! `status` reports the saved token and `logout` revokes and deletes it.

use crate::config::AppConfig;
use crate::terminal;
use anyhow::{Context, Result};
use axum::Router;
use axum::extract::State;
use axum::http::{StatusCode, Uri};
use axum::routing::get;
use colored::Colorize;
use dialoguer::Confirm;
use rand::Rng;
use rand::distr::Alphanumeric;
use raidvod_core::upload::{ClientSecrets, OAuthClient, StoredToken, parse_redirect};
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::{mpsc, oneshot};

/// How long to wait for the browser to come back
const LOGIN_TIMEOUT: Duration = Duration::from_secs(300);

/// How long the callback server may take to finish its last response
const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(5);

const STATE_LEN: usize = 32;

const CALLBACK_PAGE: &str = "raidvod is authorized. You can close this window.";

/// OAuth client for the configured secrets and token files
pub async fn oauth_client(config: &AppConfig) -> Result<OAuthClient> {
    let secrets_path = config.client_secrets_path();
    let secrets = ClientSecrets::load(&secrets_path).await.with_context(|| {
        format!(
            "Failed to read OAuth client secrets; download them from the Google Cloud \
             console and save them as {}",
            secrets_path.display()
        )
    })?;
    Ok(OAuthClient::new(secrets, config.token_path()))
}

/// Authorize uploads and save the token
pub async fn login(config: &AppConfig) -> Result<()> {
    let client = oauth_client(config).await?;

    if client.stored_token().await?.is_some() {
        let again = Confirm::new()
            .with_prompt("Already authenticated. Sign in again?")
            .default(false)
            .interact()
            .context("Failed to read input")?;
        if !again {
            return Ok(());
        }
    }

    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .context("Failed to open a local port for the OAuth redirect")?;
    let redirect_uri = format!("http://{}", listener.local_addr()?);
    let state = login_state();
    let url = client.authorization_url(&redirect_uri, &state)?;

    println!("{}", "YouTube Authorization".bold());
    println!("Open this page and allow raidvod to upload videos:");
    println!();
    println!("  {}", terminal::hyperlink_with_fallback(&url, &url));
    println!();
    println!("Waiting for the browser to return...");

    let target = tokio::time::timeout(LOGIN_TIMEOUT, accept_redirect(listener))
        .await
        .context("Timed out waiting for the authorization redirect")??;

    let response = parse_redirect(&target)?;
    if response.state.as_deref() != Some(state.as_str()) {
        anyhow::bail!("Authorization response did not match this login attempt");
    }

    client
        .exchange_code(&response.code, &redirect_uri)
        .await
        .context("Failed to exchange the authorization code")?;

    println!();
    println!("{}", "✓ Authorized".green());
    println!("Token saved to {}", client.token_path().display());

    Ok(())
}

/// Serve the loopback redirect until the authorization response arrives
///
/// Returns the path and query of that request.
async fn accept_redirect(listener: TcpListener) -> Result<String> {
    let (target_tx, mut target_rx) = mpsc::channel::<String>(1);
    let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();

    let app = Router::new()
        .route("/", get(redirect_callback))
        .with_state(target_tx);
    let server = tokio::spawn(async move {
        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = shutdown_rx.await;
            })
            .await
    });

    let target = target_rx.recv().await;
    let _ = shutdown_tx.send(());
    match tokio::time::timeout(SHUTDOWN_TIMEOUT, server).await {
        Ok(Ok(Err(e))) => log::warn!("OAuth redirect server failed: {e}"),
        Ok(Err(e)) => log::warn!("OAuth redirect server task failed: {e}"),
        Err(_) => log::debug!("OAuth redirect server did not stop in time"),
        Ok(Ok(Ok(()))) => {}
    }

    target.context("OAuth redirect server stopped before the browser returned")
}

async fn redirect_callback(
    State(target_tx): State<mpsc::Sender<String>>,
    uri: Uri,
) -> (StatusCode, &'static str) {
    let query = uri.query().unwrap_or_default();
    if !query.contains("code=") && !query.contains("error=") {
        return (StatusCode::BAD_REQUEST, "Missing authorization response");
    }

    let target = uri
        .path_and_query()
        .map(|pq| pq.as_str().to_string())
        .unwrap_or_default();
    log::debug!("OAuth redirect received");
    if target_tx.try_send(target).is_err() {
        log::debug!("Ignoring repeated OAuth redirect");
    }
    (StatusCode::OK, CALLBACK_PAGE)
}

/// Random value tying the redirect to this login attempt
fn login_state() -> String {
    rand::rng()
        .sample_iter(&Alphanumeric)
        .take(STATE_LEN)
        .map(char::from)
        .collect()
}

/// Show whether a token is saved and when it expires
pub async fn status(config: &AppConfig) -> Result<()> {
    let token_path = config.token_path();
    match StoredToken::load(&token_path).await? {
        Some(token) => {
            println!("{}", "Authenticated".green());
            println!("  Token file:  {}", token_path.display());
            println!(
                "  Expires at:  {}",
                token.expires_at.format("%Y-%m-%d %H:%M:%S UTC")
            );
            let refreshable = if token.refresh_token.is_some() {
                "yes"
            } else {
                "no"
            };
            println!("  Refreshable: {refreshable}");
        }
        None => {
            println!("Not authenticated.");
            println!("Use 'raidvod auth login' to authorize uploads.");
        }
    }
    Ok(())
}

/// Revoke the saved token and remove it
pub async fn logout(config: &AppConfig) -> Result<()> {
    if StoredToken::load(&config.token_path()).await?.is_none() {
        println!("No stored credentials found.");
        return Ok(());
    }

    let client = oauth_client(config).await?;
    if client.revoke().await.context("Failed to revoke the token")? {
        println!("✓ Revoked and removed {}", client.token_path().display());
    } else {
        println!("No stored credentials found.");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_login_state_is_random_alphanumeric() {
        let first = login_state();
        let second = login_state();

        assert_eq!(first.len(), STATE_LEN);
        assert_eq!(second.len(), STATE_LEN);
        assert!(first.chars().all(|c| c.is_ascii_alphanumeric()));
        assert_ne!(first, second);
    }

    #[tokio::test]
    async fn test_accept_redirect_skips_favicon() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let base = format!("http://{}", listener.local_addr().unwrap());
        let server = tokio::spawn(accept_redirect(listener));

        let client = reqwest::Client::new();
        let favicon = client
            .get(format!("{base}/favicon.ico"))
            .send()
            .await
            .unwrap();
        assert_eq!(favicon.status(), reqwest::StatusCode::NOT_FOUND);

        let bare = client.get(format!("{base}/")).send().await.unwrap();
        assert_eq!(bare.status(), reqwest::StatusCode::BAD_REQUEST);

        let redirect = client
            .get(format!("{base}/?code=abc&state=s1"))
            .send()
            .await
            .unwrap();
        assert_eq!(redirect.status(), reqwest::StatusCode::OK);
        assert!(redirect.text().await.unwrap().contains("authorized"));

        let target = server.await.unwrap().unwrap();
        assert_eq!(target, "/?code=abc&state=s1");
    }
}
