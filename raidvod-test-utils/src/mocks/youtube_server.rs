//! Loopback server speaking the resumable upload protocol
//!
//! `POST` on the upload path opens a session and answers with its
//! `Location`; `PUT` on the session persists a chunk and answers `308` with
//! the persisted `Range`, or `200` with the video resource once complete.

use axum::Router;
use axum::body::Bytes;
use axum::extract::{DefaultBodyLimit, State};
use axum::http::{HeaderMap, Method, StatusCode, Uri, header};
use axum::response::{IntoResponse, Response};
use axum::routing::{post, put};
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

const UPLOAD_PATH: &str = "/upload/youtube/v3/videos";
const SESSION_PATH: &str = "/session/1";

/// A request the server received
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub method: String,
    pub target: String,
    pub headers: Vec<(String, String)>,
    pub body_len: usize,
}

impl RecordedRequest {
    fn new(method: Method, uri: &Uri, headers: &HeaderMap, body: &[u8]) -> Self {
        Self {
            method: method.to_string(),
            target: uri
                .path_and_query()
                .map(|pq| pq.as_str().to_string())
                .unwrap_or_else(|| uri.path().to_string()),
            headers: headers
                .iter()
                .map(|(name, value)| {
                    (
                        name.as_str().to_string(),
                        value.to_str().unwrap_or_default().to_string(),
                    )
                })
                .collect(),
            body_len: body.len(),
        }
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }
}

#[derive(Default)]
struct ServerState {
    requests: Vec<RecordedRequest>,
    video_resource: Option<serde_json::Value>,
    received: Vec<u8>,
    chunk_failure: Option<u16>,
    omit_location: bool,
    accept_limit: Option<usize>,
}

#[derive(Clone)]
struct AppState {
    addr: SocketAddr,
    inner: Arc<Mutex<ServerState>>,
}

/// Fake YouTube upload endpoint on a random loopback port
pub struct FakeYouTubeServer {
    addr: SocketAddr,
    state: Arc<Mutex<ServerState>>,
    handle: JoinHandle<()>,
}

impl FakeYouTubeServer {
    pub async fn start() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let state = Arc::new(Mutex::new(ServerState::default()));

        let app = router(AppState {
            addr,
            inner: state.clone(),
        });
        let handle = tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });

        Self {
            addr,
            state,
            handle,
        }
    }

    /// Endpoint to hand to `YouTubeUploader::with_endpoint`
    pub fn endpoint(&self) -> String {
        format!("http://{}{UPLOAD_PATH}", self.addr)
    }

    /// Answer every chunk with this status
    pub fn fail_chunks_with(&self, status: u16) {
        self.state.lock().unwrap().chunk_failure = Some(status);
    }

    /// Open sessions without a `Location` header
    pub fn omit_location(&self) {
        self.state.lock().unwrap().omit_location = true;
    }

    /// Persist at most this many bytes of each chunk, forcing resumes
    pub fn accept_at_most(&self, bytes: usize) {
        self.state.lock().unwrap().accept_limit = Some(bytes);
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.state.lock().unwrap().requests.clone()
    }

    /// JSON body of the session-opening request
    pub fn video_resource(&self) -> Option<serde_json::Value> {
        self.state.lock().unwrap().video_resource.clone()
    }

    /// Bytes persisted so far
    pub fn received(&self) -> Vec<u8> {
        self.state.lock().unwrap().received.clone()
    }
}

impl Drop for FakeYouTubeServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

fn router(state: AppState) -> Router {
    Router::new()
        .route(UPLOAD_PATH, post(open_session))
        .route(SESSION_PATH, put(upload_chunk))
        .fallback(not_found)
        .layer(DefaultBodyLimit::disable())
        .with_state(state)
}

async fn open_session(
    State(app): State<AppState>,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let mut state = app.inner.lock().unwrap();
    state
        .requests
        .push(RecordedRequest::new(Method::POST, &uri, &headers, &body));
    state.video_resource = serde_json::from_slice(&body).ok();

    if state.omit_location {
        return StatusCode::OK.into_response();
    }
    (
        StatusCode::OK,
        [(header::LOCATION, format!("http://{}{SESSION_PATH}", app.addr))],
    )
        .into_response()
}

async fn upload_chunk(
    State(app): State<AppState>,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let mut state = app.inner.lock().unwrap();
    state
        .requests
        .push(RecordedRequest::new(Method::PUT, &uri, &headers, &body));

    if let Some(status) = state.chunk_failure {
        let status = StatusCode::from_u16(status).unwrap();
        return (status, r#"{"error":"backendError"}"#).into_response();
    }

    let Some((start, total)) = headers
        .get(header::CONTENT_RANGE)
        .and_then(|v| v.to_str().ok())
        .and_then(parse_content_range)
    else {
        return StatusCode::BAD_REQUEST.into_response();
    };
    if start != state.received.len() as u64 {
        return StatusCode::BAD_REQUEST.into_response();
    }

    let accepted = state.accept_limit.unwrap_or(body.len()).min(body.len());
    state.received.extend_from_slice(&body[..accepted]);

    let received = state.received.len() as u64;
    if received >= total {
        (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "application/json")],
            r#"{"id":"fake-video-id"}"#,
        )
            .into_response()
    } else if received == 0 {
        StatusCode::PERMANENT_REDIRECT.into_response()
    } else {
        (
            StatusCode::PERMANENT_REDIRECT,
            [(header::RANGE, format!("bytes=0-{}", received - 1))],
        )
            .into_response()
    }
}

async fn not_found(
    State(app): State<AppState>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> StatusCode {
    app.inner
        .lock()
        .unwrap()
        .requests
        .push(RecordedRequest::new(method, &uri, &headers, &body));
    StatusCode::NOT_FOUND
}

/// `bytes a-b/total` to `(a, total)`
fn parse_content_range(value: &str) -> Option<(u64, u64)> {
    let (range, total) = value.strip_prefix("bytes ")?.split_once('/')?;
    let (start, _) = range.split_once('-')?;
    Some((start.parse().ok()?, total.parse().ok()?))
}
