//! Test utilities for console-router
//!
//! Spins up fake backends on ephemeral ports so a real [`RequestRouter`]
//! can be driven end to end. Each fake records the requests it receives
//! and answers from canned fixtures keyed by path.
//!
//! ```rust,ignore
//! use console_router::testing::TestBackends;
//! use serde_json::json;
//!
//! let backends = TestBackends::start().await?;
//! backends.primary.respond_json("entities", json!({"response": []}));
//! let router = backends.router(false, &[])?;
//! ```

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::body::Bytes;
use axum::extract::State;
use axum::http::{header, HeaderMap, Method, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use parking_lot::Mutex;
use tokio::net::TcpListener;

use crate::config::{BackendConfig, BackendsConfig, ConsoleConfig};
use crate::{RequestRouter, Result};

/// A test server that automatically shuts down when dropped
pub struct TestServer {
    pub addr: SocketAddr,
    shutdown_tx: Option<tokio::sync::oneshot::Sender<()>>,
    handle: Option<tokio::task::JoinHandle<()>>,
}

impl TestServer {
    /// Serve an axum Router on an ephemeral local port
    pub async fn start(router: axum::Router) -> Result<Self> {
        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;

        let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel();

        let handle = tokio::spawn(async move {
            axum::serve(listener, router)
                .with_graceful_shutdown(async {
                    let _ = shutdown_rx.await;
                })
                .await
                .ok();
        });

        // Give server a moment to start
        tokio::time::sleep(Duration::from_millis(10)).await;

        Ok(Self {
            addr,
            shutdown_tx: Some(shutdown_tx),
            handle: Some(handle),
        })
    }

    /// Get the base URL of the test server
    pub fn base_url(&self) -> String {
        format!("http://{}/", self.addr)
    }

    /// Shutdown the server gracefully
    pub async fn shutdown(mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
        if let Some(handle) = self.handle.take() {
            let _ = handle.await;
        }
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }
}

/// A request as seen by a fake backend
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedRequest {
    pub method: String,
    /// Path without the leading `/`
    pub path: String,
    pub body: Option<serde_json::Value>,
    pub accept: Option<String>,
    pub authorization: Option<String>,
}

#[derive(Debug, Clone)]
enum Fixture {
    Json(StatusCode, serde_json::Value),
    EventStream(String),
}

#[derive(Debug, Default)]
struct FakeState {
    requests: Vec<RecordedRequest>,
    fixtures: HashMap<String, Fixture>,
}

/// A recording backend with canned responses
///
/// Unknown paths answer `404 {"error": "no fixture for <path>"}`.
#[derive(Debug, Clone, Default)]
pub struct FakeBackend {
    state: Arc<Mutex<FakeState>>,
}

impl FakeBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer `path` with `200` and a JSON body
    pub fn respond_json(&self, path: &str, body: serde_json::Value) {
        self.respond_status(path, StatusCode::OK, body);
    }

    /// Answer `path` with an arbitrary status and JSON body
    pub fn respond_status(&self, path: &str, status: StatusCode, body: serde_json::Value) {
        self.state
            .lock()
            .fixtures
            .insert(path.to_string(), Fixture::Json(status, body));
    }

    /// Answer `path` with a `text/event-stream` body that ends after `raw`
    pub fn respond_events(&self, path: &str, raw: impl Into<String>) {
        self.state
            .lock()
            .fixtures
            .insert(path.to_string(), Fixture::EventStream(raw.into()));
    }

    /// Requests received so far
    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.state.lock().requests.clone()
    }

    /// The only request received, if exactly one was
    pub fn single_request(&self) -> Option<RecordedRequest> {
        let state = self.state.lock();
        match state.requests.as_slice() {
            [only] => Some(only.clone()),
            _ => None,
        }
    }

    pub fn request_count(&self) -> usize {
        self.state.lock().requests.len()
    }

    pub fn router(&self) -> axum::Router {
        axum::Router::new()
            .fallback(handle_request)
            .with_state(self.clone())
    }

    fn record(&self, request: RecordedRequest) -> Option<Fixture> {
        let mut state = self.state.lock();
        let fixture = state.fixtures.get(&request.path).cloned();
        state.requests.push(request);
        fixture
    }
}

async fn handle_request(
    State(backend): State<FakeBackend>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let header_str = |name: header::HeaderName| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(String::from)
    };

    let path = uri.path().trim_start_matches('/').to_string();
    let request = RecordedRequest {
        method: method.to_string(),
        path: path.clone(),
        body: serde_json::from_slice(&body).ok(),
        accept: header_str(header::ACCEPT),
        authorization: header_str(header::AUTHORIZATION),
    };

    match backend.record(request) {
        Some(Fixture::Json(status, body)) => (status, axum::Json(body)).into_response(),
        Some(Fixture::EventStream(raw)) => {
            ([(header::CONTENT_TYPE, "text/event-stream")], raw).into_response()
        }
        None => (
            StatusCode::NOT_FOUND,
            axum::Json(serde_json::json!({ "error": format!("no fixture for {}", path) })),
        )
            .into_response(),
    }
}

/// One running fake backend
pub struct RunningBackend {
    pub fake: FakeBackend,
    pub server: TestServer,
}

impl RunningBackend {
    pub async fn start() -> Result<Self> {
        let fake = FakeBackend::new();
        let server = TestServer::start(fake.router()).await?;
        Ok(Self { fake, server })
    }

    pub fn config(&self) -> BackendConfig {
        BackendConfig::new(self.server.base_url())
    }
}

impl std::ops::Deref for RunningBackend {
    type Target = FakeBackend;

    fn deref(&self) -> &FakeBackend {
        &self.fake
    }
}

/// The four backends, each on its own port
pub struct TestBackends {
    pub primary: RunningBackend,
    pub auth: RunningBackend,
    pub staged: RunningBackend,
    pub mocked: RunningBackend,
}

impl TestBackends {
    pub async fn start() -> Result<Self> {
        Ok(Self {
            primary: RunningBackend::start().await?,
            auth: RunningBackend::start().await?,
            staged: RunningBackend::start().await?,
            mocked: RunningBackend::start().await?,
        })
    }

    /// Configuration pointing every backend at its fake
    pub fn config(&self, local: bool, mocked_endpoints: &[&str]) -> ConsoleConfig {
        ConsoleConfig {
            local,
            mocked_endpoints: mocked_endpoints.iter().map(|s| s.to_string()).collect(),
            backends: BackendsConfig {
                primary: self.primary.config(),
                auth: self.auth.config(),
                staged: self.staged.config(),
                mocked: self.mocked.config(),
            },
        }
    }

    pub fn router(&self, local: bool, mocked_endpoints: &[&str]) -> Result<RequestRouter> {
        RequestRouter::from_config(&self.config(local, mocked_endpoints))
    }

    /// Total requests across all four backends
    pub fn total_requests(&self) -> usize {
        [&self.primary, &self.auth, &self.staged, &self.mocked]
            .iter()
            .map(|b| b.request_count())
            .sum()
    }
}
