//! Backend HTTP clients
//!
//! Each logical backend surface is one reqwest client bound to a base URL
//! and a set of default headers.

use std::fmt;

use reqwest::header::{HeaderMap, HeaderName, HeaderValue, ACCEPT, AUTHORIZATION};
use reqwest::{Client, Response};
use serde::Serialize;
use tracing::{debug, instrument};
use url::Url;

use crate::config::{BackendConfig, BackendsConfig};
use crate::error::{ConsoleError, Result};
use crate::stream::EventStream;

/// Logical backend surfaces
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// Main CRUD API
    Primary,
    /// Authentication endpoints
    Auth,
    /// Development/production toggled API, also serves the event stream
    Staged,
    /// Fixture or passthrough API used in local/mocked mode
    Mocked,
}

impl BackendKind {
    pub const ALL: [BackendKind; 4] = [
        BackendKind::Primary,
        BackendKind::Auth,
        BackendKind::Staged,
        BackendKind::Mocked,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            BackendKind::Primary => "primary",
            BackendKind::Auth => "auth",
            BackendKind::Staged => "staged",
            BackendKind::Mocked => "mocked",
        }
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A named HTTP client bound to one backend
#[derive(Debug, Clone)]
pub struct BackendClient {
    kind: BackendKind,
    client: Client,
    base_url: Url,
}

impl BackendClient {
    /// Create a client from its configuration
    pub fn new(kind: BackendKind, config: &BackendConfig) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        if let Some(token) = &config.token {
            let value = HeaderValue::from_str(&format!("Bearer {}", token))
                .map_err(|e| ConsoleError::InvalidHeader(format!("auth token: {}", e)))?;
            headers.insert(AUTHORIZATION, value);
        }
        for (name, value) in &config.headers {
            let name = HeaderName::from_bytes(name.as_bytes())
                .map_err(|e| ConsoleError::InvalidHeader(format!("{}: {}", name, e)))?;
            let value = HeaderValue::from_str(value)
                .map_err(|e| ConsoleError::InvalidHeader(format!("{}: {}", name, e)))?;
            headers.insert(name, value);
        }

        let mut builder = Client::builder()
            .connect_timeout(config.connect_timeout())
            .default_headers(headers);
        if let Some(timeout) = config.request_timeout() {
            builder = builder.timeout(timeout);
        }
        let client = builder.build()?;

        Ok(Self {
            kind,
            client,
            base_url: normalize_base(&config.base_url)?,
        })
    }

    pub fn kind(&self) -> BackendKind {
        self.kind
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Resolve a request path against the base URL
    ///
    /// The path is always relative: a first segment such as `intent:greet`
    /// or `http://host/x` stays below the base instead of replacing it.
    pub fn url(&self, path: &str) -> Result<Url> {
        Ok(self
            .base_url
            .join(&format!("./{}", path.trim_start_matches('/')))?)
    }

    /// `GET <path>` returning the JSON body
    #[instrument(skip(self), fields(backend = %self.kind))]
    pub async fn get_json(&self, path: &str) -> Result<serde_json::Value> {
        let url = self.url(path)?;
        debug!("GET {}", url);

        let response = self.client.get(url).send().await?;
        self.handle_response(response).await
    }

    /// `POST <path>` with a JSON body, returning the JSON body
    #[instrument(skip(self, body), fields(backend = %self.kind))]
    pub async fn post_json(
        &self,
        path: &str,
        body: &serde_json::Value,
    ) -> Result<serde_json::Value> {
        let url = self.url(path)?;
        debug!("POST {} {}", url, body);

        let response = self.client.post(url).json(body).send().await?;
        self.handle_response(response).await
    }

    /// `GET <path>` as a server-sent event stream
    #[instrument(skip(self), fields(backend = %self.kind))]
    pub async fn open_stream(&self, path: &str) -> Result<EventStream> {
        let url = self.url(path)?;
        debug!("Connecting to event stream: {}", url);

        let response = self
            .client
            .get(url)
            .header(ACCEPT, "text/event-stream")
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(self.extract_error(response).await);
        }

        Ok(EventStream::from_response(response))
    }

    async fn handle_response(&self, response: Response) -> Result<serde_json::Value> {
        if !response.status().is_success() {
            return Err(self.extract_error(response).await);
        }

        let bytes = response.bytes().await?;
        if bytes.is_empty() {
            return Ok(serde_json::Value::Null);
        }
        serde_json::from_slice(&bytes).map_err(|e| ConsoleError::Parse(e.to_string()))
    }

    async fn extract_error(&self, response: Response) -> ConsoleError {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();

        // Prefer the backend's own message when it sends one
        let message = serde_json::from_str::<serde_json::Value>(&body)
            .ok()
            .and_then(|v| {
                ["message", "error", "detail"]
                    .iter()
                    .find_map(|f| v.get(*f).and_then(|m| m.as_str()).map(String::from))
            })
            .unwrap_or_else(|| {
                if body.is_empty() {
                    format!("HTTP {}", status)
                } else {
                    body
                }
            });

        ConsoleError::server_error(self.kind, status.as_u16(), message)
    }
}

/// Base URLs must end in `/` so relative paths land below them
fn normalize_base(base: &str) -> Result<Url> {
    let mut url = Url::parse(base)?;
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    Ok(url)
}

/// The four backend clients the router dispatches between
#[derive(Debug, Clone)]
pub struct BackendSet {
    primary: BackendClient,
    auth: BackendClient,
    staged: BackendClient,
    mocked: BackendClient,
}

impl BackendSet {
    pub fn from_config(config: &BackendsConfig) -> Result<Self> {
        Ok(Self {
            primary: BackendClient::new(BackendKind::Primary, &config.primary)?,
            auth: BackendClient::new(BackendKind::Auth, &config.auth)?,
            staged: BackendClient::new(BackendKind::Staged, &config.staged)?,
            mocked: BackendClient::new(BackendKind::Mocked, &config.mocked)?,
        })
    }

    pub fn get(&self, kind: BackendKind) -> &BackendClient {
        match kind {
            BackendKind::Primary => &self.primary,
            BackendKind::Auth => &self.auth,
            BackendKind::Staged => &self.staged,
            BackendKind::Mocked => &self.mocked,
        }
    }
}
