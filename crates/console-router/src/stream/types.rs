//! Types for server-sent event streams

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// One dispatched server-sent event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerEvent {
    /// Value of the `event:` field, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub event: Option<String>,

    /// Last seen `id:` field
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    /// Joined `data:` lines
    pub data: String,
}

impl ServerEvent {
    /// Decode the event data as JSON
    pub fn json<T: serde::de::DeserializeOwned>(&self) -> StreamResult<T> {
        serde_json::from_str(&self.data).map_err(|e| {
            StreamError::Parse(format!(
                "Failed to parse event JSON: {} (data: {})",
                e,
                preview(&self.data)
            ))
        })
    }
}

fn preview(data: &str) -> String {
    match data.char_indices().nth(100) {
        Some((idx, _)) => format!("{}...", &data[..idx]),
        None => data.to_string(),
    }
}

/// Errors that can occur while consuming a stream
#[derive(Debug, Error)]
pub enum StreamError {
    /// HTTP/connection error
    #[error("Connection error: {0}")]
    Connection(#[from] reqwest::Error),

    /// Failed to parse an SSE line or event payload
    #[error("Parse error: {0}")]
    Parse(String),
}

/// Result type for streaming operations
pub type StreamResult<T> = std::result::Result<T, StreamError>;
