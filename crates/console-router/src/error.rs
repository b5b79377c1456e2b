//! Error types for console router operations

use thiserror::Error;

use crate::backend::BackendKind;
use crate::stream::StreamError;

/// Result type alias for console router operations
pub type Result<T> = std::result::Result<T, ConsoleError>;

/// Errors that can occur while resolving a query key
#[derive(Error, Debug)]
pub enum ConsoleError {
    /// HTTP request failed before a response was received
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Invalid URL
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Backend answered with a non-2xx status
    #[error("{backend} backend returned {status}: {message}")]
    Server {
        backend: BackendKind,
        status: u16,
        message: String,
    },

    /// An unwrap rule expected a field the response body does not carry
    #[error("Malformed envelope from {path}: missing `{field}`")]
    MalformedEnvelope { path: String, field: &'static str },

    /// Query key could not be parsed
    #[error("Invalid query key: {0}")]
    InvalidKey(String),

    /// Configured header name or value is not valid HTTP
    #[error("Invalid header: {0}")]
    InvalidHeader(String),

    /// Configuration could not be loaded or is inconsistent
    #[error("Configuration error: {0}")]
    Config(String),

    /// A JSON payload was requested but the route produced an event stream
    #[error("Route `{0}` produces an event stream, not a JSON payload")]
    UnexpectedStream(String),

    /// Failed to decode a resolved payload into the requested type
    #[error("Failed to parse response: {0}")]
    Parse(String),

    /// Streaming error
    #[error("Stream error: {0}")]
    Stream(#[from] StreamError),
}

impl ConsoleError {
    /// Create a server error from backend, status code and message
    pub fn server_error(backend: BackendKind, status: u16, message: impl Into<String>) -> Self {
        Self::Server {
            backend,
            status,
            message: message.into(),
        }
    }

    /// Whether the error came from the transport (network or non-2xx status)
    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Http(_) | Self::Server { .. })
    }
}
