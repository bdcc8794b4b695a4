//! Error types
//!
//! Only [`Error::InvalidInput`] is ever returned from the sharing operations
//! themselves. Everything else is raised by collaborators (HTTP backend,
//! WebSocket, sinks) and is logged where the failure is absorbed.

use thiserror::Error;

/// Crate-wide result type
pub type Result<T> = std::result::Result<T, Error>;

/// Crate-wide error type
#[derive(Debug, Error)]
pub enum Error {
    /// Caller supplied an unusable value (e.g. an empty source id)
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Configuration could not be turned into usable URLs
    #[error("invalid config: {0}")]
    InvalidConfig(String),

    /// Backend stream request failed before a response arrived
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    /// WebSocket transport failure
    #[error("websocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    /// Control frame (de)serialization failure
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    /// Media sink failure
    #[error("sink error: {0}")]
    Sink(#[from] SinkError),
}

/// Reasons a media sink refuses an append or cannot be created
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SinkError {
    /// An append is already in flight
    #[error("sink is busy")]
    Busy,

    /// The sink is not ready to accept data yet
    #[error("sink is not ready")]
    NotReady,

    /// The sink refused the buffer
    #[error("append rejected: {0}")]
    Rejected(String),

    /// No sink can be built for this mime
    #[error("unsupported mime: {0}")]
    UnsupportedMime(String),
}
