//! Error taxonomy for the bridge
//!
//! Only [`ConfigError`](crate::config::ConfigError) terminates the process.
//! Session errors are recovered inside the run loop with a backoff;
//! per-message errors are contained inside the forwarder. Both surface only
//! as log lines.

use crate::config::ConfigError;
use thiserror::Error;

/// Failures that take down one broker session.
///
/// The session manager converts each of these into a log line, backs off,
/// and reconnects. They never cross the run-loop boundary.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("connection failed: {0}")]
    Connection(#[source] Box<dyn std::error::Error + Send + Sync>),

    #[error("subscribe failed: {0}")]
    Subscribe(#[source] Box<dyn std::error::Error + Send + Sync>),

    #[error("broker closed the session")]
    Disconnected,
}

/// Per-message failures contained inside the forwarder. The message is
/// dropped either way; processing continues with the next one.
#[derive(Debug, Error)]
pub enum ForwardError {
    #[error("could not json-decode payload: {0}")]
    Decode(#[source] serde_json::Error),

    #[error("delivery failed: {0}")]
    Delivery(#[source] reqwest::Error),
}

/// Top-level error for process wiring in `main`.
#[derive(Debug, Error)]
pub enum BridgeError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for bridge operations.
pub type BridgeResult<T> = Result<T, BridgeError>;
