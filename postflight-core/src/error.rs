//! Error types for postflight-core

use thiserror::Error;

/// Main error type for the postflight-core library
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),

    /// Transport/ingest API error
    #[error("transport error: {0}")]
    Transport(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type alias for postflight-core
pub type Result<T> = std::result::Result<T, Error>;
