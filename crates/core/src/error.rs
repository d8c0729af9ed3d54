//! Error types for the Parley domain.
//!
//! Uses `thiserror` for ergonomic error definitions.
//! Transport and decode failures are turn-level and never reach the process
//! boundary; only [`Error`] does.

use thiserror::Error;

/// The top-level error type. Anything surfacing as this is fatal.
#[derive(Debug, Error)]
pub enum Error {
    // --- Provider errors ---
    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    // --- Configuration errors ---
    #[error("Configuration error: {message}")]
    Config { message: String },

    // --- I/O ---
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    // --- Generic ---
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type alias using our Error.
pub type Result<T> = std::result::Result<T, Error>;

/// Failures of a single backend call.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProviderError {
    #[error("API request failed: {message} (status: {status_code})")]
    ApiError { status_code: u16, message: String },

    #[error("Network error: {0}")]
    Network(String),

    #[error("Request timed out: {0}")]
    Timeout(String),

    #[error("Response body is not readable: {0}")]
    UnreadableBody(String),

    #[error("Stream interrupted: {0}")]
    StreamInterrupted(String),

    #[error("Backend returned no text")]
    EmptyResponse,

    #[error("Provider not configured: {0}")]
    NotConfigured(String),
}

/// One stream line that could not be parsed and was skipped.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Malformed stream line: {reason}")]
pub struct DecodeError {
    /// The offending line, as received
    pub line: String,

    /// Parser message
    pub reason: String,
}
