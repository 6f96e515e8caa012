//! Error types for region loading and inline edition

use thiserror::Error;

/// Result type for reledit operations
pub type Result<T> = std::result::Result<T, RelEditError>;

/// Errors surfaced to whoever started a load, a form open or a submission.
///
/// A superseded fetch is not an error: the swap engine reports it as
/// [`crate::models::SwapOutcome::Superseded`] and nothing reaches the caller.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RelEditError {
    /// Connection failure, timeout or non-2xx status
    #[error("Network error: {0}")]
    Network(String),

    /// Body could not be read as the expected content or directive
    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    /// The server answered with an error document
    #[error("Server error: {0}")]
    ServerReported(String),

    /// No region registered under this id
    #[error("Unknown region: {0}")]
    UnknownRegion(String),

    /// Region has nothing to load itself from
    #[error("Region {0} has no load url")]
    NoLoadUrl(String),

    /// No inline edition session is attached to this div
    #[error("No edition session for {0}")]
    NoSession(String),

    /// Operation not allowed in the session's current state
    #[error("Session {div_id} is {state}, cannot {operation}")]
    InvalidState {
        div_id: String,
        state: &'static str,
        operation: &'static str,
    },
}

impl From<reqwest::Error> for RelEditError {
    fn from(err: reqwest::Error) -> Self {
        RelEditError::Network(err.to_string())
    }
}

impl From<serde_json::Error> for RelEditError {
    fn from(err: serde_json::Error) -> Self {
        RelEditError::MalformedResponse(err.to_string())
    }
}
