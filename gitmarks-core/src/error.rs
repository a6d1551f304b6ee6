//! Error types for gitmarks-core.

use thiserror::Error;

/// Failure talking to the GitMarks API.
///
/// Anything other than a 2xx response is a [`ApiError::Status`]; the server's
/// `message` field is preferred over the bare status text when present.
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("{message} ({status})")]
    Status { status: u16, message: String },

    #[error("could not decode response: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("invalid API url: {0}")]
    InvalidUrl(String),
}

/// Rejected grading-workspace operation.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum GraderError {
    #[error("no feedback with id {0}")]
    UnknownFeedback(u64),

    #[error("deleting submitted feedback is not supported")]
    DeleteUnsupported(u64),

    #[error("no student work is selected")]
    NoWorkSelected,
}

/// Failure reading or writing the local draft store.
#[derive(Error, Debug)]
pub enum DraftError {
    #[error("draft store error: {0}")]
    Db(#[from] tokio_rusqlite::Error),

    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("draft payload is not valid JSON: {0}")]
    Payload(#[from] serde_json::Error),
}

/// Convenience alias for API results.
pub type ApiResult<T> = Result<T, ApiError>;
