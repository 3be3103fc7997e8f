//! Error handling
//!
//! One closed enum per component. Item-level errors (validation, storage,
//! prediction, publish) never abort a batch; only `PipelineError` does.

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub type PipelineResult<T> = Result<T, PipelineError>;

// ============================================================================
// ITEM-LEVEL ERRORS
// ============================================================================

/// Record failed to normalize. Never retried.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("Missing required fields: {}", .0.join(", "))]
    MissingFields(Vec<String>),

    #[error("Invalid value for '{field}': {reason}")]
    InvalidField { field: String, reason: String },
}

/// Persisting or reading an entity failed.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Store unreachable: {0}")]
    Transport(String),

    #[error("Store returned HTTP {code}: {body}")]
    Status { code: u16, body: String },

    #[error("Malformed store response: {0}")]
    Malformed(String),

    #[error("Entity not found: {0}")]
    NotFound(String),

    #[error("Store backend error: {0}")]
    Backend(String),
}

/// Scoring call failed. Logged, never fails the item.
#[derive(Debug, Error)]
pub enum PredictionError {
    #[error("Missing model features: {}", .0.join(", "))]
    InvalidFeatures(Vec<String>),

    #[error("Scoring endpoint unreachable: {0}")]
    Transport(String),

    #[error("Scoring endpoint returned HTTP {code}: {body}")]
    Status { code: u16, body: String },

    #[error("Malformed prediction response: {0}")]
    MalformedResponse(String),
}

/// Publishing a prediction failed.
#[derive(Debug, Error)]
pub enum PublishError {
    #[error("Message bus unreachable: {0}")]
    Transport(String),

    #[error("Message bus returned HTTP {code}: {body}")]
    Status { code: u16, body: String },

    #[error("Malformed publish response: {0}")]
    MalformedResponse(String),
}

/// Category recorded on a failed item outcome
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Validation,
    Storage,
    Unexpected,
}

// ============================================================================
// RUN-LEVEL ERRORS
// ============================================================================

/// Initialization or I/O failure that stops the run.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Unsupported input format: {0}")]
    UnsupportedFormat(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl From<rusqlite::Error> for StorageError {
    fn from(err: rusqlite::Error) -> Self {
        StorageError::Backend(err.to_string())
    }
}

/// Map a `ureq` failure onto the component's status/transport variants.
///
/// Consumes the error response body so callers can surface it.
pub(crate) fn split_ureq_error(err: ureq::Error) -> Result<(u16, String), String> {
    match err {
        ureq::Error::Status(code, resp) => {
            let body = resp.into_string().unwrap_or_default();
            Ok((code, truncate(&body, 512)))
        }
        ureq::Error::Transport(t) => Err(t.to_string()),
    }
}

fn truncate(s: &str, max: usize) -> String {
    if s.len() <= max {
        return s.to_string();
    }
    let mut end = max;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}...", &s[..end])
}

impl From<ureq::Error> for StorageError {
    fn from(err: ureq::Error) -> Self {
        match split_ureq_error(err) {
            Ok((404, body)) => StorageError::NotFound(body),
            Ok((code, body)) => StorageError::Status { code, body },
            Err(msg) => StorageError::Transport(msg),
        }
    }
}

impl From<ureq::Error> for PredictionError {
    fn from(err: ureq::Error) -> Self {
        match split_ureq_error(err) {
            Ok((code, body)) => PredictionError::Status { code, body },
            Err(msg) => PredictionError::Transport(msg),
        }
    }
}

impl From<ureq::Error> for PublishError {
    fn from(err: ureq::Error) -> Self {
        match split_ureq_error(err) {
            Ok((code, body)) => PublishError::Status { code, body },
            Err(msg) => PublishError::Transport(msg),
        }
    }
}
