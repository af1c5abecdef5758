//! Error taxonomy for the graph-learning and decision pipelines.
//!
//! Mirrors the kinds (not the literal names) from the design doc: a
//! validation failure is never silenced, resource/external failures are
//! retried where cheap to do so, and a consistency break is always
//! non-retryable.

use std::path::PathBuf;
use thiserror::Error;

/// Crate-wide result alias.
pub type Result<T> = std::result::Result<T, BolcdError>;

#[derive(Error, Debug)]
pub enum BolcdError {
    /// Malformed event, missing threshold, inconsistent segment key.
    #[error("validation error: {0}")]
    Validation(String),

    /// I/O failure reading events or writing graphs/reports.
    #[error("resource error: {0}")]
    Resource(String),

    #[error("resource error: {0}")]
    Io(#[from] std::io::Error),

    /// Bounded ingest queue is full.
    #[error("back-pressure: queue at capacity ({capacity})")]
    BackPressure { capacity: usize },

    /// Audit hash mismatch or chain break. Non-retryable.
    #[error("consistency error: {0}")]
    Consistency(String),

    /// Connector timeout or non-2xx from an external collaborator.
    #[error("external error: {0}")]
    External(String),

    /// Cooperative cancellation; no persisted side effects.
    #[error("cancelled")]
    Cancelled,

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("file not found: {0}")]
    FileNotFound(PathBuf),

    #[error("{context}: {source}")]
    WithContext {
        context: String,
        source: Box<BolcdError>,
    },
}

impl BolcdError {
    pub fn validation(msg: impl Into<String>) -> Self {
        BolcdError::Validation(msg.into())
    }

    pub fn resource(msg: impl Into<String>) -> Self {
        BolcdError::Resource(msg.into())
    }

    pub fn external(msg: impl Into<String>) -> Self {
        BolcdError::External(msg.into())
    }

    pub fn consistency(msg: impl Into<String>) -> Self {
        BolcdError::Consistency(msg.into())
    }

    pub fn context(self, context: impl Into<String>) -> Self {
        BolcdError::WithContext {
            context: context.into(),
            source: Box::new(self),
        }
    }

    /// Exit code mapping for the CLI boundary (spec: 0 ok, 1 internal error, 2 validation failure).
    pub fn exit_code(&self) -> i32 {
        match self {
            BolcdError::Validation(_) => 2,
            _ => 1,
        }
    }
}

/// Extension trait for adding context to a `Result`.
pub trait ResultExt<T> {
    fn context(self, context: impl Into<String>) -> Result<T>;
}

impl<T> ResultExt<T> for Result<T> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| e.context(context))
    }
}
