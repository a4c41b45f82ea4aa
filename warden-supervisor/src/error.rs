//! Error types for supervisor operations

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

/// Result type for supervisor operations
pub type Result<T> = std::result::Result<T, SupervisorError>;

/// Structured detail attached to an error
pub type Details = Map<String, Value>;

/// Error kind, as seen by observers of lifecycle signals
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// A worker could not be started
    ExecutionError,
    /// A handle does not name a live, supervised worker
    NotFound,
}

/// Errors surfaced by lifecycle operations.
///
/// Serializable so it can travel inside a `process_failed` signal.
#[derive(Debug, Clone, PartialEq, Error, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SupervisorError {
    #[error("Execution error: {message}")]
    #[serde(rename = "execution_error")]
    Execution {
        message: String,
        #[serde(default)]
        details: Details,
    },

    #[error("Not found: {message}")]
    NotFound {
        message: String,
        #[serde(default)]
        details: Details,
    },
}

impl SupervisorError {
    /// Execution-class error carrying the primitive's reason
    pub fn execution(message: impl Into<String>, details: Details) -> Self {
        SupervisorError::Execution {
            message: message.into(),
            details,
        }
    }

    /// Not-found error
    pub fn not_found(message: impl Into<String>, details: Details) -> Self {
        SupervisorError::NotFound {
            message: message.into(),
            details,
        }
    }

    /// Error kind
    pub fn kind(&self) -> ErrorKind {
        match self {
            SupervisorError::Execution { .. } => ErrorKind::ExecutionError,
            SupervisorError::NotFound { .. } => ErrorKind::NotFound,
        }
    }

    /// Human-readable message
    pub fn message(&self) -> &str {
        match self {
            SupervisorError::Execution { message, .. }
            | SupervisorError::NotFound { message, .. } => message,
        }
    }

    /// Structured details
    pub fn details(&self) -> &Details {
        match self {
            SupervisorError::Execution { details, .. }
            | SupervisorError::NotFound { details, .. } => details,
        }
    }

    /// Whether this is a not-found error
    pub fn is_not_found(&self) -> bool {
        self.kind() == ErrorKind::NotFound
    }
}

/// Reasons a child-supervision primitive gives for refusing an operation
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ChildError {
    #[error("invalid module: {0}")]
    InvalidModule(String),

    #[error("invalid start function {module}.{function}")]
    InvalidFunction { module: String, function: String },

    #[error("init failed: {0}")]
    InitFailed(String),

    #[error("worker crashed during init: {0}")]
    InitCrashed(String),

    #[error("startup timeout")]
    StartupTimeout,

    #[error("no such child")]
    NotFound,

    /// The child is gone, but its worker crashed instead of stopping cleanly
    #[error("worker crashed during shutdown: {0}")]
    ShutdownCrashed(String),
}
