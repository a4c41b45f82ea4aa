//! Error types for Warden core operations

/// Result type for Warden core operations
pub type Result<T> = std::result::Result<T, CoreError>;

/// Error types for signal dispatch and configuration
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// One or more sinks failed to accept a signal
    #[error("Dispatch error: {0}")]
    Dispatch(String),

    /// Returned by a [`SignalHandler`](crate::dispatch::SignalHandler) that rejects a signal
    #[error("Handler error: {0}")]
    Handler(String),
}
