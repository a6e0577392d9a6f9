//! Error types for the Trellis runtime.

use thiserror::Error;

/// The main error type for runtime operations.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Signal-related error.
    #[error("signal error: {0}")]
    Signal(#[from] SignalError),
    /// Main-context dispatch error.
    #[error("dispatch error: {0}")]
    Dispatch(#[from] DispatchError),
    /// Background pool error.
    #[error("pool error: {0}")]
    Pool(#[from] PoolError),
}

/// Signal-specific errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SignalError {
    /// The connection ID is invalid or has already been disconnected.
    #[error("invalid or already disconnected connection")]
    InvalidConnection,
    /// The signal owning the connection has been dropped.
    #[error("signal has been dropped")]
    SignalDropped,
}

/// Errors raised when posting work to a [`MainContext`](crate::MainContext).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DispatchError {
    /// The main context has been dropped; nothing will drain the queue.
    #[error("main context has shut down")]
    ContextClosed,
}

/// Errors raised by the background pool and async runtime.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PoolError {
    /// The underlying pool could not be created.
    #[error("failed to create pool: {0}")]
    CreationFailed(String),
}

/// A specialized Result type for runtime operations.
pub type CoreResult<T> = std::result::Result<T, CoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = CoreError::from(DispatchError::ContextClosed);
        assert_eq!(err.to_string(), "dispatch error: main context has shut down");

        let err = CoreError::from(PoolError::CreationFailed("no threads".into()));
        assert!(err.to_string().contains("no threads"));
    }

    #[test]
    fn test_error_source() {
        use std::error::Error;
        let err = CoreError::from(SignalError::SignalDropped);
        assert!(err.source().is_some());
        assert_eq!(err.to_string(), "signal error: signal has been dropped");
    }
}
