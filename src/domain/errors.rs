//! Error types for the backplane.

use std::fmt;
use thiserror::Error;

/// Errors returned by adapter operations.
#[derive(Debug, Error)]
pub enum AdapterError {
    /// The pub/sub backend cannot be reached, or the factory owning the
    /// connection has been closed. The caller decides whether to drop or retry.
    #[error("Backend unavailable: {0}")]
    BackendUnavailable(String),

    /// The message could not be encoded for the wire.
    #[error("Failed to encode room message: {0}")]
    Encode(#[from] serde_json::Error),
}

impl AdapterError {
    /// Creates a backend unavailable error.
    pub fn unavailable(reason: impl Into<String>) -> Self {
        AdapterError::BackendUnavailable(reason.into())
    }

    /// Returns true if the backend could not be reached.
    pub fn is_unavailable(&self) -> bool {
        matches!(self, AdapterError::BackendUnavailable(_))
    }
}

/// Error raised by a single connection while closing.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConnectionError {
    #[error("Connection already closed")]
    AlreadyClosed,

    #[error("Dispatch task failed: {0}")]
    DispatchTask(String),

    #[error("Backend error: {0}")]
    Backend(String),
}

/// Which half of a shared connection pair an error refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConnectionRole {
    Publish,
    Subscribe,
}

impl fmt::Display for ConnectionRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ConnectionRole::Publish => "publish",
            ConnectionRole::Subscribe => "subscribe",
        };
        write!(f, "{}", s)
    }
}

/// One connection that failed to close.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CloseFailure {
    pub role: ConnectionRole,
    pub error: ConnectionError,
}

impl fmt::Display for CloseFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} connection: {}", self.role, self.error)
    }
}

/// Aggregated failure of closing a factory's connections.
///
/// Lists every connection that failed, not only the first one.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Failed to close {} connection(s): {}", .failures.len(), summarize(.failures))]
pub struct CloseError {
    failures: Vec<CloseFailure>,
}

impl CloseError {
    /// Folds close failures into a result: `Ok` when there are none.
    pub fn from_failures(failures: Vec<CloseFailure>) -> Result<(), CloseError> {
        if failures.is_empty() {
            Ok(())
        } else {
            Err(CloseError { failures })
        }
    }

    /// Returns every individual failure, in close order.
    pub fn failures(&self) -> &[CloseFailure] {
        &self.failures
    }
}

fn summarize(failures: &[CloseFailure]) -> String {
    failures
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_failures_folds_to_ok() {
        assert!(CloseError::from_failures(Vec::new()).is_ok());
    }

    #[test]
    fn close_error_lists_every_failure() {
        let err = CloseError::from_failures(vec![
            CloseFailure {
                role: ConnectionRole::Publish,
                error: ConnectionError::Backend("broken pipe".to_string()),
            },
            CloseFailure {
                role: ConnectionRole::Subscribe,
                error: ConnectionError::AlreadyClosed,
            },
        ])
        .unwrap_err();

        assert_eq!(err.failures().len(), 2);
        let message = err.to_string();
        assert!(message.contains("2 connection(s)"));
        assert!(message.contains("publish connection: Backend error: broken pipe"));
        assert!(message.contains("subscribe connection: Connection already closed"));
    }

    #[test]
    fn unavailable_is_detected() {
        assert!(AdapterError::unavailable("down").is_unavailable());
        let encode = serde_json::from_str::<u8>("x").unwrap_err();
        assert!(!AdapterError::from(encode).is_unavailable());
    }
}
