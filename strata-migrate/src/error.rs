//! Error types for the sync orchestrator.

use strata_core::TenancyError;
use thiserror::Error;

/// Result type for sync operations.
pub type SyncResult<T> = Result<T, SyncError>;

/// Errors from a sync run.
#[derive(Error, Debug)]
pub enum SyncError {
    /// The selector resolved to zero schemas. Distinguishes "nothing
    /// matched" from "everything succeeded on an empty set".
    #[error("selector '{0}' matched no schemas")]
    EmptySelection(String),

    /// Resolving the schema set through the registry failed.
    #[error("registry error: {0}")]
    Registry(#[from] TenancyError),

    /// One or more schemas failed; the rest were still attempted.
    #[error("sync failed on {failed} of {total} schemas")]
    PartialFailure {
        /// Number of schemas with at least one failed application.
        failed: usize,
        /// Number of schemas attempted.
        total: usize,
    },
}

/// Failure of a single operation invocation.
///
/// Deliberately stringly: operations run arbitrary user code, and the
/// orchestrator only needs something to report and continue past.
#[derive(Error, Debug, Clone)]
#[error("{message}")]
pub struct OperationError {
    message: String,
}

impl OperationError {
    /// Wrap a failure message.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    /// Build from a panic payload captured by the executor.
    pub fn from_panic(payload: Box<dyn std::any::Any + Send>) -> Self {
        let message = if let Some(s) = payload.downcast_ref::<&str>() {
            format!("operation panicked: {s}")
        } else if let Some(s) = payload.downcast_ref::<String>() {
            format!("operation panicked: {s}")
        } else {
            "operation panicked".to_string()
        };
        Self { message }
    }

    /// The failure message.
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl From<String> for OperationError {
    fn from(message: String) -> Self {
        Self { message }
    }
}

impl From<&str> for OperationError {
    fn from(message: &str) -> Self {
        Self::new(message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = SyncError::EmptySelection(":dynamic:".to_string());
        assert_eq!(err.to_string(), "selector ':dynamic:' matched no schemas");

        let err = SyncError::PartialFailure {
            failed: 2,
            total: 5,
        };
        assert_eq!(err.to_string(), "sync failed on 2 of 5 schemas");
    }

    #[test]
    fn test_operation_error_from_panic() {
        let err = OperationError::from_panic(Box::new("boom"));
        assert_eq!(err.message(), "operation panicked: boom");

        let err = OperationError::from_panic(Box::new(42_u8));
        assert_eq!(err.message(), "operation panicked");
    }
}
