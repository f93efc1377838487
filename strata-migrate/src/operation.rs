//! The operation contract.

use async_trait::async_trait;

use strata_core::{AppId, SchemaName};

use crate::error::OperationError;

/// A unit of work applied once per (schema, application) pair.
///
/// Implementations must be idempotent per pair: the orchestrator re-runs
/// failed subsets, and a repair pass may re-drive a whole schema.
#[async_trait]
pub trait SyncOperation: Send + Sync {
    /// Apply the operation to one application inside one schema.
    async fn apply(&self, schema: &SchemaName, app: &AppId) -> Result<(), OperationError>;
}

/// Adapter turning a plain closure into a [`SyncOperation`].
pub struct FnSyncOperation<F>
where
    F: Fn(&SchemaName, &AppId) -> Result<(), OperationError> + Send + Sync,
{
    func: F,
}

impl<F> FnSyncOperation<F>
where
    F: Fn(&SchemaName, &AppId) -> Result<(), OperationError> + Send + Sync,
{
    /// Wrap a closure.
    pub fn new(func: F) -> Self {
        Self { func }
    }
}

#[async_trait]
impl<F> SyncOperation for FnSyncOperation<F>
where
    F: Fn(&SchemaName, &AppId) -> Result<(), OperationError> + Send + Sync,
{
    async fn apply(&self, schema: &SchemaName, app: &AppId) -> Result<(), OperationError> {
        (self.func)(schema, app)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_fn_operation() {
        let op = FnSyncOperation::new(|schema: &SchemaName, app: &AppId| {
            if app == "broken" {
                Err(OperationError::new(format!("{schema}: no such app")))
            } else {
                Ok(())
            }
        });

        let schema = SchemaName::new("client1").unwrap();
        assert!(op.apply(&schema, &"shop".to_string()).await.is_ok());

        let err = op.apply(&schema, &"broken".to_string()).await.unwrap_err();
        assert_eq!(err.message(), "client1: no such app");
    }
}
