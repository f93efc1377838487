//! Sequential and parallel executors.
//!
//! Both walk a pre-resolved list of per-schema plans and record one
//! outcome per (schema, application) pair. Failures never stop the run:
//! a panicking or timed-out operation becomes that pair's failure entry
//! and execution moves on.

use std::sync::Arc;
use std::time::Duration;

use futures::FutureExt;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, warn};

use strata_core::{AppId, SchemaContext, SchemaName};

use crate::error::OperationError;
use crate::operation::SyncOperation;
use crate::report::SyncEntry;

/// The resolved work for one schema.
#[derive(Debug, Clone)]
pub struct SchemaPlan {
    /// The schema to sync.
    pub schema: SchemaName,
    /// Applications to apply, in order.
    pub apps: Vec<AppId>,
}

/// Run all plans one schema at a time, in the order given, on a single
/// schema context.
pub(crate) async fn run_sequential(
    shared: &SchemaName,
    plans: &[SchemaPlan],
    op: &dyn SyncOperation,
    timeout: Option<Duration>,
) -> Vec<SyncEntry> {
    let ctx = SchemaContext::new(shared.clone());
    let mut entries = Vec::new();
    for plan in plans {
        entries.extend(run_schema(&ctx, plan, op, timeout).await);
    }
    entries
}

/// Run plans concurrently, at most `workers` schemas in flight.
///
/// Applications within one schema stay serialized; only schemas overlap.
/// Each task gets its own context so stacks cannot interleave. Entries
/// come back in schema order regardless of completion order.
pub(crate) async fn run_parallel(
    shared: &SchemaName,
    plans: Vec<SchemaPlan>,
    op: Arc<dyn SyncOperation>,
    workers: usize,
    timeout: Option<Duration>,
) -> Vec<SyncEntry> {
    let semaphore = Arc::new(Semaphore::new(workers.max(1)));
    let mut set = JoinSet::new();

    for plan in plans {
        let op = Arc::clone(&op);
        let semaphore = Arc::clone(&semaphore);
        let shared = shared.clone();
        set.spawn(async move {
            // acquire_owned only fails after close(), which never happens
            // here; losing the permit degrades to unbounded, not broken.
            let _permit = semaphore.acquire_owned().await.ok();
            let ctx = SchemaContext::new(shared);
            let schema = plan.schema.clone();
            let entries = run_schema(&ctx, &plan, op.as_ref(), timeout).await;
            (schema, entries)
        });
    }

    let mut grouped = Vec::new();
    while let Some(joined) = set.join_next().await {
        match joined {
            Ok(pair) => grouped.push(pair),
            // Operation panics are caught inside run_schema; a JoinError
            // here means the task was cancelled.
            Err(e) => warn!(error = %e, "executor task did not complete"),
        }
    }

    grouped.sort_by(|a, b| a.0.cmp(&b.0));
    grouped.into_iter().flat_map(|(_, entries)| entries).collect()
}

/// Run every application of one plan with the schema active on the
/// context.
async fn run_schema(
    ctx: &SchemaContext,
    plan: &SchemaPlan,
    op: &dyn SyncOperation,
    timeout: Option<Duration>,
) -> Vec<SyncEntry> {
    let _guard = ctx.activate(plan.schema.clone());
    debug!(schema = %plan.schema, apps = plan.apps.len(), "syncing schema");

    let mut entries = Vec::with_capacity(plan.apps.len());
    for app in &plan.apps {
        let outcome = invoke(op, &plan.schema, app, timeout).await;
        if let Err(error) = &outcome {
            warn!(schema = %plan.schema, app = %app, error = %error, "operation failed");
        }
        entries.push(SyncEntry {
            schema: plan.schema.clone(),
            app: app.clone(),
            outcome: match outcome {
                Ok(()) => crate::report::SyncOutcome::Applied,
                Err(error) => crate::report::SyncOutcome::Failed(error),
            },
        });
    }
    entries
}

/// Invoke once, converting panics and timeouts into operation failures.
async fn invoke(
    op: &dyn SyncOperation,
    schema: &SchemaName,
    app: &AppId,
    timeout: Option<Duration>,
) -> Result<(), OperationError> {
    let fut = std::panic::AssertUnwindSafe(op.apply(schema, app)).catch_unwind();

    let caught = match timeout {
        Some(limit) => match tokio::time::timeout(limit, fut).await {
            Ok(caught) => caught,
            Err(_) => {
                return Err(OperationError::new(format!(
                    "timed out after {}ms",
                    limit.as_millis()
                )));
            }
        },
        None => fut.await,
    };

    match caught {
        Ok(result) => result,
        Err(payload) => Err(OperationError::from_panic(payload)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::operation::FnSyncOperation;
    use crate::report::SyncOutcome;
    use pretty_assertions::assert_eq;

    fn schema(name: &str) -> SchemaName {
        SchemaName::new(name).unwrap()
    }

    fn plan(name: &str, apps: &[&str]) -> SchemaPlan {
        SchemaPlan {
            schema: schema(name),
            apps: apps.iter().map(|a| a.to_string()).collect(),
        }
    }

    #[tokio::test]
    async fn test_sequential_order_and_outcomes() {
        let op = FnSyncOperation::new(|_: &SchemaName, app: &AppId| {
            if app == "bad" {
                Err(OperationError::new("nope"))
            } else {
                Ok(())
            }
        });

        let plans = vec![plan("a", &["shop", "bad"]), plan("b", &["shop"])];
        let entries = run_sequential(&schema("public"), &plans, &op, None).await;

        assert_eq!(entries.len(), 3);
        assert_eq!(entries[0].schema, schema("a"));
        assert!(entries[0].outcome.is_applied());
        assert!(matches!(entries[1].outcome, SyncOutcome::Failed(_)));
        assert_eq!(entries[2].schema, schema("b"));
        assert!(entries[2].outcome.is_applied());
    }

    #[tokio::test]
    async fn test_panic_becomes_failure() {
        let op = FnSyncOperation::new(|_: &SchemaName, _: &AppId| -> Result<(), OperationError> {
            panic!("exploded")
        });

        let plans = vec![plan("a", &["shop"]), plan("b", &["shop"])];
        let entries = run_sequential(&schema("public"), &plans, &op, None).await;

        // The panic in schema a must not stop schema b.
        assert_eq!(entries.len(), 2);
        for entry in &entries {
            match &entry.outcome {
                SyncOutcome::Failed(e) => assert!(e.message().contains("panicked")),
                other => panic!("expected failure, got {other:?}"),
            }
        }
    }

    #[tokio::test]
    async fn test_parallel_results_in_schema_order() {
        let op: Arc<dyn SyncOperation> =
            Arc::new(FnSyncOperation::new(|_: &SchemaName, _: &AppId| Ok(())));

        let plans = vec![plan("c", &["shop"]), plan("a", &["shop"]), plan("b", &["shop"])];
        let entries = run_parallel(&schema("public"), plans, op, 2, None).await;

        let order: Vec<&str> = entries.iter().map(|e| e.schema.as_str()).collect();
        assert_eq!(order, vec!["a", "b", "c"]);
    }

    #[tokio::test]
    async fn test_timeout_becomes_failure() {
        struct Slow;

        #[async_trait::async_trait]
        impl SyncOperation for Slow {
            async fn apply(&self, _: &SchemaName, _: &AppId) -> Result<(), OperationError> {
                tokio::time::sleep(Duration::from_secs(60)).await;
                Ok(())
            }
        }

        let plans = vec![plan("a", &["shop"])];
        let entries =
            run_sequential(&schema("public"), &plans, &Slow, Some(Duration::from_millis(10)))
                .await;

        match &entries[0].outcome {
            SyncOutcome::Failed(e) => assert!(e.message().contains("timed out")),
            other => panic!("expected timeout failure, got {other:?}"),
        }
    }
}
