//! The sync orchestrator.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::info;

use strata_core::{AppAssignment, Selector, TenantRegistry};

use crate::error::{SyncError, SyncResult};
use crate::executor::{self, SchemaPlan};
use crate::operation::SyncOperation;
use crate::report::SyncReport;

/// Execution options for a sync run.
#[derive(Debug, Clone)]
pub struct SyncOptions {
    /// Number of schemas in flight at once; 1 means sequential.
    pub parallelism: usize,
    /// Per-invocation timeout. `None` disables the limit.
    pub timeout: Option<Duration>,
}

impl Default for SyncOptions {
    fn default() -> Self {
        Self {
            parallelism: 1,
            timeout: None,
        }
    }
}

impl SyncOptions {
    /// Create default options.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the number of schemas in flight at once.
    pub fn parallelism(mut self, n: usize) -> Self {
        self.parallelism = n.max(1);
        self
    }

    /// Set the per-invocation timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

/// Runs a [`SyncOperation`] across every schema a selector names.
///
/// Schemas run in lexicographic order (or concurrently with ordered
/// results), each with its application list resolved through the
/// assignment table. One schema's failure never aborts the run; the
/// report carries every outcome.
pub struct Orchestrator {
    registry: Arc<TenantRegistry>,
    assignment: AppAssignment,
    options: SyncOptions,
}

impl Orchestrator {
    /// Create an orchestrator with default options.
    pub fn new(registry: Arc<TenantRegistry>, assignment: AppAssignment) -> Self {
        Self {
            registry,
            assignment,
            options: SyncOptions::default(),
        }
    }

    /// Replace the execution options.
    pub fn with_options(mut self, options: SyncOptions) -> Self {
        self.options = options;
        self
    }

    /// Run an operation across every schema the selector names.
    ///
    /// Fails fast with [`SyncError::EmptySelection`] when the selector
    /// matches nothing; otherwise always returns the full report, failures
    /// included. Use [`SyncReport::check`] to turn failures into an error.
    pub async fn run(
        &self,
        selector: &Selector,
        op: Arc<dyn SyncOperation>,
    ) -> SyncResult<SyncReport> {
        let tenants = self.registry.list(selector).await?;
        if tenants.is_empty() {
            return Err(SyncError::EmptySelection(selector.to_string()));
        }

        let plans: Vec<SchemaPlan> = tenants
            .iter()
            .map(|tenant| SchemaPlan {
                schema: tenant.schema_name.clone(),
                apps: self.assignment.applications_for(tenant).to_vec(),
            })
            .collect();

        info!(
            selector = %selector,
            schemas = plans.len(),
            parallelism = self.options.parallelism,
            "starting sync run"
        );

        let start = Instant::now();
        let shared = self.registry.shared_schema();
        let entries = if self.options.parallelism > 1 {
            executor::run_parallel(
                shared,
                plans,
                op,
                self.options.parallelism,
                self.options.timeout,
            )
            .await
        } else {
            executor::run_sequential(shared, &plans, op.as_ref(), self.options.timeout).await
        };

        let mut report = SyncReport::new();
        for entry in entries {
            match entry.outcome {
                crate::report::SyncOutcome::Applied => {
                    report.record_applied(entry.schema, entry.app)
                }
                crate::report::SyncOutcome::Failed(error) => {
                    report.record_failed(entry.schema, entry.app, error)
                }
            }
        }
        report.duration_ms = start.elapsed().as_millis() as i64;

        info!(summary = %report.summary(), "sync run finished");
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::OperationError;
    use crate::operation::FnSyncOperation;
    use pretty_assertions::assert_eq;
    use strata_core::{AppId, SchemaName, StrataConfig};

    const CONFIG: &str = r#"
        [database]
        url = "postgres://localhost/app"

        [tenancy]
        shared_schema = "public"
        dynamic_apps = ["shop"]

        [tenants.public]
        apps = ["core"]

        [tenants.alpha]
        domains = ["alpha.example.com"]

        [tenants.beta]
        domains = ["beta.example.com"]
        apps = ["shop", "blog"]
    "#;

    fn fixture() -> (Arc<TenantRegistry>, AppAssignment) {
        let config = StrataConfig::from_str(CONFIG).unwrap();
        (
            Arc::new(TenantRegistry::from_config(&config)),
            AppAssignment::from_config(&config),
        )
    }

    #[tokio::test]
    async fn test_run_static_selection() {
        let (registry, assignment) = fixture();
        let orchestrator = Orchestrator::new(registry, assignment);

        let op = Arc::new(FnSyncOperation::new(|_: &SchemaName, _: &AppId| Ok(())));
        let report = orchestrator
            .run(&Selector::Static, op)
            .await
            .unwrap();

        assert!(!report.has_failures());
        // alpha falls back to the dynamic default list, beta has its own
        // two apps, and the shared schema gets the shared list.
        assert_eq!(
            report
                .entries()
                .iter()
                .map(|e| (e.schema.as_str().to_string(), e.app.clone()))
                .collect::<Vec<_>>(),
            vec![
                ("alpha".to_string(), "shop".to_string()),
                ("beta".to_string(), "shop".to_string()),
                ("beta".to_string(), "blog".to_string()),
                ("public".to_string(), "core".to_string()),
            ]
        );
    }

    #[tokio::test]
    async fn test_empty_selection_is_an_error() {
        let (registry, assignment) = fixture();
        let orchestrator = Orchestrator::new(registry, assignment);

        let op = Arc::new(FnSyncOperation::new(|_: &SchemaName, _: &AppId| Ok(())));
        // No dynamic source configured, so :dynamic: matches nothing.
        let err = orchestrator
            .run(&Selector::Dynamic, op)
            .await
            .unwrap_err();

        assert!(matches!(err, SyncError::EmptySelection(_)));
    }

    #[tokio::test]
    async fn test_failures_do_not_stop_later_schemas() {
        let (registry, assignment) = fixture();
        let orchestrator = Orchestrator::new(registry, assignment);

        let op = Arc::new(FnSyncOperation::new(|schema: &SchemaName, _: &AppId| {
            if schema == "alpha" {
                Err(OperationError::new("bad wiring"))
            } else {
                Ok(())
            }
        }));

        let report = orchestrator.run(&Selector::Static, op).await.unwrap();

        assert!(report.has_failures());
        assert_eq!(
            report.failed_schemas(),
            vec![SchemaName::new("alpha").unwrap()]
        );
        // beta's two apps and the shared schema still ran.
        assert_eq!(report.applied_count(), 3);
        assert!(report.check().is_err());
    }

    #[tokio::test]
    async fn test_parallel_matches_sequential() {
        let (registry, assignment) = fixture();
        let orchestrator = Orchestrator::new(registry, assignment)
            .with_options(SyncOptions::new().parallelism(4));

        let op = Arc::new(FnSyncOperation::new(|_: &SchemaName, _: &AppId| Ok(())));
        let report = orchestrator.run(&Selector::Static, op).await.unwrap();

        assert_eq!(report.applied_count(), 4);
        let schemas: Vec<&str> = report
            .entries()
            .iter()
            .map(|e| e.schema.as_str())
            .collect();
        assert_eq!(schemas, vec!["alpha", "beta", "beta", "public"]);
    }
}
