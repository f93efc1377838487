//! Integration tests for the sync orchestrator and schema contexts.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use strata_tenancy::migrate::{FnSyncOperation, OperationError, SyncOptions};
use strata_tenancy::{
    AppAssignment, Orchestrator, SchemaContext, SchemaName, Selector, StrataConfig,
    TenantRegistry,
};

const CONFIG: &str = r#"
    [database]
    url = "postgresql://localhost/app"

    [tenancy]
    dynamic_apps = ["shop"]

    [tenants.alpha]
    domains = ["alpha.x.com"]

    [tenants.beta]
    domains = ["beta.x.com"]

    [tenants.gamma]
    domains = ["gamma.x.com"]
"#;

fn fixture() -> (Arc<TenantRegistry>, AppAssignment) {
    let config = StrataConfig::from_str(CONFIG).unwrap();
    (
        Arc::new(TenantRegistry::from_config(&config)),
        AppAssignment::from_config(&config),
    )
}

/// A failing schema must not prevent the others from running, and every
/// schema must be attempted exactly once per application.
#[tokio::test]
async fn test_partial_failure_attempts_everything_once() {
    let (registry, assignment) = fixture();
    let orchestrator = Orchestrator::new(registry, assignment);

    let counts: Arc<BTreeMap<String, AtomicUsize>> = Arc::new(
        ["alpha", "beta", "gamma", "public"]
            .iter()
            .map(|s| (s.to_string(), AtomicUsize::new(0)))
            .collect(),
    );

    let op_counts = counts.clone();
    let op = Arc::new(FnSyncOperation::new(move |schema: &SchemaName, _: &String| {
        op_counts[schema.as_str()].fetch_add(1, Ordering::SeqCst);
        if schema == "beta" {
            Err(OperationError::new("simulated outage"))
        } else {
            Ok(())
        }
    }));

    let report = orchestrator.run(&Selector::All, op).await.unwrap();

    assert!(report.has_failures());
    assert_eq!(report.failed_schemas(), vec![SchemaName::new("beta").unwrap()]);

    // alpha and gamma each ran their single app once; beta was attempted
    // once despite failing; the shared schema has no apps configured here.
    assert_eq!(counts["alpha"].load(Ordering::SeqCst), 1);
    assert_eq!(counts["beta"].load(Ordering::SeqCst), 1);
    assert_eq!(counts["gamma"].load(Ordering::SeqCst), 1);
    assert_eq!(counts["public"].load(Ordering::SeqCst), 0);
}

/// Parallel execution produces the same report as sequential, entries in
/// schema order.
#[tokio::test]
async fn test_parallel_report_is_deterministic() {
    let (registry, assignment) = fixture();
    let orchestrator = Orchestrator::new(registry, assignment)
        .with_options(SyncOptions::new().parallelism(3));

    let op = Arc::new(FnSyncOperation::new(|schema: &SchemaName, _: &String| {
        if schema == "beta" {
            Err(OperationError::new("simulated outage"))
        } else {
            Ok(())
        }
    }));

    let report = orchestrator.run(&Selector::All, op).await.unwrap();

    let order: Vec<&str> = report.entries().iter().map(|e| e.schema.as_str()).collect();
    assert_eq!(order, vec!["alpha", "beta", "gamma"]);
    assert_eq!(report.applied_count(), 2);
    assert_eq!(report.failed_count(), 1);
}

/// Contexts on different tasks never see each other's activations.
#[tokio::test]
async fn test_context_isolation_across_tasks() {
    let shared = SchemaName::new("public").unwrap();

    let mut handles = Vec::new();
    for i in 0..8 {
        let shared = shared.clone();
        handles.push(tokio::spawn(async move {
            let ctx = SchemaContext::new(shared.clone());
            let mine = SchemaName::new(format!("tenant_{i}")).unwrap();

            let guard = ctx.activate(mine.clone());
            tokio::time::sleep(std::time::Duration::from_millis(5)).await;
            assert_eq!(ctx.current(), mine);
            drop(guard);

            assert_eq!(ctx.current(), shared);
        }));
    }

    for handle in handles {
        handle.await.unwrap();
    }
}

/// Nested activations unwind in order.
#[test]
fn test_context_nesting_unwinds() {
    let ctx = SchemaContext::new(SchemaName::new("public").unwrap());
    let outer = SchemaName::new("outer").unwrap();
    let inner = SchemaName::new("inner").unwrap();

    {
        let _outer = ctx.activate(outer.clone());
        {
            let _inner = ctx.activate(inner.clone());
            assert_eq!(ctx.current(), inner);
            assert_eq!(ctx.search_path(), vec![inner.clone(), ctx.shared().clone()]);
        }
        assert_eq!(ctx.current(), outer);
    }
    assert_eq!(ctx.current().as_str(), "public");
}
