//! Aggregated results of a sync run.

use strata_core::{AppId, SchemaName};

use crate::error::{OperationError, SyncError, SyncResult};

/// Outcome of one (schema, application) invocation.
#[derive(Debug, Clone)]
pub enum SyncOutcome {
    /// The operation returned successfully.
    Applied,
    /// The operation returned an error or panicked.
    Failed(OperationError),
}

impl SyncOutcome {
    /// Whether this outcome is a success.
    pub fn is_applied(&self) -> bool {
        matches!(self, SyncOutcome::Applied)
    }
}

/// One entry in a sync report.
#[derive(Debug, Clone)]
pub struct SyncEntry {
    /// The schema the operation ran in.
    pub schema: SchemaName,
    /// The application the operation ran for.
    pub app: AppId,
    /// What happened.
    pub outcome: SyncOutcome,
}

/// Everything that happened during one sync run.
///
/// Every selected (schema, app) pair appears exactly once, whatever its
/// outcome; a failure never removes later pairs from the report.
#[derive(Debug, Default)]
pub struct SyncReport {
    entries: Vec<SyncEntry>,
    /// Total wall-clock duration in milliseconds.
    pub duration_ms: i64,
}

impl SyncReport {
    /// Create an empty report.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a successful invocation.
    pub fn record_applied(&mut self, schema: SchemaName, app: AppId) {
        self.entries.push(SyncEntry {
            schema,
            app,
            outcome: SyncOutcome::Applied,
        });
    }

    /// Record a failed invocation.
    pub fn record_failed(&mut self, schema: SchemaName, app: AppId, error: OperationError) {
        self.entries.push(SyncEntry {
            schema,
            app,
            outcome: SyncOutcome::Failed(error),
        });
    }

    /// All entries, in execution order (schema order preserved).
    pub fn entries(&self) -> &[SyncEntry] {
        &self.entries
    }

    /// Number of successful invocations.
    pub fn applied_count(&self) -> usize {
        self.entries.iter().filter(|e| e.outcome.is_applied()).count()
    }

    /// Number of failed invocations.
    pub fn failed_count(&self) -> usize {
        self.entries.len() - self.applied_count()
    }

    /// Whether any invocation failed.
    pub fn has_failures(&self) -> bool {
        self.entries.iter().any(|e| !e.outcome.is_applied())
    }

    /// Distinct schemas touched by the run, in order.
    pub fn schemas(&self) -> Vec<SchemaName> {
        let mut schemas: Vec<SchemaName> =
            self.entries.iter().map(|e| e.schema.clone()).collect();
        schemas.dedup();
        schemas
    }

    /// Distinct schemas with at least one failure, sorted. Feed these back
    /// into a `Selector::Match` to re-run only the failed subset.
    pub fn failed_schemas(&self) -> Vec<SchemaName> {
        let mut failed: Vec<SchemaName> = self
            .entries
            .iter()
            .filter(|e| !e.outcome.is_applied())
            .map(|e| e.schema.clone())
            .collect();
        failed.sort();
        failed.dedup();
        failed
    }

    /// One-line human summary.
    pub fn summary(&self) -> String {
        let mut parts = Vec::new();

        let applied = self.applied_count();
        if applied > 0 {
            parts.push(format!("{applied} applied"));
        }

        let failed = self.failed_count();
        if failed > 0 {
            parts.push(format!("{failed} failed"));
        }

        if parts.is_empty() {
            "Nothing to sync".to_string()
        } else {
            format!(
                "{} across {} schemas in {}ms",
                parts.join(", "),
                self.schemas().len(),
                self.duration_ms
            )
        }
    }

    /// Turn failures into an error, keeping success as `Ok`.
    pub fn check(&self) -> SyncResult<()> {
        if self.has_failures() {
            Err(SyncError::PartialFailure {
                failed: self.failed_schemas().len(),
                total: self.schemas().len(),
            })
        } else {
            Ok(())
        }
    }
}
