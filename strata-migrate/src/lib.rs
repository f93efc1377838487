//! Per-schema sync orchestration for Strata.
//!
//! Runs an idempotent [`SyncOperation`] across every schema a
//! [`Selector`](strata_core::Selector) names, sequentially or in
//! parallel, and aggregates the outcomes into a [`SyncReport`]. One
//! schema's failure never aborts the run.
//!
//! ```
//! use std::sync::Arc;
//! use strata_core::{AppAssignment, AppId, SchemaName, Selector, StrataConfig, TenantRegistry};
//! use strata_migrate::{FnSyncOperation, Orchestrator};
//!
//! # async fn demo(config: StrataConfig) -> strata_migrate::SyncResult<()> {
//! let registry = Arc::new(TenantRegistry::from_config(&config));
//! let assignment = AppAssignment::from_config(&config);
//! let orchestrator = Orchestrator::new(registry, assignment);
//!
//! let op = Arc::new(FnSyncOperation::new(|schema: &SchemaName, app: &AppId| {
//!     println!("syncing {app} in {schema}");
//!     Ok(())
//! }));
//! let report = orchestrator.run(&Selector::Static, op).await?;
//! report.check()?;
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod executor;
pub mod operation;
pub mod orchestrator;
pub mod report;

pub use error::{OperationError, SyncError, SyncResult};
pub use executor::SchemaPlan;
pub use operation::{FnSyncOperation, SyncOperation};
pub use orchestrator::{Orchestrator, SyncOptions};
pub use report::{SyncEntry, SyncOutcome, SyncReport};

/// Commonly used types.
pub mod prelude {
    pub use crate::error::{OperationError, SyncError, SyncResult};
    pub use crate::operation::{FnSyncOperation, SyncOperation};
    pub use crate::orchestrator::{Orchestrator, SyncOptions};
    pub use crate::report::{SyncOutcome, SyncReport};
}
