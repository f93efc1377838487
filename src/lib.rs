//! # Strata
//!
//! Schema-per-tenant multi-tenancy for PostgreSQL.
//!
//! Strata keeps every tenant in its own PostgreSQL schema and provides:
//! - A tenant registry combining static (configured) and dynamic
//!   (database-backed) tenants
//! - Host-to-tenant routing with a fallback tenant
//! - A re-entrant schema context and an idempotent connection
//!   `search_path` switch
//! - A per-schema sync orchestrator with sequential and parallel
//!   executors
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use strata_tenancy::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), TenancyError> {
//!     let config = StrataConfig::from_file("strata.toml")?;
//!     let registry = TenantRegistry::from_config(&config);
//!
//!     let resolver = DomainResolver::new(&registry);
//!     let tenant = resolver.resolve_host("blog.example.com:443").await?;
//!
//!     let ctx = SchemaContext::new(config.shared_schema().clone());
//!     let _guard = ctx.activate(tenant.schema_name.clone());
//!     // Queries through a TenantConnection now run in the tenant's
//!     // schema, with the shared schema still on the search path.
//!
//!     Ok(())
//! }
//! ```

#![cfg_attr(docsrs, feature(doc_cfg))]
#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

/// Tenant model, routing, contexts, and configuration.
pub mod core {
    pub use strata_core::*;
}

/// PostgreSQL pooling, schema switching, and the dynamic tenant store.
pub mod postgres {
    pub use strata_postgres::*;
}

/// Per-schema sync orchestration.
pub mod migrate {
    pub use strata_migrate::*;
}

/// Prelude module for convenient imports.
pub mod prelude {
    pub use strata_core::prelude::*;
    pub use strata_migrate::prelude::*;
    pub use strata_postgres::prelude::*;
}

// Re-export key types at the crate root
pub use strata_core::{
    AppAssignment, DomainResolver, SchemaContext, SchemaName, Selector, StrataConfig,
    TenancyError, TenancyResult, TenantDescriptor, TenantRegistry,
};
pub use strata_migrate::{Orchestrator, SyncReport};
pub use strata_postgres::{TenantConnection, TenantPool, TenantStore};
