//! # strata-core
//!
//! Tenant model, host routing, and schema contexts for the Strata
//! multi-tenancy toolkit.
//!
//! This crate holds everything that does not need a live database:
//! - Validated [`SchemaName`]s, the injection boundary for namespace SQL
//! - [`TenantDescriptor`]s, static configuration, and the
//!   [`TenantRegistry`] with its [`DynamicTenantSource`] seam
//! - The [`DomainResolver`] mapping request hosts to tenants
//! - The per-unit-of-work [`SchemaContext`] stack
//! - [`Selector`] parsing and [`AppAssignment`]
//!
//! ## Example
//!
//! ```rust
//! use strata_core::{SchemaContext, SchemaName, StrataConfig, TenantRegistry};
//!
//! # fn main() -> Result<(), strata_core::TenancyError> {
//! let config = StrataConfig::from_str(r#"
//!     [tenants.blog]
//!     domains = ["blog.x.com"]
//!     apps = ["blog_app"]
//! "#)?;
//!
//! let _registry = TenantRegistry::from_config(&config);
//!
//! let ctx = SchemaContext::new(config.shared_schema().clone());
//! let _guard = ctx.activate(SchemaName::new("blog")?);
//! assert_eq!(ctx.current().as_str(), "blog");
//! # Ok(())
//! # }
//! ```

pub mod apps;
pub mod config;
pub mod context;
pub mod error;
pub mod registry;
pub mod routing;
pub mod schema;
pub mod selector;
pub mod tenant;

pub use apps::{AppAssignment, AppId};
pub use config::{StaticTenantConfig, StrataConfig, TenancyConfig};
pub use context::{SchemaContext, SchemaGuard};
pub use error::{TenancyError, TenancyResult};
pub use registry::{DynamicTenantSource, TenantRegistry};
pub use routing::{DomainResolver, normalize_host};
pub use schema::{MAX_SCHEMA_NAME_LEN, SchemaName};
pub use selector::{DYNAMIC_TOKEN, STATIC_TOKEN, Selector};
pub use tenant::{DomainRecord, TenantDescriptor, TenantKind};

/// Prelude for convenient imports.
pub mod prelude {
    pub use crate::apps::{AppAssignment, AppId};
    pub use crate::config::StrataConfig;
    pub use crate::context::SchemaContext;
    pub use crate::error::{TenancyError, TenancyResult};
    pub use crate::registry::{DynamicTenantSource, TenantRegistry};
    pub use crate::routing::DomainResolver;
    pub use crate::schema::SchemaName;
    pub use crate::selector::Selector;
    pub use crate::tenant::{DomainRecord, TenantDescriptor, TenantKind};
}
