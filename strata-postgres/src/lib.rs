//! PostgreSQL backend for Strata.
//!
//! Connection pooling with per-connection `search_path` tracking, the
//! schema switch itself, and the dynamic tenant store.
//!
//! ```no_run
//! use strata_core::SchemaName;
//! use strata_postgres::TenantPool;
//!
//! # async fn demo() -> strata_postgres::PgResult<()> {
//! let pool = TenantPool::builder()
//!     .url("postgres://localhost/app")
//!     .shared_schema(SchemaName::new("public")?)
//!     .build()?;
//!
//! let mut conn = pool.get().await?;
//! conn.apply_schema(&SchemaName::new("client1")?).await?;
//! let rows = conn.query("SELECT id FROM orders", &[]).await?;
//! # let _ = rows;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod connection;
pub mod error;
pub mod pool;
pub mod store;

pub use config::PgConfig;
pub use connection::TenantConnection;
pub use error::{PgError, PgResult};
pub use pool::{PoolOptions, PoolStatus, TenantPool, TenantPoolBuilder};
pub use store::{ReconcileReport, TenantStore};

/// Commonly used types.
pub mod prelude {
    pub use crate::config::PgConfig;
    pub use crate::connection::TenantConnection;
    pub use crate::error::{PgError, PgResult};
    pub use crate::pool::{PoolOptions, TenantPool};
    pub use crate::store::{ReconcileReport, TenantStore};
}
