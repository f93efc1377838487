//! CLI command implementations.

pub mod migrate;
pub mod repair;
pub mod tenant;
pub mod version;
pub mod whois;

use std::sync::Arc;

use strata_core::{AppAssignment, DynamicTenantSource, StrataConfig, TenantRegistry};
use strata_postgres::{TenantPool, TenantStore};

use crate::error::{CliError, CliResult};

/// Everything a database-backed command needs: the pool, the store, and
/// a registry wired to it.
pub(crate) struct Backend {
    pub pool: TenantPool,
    pub store: Arc<TenantStore>,
    pub registry: Arc<TenantRegistry>,
    pub assignment: AppAssignment,
}

/// Build the backend from configuration and ensure the store's tables
/// exist.
pub(crate) async fn connect(config: &StrataConfig) -> CliResult<Backend> {
    let url = config.database.url.as_deref().ok_or_else(|| {
        CliError::Config("database.url is not set in strata.toml".to_string())
    })?;
    let pool = TenantPool::builder()
        .url(url)
        .shared_schema(config.shared_schema().clone())
        .max_connections(config.database.pool.max_connections)
        .connect_timeout(std::time::Duration::from_secs(
            config.database.pool.connect_timeout_secs,
        ))
        .build()?;

    let registry = TenantRegistry::from_config(config);
    let store = Arc::new(TenantStore::new(
        pool.clone(),
        registry.reserved_names(),
        registry.static_domains(),
        config.tenancy.dynamic_apps.clone(),
    ));
    store.init().await?;

    let source: Arc<dyn DynamicTenantSource> = store.clone();
    let registry = Arc::new(registry.with_source(source));
    let assignment = AppAssignment::from_config(config);

    Ok(Backend {
        pool,
        store,
        registry,
        assignment,
    })
}

/// Registry for read-only commands: wired to the store when a database
/// URL is configured, static-only otherwise. Static-only deployments can
/// resolve and list without a running database.
pub(crate) async fn registry(config: &StrataConfig) -> CliResult<Arc<TenantRegistry>> {
    if config.database.url.is_some() {
        Ok(connect(config).await?.registry)
    } else {
        Ok(Arc::new(TenantRegistry::from_config(config)))
    }
}
