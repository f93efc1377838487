//! Connection pooling with per-connection schema state.
//!
//! The pooled object is our own [`TenantClient`], not a bare driver
//! client, because the "last applied search path" must live on the
//! physical connection and survive release back into the pool: the next
//! borrower re-applies only if its schema differs. Pool borrow/release is
//! the sole synchronization boundary; a connection is never used by two
//! units of work at once.

use std::sync::Arc;
use std::time::Duration;

use deadpool::Runtime;
use deadpool::managed::{self, Metrics, RecycleError, RecycleResult};
use tokio_postgres::{Client, NoTls};
use tracing::{debug, info, warn};

use strata_core::SchemaName;

use crate::config::PgConfig;
use crate::connection::TenantConnection;
use crate::error::{PgError, PgResult};

/// A physical connection plus its connection-local schema cache.
pub struct TenantClient {
    pub(crate) client: Client,
    /// The search path last applied on this connection, verbatim.
    /// Deliberately retained across pool release.
    pub(crate) search_path: Option<String>,
}

impl TenantClient {
    /// The cached search path, if any statement has been issued.
    pub fn last_search_path(&self) -> Option<&str> {
        self.search_path.as_deref()
    }
}

/// Deadpool manager creating [`TenantClient`]s.
pub struct TenantManager {
    config: PgConfig,
}

impl TenantManager {
    /// Create a manager for the given connection configuration.
    pub fn new(config: PgConfig) -> Self {
        Self { config }
    }
}

impl managed::Manager for TenantManager {
    type Type = TenantClient;
    type Error = PgError;

    async fn create(&self) -> Result<TenantClient, PgError> {
        debug!(host = %self.config.host, database = %self.config.database, "opening connection");
        let (client, connection) = self.config.to_pg_config().connect(NoTls).await?;

        // The driver requires its connection future to be polled for the
        // client to make progress.
        tokio::spawn(async move {
            if let Err(e) = connection.await {
                warn!(error = %e, "postgres connection terminated");
            }
        });

        Ok(TenantClient {
            client,
            search_path: None,
        })
    }

    async fn recycle(
        &self,
        client: &mut TenantClient,
        _metrics: &Metrics,
    ) -> RecycleResult<PgError> {
        if client.client.is_closed() {
            return Err(RecycleError::message("connection closed"));
        }
        // The cached search path is kept: the next borrower re-applies
        // only when its schema differs from the last one used here.
        Ok(())
    }
}

/// A connection pool whose connections carry schema state.
#[derive(Clone)]
pub struct TenantPool {
    inner: managed::Pool<TenantManager>,
    config: Arc<PgConfig>,
    shared: SchemaName,
}

impl TenantPool {
    /// Create a pool with default options.
    pub fn new(config: PgConfig, shared: SchemaName) -> PgResult<Self> {
        Self::with_options(config, shared, PoolOptions::default())
    }

    /// Create a pool with explicit options.
    pub fn with_options(
        config: PgConfig,
        shared: SchemaName,
        options: PoolOptions,
    ) -> PgResult<Self> {
        let manager = TenantManager::new(config.clone());

        let pool = managed::Pool::builder(manager)
            .max_size(options.max_connections)
            .wait_timeout(options.connect_timeout)
            .create_timeout(options.connect_timeout)
            .runtime(Runtime::Tokio1)
            .build()
            .map_err(|e| PgError::config(format!("failed to create pool: {}", e)))?;

        info!(
            host = %config.host,
            port = %config.port,
            database = %config.database,
            shared_schema = %shared,
            max_connections = %options.max_connections,
            "PostgreSQL connection pool created"
        );

        Ok(Self {
            inner: pool,
            config: Arc::new(config),
            shared,
        })
    }

    /// Create a builder for configuring the pool.
    pub fn builder() -> TenantPoolBuilder {
        TenantPoolBuilder::new()
    }

    /// Borrow a connection from the pool.
    ///
    /// The returned connection starts in whatever schema state its
    /// physical connection last had; callers apply their own context
    /// before issuing statements.
    pub async fn get(&self) -> PgResult<TenantConnection> {
        debug!("acquiring connection from pool");
        let client = self.inner.get().await?;
        Ok(TenantConnection::new(client, self.shared.clone()))
    }

    /// The reserved shared schema used as the search-path fallback.
    pub fn shared_schema(&self) -> &SchemaName {
        &self.shared
    }

    /// The connection configuration.
    pub fn config(&self) -> &PgConfig {
        &self.config
    }

    /// Current pool status.
    pub fn status(&self) -> PoolStatus {
        let status = self.inner.status();
        PoolStatus {
            available: status.available,
            size: status.size,
            max_size: status.max_size,
            waiting: status.waiting,
        }
    }

    /// Check if the pool can produce a working connection.
    pub async fn is_healthy(&self) -> bool {
        match self.inner.get().await {
            Ok(client) => client.client.query_one("SELECT 1", &[]).await.is_ok(),
            Err(_) => false,
        }
    }

    /// Close the pool and all connections.
    pub fn close(&self) {
        self.inner.close();
        info!("PostgreSQL connection pool closed");
    }
}

/// Pool status information.
#[derive(Debug, Clone)]
pub struct PoolStatus {
    /// Number of available (idle) connections.
    pub available: usize,
    /// Current total size of the pool.
    pub size: usize,
    /// Maximum size of the pool.
    pub max_size: usize,
    /// Number of tasks waiting for a connection.
    pub waiting: usize,
}

/// Options for the connection pool.
#[derive(Debug, Clone)]
pub struct PoolOptions {
    /// Maximum number of connections in the pool.
    pub max_connections: usize,
    /// Maximum time to wait for a connection.
    pub connect_timeout: Option<Duration>,
}

impl Default for PoolOptions {
    fn default() -> Self {
        Self {
            max_connections: 10,
            connect_timeout: Some(Duration::from_secs(30)),
        }
    }
}

/// Builder for creating a [`TenantPool`].
#[derive(Debug, Default)]
pub struct TenantPoolBuilder {
    url: Option<String>,
    config: Option<PgConfig>,
    shared: Option<SchemaName>,
    options: PoolOptions,
}

impl TenantPoolBuilder {
    /// Create a new pool builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the database URL.
    pub fn url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    /// Set an explicit connection configuration.
    pub fn config(mut self, config: PgConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Set the shared schema (defaults to `public`).
    pub fn shared_schema(mut self, shared: SchemaName) -> Self {
        self.shared = Some(shared);
        self
    }

    /// Set the maximum number of connections.
    pub fn max_connections(mut self, n: usize) -> Self {
        self.options.max_connections = n;
        self
    }

    /// Set the connection acquisition timeout.
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.options.connect_timeout = Some(timeout);
        self
    }

    /// Build the pool.
    pub fn build(self) -> PgResult<TenantPool> {
        let config = if let Some(config) = self.config {
            config
        } else if let Some(url) = self.url {
            PgConfig::from_url(url)?
        } else {
            return Err(PgError::config("no database URL or config provided"));
        };

        let shared = match self.shared {
            Some(shared) => shared,
            None => SchemaName::new("public").map_err(PgError::from)?,
        };

        TenantPool::with_options(config, shared, self.options)
    }
}
