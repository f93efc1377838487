//! The dynamic tenant store.
//!
//! Tenant and domain records live in tables owned by the shared schema.
//! Creating a tenant is a two-step operation with no single atomic
//! primitive spanning namespace DDL and row DML: the namespace is created
//! first, then the registry row. Deletion reverses the order (row first,
//! then namespace). A failure between the two steps leaves a detectable
//! half-state that [`TenantStore::reconcile`] finds and
//! [`TenantStore::repair`] re-drives.

use std::collections::{BTreeMap, BTreeSet};

use async_trait::async_trait;
use tracing::{info, warn};

use strata_core::{
    AppId, DynamicTenantSource, SchemaName, TenancyResult, TenantDescriptor,
};
use strata_core::tenant::DomainRecord;

use crate::connection::TenantConnection;
use crate::error::{PgError, PgResult};
use crate::pool::TenantPool;

/// Table holding one row per dynamic tenant.
pub const TENANTS_TABLE: &str = "strata_tenants";

/// Table holding domain records, cascade-deleted with their tenant.
pub const DOMAINS_TABLE: &str = "strata_domains";

/// CRUD for dynamic tenants, including the physical namespace.
pub struct TenantStore {
    pool: TenantPool,
    /// Names owned by configuration: the shared schema and every static
    /// tenant. Dynamic creation rejects them up front so a dynamic tenant
    /// can never collide with (or shadow) a static one.
    reserved: BTreeSet<SchemaName>,
    /// Domains owned by static tenants, lowercased. Static domains win in
    /// routing, so a dynamic domain colliding with one would never be
    /// reachable; creation rejects the collision instead.
    static_domains: BTreeSet<String>,
    /// Application list attached to descriptors read from the store.
    dynamic_apps: Vec<AppId>,
}

impl TenantStore {
    /// Create a store over a pool.
    ///
    /// `reserved` and `static_domains` are typically
    /// [`TenantRegistry::reserved_names`](strata_core::TenantRegistry::reserved_names)
    /// and
    /// [`TenantRegistry::static_domains`](strata_core::TenantRegistry::static_domains).
    pub fn new(
        pool: TenantPool,
        reserved: impl IntoIterator<Item = SchemaName>,
        static_domains: impl IntoIterator<Item = String>,
        dynamic_apps: Vec<AppId>,
    ) -> Self {
        Self {
            pool,
            reserved: reserved.into_iter().collect(),
            static_domains: static_domains
                .into_iter()
                .map(|d| d.to_ascii_lowercase())
                .collect(),
            dynamic_apps,
        }
    }

    fn check_domain_free(&self, domain: &str) -> PgResult<()> {
        if self.static_domains.contains(domain) {
            return Err(PgError::conflict(format!(
                "domain '{}' belongs to a static tenant",
                domain
            )));
        }
        Ok(())
    }

    fn shared(&self) -> &SchemaName {
        self.pool.shared_schema()
    }

    fn tenants_table(&self) -> String {
        format!("{}.\"{}\"", self.shared().quoted(), TENANTS_TABLE)
    }

    fn domains_table(&self) -> String {
        format!("{}.\"{}\"", self.shared().quoted(), DOMAINS_TABLE)
    }

    /// Create the tenant and domain tables if they do not exist.
    pub async fn init(&self) -> PgResult<()> {
        let conn = self.pool.get().await?;
        let sql = format!(
            r#"
            CREATE TABLE IF NOT EXISTS {tenants} (
                schema_name VARCHAR(63) PRIMARY KEY,
                created_at TIMESTAMP WITH TIME ZONE NOT NULL DEFAULT NOW()
            );

            CREATE TABLE IF NOT EXISTS {domains} (
                domain VARCHAR(253) PRIMARY KEY,
                schema_name VARCHAR(63) NOT NULL
                    REFERENCES {tenants} (schema_name) ON DELETE CASCADE,
                is_primary BOOLEAN NOT NULL DEFAULT FALSE
            );

            CREATE INDEX IF NOT EXISTS "strata_domains_schema_idx"
                ON {domains} (schema_name);

            CREATE UNIQUE INDEX IF NOT EXISTS "strata_domains_one_primary_idx"
                ON {domains} (schema_name) WHERE is_primary;
            "#,
            tenants = self.tenants_table(),
            domains = self.domains_table(),
        );
        conn.batch_execute(&sql).await?;
        Ok(())
    }

    /// Create a dynamic tenant: the physical namespace first, then the
    /// registry row and its domains.
    ///
    /// Name and domain collisions with static tenants are rejected
    /// locally; a collision with another dynamic tenant (or a leftover
    /// namespace) surfaces as [`PgError::Conflict`] from the database.
    pub async fn create_tenant(
        &self,
        schema: &SchemaName,
        domains: &[DomainRecord],
    ) -> PgResult<TenantDescriptor> {
        if self.reserved.contains(schema) {
            return Err(PgError::conflict(format!(
                "schema name '{}' is reserved by static configuration",
                schema
            )));
        }
        let primaries = domains.iter().filter(|d| d.is_primary).count();
        if primaries > 1 {
            return Err(PgError::conflict(format!(
                "tenant '{}' declares {} primary domains, at most one allowed",
                schema, primaries
            )));
        }
        for domain in domains {
            self.check_domain_free(&domain.domain)?;
        }

        let mut conn = self.pool.get().await?;

        // Step one: the namespace. No IF NOT EXISTS: an existing schema of
        // this name is a conflict, not something to adopt silently.
        conn.batch_execute(&format!("CREATE SCHEMA {}", schema.quoted()))
            .await
            .map_err(|e| e.into_conflict(format!("schema '{}' already exists", schema)))?;

        // Step two: the registry row and domains, atomically. A failure
        // here leaves a namespace without a row; reconcile() reports it.
        let txn = conn.transaction().await?;
        let insert_tenant =
            format!("INSERT INTO {} (schema_name) VALUES ($1)", self.tenants_table());
        txn.execute(insert_tenant.as_str(), &[&schema.as_str()])
            .await
            .map_err(PgError::from)
            .map_err(|e| e.into_conflict(format!("tenant '{}' already registered", schema)))?;

        let insert_domain = format!(
            "INSERT INTO {} (domain, schema_name, is_primary) VALUES ($1, $2, $3)",
            self.domains_table()
        );
        for domain in domains {
            txn.execute(
                insert_domain.as_str(),
                &[&domain.domain, &schema.as_str(), &domain.is_primary],
            )
            .await
            .map_err(PgError::from)
            .map_err(|e| {
                e.into_conflict(format!("domain '{}' already registered", domain.domain))
            })?;
        }
        txn.commit().await?;

        info!(schema = %schema, domains = domains.len(), "created dynamic tenant");
        let mut descriptor =
            TenantDescriptor::new_dynamic(schema.clone()).with_apps(self.dynamic_apps.clone());
        descriptor.domains = domains.to_vec();
        Ok(descriptor)
    }

    /// Drop a dynamic tenant: the registry row first (cascading its
    /// domains), then the physical namespace.
    ///
    /// Returns `false` when no such tenant row existed. The namespace drop
    /// uses IF EXISTS so a previous half-failed drop can be re-driven.
    pub async fn drop_tenant(&self, schema: &SchemaName) -> PgResult<bool> {
        if self.reserved.contains(schema) {
            return Err(PgError::conflict(format!(
                "'{}' is a static schema and cannot be dropped here",
                schema
            )));
        }

        let conn = self.pool.get().await?;
        let deleted = conn
            .execute(
                &format!("DELETE FROM {} WHERE schema_name = $1", self.tenants_table()),
                &[&schema.as_str()],
            )
            .await?;

        conn.batch_execute(&format!("DROP SCHEMA IF EXISTS {} CASCADE", schema.quoted()))
            .await?;

        if deleted > 0 {
            info!(schema = %schema, "dropped dynamic tenant");
        }
        Ok(deleted > 0)
    }

    /// Attach a domain to an existing tenant. When `is_primary` is set,
    /// the previous primary (if any) is demoted in the same transaction.
    pub async fn add_domain(&self, schema: &SchemaName, domain: DomainRecord) -> PgResult<()> {
        self.check_domain_free(&domain.domain)?;

        let mut conn = self.pool.get().await?;
        let txn = conn.transaction().await?;

        if domain.is_primary {
            let demote = format!(
                "UPDATE {} SET is_primary = FALSE WHERE schema_name = $1 AND is_primary",
                self.domains_table()
            );
            txn.execute(demote.as_str(), &[&schema.as_str()]).await?;
        }

        let insert = format!(
            "INSERT INTO {} (domain, schema_name, is_primary) VALUES ($1, $2, $3)",
            self.domains_table()
        );
        txn.execute(
            insert.as_str(),
            &[&domain.domain, &schema.as_str(), &domain.is_primary],
        )
        .await
        .map_err(PgError::from)
        .map_err(|e| e.into_conflict(format!("domain '{}' already registered", domain.domain)))?;

        txn.commit().await?;
        Ok(())
    }

    /// Remove a domain. Returns `false` when it was not registered.
    pub async fn remove_domain(&self, domain: &str) -> PgResult<bool> {
        let conn = self.pool.get().await?;
        let deleted = conn
            .execute(
                &format!("DELETE FROM {} WHERE domain = $1", self.domains_table()),
                &[&domain.to_ascii_lowercase()],
            )
            .await?;
        Ok(deleted > 0)
    }

    /// Look up a dynamic tenant by schema name.
    pub async fn get_tenant(&self, schema: &SchemaName) -> PgResult<Option<TenantDescriptor>> {
        let conn = self.pool.get().await?;
        let row = conn
            .query_opt(
                &format!(
                    "SELECT schema_name FROM {} WHERE schema_name = $1",
                    self.tenants_table()
                ),
                &[&schema.as_str()],
            )
            .await?;

        match row {
            Some(_) => Ok(Some(self.load_descriptor(&conn, schema).await?)),
            None => Ok(None),
        }
    }

    /// All dynamic tenants, in schema-name order.
    pub async fn list_tenants(&self) -> PgResult<Vec<TenantDescriptor>> {
        let conn = self.pool.get().await?;
        let rows = conn
            .query(
                &format!(
                    "SELECT schema_name FROM {} ORDER BY schema_name",
                    self.tenants_table()
                ),
                &[],
            )
            .await?;

        let mut domains_by_schema = self.load_all_domains(&conn).await?;

        let mut tenants = Vec::with_capacity(rows.len());
        for row in rows {
            let schema = SchemaName::new(row.get::<_, String>(0))?;
            let mut descriptor = TenantDescriptor::new_dynamic(schema.clone())
                .with_apps(self.dynamic_apps.clone());
            descriptor.domains = domains_by_schema.remove(&schema).unwrap_or_default();
            tenants.push(descriptor);
        }
        Ok(tenants)
    }

    /// The tenant owning a domain, if any.
    pub async fn tenant_by_domain(&self, domain: &str) -> PgResult<Option<TenantDescriptor>> {
        let conn = self.pool.get().await?;
        let row = conn
            .query_opt(
                &format!(
                    "SELECT schema_name FROM {} WHERE domain = $1",
                    self.domains_table()
                ),
                &[&domain.to_ascii_lowercase()],
            )
            .await?;

        match row {
            Some(row) => {
                let schema = SchemaName::new(row.get::<_, String>(0))?;
                Ok(Some(self.load_descriptor(&conn, &schema).await?))
            }
            None => Ok(None),
        }
    }

    /// All tenants with a domain starting with the given prefix.
    pub async fn tenants_by_domain_prefix(
        &self,
        prefix: &str,
    ) -> PgResult<Vec<TenantDescriptor>> {
        let conn = self.pool.get().await?;
        let pattern = format!("{}%", escape_like(&prefix.to_ascii_lowercase()));
        let rows = conn
            .query(
                &format!(
                    "SELECT DISTINCT schema_name FROM {} WHERE domain LIKE $1 ORDER BY schema_name",
                    self.domains_table()
                ),
                &[&pattern],
            )
            .await?;

        let mut tenants = Vec::with_capacity(rows.len());
        for row in rows {
            let schema = SchemaName::new(row.get::<_, String>(0))?;
            tenants.push(self.load_descriptor(&conn, &schema).await?);
        }
        Ok(tenants)
    }

    /// Compare registry rows against physical namespaces.
    pub async fn reconcile(&self) -> PgResult<ReconcileReport> {
        let conn = self.pool.get().await?;

        let namespace_rows = conn
            .query(
                "SELECT nspname FROM pg_catalog.pg_namespace \
                 WHERE nspname NOT LIKE 'pg\\_%' AND nspname <> 'information_schema'",
                &[],
            )
            .await?;
        let mut namespaces = BTreeSet::new();
        for row in namespace_rows {
            // Namespaces created outside Strata may carry names our
            // validator rejects; those are simply not ours to manage.
            if let Ok(name) = SchemaName::new(row.get::<_, String>(0)) {
                namespaces.insert(name);
            }
        }

        let tenant_rows = conn
            .query(
                &format!("SELECT schema_name FROM {}", self.tenants_table()),
                &[],
            )
            .await?;
        let mut registered = BTreeSet::new();
        for row in tenant_rows {
            registered.insert(SchemaName::new(row.get::<_, String>(0))?);
        }

        let orphan_schemas: Vec<SchemaName> = namespaces
            .iter()
            .filter(|n| !registered.contains(*n) && !self.reserved.contains(*n))
            .cloned()
            .collect();
        let missing_schemas: Vec<SchemaName> = registered
            .iter()
            .filter(|n| !namespaces.contains(*n))
            .cloned()
            .collect();

        if !orphan_schemas.is_empty() || !missing_schemas.is_empty() {
            warn!(
                orphans = orphan_schemas.len(),
                missing = missing_schemas.len(),
                "tenant store out of sync with physical namespaces"
            );
        }

        Ok(ReconcileReport {
            orphan_schemas,
            missing_schemas,
        })
    }

    /// Re-drive half-finished creations and, optionally, half-finished
    /// drops.
    ///
    /// Missing namespaces (row without schema) are always created, since
    /// the row is the authoritative intent. Orphan namespaces (schema
    /// without row) are only dropped when `drop_orphans` is set, because
    /// an orphan may also be a namespace Strata never owned.
    pub async fn repair(&self, report: &ReconcileReport, drop_orphans: bool) -> PgResult<usize> {
        let conn = self.pool.get().await?;
        let mut repaired = 0;

        for schema in &report.missing_schemas {
            conn.batch_execute(&format!("CREATE SCHEMA IF NOT EXISTS {}", schema.quoted()))
                .await?;
            info!(schema = %schema, "re-created missing namespace");
            repaired += 1;
        }

        if drop_orphans {
            for schema in &report.orphan_schemas {
                conn.batch_execute(&format!(
                    "DROP SCHEMA IF EXISTS {} CASCADE",
                    schema.quoted()
                ))
                .await?;
                info!(schema = %schema, "dropped orphan namespace");
                repaired += 1;
            }
        }

        Ok(repaired)
    }

    async fn load_descriptor(
        &self,
        conn: &TenantConnection,
        schema: &SchemaName,
    ) -> PgResult<TenantDescriptor> {
        let rows = conn
            .query(
                &format!(
                    "SELECT domain, is_primary FROM {} WHERE schema_name = $1 ORDER BY domain",
                    self.domains_table()
                ),
                &[&schema.as_str()],
            )
            .await?;

        let mut descriptor =
            TenantDescriptor::new_dynamic(schema.clone()).with_apps(self.dynamic_apps.clone());
        descriptor.domains = rows
            .iter()
            .map(|row| DomainRecord {
                domain: row.get(0),
                is_primary: row.get(1),
            })
            .collect();
        Ok(descriptor)
    }

    async fn load_all_domains(
        &self,
        conn: &TenantConnection,
    ) -> PgResult<BTreeMap<SchemaName, Vec<DomainRecord>>> {
        let rows = conn
            .query(
                &format!(
                    "SELECT schema_name, domain, is_primary FROM {} ORDER BY domain",
                    self.domains_table()
                ),
                &[],
            )
            .await?;

        let mut by_schema: BTreeMap<SchemaName, Vec<DomainRecord>> = BTreeMap::new();
        for row in rows {
            let schema = SchemaName::new(row.get::<_, String>(0))?;
            by_schema.entry(schema).or_default().push(DomainRecord {
                domain: row.get(1),
                is_primary: row.get(2),
            });
        }
        Ok(by_schema)
    }
}

/// Result of comparing tenant rows against physical namespaces.
#[derive(Debug, Clone, Default)]
pub struct ReconcileReport {
    /// Namespaces with no tenant row (half-finished create or drop, or a
    /// foreign namespace).
    pub orphan_schemas: Vec<SchemaName>,
    /// Tenant rows whose namespace is missing.
    pub missing_schemas: Vec<SchemaName>,
}

impl ReconcileReport {
    /// True when rows and namespaces agree.
    pub fn is_clean(&self) -> bool {
        self.orphan_schemas.is_empty() && self.missing_schemas.is_empty()
    }
}

#[async_trait]
impl DynamicTenantSource for TenantStore {
    async fn get(&self, schema: &SchemaName) -> TenancyResult<Option<TenantDescriptor>> {
        Ok(self.get_tenant(schema).await?)
    }

    async fn all(&self) -> TenancyResult<Vec<TenantDescriptor>> {
        Ok(self.list_tenants().await?)
    }

    async fn find_by_domain(&self, domain: &str) -> TenancyResult<Option<TenantDescriptor>> {
        Ok(self.tenant_by_domain(domain).await?)
    }

    async fn find_by_domain_prefix(
        &self,
        prefix: &str,
    ) -> TenancyResult<Vec<TenantDescriptor>> {
        Ok(self.tenants_by_domain_prefix(prefix).await?)
    }
}

/// Escape LIKE metacharacters so a prefix matches literally.
fn escape_like(s: &str) -> String {
    s.replace('\\', "\\\\").replace('%', "\\%").replace('_', "\\_")
}
