//! The connection schema switch.
//!
//! Every statement issued through a [`TenantConnection`] runs under the
//! search path applied last. [`TenantConnection::apply_schema`] compares
//! the target against the connection's cached search path and issues the
//! `SET search_path` statement only on change, so connection reuse within
//! the pool costs no extra round-trips. Only validated [`SchemaName`]s can
//! reach the interpolation; raw strings have no path here.

use deadpool::managed::Object;
use tokio_postgres::Row;
use tokio_postgres::types::ToSql;
use tracing::{debug, trace};

use strata_core::{SchemaContext, SchemaName};

use crate::error::PgResult;
use crate::pool::TenantManager;

/// A pooled PostgreSQL connection with schema switching.
pub struct TenantConnection {
    inner: Object<TenantManager>,
    shared: SchemaName,
}

impl TenantConnection {
    pub(crate) fn new(inner: Object<TenantManager>, shared: SchemaName) -> Self {
        Self { inner, shared }
    }

    /// Apply a tenant schema to this connection.
    ///
    /// The resulting namespace list is the tenant schema followed by the
    /// shared schema, so shared-application tables resolve without
    /// qualification. Idempotent: a second call with the same schema
    /// issues no statement.
    pub async fn apply_schema(&mut self, schema: &SchemaName) -> PgResult<()> {
        let clause = search_path_clause(schema, &self.shared);
        if self.inner.search_path.as_deref() == Some(clause.as_str()) {
            trace!(schema = %schema, "search path already applied");
            return Ok(());
        }

        debug!(schema = %schema, search_path = %clause, "switching search path");
        self.inner
            .client
            .batch_execute(&format!("SET search_path TO {}", clause))
            .await?;
        self.inner.search_path = Some(clause);
        Ok(())
    }

    /// Apply the currently effective schema of a context.
    pub async fn apply_context(&mut self, ctx: &SchemaContext) -> PgResult<()> {
        self.apply_schema(&ctx.current()).await
    }

    /// The search path last applied on the underlying physical connection.
    pub fn last_search_path(&self) -> Option<&str> {
        self.inner.last_search_path()
    }

    /// The shared schema used as the namespace fallback.
    pub fn shared_schema(&self) -> &SchemaName {
        &self.shared
    }

    /// Execute a query and return all rows.
    pub async fn query(&self, sql: &str, params: &[&(dyn ToSql + Sync)]) -> PgResult<Vec<Row>> {
        trace!(sql = %sql, "executing query");
        Ok(self.inner.client.query(sql, params).await?)
    }

    /// Execute a query and return exactly one row.
    pub async fn query_one(&self, sql: &str, params: &[&(dyn ToSql + Sync)]) -> PgResult<Row> {
        trace!(sql = %sql, "executing query_one");
        Ok(self.inner.client.query_one(sql, params).await?)
    }

    /// Execute a query and return zero or one row.
    pub async fn query_opt(
        &self,
        sql: &str,
        params: &[&(dyn ToSql + Sync)],
    ) -> PgResult<Option<Row>> {
        trace!(sql = %sql, "executing query_opt");
        Ok(self.inner.client.query_opt(sql, params).await?)
    }

    /// Execute a statement and return the number of affected rows.
    pub async fn execute(&self, sql: &str, params: &[&(dyn ToSql + Sync)]) -> PgResult<u64> {
        trace!(sql = %sql, "executing statement");
        Ok(self.inner.client.execute(sql, params).await?)
    }

    /// Execute a batch of statements in a single round-trip.
    pub async fn batch_execute(&self, sql: &str) -> PgResult<()> {
        trace!(sql = %sql, "executing batch");
        Ok(self.inner.client.batch_execute(sql).await?)
    }

    /// Begin a transaction.
    ///
    /// Schema state applied before the transaction stays in effect. The
    /// switch cache does not track raw `SET search_path` statements issued
    /// inside a transaction; callers doing that must call
    /// [`apply_schema`](Self::apply_schema) again afterwards.
    pub async fn transaction(&mut self) -> PgResult<tokio_postgres::Transaction<'_>> {
        debug!("beginning transaction");
        Ok(self.inner.client.transaction().await?)
    }
}

/// Render the namespace list for `SET search_path`.
fn search_path_clause(schema: &SchemaName, shared: &SchemaName) -> String {
    if schema == shared {
        shared.quoted()
    } else {
        format!("{}, {}", schema.quoted(), shared.quoted())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn schema(name: &str) -> SchemaName {
        SchemaName::new(name).unwrap()
    }

    #[test]
    fn test_search_path_clause() {
        assert_eq!(
            search_path_clause(&schema("client1"), &schema("public")),
            "\"client1\", \"public\""
        );
    }

    #[test]
    fn test_search_path_clause_shared_active() {
        // The shared schema is not repeated when it is itself active.
        assert_eq!(
            search_path_clause(&schema("public"), &schema("public")),
            "\"public\""
        );
    }

    #[test]
    fn test_invalid_names_cannot_reach_interpolation() {
        // The switch only accepts SchemaName; construction is where an
        // injection attempt dies, before any statement exists.
        let err = SchemaName::new("client1\", \"admin").unwrap_err();
        assert!(matches!(
            err,
            strata_core::TenancyError::InvalidSchemaName { .. }
        ));
    }
}
