//! `strata migrate` command - per-schema SQL sync.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use strata_core::{AppId, SchemaName, Selector};
use strata_migrate::{OperationError, Orchestrator, SyncOperation, SyncOptions, SyncOutcome};
use strata_postgres::TenantPool;

use crate::cli::MigrateArgs;
use crate::config::load_config;
use crate::error::{CliError, CliResult};
use crate::output;

/// Run the migrate command
pub async fn run(args: MigrateArgs, config_path: Option<&Path>) -> CliResult<()> {
    output::header("Migrate");

    let config = load_config(config_path)?;
    let backend = crate::commands::connect(&config).await?;

    let selector = match &args.schema {
        Some(expr) => Selector::parse(expr),
        None => Selector::All,
    };

    output::kv("Selector", &selector.to_string());
    output::kv("Migrations", &args.migrations_dir.display().to_string());
    if args.parallel > 1 {
        output::kv("Parallelism", &args.parallel.to_string());
    }
    output::newline();

    let op = Arc::new(SqlSyncOperation {
        pool: backend.pool.clone(),
        migrations_dir: args.migrations_dir.clone(),
    });

    let mut options = SyncOptions::new().parallelism(args.parallel);
    if let Some(secs) = args.timeout {
        options = options.timeout(Duration::from_secs(secs));
    }

    let orchestrator =
        Orchestrator::new(backend.registry.clone(), backend.assignment).with_options(options);
    let report = orchestrator.run(&selector, op).await?;

    for entry in report.entries() {
        match &entry.outcome {
            SyncOutcome::Applied => {
                output::schema_line(
                    entry.schema.as_str(),
                    &format!("{} {}", entry.app, output::style_success("ok")),
                );
            }
            SyncOutcome::Failed(e) => {
                output::schema_line(
                    entry.schema.as_str(),
                    &format!("{} {} ({})", entry.app, output::style_error("failed"), e),
                );
            }
        }
    }

    output::newline();
    if report.has_failures() {
        let failed: Vec<String> = report
            .failed_schemas()
            .iter()
            .map(|s| s.to_string())
            .collect();
        output::warn(&format!("failed schemas: {}", failed.join(", ")));
        return Err(CliError::Sync(report.summary()));
    }

    output::success(&report.summary());
    Ok(())
}

/// Applies `<migrations_dir>/<app>.sql` inside each schema.
///
/// SQL files are expected to be idempotent (CREATE TABLE IF NOT EXISTS
/// and the like); a missing file means the application has nothing to
/// sync and is not an error.
struct SqlSyncOperation {
    pool: TenantPool,
    migrations_dir: PathBuf,
}

#[async_trait]
impl SyncOperation for SqlSyncOperation {
    async fn apply(&self, schema: &SchemaName, app: &AppId) -> Result<(), OperationError> {
        let path = self.migrations_dir.join(format!("{app}.sql"));
        let sql = match tokio::fs::read_to_string(&path).await {
            Ok(sql) => sql,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(()),
            Err(e) => {
                return Err(OperationError::new(format!(
                    "reading {}: {}",
                    path.display(),
                    e
                )));
            }
        };

        let mut conn = self
            .pool
            .get()
            .await
            .map_err(|e| OperationError::new(e.to_string()))?;
        conn.apply_schema(schema)
            .await
            .map_err(|e| OperationError::new(e.to_string()))?;
        conn.batch_execute(&sql)
            .await
            .map_err(|e| OperationError::new(format!("{}: {}", path.display(), e)))?;
        Ok(())
    }
}
