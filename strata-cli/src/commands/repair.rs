//! `strata repair` command - reconcile tenant rows and namespaces.

use std::path::Path;

use crate::cli::RepairArgs;
use crate::config::load_config;
use crate::error::{CliError, CliResult};
use crate::output;

/// Run the repair command
pub async fn run(args: RepairArgs, config_path: Option<&Path>) -> CliResult<()> {
    output::header("Repair");

    let config = load_config(config_path)?;
    let backend = crate::commands::connect(&config).await?;

    let report = backend.store.reconcile().await?;

    if report.is_clean() {
        output::success("Tenant rows and schemas are in sync.");
        return Ok(());
    }

    if !report.missing_schemas.is_empty() {
        output::list("Tenant rows without a schema:");
        for schema in &report.missing_schemas {
            output::list_item(schema.as_str());
        }
        output::newline();
    }

    if !report.orphan_schemas.is_empty() {
        output::list("Schemas without a tenant row:");
        for schema in &report.orphan_schemas {
            output::list_item(schema.as_str());
        }
        output::newline();
    }

    if !args.fix {
        output::info("Run again with --fix to re-create missing schemas.");
        if !report.orphan_schemas.is_empty() {
            output::info("Add --drop-orphans to also drop unregistered schemas.");
        }
        return Err(CliError::Command(format!(
            "{} missing, {} orphaned",
            report.missing_schemas.len(),
            report.orphan_schemas.len()
        )));
    }

    let repaired = backend.store.repair(&report, args.drop_orphans).await?;
    output::success(&format!("Repaired {} schemas", repaired));

    if !args.drop_orphans && !report.orphan_schemas.is_empty() {
        output::warn(&format!(
            "{} orphan schemas left untouched (use --drop-orphans)",
            report.orphan_schemas.len()
        ));
    }
    Ok(())
}
