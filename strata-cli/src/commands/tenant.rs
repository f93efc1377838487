//! `strata tenant` commands - dynamic tenant management.

use std::path::Path;

use strata_core::tenant::DomainRecord;
use strata_core::{SchemaName, Selector, TenantKind};

use crate::cli::{TenantArgs, TenantCreateArgs, TenantDropArgs, TenantListArgs, TenantSubcommand};
use crate::config::load_config;
use crate::error::{CliError, CliResult};
use crate::output;

/// Run the tenant command
pub async fn run(args: TenantArgs, config_path: Option<&Path>) -> CliResult<()> {
    match args.command {
        TenantSubcommand::Create(create_args) => run_create(create_args, config_path).await,
        TenantSubcommand::Drop(drop_args) => run_drop(drop_args, config_path).await,
        TenantSubcommand::List(list_args) => run_list(list_args, config_path).await,
    }
}

/// Run `strata tenant create`
async fn run_create(args: TenantCreateArgs, config_path: Option<&Path>) -> CliResult<()> {
    output::header("Tenant Create");

    let config = load_config(config_path)?;
    let backend = crate::commands::connect(&config).await?;

    let schema = SchemaName::new(args.schema.as_str())?;

    // The first domain becomes primary, matching how static tenants are
    // configured.
    let mut domains = Vec::with_capacity(args.domain.len());
    for (i, domain) in args.domain.iter().enumerate() {
        domains.push(DomainRecord::new(domain.as_str(), i == 0)?);
    }

    let tenant = backend.store.create_tenant(&schema, &domains).await?;

    output::kv("Schema", tenant.schema_name.as_str());
    for domain in &tenant.domains {
        let label = if domain.is_primary {
            format!("{} (primary)", domain.domain)
        } else {
            domain.domain.clone()
        };
        output::kv("Domain", &label);
    }
    output::newline();
    output::success(&format!("Tenant '{}' created", schema));
    Ok(())
}

/// Run `strata tenant drop`
async fn run_drop(args: TenantDropArgs, config_path: Option<&Path>) -> CliResult<()> {
    output::header("Tenant Drop");

    let config = load_config(config_path)?;
    let backend = crate::commands::connect(&config).await?;

    let schema = SchemaName::new(args.schema.as_str())?;

    if !args.force {
        output::warn(&format!(
            "This drops schema '{}' and ALL data in it.",
            schema
        ));
        if !output::confirm("Continue?") {
            output::info("Aborted.");
            return Ok(());
        }
    }

    if backend.store.drop_tenant(&schema).await? {
        output::success(&format!("Tenant '{}' dropped", schema));
        Ok(())
    } else {
        Err(CliError::Command(format!(
            "no dynamic tenant named '{}'",
            schema
        )))
    }
}

/// Run `strata tenant list`
async fn run_list(args: TenantListArgs, config_path: Option<&Path>) -> CliResult<()> {
    output::header("Tenants");

    let config = load_config(config_path)?;
    let registry = crate::commands::registry(&config).await?;

    let selector = match &args.selector {
        Some(expr) => Selector::parse(expr),
        None => Selector::All,
    };

    let tenants = registry.list(&selector).await?;
    if tenants.is_empty() {
        output::info(&format!("No tenants match '{}'", selector));
        return Ok(());
    }

    for tenant in &tenants {
        let kind = match tenant.kind {
            TenantKind::Static => "static",
            TenantKind::Dynamic => "dynamic",
        };
        let mut line = format!("{} ({})", tenant.schema_name, kind);
        if let Some(primary) = tenant.primary_domain() {
            line.push_str(&format!(" - {}", primary));
        }
        if tenant.fallback {
            line.push_str(" [fallback]");
        }
        output::list_item(&line);
        for domain in tenant.domains.iter().filter(|d| !d.is_primary) {
            output::dim(&format!("      {}", domain.domain));
        }
    }

    output::newline();
    output::dim(&format!("{} tenants", tenants.len()));
    Ok(())
}
