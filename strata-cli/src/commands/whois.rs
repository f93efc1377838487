//! `strata whois` command - resolve a host to its tenant.

use std::path::Path;

use strata_core::{DomainResolver, TenantKind, normalize_host};

use crate::cli::WhoisArgs;
use crate::config::load_config;
use crate::error::CliResult;
use crate::output;

/// Run the whois command
pub async fn run(args: WhoisArgs, config_path: Option<&Path>) -> CliResult<()> {
    output::header("Whois");

    let config = load_config(config_path)?;
    let registry = crate::commands::registry(&config).await?;

    let resolver = DomainResolver::new(&registry);
    let tenant = resolver.resolve_host(&args.host).await?;

    let kind = match tenant.kind {
        TenantKind::Static => "static",
        TenantKind::Dynamic => "dynamic",
    };

    output::kv("Host", &normalize_host(&args.host));
    output::kv("Schema", tenant.schema_name.as_str());
    output::kv("Kind", kind);
    if let Some(primary) = tenant.primary_domain() {
        output::kv("Primary domain", primary);
    }
    if tenant.fallback {
        output::kv("Fallback", "yes");
    }
    Ok(())
}
