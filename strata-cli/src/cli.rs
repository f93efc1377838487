//! CLI argument definitions using clap.

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// Strata CLI - schema-per-tenant PostgreSQL management
#[derive(Parser, Debug)]
#[command(name = "strata")]
#[command(author = "Pegasus Heavy Industries LLC")]
#[command(version)]
#[command(about = "Strata CLI - schema-per-tenant PostgreSQL management", long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Path to the configuration file (defaults to discovering strata.toml)
    #[arg(short, long, global = true, env = "STRATA_CONFIG")]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Command,
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run per-schema sync operations
    Migrate(MigrateArgs),

    /// Manage dynamic tenants
    Tenant(TenantArgs),

    /// Show which tenant serves a host
    Whois(WhoisArgs),

    /// Detect and fix half-created tenants
    Repair(RepairArgs),

    /// Display version information
    Version,
}

// =============================================================================
// Migrate Command
// =============================================================================

/// Arguments for the `migrate` command
#[derive(Args, Debug)]
pub struct MigrateArgs {
    /// Schema selector: a schema name, a domain prefix, `:static:`, or
    /// `:dynamic:` (defaults to every schema)
    #[arg(short, long)]
    pub schema: Option<String>,

    /// Number of schemas to sync concurrently
    #[arg(short, long, default_value_t = 1)]
    pub parallel: usize,

    /// Per-application timeout in seconds
    #[arg(long)]
    pub timeout: Option<u64>,

    /// Directory holding per-application SQL files
    #[arg(short, long, default_value = "migrations")]
    pub migrations_dir: PathBuf,
}

// =============================================================================
// Tenant Command
// =============================================================================

/// Arguments for the `tenant` command
#[derive(Args, Debug)]
pub struct TenantArgs {
    #[command(subcommand)]
    pub command: TenantSubcommand,
}

/// Tenant subcommands
#[derive(Subcommand, Debug)]
pub enum TenantSubcommand {
    /// Create a dynamic tenant and its schema
    Create(TenantCreateArgs),

    /// Drop a dynamic tenant and its schema
    Drop(TenantDropArgs),

    /// List tenants matching a selector
    List(TenantListArgs),
}

/// Arguments for `tenant create`
#[derive(Args, Debug)]
pub struct TenantCreateArgs {
    /// Schema name for the new tenant
    pub schema: String,

    /// Domains to route to the tenant; the first becomes primary
    #[arg(short, long)]
    pub domain: Vec<String>,
}

/// Arguments for `tenant drop`
#[derive(Args, Debug)]
pub struct TenantDropArgs {
    /// Schema name of the tenant to drop
    pub schema: String,

    /// Skip the confirmation prompt
    #[arg(short, long)]
    pub force: bool,
}

/// Arguments for `tenant list`
#[derive(Args, Debug)]
pub struct TenantListArgs {
    /// Schema selector (defaults to every tenant)
    pub selector: Option<String>,
}

// =============================================================================
// Whois Command
// =============================================================================

/// Arguments for the `whois` command
#[derive(Args, Debug)]
pub struct WhoisArgs {
    /// Host to resolve, with or without a port
    pub host: String,
}

// =============================================================================
// Repair Command
// =============================================================================

/// Arguments for the `repair` command
#[derive(Args, Debug)]
pub struct RepairArgs {
    /// Apply fixes instead of only reporting
    #[arg(long)]
    pub fix: bool,

    /// When fixing, also drop schemas that have no tenant row
    #[arg(long)]
    pub drop_orphans: bool,
}
