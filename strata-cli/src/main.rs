//! Strata CLI - Command-line interface for the Strata multi-tenancy
//! toolkit.

use clap::Parser;
use tracing_subscriber::EnvFilter;

use strata_cli::cli::{Cli, Command};
use strata_cli::commands;
use strata_cli::error::CliResult;
use strata_cli::output;

#[tokio::main]
async fn main() {
    // Run the CLI and handle errors
    if let Err(e) = run().await {
        output::newline();
        output::error(&e.to_string());
        std::process::exit(1);
    }
}

async fn run() -> CliResult<()> {
    // Parse CLI arguments
    let cli = Cli::parse();

    init_tracing(cli.verbose);

    let config_path = cli.config.as_deref();

    // Run the appropriate command
    match cli.command {
        Command::Migrate(args) => commands::migrate::run(args, config_path).await,
        Command::Tenant(args) => commands::tenant::run(args, config_path).await,
        Command::Whois(args) => commands::whois::run(args, config_path).await,
        Command::Repair(args) => commands::repair::run(args, config_path).await,
        Command::Version => commands::version::run().await,
    }
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}
