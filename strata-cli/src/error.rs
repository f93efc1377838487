//! CLI error types and result alias.

use miette::Diagnostic;
use thiserror::Error;

/// Result type alias for CLI operations
pub type CliResult<T> = Result<T, CliError>;

/// CLI error types
#[derive(Error, Debug, Diagnostic)]
pub enum CliError {
    /// IO error
    #[error("IO error: {0}")]
    #[diagnostic(code(strata::io))]
    Io(#[from] std::io::Error),

    /// Configuration error
    #[error("Configuration error: {0}")]
    #[diagnostic(code(strata::config))]
    Config(String),

    /// Tenancy error (registry, routing, validation)
    #[error("Tenancy error: {0}")]
    #[diagnostic(code(strata::tenancy))]
    Tenancy(String),

    /// Database error
    #[error("Database error: {0}")]
    #[diagnostic(code(strata::database))]
    Database(String),

    /// Sync run error
    #[error("Sync error: {0}")]
    #[diagnostic(code(strata::sync))]
    Sync(String),

    /// Command error
    #[error("Command error: {0}")]
    #[diagnostic(code(strata::command))]
    Command(String),
}

impl From<strata_core::TenancyError> for CliError {
    fn from(err: strata_core::TenancyError) -> Self {
        CliError::Tenancy(err.to_string())
    }
}

impl From<strata_postgres::PgError> for CliError {
    fn from(err: strata_postgres::PgError) -> Self {
        CliError::Database(err.to_string())
    }
}

impl From<strata_migrate::SyncError> for CliError {
    fn from(err: strata_migrate::SyncError) -> Self {
        CliError::Sync(err.to_string())
    }
}

impl From<toml::de::Error> for CliError {
    fn from(err: toml::de::Error) -> Self {
        CliError::Config(format!("Failed to parse TOML: {}", err))
    }
}
