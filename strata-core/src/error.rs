//! Error types for tenant resolution and schema handling.

use thiserror::Error;

/// Result type alias for tenancy operations.
pub type TenancyResult<T> = Result<T, TenancyError>;

/// Errors that can occur during tenant resolution and schema handling.
#[derive(Debug, Error)]
pub enum TenancyError {
    /// No tenant matches the given schema name or hostname.
    ///
    /// Recoverable: the caller maps this to a routing failure (404).
    #[error("no tenant found for '{0}'")]
    NotFound(String),

    /// A schema name failed allow-list validation.
    ///
    /// Always fatal to the current unit of work. Schema names derive from
    /// user-controlled hostnames, so a failed validation is logged as a
    /// potential injection attempt and never corrected or defaulted.
    #[error("invalid schema name '{name}': {reason}")]
    InvalidSchemaName {
        /// The rejected name.
        name: String,
        /// Why validation failed.
        reason: String,
    },

    /// A schema name or domain collides with an existing tenant.
    #[error("uniqueness conflict: {0}")]
    UniquenessConflict(String),

    /// An application-placement rule was violated in the static
    /// configuration. Fatal at startup, not recoverable at runtime.
    #[error("configuration invariant violated: {0}")]
    ConfigurationInvariant(String),

    /// Configuration file could not be read or parsed.
    #[error("configuration error: {0}")]
    Config(String),

    /// The dynamic tenant source (database) failed.
    #[error("tenant source error: {0}")]
    Source(String),
}

impl TenancyError {
    /// Create a `NotFound` error.
    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound(what.into())
    }

    /// Create an `InvalidSchemaName` error.
    pub fn invalid_schema_name(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidSchemaName {
            name: name.into(),
            reason: reason.into(),
        }
    }

    /// Create a `UniquenessConflict` error.
    pub fn conflict(message: impl Into<String>) -> Self {
        Self::UniquenessConflict(message.into())
    }

    /// Create a `ConfigurationInvariant` error.
    pub fn invariant(message: impl Into<String>) -> Self {
        Self::ConfigurationInvariant(message.into())
    }

    /// Create a `Config` error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Create a `Source` error.
    pub fn source(message: impl Into<String>) -> Self {
        Self::Source(message.into())
    }

    /// Check if this is a `NotFound` error.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }

    /// Check if this is a `UniquenessConflict` error.
    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::UniquenessConflict(_))
    }
}
