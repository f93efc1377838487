//! Error types for the PostgreSQL layer.

use strata_core::TenancyError;
use thiserror::Error;
use tokio_postgres::error::SqlState;

/// Result type for PostgreSQL operations.
pub type PgResult<T> = Result<T, PgError>;

/// Errors that can occur in the PostgreSQL layer.
#[derive(Debug, Error)]
pub enum PgError {
    /// PostgreSQL error.
    #[error("postgres error: {0}")]
    Postgres(#[from] tokio_postgres::Error),

    /// Connection pool error.
    #[error("pool error: {0}")]
    Pool(String),

    /// Timed out waiting for a pooled connection.
    #[error("timed out acquiring a connection from the pool")]
    PoolTimeout,

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),

    /// A schema name or domain collides with an existing tenant.
    #[error("uniqueness conflict: {0}")]
    Conflict(String),

    /// Tenancy-model error (invalid schema name, reserved name, ...).
    #[error(transparent)]
    Tenancy(#[from] TenancyError),
}

impl PgError {
    /// Create a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Create a uniqueness-conflict error.
    pub fn conflict(message: impl Into<String>) -> Self {
        Self::Conflict(message.into())
    }

    /// Check if this is a uniqueness conflict, either detected locally or
    /// reported by the database.
    pub fn is_conflict(&self) -> bool {
        match self {
            Self::Conflict(_) => true,
            Self::Tenancy(e) => e.is_conflict(),
            Self::Postgres(e) => matches!(
                e.code(),
                Some(&SqlState::UNIQUE_VIOLATION) | Some(&SqlState::DUPLICATE_SCHEMA)
            ),
            _ => false,
        }
    }

    /// Check if this is a pool timeout.
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::PoolTimeout)
    }

    /// Lift database-reported uniqueness violations into [`PgError::Conflict`]
    /// with a caller-supplied description.
    pub fn into_conflict(self, message: impl Into<String>) -> Self {
        if self.is_conflict() {
            Self::Conflict(message.into())
        } else {
            self
        }
    }
}

impl From<deadpool::managed::PoolError<PgError>> for PgError {
    fn from(err: deadpool::managed::PoolError<PgError>) -> Self {
        use deadpool::managed::PoolError;
        match err {
            PoolError::Backend(e) => e,
            PoolError::Timeout(_) => PgError::PoolTimeout,
            other => PgError::Pool(other.to_string()),
        }
    }
}

impl From<PgError> for TenancyError {
    fn from(err: PgError) -> Self {
        match err {
            PgError::Tenancy(e) => e,
            PgError::Conflict(msg) => TenancyError::UniquenessConflict(msg),
            other => TenancyError::Source(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_conflict_predicate() {
        assert!(PgError::conflict("duplicate domain").is_conflict());
        assert!(!PgError::config("bad url").is_conflict());
    }

    #[test]
    fn test_into_tenancy_error() {
        let err: TenancyError = PgError::conflict("schema exists").into();
        assert!(err.is_conflict());

        let err: TenancyError = PgError::PoolTimeout.into();
        assert!(matches!(err, TenancyError::Source(_)));
    }
}
