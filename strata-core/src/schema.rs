//! Validated schema names.
//!
//! A [`SchemaName`] is the only value ever interpolated into a
//! namespace-setting statement. Validation happens exactly once, at
//! construction; everything downstream takes the newtype, never a raw
//! string. Schema names ultimately derive from user-controlled request
//! hosts, so this is a security boundary, not a convenience check.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{TenancyError, TenancyResult};

/// PostgreSQL truncates identifiers beyond 63 bytes; names that long are
/// rejected outright rather than silently shortened.
pub const MAX_SCHEMA_NAME_LEN: usize = 63;

/// A validated PostgreSQL schema (namespace) name.
///
/// Allowed: ASCII alphanumerics and underscore, not starting with a digit,
/// at most [`MAX_SCHEMA_NAME_LEN`] bytes, and never the reserved `pg_`
/// prefix.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct SchemaName(String);

impl SchemaName {
    /// Validate and construct a schema name.
    pub fn new(name: impl Into<String>) -> TenancyResult<Self> {
        let name = name.into();
        validate(&name)?;
        Ok(Self(name))
    }

    /// Get the name as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Render the name as a quoted SQL identifier.
    pub fn quoted(&self) -> String {
        // Validation forbids '"', so plain wrapping is sufficient.
        format!("\"{}\"", self.0)
    }
}

fn validate(name: &str) -> TenancyResult<()> {
    if name.is_empty() {
        return Err(TenancyError::invalid_schema_name(name, "empty name"));
    }
    if name.len() > MAX_SCHEMA_NAME_LEN {
        return Err(TenancyError::invalid_schema_name(
            name,
            format!("longer than {} bytes", MAX_SCHEMA_NAME_LEN),
        ));
    }
    let mut chars = name.chars();
    let first = chars.next().expect("non-empty");
    if !(first.is_ascii_alphabetic() || first == '_') {
        return Err(TenancyError::invalid_schema_name(
            name,
            format!("must start with a letter or underscore, got '{}'", first),
        ));
    }
    if let Some(bad) = name.chars().find(|c| !(c.is_ascii_alphanumeric() || *c == '_')) {
        return Err(TenancyError::invalid_schema_name(
            name,
            format!("illegal character '{}'", bad.escape_default()),
        ));
    }
    if name.starts_with("pg_") {
        return Err(TenancyError::invalid_schema_name(
            name,
            "reserved prefix 'pg_'",
        ));
    }
    Ok(())
}

impl fmt::Display for SchemaName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for SchemaName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl FromStr for SchemaName {
    type Err = TenancyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<String> for SchemaName {
    type Error = TenancyError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<SchemaName> for String {
    fn from(name: SchemaName) -> Self {
        name.0
    }
}

impl PartialEq<str> for SchemaName {
    fn eq(&self, other: &str) -> bool {
        self.0 == other
    }
}

impl PartialEq<&str> for SchemaName {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_names() {
        for name in ["public", "client1", "_shadow", "Tenant_42", "a"] {
            assert!(SchemaName::new(name).is_ok(), "expected '{}' valid", name);
        }
    }

    #[test]
    fn test_rejects_injection_vectors() {
        // Namespace terminators and quoting characters must never reach SQL.
        for name in [
            "public\"; DROP SCHEMA public; --",
            "a;b",
            "a b",
            "a\"b",
            "a'b",
            "a,b",
            "a.b",
        ] {
            let err = SchemaName::new(name).unwrap_err();
            assert!(
                matches!(err, TenancyError::InvalidSchemaName { .. }),
                "expected '{}' rejected",
                name
            );
        }
    }

    #[test]
    fn test_rejects_empty_and_numeric_start() {
        assert!(SchemaName::new("").is_err());
        assert!(SchemaName::new("1tenant").is_err());
    }

    #[test]
    fn test_rejects_reserved_prefix() {
        assert!(SchemaName::new("pg_catalog").is_err());
        assert!(SchemaName::new("pg_temp_1").is_err());
    }

    #[test]
    fn test_rejects_overlong() {
        let name = "a".repeat(MAX_SCHEMA_NAME_LEN + 1);
        assert!(SchemaName::new(name).is_err());

        let name = "a".repeat(MAX_SCHEMA_NAME_LEN);
        assert!(SchemaName::new(name).is_ok());
    }

    #[test]
    fn test_quoted() {
        let name = SchemaName::new("client1").unwrap();
        assert_eq!(name.quoted(), "\"client1\"");
    }

    #[derive(serde::Deserialize)]
    struct Holder {
        name: SchemaName,
    }

    #[test]
    fn test_deserialize_validates() {
        let holder: Holder = toml::from_str("name = \"client1\"").unwrap();
        assert_eq!(holder.name, "client1");

        assert!(toml::from_str::<Holder>("name = \"a;b\"").is_err());
    }
}
