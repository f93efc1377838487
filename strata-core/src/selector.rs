//! Schema selectors.
//!
//! The textual syntax is stable: a reserved token for all static tenants,
//! a reserved token for all dynamic tenants, and any other string, which is
//! first tried as an exact schema name and otherwise matched as a
//! case-insensitive prefix against registered domains. There are no other
//! forms; [`Selector::All`] is programmatic only.

use std::fmt;
use std::str::FromStr;

/// Token selecting every static tenant (plus the shared schema).
pub const STATIC_TOKEN: &str = ":static:";

/// Token selecting every dynamic tenant.
pub const DYNAMIC_TOKEN: &str = ":dynamic:";

/// A selector choosing a subset of schemas for an orchestrated operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selector {
    /// Every known schema: shared, static, and dynamic.
    All,
    /// The shared schema and all static tenants.
    Static,
    /// All dynamic tenants.
    Dynamic,
    /// An exact schema name, or failing that a case-insensitive domain
    /// prefix. Resolution order is decided by the registry.
    Match(String),
}

impl Selector {
    /// Parse a selector expression. Never fails: anything that is not a
    /// reserved token is a match expression.
    pub fn parse(input: &str) -> Self {
        match input.trim() {
            STATIC_TOKEN => Self::Static,
            DYNAMIC_TOKEN => Self::Dynamic,
            other => Self::Match(other.to_string()),
        }
    }
}

impl FromStr for Selector {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::parse(s))
    }
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::All => f.write_str("<all schemas>"),
            Self::Static => f.write_str(STATIC_TOKEN),
            Self::Dynamic => f.write_str(DYNAMIC_TOKEN),
            Self::Match(s) => f.write_str(s),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_tokens() {
        assert_eq!(Selector::parse(":static:"), Selector::Static);
        assert_eq!(Selector::parse(":dynamic:"), Selector::Dynamic);
    }

    #[test]
    fn test_parse_match() {
        assert_eq!(
            Selector::parse("client1"),
            Selector::Match("client1".into())
        );
        // Near-miss tokens are match expressions, not errors.
        assert_eq!(
            Selector::parse(":static"),
            Selector::Match(":static".into())
        );
    }

    #[test]
    fn test_parse_trims() {
        assert_eq!(Selector::parse("  :dynamic:  "), Selector::Dynamic);
    }

    #[test]
    fn test_display_round_trip() {
        for s in [":static:", ":dynamic:", "blog.x"] {
            assert_eq!(Selector::parse(s).to_string(), s);
        }
    }
}
