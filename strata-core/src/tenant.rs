//! Tenant descriptors and domain records.

use serde::{Deserialize, Serialize};

use crate::apps::AppId;
use crate::error::{TenancyError, TenancyResult};
use crate::schema::SchemaName;

/// Where a tenant descriptor is sourced from.
///
/// Behavior differs only in sourcing, not in an open-ended operation set,
/// so this is a plain tag on [`TenantDescriptor`] rather than a trait.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TenantKind {
    /// Defined in process configuration, immutable for the process lifetime.
    Static,
    /// Defined by a row in the shared schema's tenant table.
    Dynamic,
}

/// A domain owned by a tenant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DomainRecord {
    /// The domain string, stored lowercased. Unique across all tenants.
    pub domain: String,
    /// Whether this is the tenant's primary domain (at most one per tenant).
    /// The primary domain is used for reverse lookups such as email links;
    /// any domain matches for inbound routing.
    pub is_primary: bool,
}

impl DomainRecord {
    /// Create a domain record, normalizing the domain to lowercase.
    pub fn new(domain: impl Into<String>, is_primary: bool) -> TenancyResult<Self> {
        let domain = domain.into().to_ascii_lowercase();
        if domain.is_empty() {
            return Err(TenancyError::config("empty domain"));
        }
        Ok(Self { domain, is_primary })
    }
}

/// A resolved tenant: a routable subset of data behind one schema.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TenantDescriptor {
    /// The underlying namespace.
    pub schema_name: SchemaName,
    /// Static (configuration) or dynamic (database row).
    pub kind: TenantKind,
    /// Ordered list of applications installed in this schema.
    pub apps: Vec<AppId>,
    /// Domains routed to this tenant.
    pub domains: Vec<DomainRecord>,
    /// Whether this tenant serves hosts that match no registered domain.
    /// Only meaningful for static tenants; at most one per deployment.
    pub fallback: bool,
}

impl TenantDescriptor {
    /// Create a static tenant descriptor.
    pub fn new_static(schema_name: SchemaName) -> Self {
        Self {
            schema_name,
            kind: TenantKind::Static,
            apps: Vec::new(),
            domains: Vec::new(),
            fallback: false,
        }
    }

    /// Create a dynamic tenant descriptor.
    pub fn new_dynamic(schema_name: SchemaName) -> Self {
        Self {
            schema_name,
            kind: TenantKind::Dynamic,
            apps: Vec::new(),
            domains: Vec::new(),
            fallback: false,
        }
    }

    /// Set the application list.
    pub fn with_apps(mut self, apps: impl IntoIterator<Item = impl Into<AppId>>) -> Self {
        self.apps = apps.into_iter().map(Into::into).collect();
        self
    }

    /// Add a domain.
    pub fn with_domain(mut self, domain: DomainRecord) -> Self {
        self.domains.push(domain);
        self
    }

    /// Mark this tenant as the fallback for unmatched hosts.
    pub fn with_fallback(mut self, fallback: bool) -> Self {
        self.fallback = fallback;
        self
    }

    /// The tenant's primary domain, if any.
    pub fn primary_domain(&self) -> Option<&str> {
        self.domains
            .iter()
            .find(|d| d.is_primary)
            .map(|d| d.domain.as_str())
    }

    /// Check whether a (lowercased, port-stripped) host matches one of this
    /// tenant's domains exactly.
    pub fn owns_domain(&self, host: &str) -> bool {
        self.domains.iter().any(|d| d.domain == host)
    }

    /// Check whether any of this tenant's domains starts with the given
    /// lowercase prefix.
    pub fn matches_domain_prefix(&self, prefix: &str) -> bool {
        self.domains.iter().any(|d| d.domain.starts_with(prefix))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn schema(name: &str) -> SchemaName {
        SchemaName::new(name).unwrap()
    }

    #[test]
    fn test_domain_normalization() {
        let d = DomainRecord::new("Blog.X.Com", true).unwrap();
        assert_eq!(d.domain, "blog.x.com");
        assert!(d.is_primary);
    }

    #[test]
    fn test_primary_domain() {
        let tenant = TenantDescriptor::new_dynamic(schema("client1"))
            .with_domain(DomainRecord::new("alias.x.com", false).unwrap())
            .with_domain(DomainRecord::new("client1.x.com", true).unwrap());

        assert_eq!(tenant.primary_domain(), Some("client1.x.com"));
    }

    #[test]
    fn test_owns_domain_and_prefix() {
        let tenant = TenantDescriptor::new_static(schema("blog"))
            .with_domain(DomainRecord::new("blog.x.com", true).unwrap())
            .with_domain(DomainRecord::new("help.x.com", false).unwrap());

        assert!(tenant.owns_domain("help.x.com"));
        assert!(!tenant.owns_domain("other.x.com"));
        assert!(tenant.matches_domain_prefix("blog."));
        assert!(!tenant.matches_domain_prefix("shop."));
    }
}
