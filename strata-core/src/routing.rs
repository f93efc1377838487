//! Hostname-to-tenant resolution.

use tracing::{debug, warn};

use crate::error::{TenancyError, TenancyResult};
use crate::registry::TenantRegistry;
use crate::tenant::TenantDescriptor;

/// Maps an inbound request host to a tenant.
///
/// Matching is exact, case-insensitive, and ignores the port. Static
/// tenant domains take precedence on a tie; global domain uniqueness makes
/// ties impossible in practice, the precedence just removes ambiguity. An
/// unmatched host falls back to the configured wildcard tenant, if any.
pub struct DomainResolver<'a> {
    registry: &'a TenantRegistry,
}

impl<'a> DomainResolver<'a> {
    /// Create a resolver over a registry.
    pub fn new(registry: &'a TenantRegistry) -> Self {
        Self { registry }
    }

    /// Resolve an inbound hostname to a tenant descriptor.
    pub async fn resolve_host(&self, host: &str) -> TenancyResult<TenantDescriptor> {
        let host = normalize_host(host);

        for tenant in self.registry.static_tenants() {
            if tenant.owns_domain(&host) {
                debug!(host = %host, schema = %tenant.schema_name, "resolved static tenant");
                return Ok(tenant.clone());
            }
        }

        if let Some(tenant) = self.find_dynamic(&host).await? {
            debug!(host = %host, schema = %tenant.schema_name, "resolved dynamic tenant");
            return Ok(tenant);
        }

        if let Some(fallback) = self.registry.fallback() {
            debug!(host = %host, schema = %fallback, "host unmatched, using fallback tenant");
            return self.registry.resolve(fallback).await;
        }

        warn!(host = %host, "no tenant found for host");
        Err(TenancyError::not_found(host))
    }

    async fn find_dynamic(&self, host: &str) -> TenancyResult<Option<TenantDescriptor>> {
        // Registry without a dynamic source: static-only deployment.
        match self.registry.dynamic_source() {
            Some(source) => source.find_by_domain(host).await,
            None => Ok(None),
        }
    }
}

/// Lowercase a host and strip any port suffix.
pub fn normalize_host(host: &str) -> String {
    let host = host.trim();
    let host = match host.rsplit_once(':') {
        // Only treat the suffix as a port if it is numeric; IPv6 literals
        // and odd hostnames keep their colons otherwise.
        Some((name, port)) if port.chars().all(|c| c.is_ascii_digit()) => name,
        _ => host,
    };
    host.trim_end_matches('.').to_ascii_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StrataConfig;

    const CONFIG: &str = r#"
        [tenants.blog]
        domains = ["blog.x.com", "help.x.com"]
        apps = ["blog_app"]
    "#;

    const CONFIG_WITH_FALLBACK: &str = r#"
        [tenants.blog]
        domains = ["blog.x.com"]

        [tenants.main]
        domains = ["x.com"]
        fallback = true
    "#;

    fn registry(config: &str) -> TenantRegistry {
        TenantRegistry::from_config(&StrataConfig::from_str(config).unwrap())
    }

    #[test]
    fn test_normalize_host() {
        assert_eq!(normalize_host("Blog.X.Com"), "blog.x.com");
        assert_eq!(normalize_host("blog.x.com:8000"), "blog.x.com");
        assert_eq!(normalize_host("blog.x.com."), "blog.x.com");
        assert_eq!(normalize_host("  x.com "), "x.com");
    }

    #[tokio::test]
    async fn test_resolves_any_registered_domain() {
        let registry = registry(CONFIG);
        let resolver = DomainResolver::new(&registry);

        for host in ["blog.x.com", "help.x.com", "HELP.X.COM:443"] {
            let tenant = resolver.resolve_host(host).await.unwrap();
            assert_eq!(tenant.schema_name, "blog", "host {}", host);
        }
    }

    #[tokio::test]
    async fn test_unmatched_without_fallback() {
        let registry = registry(CONFIG);
        let resolver = DomainResolver::new(&registry);
        let err = resolver.resolve_host("other.x.com").await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_unmatched_with_fallback() {
        let registry = registry(CONFIG_WITH_FALLBACK);
        let resolver = DomainResolver::new(&registry);
        let tenant = resolver.resolve_host("anything.example").await.unwrap();
        assert_eq!(tenant.schema_name, "main");
    }
}
