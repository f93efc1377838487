//! The tenant registry.
//!
//! Static tenants come from configuration and are held in an immutable
//! table built once at startup. Dynamic tenants are read through a
//! [`DynamicTenantSource`], typically backed by the tenant table in the
//! shared schema. Exact-name lookups check dynamic first, then static, so
//! a dynamic registration can never silently shadow a reserved static one;
//! uniqueness is enforced at creation time instead.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use crate::config::StrataConfig;
use crate::error::{TenancyError, TenancyResult};
use crate::schema::SchemaName;
use crate::selector::Selector;
use crate::tenant::{TenantDescriptor, TenantKind};

/// Read access to dynamically registered tenants.
///
/// Implemented by the PostgreSQL tenant store; test code supplies
/// in-memory implementations.
#[async_trait]
pub trait DynamicTenantSource: Send + Sync {
    /// Look up a dynamic tenant by exact schema name.
    async fn get(&self, schema: &SchemaName) -> TenancyResult<Option<TenantDescriptor>>;

    /// All dynamic tenants.
    async fn all(&self) -> TenancyResult<Vec<TenantDescriptor>>;

    /// Look up the tenant owning a domain (exact, lowercased, no port).
    async fn find_by_domain(&self, domain: &str) -> TenancyResult<Option<TenantDescriptor>>;

    /// All dynamic tenants with a domain starting with the given lowercase
    /// prefix.
    async fn find_by_domain_prefix(&self, prefix: &str)
    -> TenancyResult<Vec<TenantDescriptor>>;
}

/// Lookup of tenants by schema name or selector.
pub struct TenantRegistry {
    shared: SchemaName,
    /// Synthetic descriptor for the shared schema: never routable, but
    /// selectable for management operations such as migration.
    shared_entry: TenantDescriptor,
    statics: BTreeMap<SchemaName, TenantDescriptor>,
    fallback: Option<SchemaName>,
    source: Option<Arc<dyn DynamicTenantSource>>,
}

impl TenantRegistry {
    /// Build the registry's immutable static table from configuration.
    pub fn from_config(config: &StrataConfig) -> Self {
        let shared = config.shared_schema().clone();
        let shared_entry = TenantDescriptor::new_static(shared.clone())
            .with_apps(config.shared_applications());

        let mut statics = BTreeMap::new();
        let mut fallback = None;
        for descriptor in config.static_descriptors() {
            if descriptor.fallback {
                fallback = Some(descriptor.schema_name.clone());
            }
            statics.insert(descriptor.schema_name.clone(), descriptor);
        }

        Self {
            shared,
            shared_entry,
            statics,
            fallback,
            source: None,
        }
    }

    /// Attach the dynamic tenant source.
    pub fn with_source(mut self, source: Arc<dyn DynamicTenantSource>) -> Self {
        self.source = Some(source);
        self
    }

    /// The reserved shared schema name.
    pub fn shared_schema(&self) -> &SchemaName {
        &self.shared
    }

    /// The configured fallback tenant for unmatched hosts, if any.
    pub fn fallback(&self) -> Option<&SchemaName> {
        self.fallback.as_ref()
    }

    /// The attached dynamic tenant source, if any.
    pub fn dynamic_source(&self) -> Option<&Arc<dyn DynamicTenantSource>> {
        self.source.as_ref()
    }

    /// The static tenant descriptors, in schema-name order.
    pub fn static_tenants(&self) -> impl Iterator<Item = &TenantDescriptor> {
        self.statics.values()
    }

    /// Every name reserved by configuration: the shared schema and all
    /// static tenants. Dynamic tenant creation must reject these.
    pub fn reserved_names(&self) -> Vec<SchemaName> {
        let mut names = vec![self.shared.clone()];
        names.extend(self.statics.keys().cloned());
        names
    }

    /// Every domain owned by a static tenant, lowercased. Dynamic tenant
    /// creation must reject these too: static domains take precedence in
    /// routing, so a colliding dynamic domain would be permanently
    /// shadowed instead of failing loudly.
    pub fn static_domains(&self) -> Vec<String> {
        self.statics
            .values()
            .flat_map(|t| t.domains.iter().map(|d| d.domain.clone()))
            .collect()
    }

    /// Resolve an exact schema name to a tenant descriptor.
    ///
    /// Dynamic tenants are checked first, then static ones. The shared
    /// schema resolves to its synthetic descriptor so management
    /// operations can target it by name.
    pub async fn resolve(&self, schema: &SchemaName) -> TenancyResult<TenantDescriptor> {
        if let Some(source) = &self.source {
            if let Some(tenant) = source.get(schema).await? {
                return Ok(tenant);
            }
        }
        if let Some(tenant) = self.statics.get(schema) {
            return Ok(tenant.clone());
        }
        if *schema == self.shared {
            return Ok(self.shared_entry.clone());
        }
        Err(TenancyError::not_found(schema.as_str()))
    }

    /// Resolve a selector to a list of tenant descriptors, sorted by
    /// schema name for reproducible iteration.
    pub async fn list(&self, selector: &Selector) -> TenancyResult<Vec<TenantDescriptor>> {
        let mut tenants = match selector {
            Selector::All => {
                let mut all = self.static_with_shared();
                all.extend(self.dynamic_tenants().await?);
                all
            }
            Selector::Static => self.static_with_shared(),
            Selector::Dynamic => self.dynamic_tenants().await?,
            Selector::Match(expr) => self.match_expression(expr).await?,
        };
        tenants.sort_by(|a, b| a.schema_name.cmp(&b.schema_name));
        tenants.dedup_by(|a, b| a.schema_name == b.schema_name);
        debug!(selector = %selector, matched = tenants.len(), "resolved selector");
        Ok(tenants)
    }

    fn static_with_shared(&self) -> Vec<TenantDescriptor> {
        let mut tenants = vec![self.shared_entry.clone()];
        tenants.extend(self.statics.values().cloned());
        tenants
    }

    async fn dynamic_tenants(&self) -> TenancyResult<Vec<TenantDescriptor>> {
        match &self.source {
            Some(source) => source.all().await,
            None => Ok(Vec::new()),
        }
    }

    /// An exact schema name wins; anything else falls back to a
    /// case-insensitive domain-prefix match.
    async fn match_expression(&self, expr: &str) -> TenancyResult<Vec<TenantDescriptor>> {
        if let Ok(schema) = SchemaName::new(expr) {
            match self.resolve(&schema).await {
                Ok(tenant) => return Ok(vec![tenant]),
                Err(TenancyError::NotFound(_)) => {}
                Err(e) => return Err(e),
            }
        }

        let prefix = expr.to_ascii_lowercase();
        let mut matched: Vec<TenantDescriptor> = self
            .statics
            .values()
            .filter(|t| t.matches_domain_prefix(&prefix))
            .cloned()
            .collect();
        if let Some(source) = &self.source {
            matched.extend(source.find_by_domain_prefix(&prefix).await?);
        }
        Ok(matched)
    }
}

impl std::fmt::Debug for TenantRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TenantRegistry")
            .field("shared", &self.shared)
            .field("statics", &self.statics.keys().collect::<Vec<_>>())
            .field("fallback", &self.fallback)
            .field("has_source", &self.source.is_some())
            .finish()
    }
}

/// Convenience predicate used by callers displaying tenant lists.
pub fn is_dynamic(tenant: &TenantDescriptor) -> bool {
    tenant.kind == TenantKind::Dynamic
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StrataConfig;
    use crate::tenant::DomainRecord;

    const CONFIG: &str = r#"
        [tenancy]
        shared_schema = "public"

        [tenants.public]
        apps = ["content_types"]

        [tenants.blog]
        domains = ["blog.x.com", "help.x.com"]
        apps = ["blog_app"]
    "#;

    fn registry() -> TenantRegistry {
        TenantRegistry::from_config(&StrataConfig::from_str(CONFIG).unwrap())
    }

    struct FakeSource {
        tenants: Vec<TenantDescriptor>,
    }

    #[async_trait]
    impl DynamicTenantSource for FakeSource {
        async fn get(&self, schema: &SchemaName) -> TenancyResult<Option<TenantDescriptor>> {
            Ok(self
                .tenants
                .iter()
                .find(|t| &t.schema_name == schema)
                .cloned())
        }

        async fn all(&self) -> TenancyResult<Vec<TenantDescriptor>> {
            Ok(self.tenants.clone())
        }

        async fn find_by_domain(
            &self,
            domain: &str,
        ) -> TenancyResult<Option<TenantDescriptor>> {
            Ok(self.tenants.iter().find(|t| t.owns_domain(domain)).cloned())
        }

        async fn find_by_domain_prefix(
            &self,
            prefix: &str,
        ) -> TenancyResult<Vec<TenantDescriptor>> {
            Ok(self
                .tenants
                .iter()
                .filter(|t| t.matches_domain_prefix(prefix))
                .cloned()
                .collect())
        }
    }

    fn dynamic_source() -> Arc<FakeSource> {
        Arc::new(FakeSource {
            tenants: vec![
                TenantDescriptor::new_dynamic(SchemaName::new("client1").unwrap())
                    .with_domain(DomainRecord::new("client1.x.com", true).unwrap()),
            ],
        })
    }

    #[tokio::test]
    async fn test_resolve_static() {
        let registry = registry();
        let tenant = registry
            .resolve(&SchemaName::new("blog").unwrap())
            .await
            .unwrap();
        assert_eq!(tenant.kind, TenantKind::Static);
    }

    #[tokio::test]
    async fn test_resolve_dynamic_first() {
        let registry = registry().with_source(dynamic_source());
        let tenant = registry
            .resolve(&SchemaName::new("client1").unwrap())
            .await
            .unwrap();
        assert_eq!(tenant.kind, TenantKind::Dynamic);
    }

    #[tokio::test]
    async fn test_resolve_unknown() {
        let registry = registry();
        let err = registry
            .resolve(&SchemaName::new("nope").unwrap())
            .await
            .unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_list_static_includes_shared() {
        let registry = registry();
        let tenants = registry.list(&Selector::Static).await.unwrap();
        let names: Vec<_> = tenants.iter().map(|t| t.schema_name.as_str()).collect();
        assert_eq!(names, ["blog", "public"]);
    }

    #[tokio::test]
    async fn test_list_all_sorted() {
        let registry = registry().with_source(dynamic_source());
        let tenants = registry.list(&Selector::All).await.unwrap();
        let names: Vec<_> = tenants.iter().map(|t| t.schema_name.as_str()).collect();
        assert_eq!(names, ["blog", "client1", "public"]);
    }

    #[tokio::test]
    async fn test_match_exact_schema_name() {
        let registry = registry();
        let tenants = registry
            .list(&Selector::Match("blog".into()))
            .await
            .unwrap();
        assert_eq!(tenants.len(), 1);
        assert_eq!(tenants[0].schema_name, "blog");
    }

    #[tokio::test]
    async fn test_match_domain_prefix() {
        let registry = registry().with_source(dynamic_source());
        // Not a schema name of any tenant: falls back to prefix matching.
        let tenants = registry
            .list(&Selector::Match("CLIENT1.x".into()))
            .await
            .unwrap();
        assert_eq!(tenants.len(), 1);
        assert_eq!(tenants[0].schema_name, "client1");
    }

    #[tokio::test]
    async fn test_match_nothing() {
        let registry = registry();
        let tenants = registry
            .list(&Selector::Match("unknown.host".into()))
            .await
            .unwrap();
        assert!(tenants.is_empty());
    }

    #[tokio::test]
    async fn test_reserved_names() {
        let registry = registry();
        let names: Vec<_> = registry
            .reserved_names()
            .iter()
            .map(|n| n.as_str().to_string())
            .collect();
        assert!(names.contains(&"public".to_string()));
        assert!(names.contains(&"blog".to_string()));
    }

    #[tokio::test]
    async fn test_static_domains() {
        let mut domains = registry().static_domains();
        domains.sort();
        assert_eq!(domains, vec!["blog.x.com", "help.x.com"]);
    }
}
