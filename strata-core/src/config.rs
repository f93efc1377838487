//! Configuration file parsing for `strata.toml`.
//!
//! Static tenants live here and are immutable for the process lifetime.
//! Application-placement invariants are enforced at load time; a violation
//! is fatal at startup, never recovered at runtime.

use std::collections::{BTreeMap, HashSet};
use std::path::Path;

use indexmap::IndexSet;
use serde::{Deserialize, Serialize};

use crate::apps::AppId;
use crate::error::{TenancyError, TenancyResult};
use crate::schema::SchemaName;
use crate::tenant::{DomainRecord, TenantDescriptor};

/// Main configuration structure for `strata.toml`.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct StrataConfig {
    /// Database configuration.
    #[serde(default)]
    pub database: DatabaseConfig,

    /// Tenancy-wide settings.
    #[serde(default)]
    pub tenancy: TenancyConfig,

    /// Static tenants, keyed by schema name. The entry whose key equals the
    /// shared schema name describes the shared schema itself; it is
    /// migratable but never routable.
    #[serde(default)]
    pub tenants: BTreeMap<SchemaName, StaticTenantConfig>,
}

impl StrataConfig {
    /// Load configuration from a file path.
    pub fn from_file(path: impl AsRef<Path>) -> TenancyResult<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            TenancyError::config(format!("failed to read {}: {}", path.display(), e))
        })?;
        Self::from_str(&content)
    }

    /// Parse configuration from a TOML string and check invariants.
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(content: &str) -> TenancyResult<Self> {
        let expanded = expand_env_vars(content);
        let config: Self = toml::from_str(&expanded)
            .map_err(|e| TenancyError::config(format!("failed to parse TOML: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// The reserved shared schema name.
    pub fn shared_schema(&self) -> &SchemaName {
        &self.tenancy.shared_schema
    }

    /// Build the immutable static tenant table.
    ///
    /// The shared schema's entry is excluded: it is not a tenant. Its
    /// effective application list is exposed through
    /// [`AppAssignment`](crate::apps::AppAssignment) instead.
    pub fn static_descriptors(&self) -> Vec<TenantDescriptor> {
        self.tenants
            .iter()
            .filter(|(name, _)| *name != self.shared_schema())
            .map(|(name, tenant)| {
                let mut descriptor = TenantDescriptor::new_static(name.clone())
                    .with_apps(tenant.apps.iter().cloned())
                    .with_fallback(tenant.fallback);
                for (i, domain) in tenant.domains.iter().enumerate() {
                    // The first configured domain is the primary one.
                    descriptor.domains.push(DomainRecord {
                        domain: domain.to_ascii_lowercase(),
                        is_primary: i == 0,
                    });
                }
                descriptor
            })
            .collect()
    }

    /// The effective application list of the shared schema: the shared
    /// entry's own apps plus every app marked shared by a tenant, in
    /// declaration order and deduplicated.
    pub fn shared_applications(&self) -> Vec<AppId> {
        let mut apps: IndexSet<AppId> = IndexSet::new();
        if let Some(shared) = self.tenants.get(self.shared_schema()) {
            apps.extend(shared.apps.iter().cloned());
        }
        for tenant in self.tenants.values() {
            apps.extend(tenant.shared_apps.iter().cloned());
        }
        apps.into_iter().collect()
    }

    /// Enforce the load-time invariants.
    fn validate(&self) -> TenancyResult<()> {
        let shared = self.shared_schema().clone();

        if let Some(entry) = self.tenants.get(&shared) {
            if !entry.domains.is_empty() {
                return Err(TenancyError::invariant(format!(
                    "shared schema '{}' must not declare domains; it is never routable",
                    shared
                )));
            }
            if entry.fallback {
                return Err(TenancyError::invariant(format!(
                    "shared schema '{}' cannot be the fallback tenant",
                    shared
                )));
            }
        }

        // Domain uniqueness across static tenants.
        let mut domains: HashSet<String> = HashSet::new();
        for (name, tenant) in &self.tenants {
            for domain in &tenant.domains {
                let lowered = domain.to_ascii_lowercase();
                if !domains.insert(lowered.clone()) {
                    return Err(TenancyError::invariant(format!(
                        "domain '{}' is configured for more than one tenant (last: '{}')",
                        lowered, name
                    )));
                }
            }
        }

        // At most one fallback tenant.
        let fallbacks: Vec<_> = self
            .tenants
            .iter()
            .filter(|(_, t)| t.fallback)
            .map(|(name, _)| name.as_str())
            .collect();
        if fallbacks.len() > 1 {
            return Err(TenancyError::invariant(format!(
                "multiple fallback tenants configured: {}",
                fallbacks.join(", ")
            )));
        }

        // The content-type registry app belongs to the shared schema only.
        if let Some(ct) = &self.tenancy.content_type_app {
            for (name, tenant) in &self.tenants {
                if name != &shared && tenant.apps.contains(ct) {
                    return Err(TenancyError::invariant(format!(
                        "app '{}' must be assigned to the shared schema only, found in '{}'",
                        ct, name
                    )));
                }
            }
            if self.tenancy.dynamic_apps.contains(ct) {
                return Err(TenancyError::invariant(format!(
                    "app '{}' must be assigned to the shared schema only, found in dynamic_apps",
                    ct
                )));
            }
        }

        // Session storage requires the user-identity app in the same schema.
        if let (Some(session), Some(user)) =
            (&self.tenancy.session_app, &self.tenancy.user_app)
        {
            let check = |where_: &str, apps: &[AppId]| -> TenancyResult<()> {
                if apps.contains(session) && !apps.contains(user) {
                    return Err(TenancyError::invariant(format!(
                        "app '{}' in '{}' requires app '{}' in the same schema",
                        session, where_, user
                    )));
                }
                Ok(())
            };
            for (name, tenant) in &self.tenants {
                check(name.as_str(), &tenant.apps)?;
            }
            check("dynamic_apps", &self.tenancy.dynamic_apps)?;
            check(shared.as_str(), &self.shared_applications())?;
        }

        Ok(())
    }
}

impl Default for StrataConfig {
    fn default() -> Self {
        Self {
            database: DatabaseConfig::default(),
            tenancy: TenancyConfig::default(),
            tenants: BTreeMap::new(),
        }
    }
}

/// Database configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct DatabaseConfig {
    /// Connection URL (supports `${ENV_VAR}` interpolation).
    pub url: Option<String>,

    /// Connection pool settings.
    #[serde(default)]
    pub pool: PoolSettings,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: None,
            pool: PoolSettings::default(),
        }
    }
}

/// Connection pool settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct PoolSettings {
    /// Maximum number of connections.
    #[serde(default = "default_max_connections")]
    pub max_connections: usize,

    /// Connection acquisition timeout in seconds.
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,
}

impl Default for PoolSettings {
    fn default() -> Self {
        Self {
            max_connections: default_max_connections(),
            connect_timeout_secs: default_connect_timeout_secs(),
        }
    }
}

fn default_max_connections() -> usize {
    10
}
fn default_connect_timeout_secs() -> u64 {
    30
}

/// Tenancy-wide settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct TenancyConfig {
    /// The reserved shared schema name. Holds data common to all tenants
    /// and is always included as a search-path fallback.
    #[serde(default = "default_shared_schema")]
    pub shared_schema: SchemaName,

    /// The content-type-registry application. May only live in the shared
    /// schema.
    #[serde(default)]
    pub content_type_app: Option<AppId>,

    /// The session-storage application. May only live alongside
    /// `user_app`.
    #[serde(default)]
    pub session_app: Option<AppId>,

    /// The user-identity application.
    #[serde(default)]
    pub user_app: Option<AppId>,

    /// Applications installed in every dynamic tenant schema.
    #[serde(default)]
    pub dynamic_apps: Vec<AppId>,
}

impl Default for TenancyConfig {
    fn default() -> Self {
        Self {
            shared_schema: default_shared_schema(),
            content_type_app: None,
            session_app: None,
            user_app: None,
            dynamic_apps: Vec::new(),
        }
    }
}

fn default_shared_schema() -> SchemaName {
    SchemaName::new("public").expect("'public' is a valid schema name")
}

/// A static tenant entry in `strata.toml`.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct StaticTenantConfig {
    /// Domains routed to this tenant. The first one is the primary domain.
    #[serde(default)]
    pub domains: Vec<String>,

    /// Applications installed in this schema, in order.
    #[serde(default)]
    pub apps: Vec<AppId>,

    /// Applications this tenant requires in the shared schema.
    #[serde(default)]
    pub shared_apps: Vec<AppId>,

    /// Serve hosts that match no registered domain.
    #[serde(default)]
    pub fallback: bool,
}

/// Expand environment variables in the format `${VAR_NAME}`.
fn expand_env_vars(content: &str) -> String {
    let mut result = content.to_string();
    let re = regex_lite::Regex::new(r"\$\{([^}]+)\}").expect("static pattern");

    for cap in re.captures_iter(content) {
        let var_name = &cap[1];
        let full_match = &cap[0];

        if let Ok(value) = std::env::var(var_name) {
            result = result.replace(full_match, &value);
        }
    }

    result
}
