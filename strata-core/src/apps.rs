//! Application-to-schema assignment.

use crate::config::StrataConfig;
use crate::schema::SchemaName;
use crate::tenant::TenantDescriptor;

/// Identifier of an installed application.
pub type AppId = String;

/// Decides which applications' structures belong in which schema.
///
/// Built once from validated configuration; the placement invariants
/// (content-type registry in the shared schema only, sessions alongside
/// users) are enforced when the configuration is loaded, so lookups here
/// are infallible.
#[derive(Debug, Clone)]
pub struct AppAssignment {
    shared: SchemaName,
    shared_apps: Vec<AppId>,
    dynamic_apps: Vec<AppId>,
}

impl AppAssignment {
    /// Build the assignment from validated configuration.
    pub fn from_config(config: &StrataConfig) -> Self {
        Self {
            shared: config.shared_schema().clone(),
            shared_apps: config.shared_applications(),
            dynamic_apps: config.tenancy.dynamic_apps.clone(),
        }
    }

    /// Construct directly, mainly for tests.
    pub fn new(
        shared: SchemaName,
        shared_apps: Vec<AppId>,
        dynamic_apps: Vec<AppId>,
    ) -> Self {
        Self {
            shared,
            shared_apps,
            dynamic_apps,
        }
    }

    /// The shared schema name.
    pub fn shared_schema(&self) -> &SchemaName {
        &self.shared
    }

    /// The shared schema's effective application list.
    pub fn shared_applications(&self) -> &[AppId] {
        &self.shared_apps
    }

    /// The ordered application list for a tenant's schema.
    ///
    /// A descriptor with an explicit list wins; dynamic tenants without one
    /// get the configured dynamic default.
    pub fn applications_for<'a>(&'a self, tenant: &'a TenantDescriptor) -> &'a [AppId] {
        if tenant.schema_name == self.shared {
            &self.shared_apps
        } else if !tenant.apps.is_empty() {
            &tenant.apps
        } else {
            &self.dynamic_apps
        }
    }
}
