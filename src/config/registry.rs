//! Per-tenant settings registry.
//!
//! The registry holds the single active [`PayrollSettings`] record of each
//! tenant and hands out immutable, versioned snapshots. A payroll run takes a
//! snapshot when it starts; later replacements only affect runs started
//! afterwards.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use tracing::info;

use crate::error::{EngineError, EngineResult};

use super::loader::SettingsLoader;
use super::types::PayrollSettings;

/// An immutable view of one tenant's settings at a given version.
#[derive(Debug, Clone)]
pub struct SettingsSnapshot {
    /// Increases by one every time the tenant's settings are replaced.
    pub version: u64,
    /// The settings themselves, shared read-only between workers.
    pub settings: Arc<PayrollSettings>,
}

/// Holds exactly one active settings record per tenant.
#[derive(Debug, Default)]
pub struct SettingsRegistry {
    tenants: RwLock<HashMap<String, SettingsSnapshot>>,
}

impl SettingsRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a registry seeded with every tenant of a loader.
    pub fn from_loader(loader: &SettingsLoader) -> EngineResult<Self> {
        let registry = Self::new();
        for settings in loader.tenants() {
            registry.replace(settings.clone())?;
        }
        Ok(registry)
    }

    /// Installs new settings for a tenant, replacing the active record.
    ///
    /// Returns the new version. Snapshots taken earlier keep the old values.
    pub fn replace(&self, settings: PayrollSettings) -> EngineResult<u64> {
        settings.validate()?;

        let mut tenants = self.tenants.write().map_err(|_| EngineError::Store {
            message: "settings registry lock poisoned".to_string(),
        })?;

        let version = tenants
            .get(&settings.tenant_id)
            .map_or(1, |current| current.version + 1);
        info!(tenant_id = %settings.tenant_id, version, "Installed payroll settings");

        tenants.insert(
            settings.tenant_id.clone(),
            SettingsSnapshot {
                version,
                settings: Arc::new(settings),
            },
        );
        Ok(version)
    }

    /// Takes a snapshot of a tenant's active settings.
    pub fn snapshot(&self, tenant_id: &str) -> EngineResult<SettingsSnapshot> {
        let tenants = self.tenants.read().map_err(|_| EngineError::Store {
            message: "settings registry lock poisoned".to_string(),
        })?;

        tenants.get(tenant_id).cloned().ok_or_else(|| {
            EngineError::invalid_config(
                "tenant_id",
                format!("no payroll settings for tenant '{}'", tenant_id),
            )
        })
    }
}
