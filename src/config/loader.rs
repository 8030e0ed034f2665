//! Settings loading functionality.
//!
//! This module provides the [`SettingsLoader`] type for loading per-tenant
//! payroll settings and the detector schedule from YAML files.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::error::{EngineError, EngineResult};

use super::types::{DetectorConfig, PayrollSettings};

/// Loads and provides access to payroll configuration.
///
/// # Directory Structure
///
/// ```text
/// config/
/// ├── detector.yaml        # Optional stuck-submission sweep schedule
/// └── tenants/
///     ├── acme.yaml        # One PayrollSettings document per tenant
///     └── globex.yaml
/// ```
///
/// # Example
///
/// ```no_run
/// use payroll_engine::config::SettingsLoader;
///
/// let loader = SettingsLoader::load("./config").unwrap();
/// let settings = loader.get_settings("acme").unwrap();
/// println!("Calculation method: {:?}", settings.calculation_method);
/// ```
#[derive(Debug, Clone)]
pub struct SettingsLoader {
    tenants: HashMap<String, PayrollSettings>,
    detector: DetectorConfig,
}

impl SettingsLoader {
    /// Loads configuration from the specified directory.
    ///
    /// Every tenant file is validated. Two files declaring the same tenant
    /// are rejected, since a tenant has exactly one active settings record.
    pub fn load<P: AsRef<Path>>(path: P) -> EngineResult<Self> {
        let path = path.as_ref();

        let tenants_dir = path.join("tenants");
        let tenants = Self::load_tenants(&tenants_dir)?;

        let detector_path = path.join("detector.yaml");
        let detector = if detector_path.exists() {
            Self::load_yaml::<DetectorConfig>(&detector_path)?
        } else {
            DetectorConfig::default()
        };
        detector.validate()?;

        info!(
            tenants = tenants.len(),
            sweep_interval_hours = detector.sweep_interval_hours,
            "Loaded payroll configuration"
        );

        Ok(Self { tenants, detector })
    }

    /// Loads and parses a YAML file.
    fn load_yaml<T: serde::de::DeserializeOwned>(path: &Path) -> EngineResult<T> {
        let path_str = path.display().to_string();

        let content = fs::read_to_string(path).map_err(|_| EngineError::ConfigNotFound {
            path: path_str.clone(),
        })?;

        serde_yaml::from_str(&content).map_err(|e| EngineError::ConfigParseError {
            path: path_str,
            message: e.to_string(),
        })
    }

    /// Loads all tenant settings files.
    fn load_tenants(tenants_dir: &Path) -> EngineResult<HashMap<String, PayrollSettings>> {
        let tenants_dir_str = tenants_dir.display().to_string();

        let entries = fs::read_dir(tenants_dir).map_err(|_| EngineError::ConfigNotFound {
            path: tenants_dir_str.clone(),
        })?;

        let mut paths: Vec<PathBuf> = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|_| EngineError::ConfigNotFound {
                path: tenants_dir_str.clone(),
            })?;
            let path = entry.path();
            if path
                .extension()
                .is_some_and(|ext| ext == "yaml" || ext == "yml")
            {
                paths.push(path);
            }
        }
        paths.sort();

        let mut tenants = HashMap::new();
        for path in paths {
            let settings = Self::load_yaml::<PayrollSettings>(&path)?;
            settings.validate()?;
            debug!(tenant_id = %settings.tenant_id, path = %path.display(), "Loaded tenant settings");

            if tenants.contains_key(&settings.tenant_id) {
                return Err(EngineError::invalid_config(
                    "tenant_id",
                    format!(
                        "tenant '{}' has more than one settings file ({})",
                        settings.tenant_id,
                        path.display()
                    ),
                ));
            }
            tenants.insert(settings.tenant_id.clone(), settings);
        }

        if tenants.is_empty() {
            return Err(EngineError::ConfigNotFound {
                path: format!("{} (no tenant settings found)", tenants_dir_str),
            });
        }

        Ok(tenants)
    }

    /// Gets the settings of one tenant.
    pub fn get_settings(&self, tenant_id: &str) -> EngineResult<&PayrollSettings> {
        self.tenants
            .get(tenant_id)
            .ok_or_else(|| EngineError::invalid_config(
                "tenant_id",
                format!("no payroll settings for tenant '{}'", tenant_id),
            ))
    }

    /// Returns all loaded tenant settings.
    pub fn tenants(&self) -> impl Iterator<Item = &PayrollSettings> {
        self.tenants.values()
    }

    /// Returns the stuck-submission sweep schedule.
    pub fn detector(&self) -> &DetectorConfig {
        &self.detector
    }
}
