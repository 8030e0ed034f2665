//! Configuration loading and management for the payroll engine.
//!
//! This module provides the per-tenant [`PayrollSettings`] policy record,
//! loading from YAML files, and a registry that hands out immutable settings
//! snapshots to payroll runs.
//!
//! # Example
//!
//! ```no_run
//! use payroll_engine::config::{SettingsLoader, SettingsRegistry};
//!
//! let loader = SettingsLoader::load("./config").unwrap();
//! let registry = SettingsRegistry::from_loader(&loader).unwrap();
//! let snapshot = registry.snapshot("acme").unwrap();
//! println!("acme settings v{}", snapshot.version);
//! ```

mod loader;
mod registry;
mod types;

pub use loader::SettingsLoader;
pub use registry::{SettingsRegistry, SettingsSnapshot};
pub use types::{
    CalculationMethod, DeductionKind, DetectorConfig, LateDeductionMethod, LateSettings,
    OvertimeAllocationPolicy, OvertimeSettings, OvertimeSource, PayrollSettings,
    RoundingDirection, RoundingRule, StatutorySettings,
};
