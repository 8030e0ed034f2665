//! Payroll run model.
//!
//! A run is the batch of payslips for one tenant and one period. It starts in
//! DRAFT, is locked exactly once, and is only corrected through a new
//! adjustment run that references the locked original.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::PayPeriod;

/// Lifecycle state of a payroll run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RunStatus {
    /// Payslips may still be written.
    Draft,
    /// Payslips are immutable.
    Locked,
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Draft => f.write_str("DRAFT"),
            Self::Locked => f.write_str("LOCKED"),
        }
    }
}

/// Reference from an adjustment run to the run it corrects.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdjustmentRef {
    /// The locked run being corrected.
    pub original_run_id: Uuid,
    /// Why the correction was needed.
    pub reason: String,
}

/// A payroll batch for one tenant and period.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PayrollRun {
    /// Unique run identifier.
    pub id: Uuid,
    /// The tenant the run belongs to.
    pub tenant_id: String,
    /// The pay period covered.
    pub period: PayPeriod,
    /// DRAFT or LOCKED.
    pub status: RunStatus,
    /// Set for adjustment runs.
    #[serde(default)]
    pub adjustment_of: Option<AdjustmentRef>,
    /// Bumped on every payslip write. Used for the optimistic lock check.
    pub revision: u64,
    /// Version of the tenant settings snapshot taken when the run was created.
    pub settings_version: u64,
    /// When the run was created.
    pub created_at: DateTime<Utc>,
    /// When the run was locked.
    #[serde(default)]
    pub locked_at: Option<DateTime<Utc>>,
}

impl PayrollRun {
    /// Creates a new DRAFT run.
    pub fn new(tenant_id: impl Into<String>, period: PayPeriod, settings_version: u64) -> Self {
        Self {
            id: Uuid::new_v4(),
            tenant_id: tenant_id.into(),
            period,
            status: RunStatus::Draft,
            adjustment_of: None,
            revision: 0,
            settings_version,
            created_at: Utc::now(),
            locked_at: None,
        }
    }

    /// Whether the run's payslips are immutable.
    pub fn is_locked(&self) -> bool {
        self.status == RunStatus::Locked
    }

    /// Whether the run corrects another run.
    pub fn is_adjustment(&self) -> bool {
        self.adjustment_of.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_run_is_draft() {
        let run = PayrollRun::new("acme", PayPeriod::month(2026, 3).unwrap(), 2);
        assert_eq!(run.status, RunStatus::Draft);
        assert_eq!(run.revision, 0);
        assert_eq!(run.settings_version, 2);
        assert!(!run.is_locked());
        assert!(!run.is_adjustment());
    }

    #[test]
    fn test_run_status_serialization() {
        assert_eq!(serde_json::to_string(&RunStatus::Locked).unwrap(), "\"LOCKED\"");
        assert_eq!(RunStatus::Draft.to_string(), "DRAFT");
    }
}
