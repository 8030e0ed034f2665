//! Government wage-reporting submission workflows.
//!
//! Two state machines share one transition-table engine: payroll-compliance
//! submissions and bank wage-protection files. Every accepted transition is
//! written to an append-only status log before the new state is saved, and
//! transitions of one entity are serialized through [`EntityLocks`].

mod detector;
mod locks;
mod machine;
mod service;
mod states;

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub use detector::{
    AlertSink, StuckGroup, StuckSubmissionDetector, SweepReport, find_stuck_submissions,
};
pub use locks::EntityLocks;
pub use machine::{SubmissionState, TransitionTable};
pub use service::SubmissionService;
pub use states::{
    ComplianceStatus, IN_FLIGHT_STATUS, WageFileStatus, initial_status, is_terminal,
    validate_transition,
};

/// Which submission machine an entity belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityType {
    /// Payroll-compliance submission.
    ComplianceSubmission,
    /// Bank wage-protection file.
    WageFile,
}

impl EntityType {
    /// Both machines.
    pub const ALL: [EntityType; 2] = [Self::ComplianceSubmission, Self::WageFile];

    /// The snake-case name used in logs and errors.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ComplianceSubmission => "compliance_submission",
            Self::WageFile => "wage_file",
        }
    }
}

impl fmt::Display for EntityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Identifies one submission entity.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EntityRef {
    /// The machine.
    pub entity_type: EntityType,
    /// The entity id within the machine.
    pub entity_id: String,
}

impl EntityRef {
    /// Creates a reference to a compliance submission.
    pub fn compliance(entity_id: impl Into<String>) -> Self {
        Self {
            entity_type: EntityType::ComplianceSubmission,
            entity_id: entity_id.into(),
        }
    }

    /// Creates a reference to a wage file.
    pub fn wage_file(entity_id: impl Into<String>) -> Self {
        Self {
            entity_type: EntityType::WageFile,
            entity_id: entity_id.into(),
        }
    }
}

impl fmt::Display for EntityRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.entity_type, self.entity_id)
    }
}

/// One accepted state change. Entries are appended, never rewritten.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmissionStatusLog {
    /// Unique entry id.
    pub id: Uuid,
    /// The machine.
    pub entity_type: EntityType,
    /// The entity.
    pub entity_id: String,
    /// The previous state; `None` for the entry that registered the entity.
    pub from_status: Option<String>,
    /// The new state.
    pub to_status: String,
    /// Who made the change.
    pub changed_by: String,
    /// Why, when given.
    pub reason: Option<String>,
    /// When the change was accepted.
    pub created_at: DateTime<Utc>,
}

/// The current state of one submission as held by the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmissionRecord {
    /// The entity.
    pub entity: EntityRef,
    /// The tenant the submission belongs to.
    pub tenant_id: String,
    /// The current state name.
    pub status: String,
    /// When the last transition was accepted.
    pub last_transition_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entity_type_names() {
        assert_eq!(EntityType::ComplianceSubmission.to_string(), "compliance_submission");
        assert_eq!(EntityType::WageFile.to_string(), "wage_file");
        assert_eq!(
            serde_json::to_string(&EntityType::WageFile).unwrap(),
            "\"wage_file\""
        );
    }

    #[test]
    fn test_entity_ref_display() {
        assert_eq!(EntityRef::wage_file("wf-9").to_string(), "wage_file/wf-9");
    }
}
