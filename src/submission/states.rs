//! The compliance-submission and wage-file state machines.
//!
//! ```text
//! Compliance:
//!   PENDING ──▶ PREPARED ──▶ SUBMITTED ──▶ ACCEPTED (terminal)
//!                 │  ▲  ▲        │  │
//!                 │  │  │        │  └──▶ REJECTED ──▶ RESUBMITTED ──▶ ACCEPTED | REJECTED
//!                 │  │  └────────┴──▶ RESUBMIT_REQUIRED
//!                 └──┴──▶ PENDING
//!
//! Wage file:
//!   GENERATED ──▶ DOWNLOADED ──▶ SUBMITTED ──▶ PROCESSING ──▶ PROCESSED (terminal)
//!       ▲  │          │              │              │
//!       │  └──────────┴──▶ FAILED ◀──┴──────────────┘
//!       └───────────────────┘
//! ```

use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use serde::{Deserialize, Serialize};

use crate::error::{EngineError, EngineResult};

use super::EntityType;
use super::machine::{SubmissionState, TransitionTable};

/// The name of the in-flight state shared by both machines.
pub const IN_FLIGHT_STATUS: &str = "SUBMITTED";

/// State of a payroll-compliance submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ComplianceStatus {
    /// Waiting for payroll data.
    Pending,
    /// Data prepared for submission.
    Prepared,
    /// Sent to the authority, awaiting a decision.
    Submitted,
    /// Accepted by the authority (terminal).
    Accepted,
    /// Rejected by the authority.
    Rejected,
    /// Sent again after a rejection.
    Resubmitted,
    /// The authority asked for a corrected submission.
    ResubmitRequired,
}

/// State of a bank wage-protection file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WageFileStatus {
    /// File produced.
    Generated,
    /// File downloaded by the tenant.
    Downloaded,
    /// File uploaded to the bank.
    Submitted,
    /// The bank is processing the file.
    Processing,
    /// The bank processed the file (terminal).
    Processed,
    /// Generation, upload or processing failed.
    Failed,
}

static COMPLIANCE_TRANSITIONS: LazyLock<TransitionTable<ComplianceStatus>> = LazyLock::new(|| {
    use ComplianceStatus::*;
    TransitionTable::new(
        EntityType::ComplianceSubmission,
        vec![
            (Pending, vec![Prepared]),
            (Prepared, vec![Submitted, Pending, ResubmitRequired]),
            (Submitted, vec![Accepted, Rejected, ResubmitRequired]),
            (Accepted, vec![]),
            (Rejected, vec![Resubmitted]),
            (Resubmitted, vec![Accepted, Rejected]),
            (ResubmitRequired, vec![Prepared]),
        ],
    )
});

static WAGE_FILE_TRANSITIONS: LazyLock<TransitionTable<WageFileStatus>> = LazyLock::new(|| {
    use WageFileStatus::*;
    TransitionTable::new(
        EntityType::WageFile,
        vec![
            (Generated, vec![Downloaded, Failed]),
            (Downloaded, vec![Submitted, Generated]),
            (Submitted, vec![Processing, Failed]),
            (Processing, vec![Processed, Failed]),
            (Processed, vec![]),
            (Failed, vec![Generated]),
        ],
    )
});

impl SubmissionState for ComplianceStatus {
    const ENTITY_TYPE: EntityType = EntityType::ComplianceSubmission;
    const INITIAL: Self = Self::Pending;
    const ALL: &'static [Self] = &[
        Self::Pending,
        Self::Prepared,
        Self::Submitted,
        Self::Accepted,
        Self::Rejected,
        Self::Resubmitted,
        Self::ResubmitRequired,
    ];

    fn table() -> &'static TransitionTable<Self> {
        &COMPLIANCE_TRANSITIONS
    }

    fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::Prepared => "PREPARED",
            Self::Submitted => "SUBMITTED",
            Self::Accepted => "ACCEPTED",
            Self::Rejected => "REJECTED",
            Self::Resubmitted => "RESUBMITTED",
            Self::ResubmitRequired => "RESUBMIT_REQUIRED",
        }
    }
}

impl SubmissionState for WageFileStatus {
    const ENTITY_TYPE: EntityType = EntityType::WageFile;
    const INITIAL: Self = Self::Generated;
    const ALL: &'static [Self] = &[
        Self::Generated,
        Self::Downloaded,
        Self::Submitted,
        Self::Processing,
        Self::Processed,
        Self::Failed,
    ];

    fn table() -> &'static TransitionTable<Self> {
        &WAGE_FILE_TRANSITIONS
    }

    fn as_str(&self) -> &'static str {
        match self {
            Self::Generated => "GENERATED",
            Self::Downloaded => "DOWNLOADED",
            Self::Submitted => "SUBMITTED",
            Self::Processing => "PROCESSING",
            Self::Processed => "PROCESSED",
            Self::Failed => "FAILED",
        }
    }
}

macro_rules! state_text {
    ($state:ty) => {
        impl fmt::Display for $state {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $state {
            type Err = EngineError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                <$state as SubmissionState>::ALL
                    .iter()
                    .copied()
                    .find(|state| state.as_str() == s)
                    .ok_or_else(|| {
                        EngineError::invalid_config(
                            "status",
                            format!("unknown {} status '{}'", <$state>::ENTITY_TYPE, s),
                        )
                    })
            }
        }
    };
}

state_text!(ComplianceStatus);
state_text!(WageFileStatus);

/// Checks a transition of either machine given as state names.
///
/// # Errors
///
/// Returns `InvalidTransition` naming the machine, both states and the
/// states allowed from `from`.
pub fn validate_transition(machine: EntityType, from: &str, to: &str) -> EngineResult<()> {
    match machine {
        EntityType::ComplianceSubmission => ComplianceStatus::table()
            .validate_raw(from, to)
            .map(|_| ()),
        EntityType::WageFile => WageFileStatus::table().validate_raw(from, to).map(|_| ()),
    }
}

/// Whether a named state of a machine is terminal. Unknown states are
/// treated as terminal since nothing may leave them.
pub fn is_terminal(machine: EntityType, state: &str) -> bool {
    match machine {
        EntityType::ComplianceSubmission => state
            .parse::<ComplianceStatus>()
            .map_or(true, |s| ComplianceStatus::table().is_terminal(s)),
        EntityType::WageFile => state
            .parse::<WageFileStatus>()
            .map_or(true, |s| WageFileStatus::table().is_terminal(s)),
    }
}

/// The state a new submission of a machine starts in.
pub fn initial_status(machine: EntityType) -> &'static str {
    match machine {
        EntityType::ComplianceSubmission => ComplianceStatus::INITIAL.as_str(),
        EntityType::WageFile => WageFileStatus::INITIAL.as_str(),
    }
}
