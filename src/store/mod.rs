//! Persistence collaborators.
//!
//! The engine never chooses a storage technology. It talks to storage
//! through [`PayrollStore`] and [`SubmissionStore`]; any implementation must
//! honour the contracts documented on each method. [`MemoryStore`] is the
//! in-memory reference implementation used by tests and embedders.

mod memory;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::EngineResult;
use crate::models::{PayrollRun, PayslipResult};
use crate::submission::{EntityRef, SubmissionRecord, SubmissionStatusLog};

pub use memory::MemoryStore;

/// Storage for payroll runs and their payslips.
#[async_trait]
pub trait PayrollStore: Send + Sync {
    /// Stores a new run.
    ///
    /// When the run references an original run, the original must exist and
    /// be LOCKED, checked atomically with the insert; otherwise
    /// `InvalidAdjustment`.
    async fn create_run(&self, run: PayrollRun) -> EngineResult<()>;

    /// Loads a run, `RunNotFound` if missing.
    async fn get_run(&self, run_id: Uuid) -> EngineResult<PayrollRun>;

    /// Writes (or replaces) one employee's payslip in a run and bumps the
    /// run revision, returning the new revision.
    ///
    /// Must fail with `RunLocked` once the run is locked.
    async fn create_payslip_lines(&self, run_id: Uuid, payslip: PayslipResult)
    -> EngineResult<u64>;

    /// Locks a run if its revision still equals `expected_revision`.
    ///
    /// Fails with `LockConflict` when a payslip write happened since the
    /// revision was read, and with `RunLocked` when already locked.
    async fn lock_run(&self, run_id: Uuid, expected_revision: u64) -> EngineResult<PayrollRun>;

    /// Payslips of a run ordered by employee id.
    async fn payslips(&self, run_id: Uuid) -> EngineResult<Vec<PayslipResult>>;

    /// Adjustment runs that reference a run.
    async fn adjustments_of(&self, run_id: Uuid) -> EngineResult<Vec<PayrollRun>>;
}

/// Storage for submission states and their status log.
#[async_trait]
pub trait SubmissionStore: Send + Sync {
    /// Appends one entry to the status log. Entries are never rewritten.
    async fn append_status_log(&self, entry: SubmissionStatusLog) -> EngineResult<()>;

    /// Loads the current state of an entity.
    async fn load_submission(&self, entity: &EntityRef) -> EngineResult<Option<SubmissionRecord>>;

    /// Saves the current state of an entity.
    async fn save_submission_state(&self, record: SubmissionRecord) -> EngineResult<()>;

    /// Submissions of either machine in `status` whose last transition is
    /// strictly before `before`.
    async fn find_in_state(
        &self,
        status: &str,
        before: DateTime<Utc>,
    ) -> EngineResult<Vec<SubmissionRecord>>;

    /// The status log of one entity, oldest first.
    async fn status_log(&self, entity: &EntityRef) -> EngineResult<Vec<SubmissionStatusLog>>;
}
