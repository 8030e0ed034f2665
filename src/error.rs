//! Error types for the payroll engine.
//!
//! This module provides strongly-typed errors using the `thiserror` crate
//! for every failure the payroll calculation and the submission state
//! machines can report.

use thiserror::Error;
use uuid::Uuid;

use crate::submission::EntityType;

/// The main error type for the payroll engine.
///
/// # Example
///
/// ```
/// use payroll_engine::error::EngineError;
///
/// let error = EngineError::ConfigNotFound {
///     path: "/missing/tenants".to_string(),
/// };
/// assert_eq!(error.to_string(), "Configuration file not found: /missing/tenants");
/// ```
#[derive(Debug, Error)]
pub enum EngineError {
    /// Configuration file was not found at the specified path.
    #[error("Configuration file not found: {path}")]
    ConfigNotFound {
        /// The path that was not found.
        path: String,
    },

    /// Configuration file could not be parsed.
    #[error("Failed to parse configuration file '{path}': {message}")]
    ConfigParseError {
        /// The path to the file that failed to parse.
        path: String,
        /// A description of the parse error.
        message: String,
    },

    /// Payroll settings or rate inputs are invalid. Not retryable; an
    /// administrator has to fix the configuration.
    #[error("Invalid configuration '{field}': {message}")]
    InvalidConfiguration {
        /// The setting or input that was rejected.
        field: String,
        /// What is wrong with it.
        message: String,
    },

    /// A submission state change that the transition table does not allow.
    #[error("Invalid {machine} transition {from} -> {to} (allowed: [{}])", .allowed.join(", "))]
    InvalidTransition {
        /// Which state machine rejected the change.
        machine: EntityType,
        /// The state the entity was in.
        from: String,
        /// The state that was requested.
        to: String,
        /// The states reachable from `from`.
        allowed: Vec<String>,
    },

    /// A payslip could not be computed for one employee.
    #[error("Calculation error for employee '{employee_id}': {message}")]
    CalculationError {
        /// The employee whose payslip failed.
        employee_id: String,
        /// A description of the calculation error.
        message: String,
    },

    /// No payroll run exists with the given id.
    #[error("Payroll run not found: {run_id}")]
    RunNotFound {
        /// The missing run.
        run_id: Uuid,
    },

    /// A write was attempted against a locked payroll run.
    #[error("Payroll run {run_id} is locked")]
    RunLocked {
        /// The locked run.
        run_id: Uuid,
    },

    /// Payslips changed between reading the run revision and locking it.
    #[error("Payroll run {run_id} changed during lock (expected revision {expected}, found {found})")]
    LockConflict {
        /// The run being locked.
        run_id: Uuid,
        /// The revision the lock attempt started from.
        expected: u64,
        /// The revision found at lock time.
        found: u64,
    },

    /// An adjustment run could not be created.
    #[error("Invalid adjustment of run {original_run_id}: {message}")]
    InvalidAdjustment {
        /// The run being adjusted.
        original_run_id: Uuid,
        /// Why the adjustment was refused.
        message: String,
    },

    /// No submission exists for the entity.
    #[error("Submission not found: {entity_type}/{entity_id}")]
    SubmissionNotFound {
        /// The entity type.
        entity_type: EntityType,
        /// The entity id.
        entity_id: String,
    },

    /// The caller's view of a submission's state is out of date.
    #[error("Submission {entity_type}/{entity_id} is in {actual}, not {expected}")]
    StaleSubmissionState {
        /// The entity type.
        entity_type: EntityType,
        /// The entity id.
        entity_id: String,
        /// The state the caller transitioned from.
        expected: String,
        /// The state actually stored.
        actual: String,
    },

    /// The persistence collaborator failed.
    #[error("Store error: {message}")]
    Store {
        /// A description of the failure.
        message: String,
    },
}

impl EngineError {
    /// Whether retrying the same call may succeed.
    ///
    /// Configuration, calculation and transition errors are deterministic and
    /// never retryable.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Store { .. } | Self::LockConflict { .. })
    }

    pub(crate) fn invalid_config(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidConfiguration {
            field: field.into(),
            message: message.into(),
        }
    }

    pub(crate) fn calculation(employee_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self::CalculationError {
            employee_id: employee_id.into(),
            message: message.into(),
        }
    }
}

/// A type alias for Results that return EngineError.
pub type EngineResult<T> = Result<T, EngineError>;
