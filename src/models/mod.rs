//! Core data models for the payroll engine.
//!
//! This module contains all the domain models used throughout the engine.

mod attendance;
mod calculation_result;
mod employee;
mod pay_period;
mod payroll_run;
mod salary;

pub use attendance::{AttendanceRecord, AttendanceStatus, OvertimeSplit};
pub use calculation_result::{
    AuditStep, AuditTrace, AuditWarning, DEDUCTIONS_CLIPPED_WARNING, LineKind, LineSource,
    NEGATIVE_NET_WARNING, PayslipLine, PayslipResult, PayslipTotals,
};
pub use employee::{EmployeeInputs, ManualDeduction};
pub use pay_period::{PayPeriod, PublicHoliday};
pub use payroll_run::{AdjustmentRef, PayrollRun, RunStatus};
pub use salary::{SalaryAssignment, StructureComponent};
