//! Per-employee calculation inputs.
//!
//! This module defines [`EmployeeInputs`], everything the payslip assembler
//! needs for one employee and one period, and the caller-supplied
//! [`ManualDeduction`] lines.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::config::DeductionKind;

use super::{AttendanceRecord, PayPeriod, SalaryAssignment};

/// A deduction supplied by an external collaborator (loan installment,
/// advance recovery, penalty).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManualDeduction {
    /// The deduction kind, which decides its priority.
    pub kind: DeductionKind,
    /// The requested amount.
    pub amount: Decimal,
    /// Free-text description shown on the payslip.
    pub description: String,
}

/// Everything needed to compute one employee's payslip.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmployeeInputs {
    /// The employee.
    pub employee_id: String,
    /// The pay period.
    pub period: PayPeriod,
    /// The salary assignment active in the period. Required.
    pub assignment: Option<SalaryAssignment>,
    /// Attendance for the period, at most one record per day.
    #[serde(default)]
    pub attendance: Vec<AttendanceRecord>,
    /// Caller-supplied deductions.
    #[serde(default)]
    pub manual_deductions: Vec<ManualDeduction>,
    /// Whether the employee is covered by social insurance. Decided by an
    /// external collaborator (nationality, category).
    #[serde(default)]
    pub statutory_eligible: bool,
}
