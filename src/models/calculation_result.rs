//! Payslip result models for the payroll engine.
//!
//! This module contains the [`PayslipResult`] type and its associated
//! structures that capture all outputs of a payslip calculation, including
//! lines, totals, and audit traces.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::PayPeriod;

/// Warning code for a payslip whose net salary is below zero.
pub const NEGATIVE_NET_WARNING: &str = "NEGATIVE_NET";

/// Warning code for deductions clipped by the maximum deduction percentage.
pub const DEDUCTIONS_CLIPPED_WARNING: &str = "DEDUCTIONS_CLIPPED";

/// Where a payslip line comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LineSource {
    /// Base salary and structure components.
    Structure,
    /// Social-insurance contributions.
    Statutory,
    /// Overtime pay.
    Overtime,
    /// Late, absence and manual deductions.
    Deduction,
}

/// How a line affects the net salary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LineKind {
    /// Adds to gross salary.
    Earning,
    /// Subtracted from gross salary.
    Deduction,
    /// Paid by the employer; reported but does not affect net.
    EmployerContribution,
}

/// A single line item on a payslip.
///
/// # Example
///
/// ```
/// use payroll_engine::models::{LineKind, LineSource, PayslipLine};
/// use rust_decimal::Decimal;
///
/// let line = PayslipLine {
///     source: LineSource::Structure,
///     kind: LineKind::Earning,
///     code: "BASIC".to_string(),
///     description: "Basic salary".to_string(),
///     amount: Decimal::new(900000, 2),
///     clipped: Decimal::ZERO,
/// };
/// assert_eq!(line.amount.to_string(), "9000.00");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PayslipLine {
    /// Which component produced the line.
    pub source: LineSource,
    /// How the line affects net.
    pub kind: LineKind,
    /// Short machine-readable code, e.g. `BASIC`, `LATE`, `STATUTORY_EMPLOYEE`.
    pub code: String,
    /// Human-readable description.
    pub description: String,
    /// The amount applied, unrounded.
    pub amount: Decimal,
    /// For deductions, the part of the requested amount that the deduction
    /// cap cut off. Zero otherwise.
    #[serde(default)]
    pub clipped: Decimal,
}

/// Aggregated totals for a payslip. Derived from the lines, never set
/// independently.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PayslipTotals {
    /// Sum of earning lines.
    pub gross_salary: Decimal,
    /// Sum of deduction lines, statutory employee share included.
    pub total_deductions: Decimal,
    /// Gross minus deductions, rounded once. May be negative.
    pub net_salary: Decimal,
    /// Net before rounding.
    pub unrounded_net: Decimal,
    /// Sum of employer contribution lines.
    pub employer_contributions: Decimal,
    /// Total deductions cut off by the cap, reported for audit.
    pub clipped_deductions: Decimal,
}

/// A single step in the audit trace recording a calculation decision.
///
/// Each step captures the input, output, and reasoning for a rule application.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditStep {
    /// The sequential step number.
    pub step_number: u32,
    /// The unique identifier of the rule that was applied.
    pub rule_id: String,
    /// The human-readable name of the rule.
    pub rule_name: String,
    /// The payroll setting that governed the step (e.g. `late.method`).
    pub setting_ref: String,
    /// The input data for this step.
    pub input: serde_json::Value,
    /// The output data from this step.
    pub output: serde_json::Value,
    /// Human-readable explanation of the decision.
    pub reasoning: String,
}

/// A warning generated during calculation.
///
/// Warnings report business conditions that do not stop the calculation,
/// such as a negative net salary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditWarning {
    /// A code identifying the type of warning.
    pub code: String,
    /// A human-readable description of the warning.
    pub message: String,
    /// The severity level (e.g., "low", "medium", "high").
    pub severity: String,
}

/// The complete audit trace for a calculation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditTrace {
    /// The sequence of calculation steps.
    pub steps: Vec<AuditStep>,
    /// Any warnings generated during calculation.
    pub warnings: Vec<AuditWarning>,
    /// The total calculation duration in microseconds.
    pub duration_us: u64,
}

impl AuditTrace {
    /// Whether a warning with the given code was raised.
    pub fn has_warning(&self, code: &str) -> bool {
        self.warnings.iter().any(|w| w.code == code)
    }
}

/// The complete result of a payslip calculation for one employee.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PayslipResult {
    /// Unique identifier for this calculation.
    pub calculation_id: Uuid,
    /// When the calculation was performed.
    pub timestamp: DateTime<Utc>,
    /// The version of the engine that performed the calculation.
    pub engine_version: String,
    /// The employee the payslip is for.
    pub employee_id: String,
    /// The pay period.
    pub pay_period: PayPeriod,
    /// Individual lines making up the payslip.
    pub lines: Vec<PayslipLine>,
    /// Aggregated totals.
    pub totals: PayslipTotals,
    /// Complete audit trace of calculation decisions.
    pub audit_trace: AuditTrace,
}

impl PayslipResult {
    /// Whether the payslip carries the negative-net warning.
    pub fn has_negative_net(&self) -> bool {
        self.audit_trace.has_warning(NEGATIVE_NET_WARNING)
    }

    /// Lines from one source.
    pub fn lines_from(&self, source: LineSource) -> impl Iterator<Item = &PayslipLine> {
        self.lines.iter().filter(move |l| l.source == source)
    }
}
