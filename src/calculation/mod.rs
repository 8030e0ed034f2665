//! Calculation logic for the payroll engine.
//!
//! This module contains the calculators that turn attendance, salary
//! assignments and tenant settings into payslips: rate derivation, late and
//! absence deductions with prioritized capping, overtime capping and pay,
//! statutory contributions, payslip assembly, and run-level fan-out.

mod batch;
mod deduction;
mod overtime;
mod payslip;
mod rate;
mod statutory;

pub use batch::{
    DEFAULT_MAX_CONCURRENCY, EmployeeFailure, RunReport, calculate_run, calculate_run_with_limit,
};
pub use deduction::{
    AbsenceDeduction, AppliedDeduction, CappedDeductions, CumulativeLateRule, DeductionRequest,
    LateDeduction, LateDeductionRule, LatenessSummary, StandardLateRule, apply_deductions,
    calculate_absence_deduction, calculate_late_deduction, late_rules_for, select_late_deduction,
};
pub use overtime::{
    HolidayFirstAllocation, OvertimeAllocationStrategy, OvertimeCategoryPay, OvertimeHours,
    OvertimeResult, allocation_strategy, calculate_overtime,
};
pub use payslip::calculate_payslip;
pub use rate::{
    DerivedRates, FIXED_PERIOD_DAYS, calculate_rates, calculate_rates_for, count_days_between,
    resolve_days_in_period,
};
pub use statutory::{StatutoryContribution, calculate_statutory};
