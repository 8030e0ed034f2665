//! Social-insurance contributions.
//!
//! Contributions are charged on the insurable salary, capped per month.
//! They sit outside the deduction priority and cap.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::config::StatutorySettings;
use crate::models::{AuditStep, SalaryAssignment};

/// Employee and employer contributions on a capped insurable salary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatutoryContribution {
    /// Base plus insurable components, before the cap.
    pub insurable_before_cap: Decimal,
    /// The salary contributions are charged on.
    pub insurable_salary: Decimal,
    /// Deducted from the employee.
    pub employee_contribution: Decimal,
    /// Paid by the employer.
    pub employer_contribution: Decimal,
    /// The audit step recording the calculation.
    pub audit_step: AuditStep,
}

/// Computes contributions for an eligible employee.
///
/// Returns `None` for employees not covered by social insurance; they get no
/// statutory lines at all.
pub fn calculate_statutory(
    assignment: &SalaryAssignment,
    settings: &StatutorySettings,
    eligible: bool,
    step_number: u32,
) -> Option<StatutoryContribution> {
    if !eligible {
        return None;
    }

    let insurable_before_cap = assignment.insurable_amount();
    let insurable_salary = insurable_before_cap.min(settings.insurable_cap);
    let employee_contribution = insurable_salary * settings.employee_rate;
    let employer_contribution = insurable_salary * settings.employer_rate;

    let reasoning = if insurable_salary < insurable_before_cap {
        format!(
            "Insurable salary {} capped at {}; employee {} at {}, employer {} at {}",
            insurable_before_cap,
            settings.insurable_cap,
            employee_contribution.round_dp(2),
            settings.employee_rate,
            employer_contribution.round_dp(2),
            settings.employer_rate
        )
    } else {
        format!(
            "Insurable salary {}; employee {} at {}, employer {} at {}",
            insurable_salary,
            employee_contribution.round_dp(2),
            settings.employee_rate,
            employer_contribution.round_dp(2),
            settings.employer_rate
        )
    };

    let audit_step = AuditStep {
        step_number,
        rule_id: "statutory_contribution".to_string(),
        rule_name: "Statutory Contribution".to_string(),
        setting_ref: "statutory".to_string(),
        input: serde_json::json!({
            "insurable_before_cap": insurable_before_cap.to_string(),
            "insurable_cap": settings.insurable_cap.to_string(),
            "employee_rate": settings.employee_rate.to_string(),
            "employer_rate": settings.employer_rate.to_string()
        }),
        output: serde_json::json!({
            "insurable_salary": insurable_salary.to_string(),
            "employee_contribution": employee_contribution.to_string(),
            "employer_contribution": employer_contribution.to_string()
        }),
        reasoning,
    };

    Some(StatutoryContribution {
        insurable_before_cap,
        insurable_salary,
        employee_contribution,
        employer_contribution,
        audit_step,
    })
}
