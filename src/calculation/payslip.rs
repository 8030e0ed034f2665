//! Payslip assembly.
//!
//! [`calculate_payslip`] validates one employee's inputs, runs every
//! calculator in order, turns their results into payslip lines and derives
//! the totals. Rounding is applied exactly once, to the net salary.

use std::collections::HashSet;
use std::time::Instant;

use chrono::Utc;
use rust_decimal::Decimal;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::config::{DeductionKind, OvertimeSource, PayrollSettings};
use crate::error::{EngineError, EngineResult};
use crate::models::{
    AuditStep, AuditTrace, AuditWarning, DEDUCTIONS_CLIPPED_WARNING, EmployeeInputs, LineKind,
    LineSource, NEGATIVE_NET_WARNING, PayslipLine, PayslipResult, PayslipTotals,
    SalaryAssignment,
};

use super::deduction::{
    DeductionRequest, apply_deductions, calculate_absence_deduction, calculate_late_deduction,
};
use super::overtime::{OvertimeHours, calculate_overtime};
use super::rate::{calculate_rates_for, count_days_between};
use super::statutory::calculate_statutory;

/// Computes one employee's payslip.
///
/// # Errors
///
/// - `CalculationError` for missing or inconsistent inputs: no assignment
///   covering the period, attendance of another employee or outside the
///   period, duplicate attendance dates, negative manual deductions.
/// - `InvalidConfiguration` for unusable settings, including a deduction
///   kind missing from the priority list.
///
/// A negative net salary is not an error; it is reported as a
/// `NEGATIVE_NET` warning.
pub fn calculate_payslip(
    inputs: &EmployeeInputs,
    settings: &PayrollSettings,
) -> EngineResult<PayslipResult> {
    let start_time = Instant::now();
    let employee_id = inputs.employee_id.as_str();
    settings.validate()?;
    let assignment = validate_inputs(inputs)?;
    let priority = settings.deduction_priority()?;

    let period = &inputs.period;
    let mut lines: Vec<PayslipLine> = Vec::new();
    let mut steps: Vec<AuditStep> = Vec::new();
    let mut warnings: Vec<AuditWarning> = Vec::new();
    let mut step_number: u32 = 1;

    // Rates from base salary
    let rates = calculate_rates_for(assignment.base_salary, settings, period, step_number)?;
    steps.push(rates.audit_step.clone());
    step_number += 1;

    // Structure earnings
    let applicable_days = count_days_between(
        settings.calculation_method,
        period,
        &settings.weekend_days,
        assignment.effective_from,
        assignment.effective_until(),
    );
    // Counted the same way as applicable_days; the days-in-period override
    // only affects rates.
    let period_days = count_days_between(
        settings.calculation_method,
        period,
        &settings.weekend_days,
        period.start_date,
        period.end_date,
    );
    let prorate = |amount: Decimal| {
        if period_days == 0 || applicable_days >= period_days {
            amount
        } else {
            amount * Decimal::from(applicable_days) / Decimal::from(period_days)
        }
    };
    let proration_factor = prorate(Decimal::ONE);

    lines.push(PayslipLine {
        source: LineSource::Structure,
        kind: LineKind::Earning,
        code: "BASIC".to_string(),
        description: "Basic salary".to_string(),
        amount: assignment.base_salary,
        clipped: Decimal::ZERO,
    });
    for component in &assignment.components {
        let amount = if component.prorate {
            prorate(component.amount)
        } else {
            component.amount
        };
        lines.push(PayslipLine {
            source: LineSource::Structure,
            kind: LineKind::Earning,
            code: component.code.clone(),
            description: component.name.clone(),
            amount,
            clipped: Decimal::ZERO,
        });
    }
    steps.push(AuditStep {
        step_number,
        rule_id: "structure_proration".to_string(),
        rule_name: "Structure Proration".to_string(),
        setting_ref: "calculation_method".to_string(),
        input: serde_json::json!({
            "effective_from": assignment.effective_from.to_string(),
            "effective_to": assignment.effective_to.map(|d| d.to_string()),
            "applicable_days": applicable_days,
            "period_days": period_days
        }),
        output: serde_json::json!({
            "proration_factor": proration_factor.to_string(),
            "components": assignment.components.iter().map(|c| c.code.as_str()).collect::<Vec<_>>()
        }),
        reasoning: format!(
            "{} of {} days applicable; prorated components scaled by {}",
            applicable_days,
            period_days,
            proration_factor.round_dp(4)
        ),
    });
    step_number += 1;

    // Overtime
    let overtime_rate = match settings.overtime_source {
        OvertimeSource::BasicOnly => rates.hourly_rate,
        OvertimeSource::BasicPlusAllowances => {
            calculate_rates_for(assignment.overtime_base(), settings, period, step_number)?
                .hourly_rate
        }
    };
    let overtime = calculate_overtime(
        employee_id,
        OvertimeHours::from_records(&inputs.attendance),
        &settings.overtime,
        overtime_rate,
        step_number,
    )?;
    steps.push(overtime.audit_step.clone());
    step_number += 1;

    for (code, description, pay) in [
        ("OT_REGULAR", "Regular overtime", &overtime.regular),
        ("OT_WEEKEND", "Weekend overtime", &overtime.weekend),
        ("OT_HOLIDAY", "Public holiday overtime", &overtime.holiday),
    ] {
        if pay.hours > Decimal::ZERO {
            lines.push(PayslipLine {
                source: LineSource::Overtime,
                kind: LineKind::Earning,
                code: code.to_string(),
                description: format!(
                    "{} ({}h x {})",
                    description,
                    pay.hours.normalize(),
                    pay.multiplier.normalize()
                ),
                amount: pay.amount,
                clipped: Decimal::ZERO,
            });
        }
    }

    let gross_salary: Decimal = lines
        .iter()
        .filter(|l| l.kind == LineKind::Earning)
        .map(|l| l.amount)
        .sum();

    // Late, absence and manual deductions
    let late = calculate_late_deduction(&inputs.attendance, &settings.late, &rates, step_number);
    steps.push(late.audit_step.clone());
    step_number += 1;

    let absence = calculate_absence_deduction(&inputs.attendance, &rates, step_number);
    steps.push(absence.audit_step.clone());
    step_number += 1;

    let mut requests = Vec::new();
    if late.amount > Decimal::ZERO {
        requests.push(DeductionRequest {
            kind: DeductionKind::Late,
            code: "LATE".to_string(),
            description: format!("Late arrival ({} events)", late.summary.late_event_count),
            amount: late.amount,
        });
    }
    if absence.amount > Decimal::ZERO {
        requests.push(DeductionRequest {
            kind: DeductionKind::Absence,
            code: "ABSENCE".to_string(),
            description: format!("Absence ({} days)", absence.absent_days),
            amount: absence.amount,
        });
    }
    for manual in &inputs.manual_deductions {
        if manual.amount > Decimal::ZERO {
            requests.push(DeductionRequest {
                kind: manual.kind,
                code: manual.kind.as_str().to_string(),
                description: manual.description.clone(),
                amount: manual.amount,
            });
        }
    }

    let capped = apply_deductions(
        requests,
        &priority,
        gross_salary,
        settings.max_deduction_percent,
        step_number,
    )?;
    steps.push(capped.audit_step.clone());
    step_number += 1;

    for deduction in &capped.deductions {
        lines.push(PayslipLine {
            source: LineSource::Deduction,
            kind: LineKind::Deduction,
            code: deduction.request.code.clone(),
            description: deduction.request.description.clone(),
            amount: deduction.applied,
            clipped: deduction.clipped,
        });
    }
    if capped.total_clipped > Decimal::ZERO {
        warnings.push(AuditWarning {
            code: DEDUCTIONS_CLIPPED_WARNING.to_string(),
            message: format!(
                "{} of deductions exceeded the {}% cap and were not applied",
                capped.total_clipped.round_dp(2),
                settings.max_deduction_percent.normalize()
            ),
            severity: "medium".to_string(),
        });
    }

    // Statutory contributions
    if let Some(statutory) = calculate_statutory(
        assignment,
        &settings.statutory,
        inputs.statutory_eligible,
        step_number,
    ) {
        lines.push(PayslipLine {
            source: LineSource::Statutory,
            kind: LineKind::Deduction,
            code: "STATUTORY_EMPLOYEE".to_string(),
            description: "Social insurance (employee share)".to_string(),
            amount: statutory.employee_contribution,
            clipped: Decimal::ZERO,
        });
        lines.push(PayslipLine {
            source: LineSource::Statutory,
            kind: LineKind::EmployerContribution,
            code: "STATUTORY_EMPLOYER".to_string(),
            description: "Social insurance (employer share)".to_string(),
            amount: statutory.employer_contribution,
            clipped: Decimal::ZERO,
        });
        steps.push(statutory.audit_step);
        step_number += 1;
    }

    // Totals
    let total_deductions: Decimal = lines
        .iter()
        .filter(|l| l.kind == LineKind::Deduction)
        .map(|l| l.amount)
        .sum();
    let employer_contributions: Decimal = lines
        .iter()
        .filter(|l| l.kind == LineKind::EmployerContribution)
        .map(|l| l.amount)
        .sum();
    let unrounded_net = gross_salary - total_deductions;
    let net_salary = settings.rounding.apply(unrounded_net);

    steps.push(AuditStep {
        step_number,
        rule_id: "net_salary".to_string(),
        rule_name: "Net Salary".to_string(),
        setting_ref: "rounding".to_string(),
        input: serde_json::json!({
            "gross_salary": gross_salary.to_string(),
            "total_deductions": total_deductions.to_string(),
            "rounding_nearest": settings.rounding.nearest.to_string(),
            "rounding_direction": settings.rounding.direction
        }),
        output: serde_json::json!({
            "unrounded_net": unrounded_net.to_string(),
            "net_salary": net_salary.to_string()
        }),
        reasoning: format!(
            "{} - {} = {}, rounded to {}",
            gross_salary.round_dp(4),
            total_deductions.round_dp(4),
            unrounded_net.round_dp(4),
            net_salary
        ),
    });

    if net_salary < Decimal::ZERO {
        warn!(employee_id, net_salary = %net_salary, "Negative net salary");
        warnings.push(AuditWarning {
            code: NEGATIVE_NET_WARNING.to_string(),
            message: format!("Net salary is {}", net_salary),
            severity: "high".to_string(),
        });
    }

    let duration_us = start_time.elapsed().as_micros() as u64;
    debug!(
        employee_id,
        gross = %gross_salary,
        net = %net_salary,
        duration_us,
        "Payslip calculated"
    );

    Ok(PayslipResult {
        calculation_id: Uuid::new_v4(),
        timestamp: Utc::now(),
        engine_version: env!("CARGO_PKG_VERSION").to_string(),
        employee_id: inputs.employee_id.clone(),
        pay_period: period.clone(),
        lines,
        totals: PayslipTotals {
            gross_salary,
            total_deductions,
            net_salary,
            unrounded_net,
            employer_contributions,
            clipped_deductions: capped.total_clipped,
        },
        audit_trace: AuditTrace {
            steps,
            warnings,
            duration_us,
        },
    })
}

/// Checks the inputs are complete and consistent, returning the assignment.
fn validate_inputs(inputs: &EmployeeInputs) -> EngineResult<&SalaryAssignment> {
    let employee_id = inputs.employee_id.as_str();
    let period = &inputs.period;

    if period.end_date < period.start_date {
        return Err(EngineError::calculation(
            employee_id,
            format!(
                "pay period ends {} before it starts {}",
                period.end_date, period.start_date
            ),
        ));
    }

    let assignment = inputs.assignment.as_ref().ok_or_else(|| {
        EngineError::calculation(employee_id, "no salary assignment for the period")
    })?;
    if assignment.employee_id != inputs.employee_id {
        return Err(EngineError::calculation(
            employee_id,
            format!("salary assignment belongs to '{}'", assignment.employee_id),
        ));
    }
    if assignment.effective_from > period.end_date
        || assignment.effective_until() < period.start_date
    {
        return Err(EngineError::calculation(
            employee_id,
            format!(
                "salary assignment effective {} does not cover the period {} to {}",
                assignment.effective_from, period.start_date, period.end_date
            ),
        ));
    }

    let mut seen = HashSet::new();
    for record in &inputs.attendance {
        if record.employee_id != inputs.employee_id {
            return Err(EngineError::calculation(
                employee_id,
                format!("attendance on {} belongs to '{}'", record.date, record.employee_id),
            ));
        }
        if !period.contains_date(record.date) {
            return Err(EngineError::calculation(
                employee_id,
                format!("attendance on {} is outside the pay period", record.date),
            ));
        }
        if !seen.insert(record.date) {
            return Err(EngineError::calculation(
                employee_id,
                format!("duplicate attendance for {}", record.date),
            ));
        }
    }

    if let Some(negative) = inputs
        .manual_deductions
        .iter()
        .find(|d| d.amount < Decimal::ZERO)
    {
        return Err(EngineError::calculation(
            employee_id,
            format!(
                "{} deduction '{}' has negative amount {}",
                negative.kind, negative.description, negative.amount
            ),
        ));
    }

    Ok(assignment)
}
