//! Late, absence and priority-capped deductions.
//!
//! Late deductions are computed by a set of [`LateDeductionRule`]s selected
//! from the tenant's settings; the most punitive single rule wins and rules
//! never stack. All deductions then consume a shared cap in the configured
//! priority order, and whatever does not fit is clipped and reported.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::config::{DeductionKind, LateDeductionMethod, LateSettings};
use crate::error::{EngineError, EngineResult};
use crate::models::{AttendanceRecord, AuditStep};

use super::rate::DerivedRates;

const MINUTES_PER_HOUR: Decimal = Decimal::from_parts(60, 0, 0, false, 0);

/// Lateness aggregated over a period.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LatenessSummary {
    /// Sum over days of minutes late beyond the grace period.
    pub effective_late_minutes: u32,
    /// Days late beyond the grace period.
    pub late_event_count: u32,
    /// Days whose lateness exceeded the per-day threshold.
    pub days_over_threshold: u32,
}

impl LatenessSummary {
    /// Aggregates the lateness of a set of attendance records.
    pub fn from_records(records: &[AttendanceRecord], late: &LateSettings) -> Self {
        let grace = late.grace_period_minutes;
        let day_threshold = late.effective_day_threshold();

        records.iter().fold(Self::default(), |mut summary, record| {
            let beyond_grace = record.late_minutes.saturating_sub(grace);
            summary.effective_late_minutes += beyond_grace;
            if beyond_grace > 0 {
                summary.late_event_count += 1;
            }
            if record.late_minutes > day_threshold {
                summary.days_over_threshold += 1;
            }
            summary
        })
    }
}

/// A way of turning lateness into a deduction amount.
///
/// Implementations must be pure: the same summary and rates always produce
/// the same amount.
pub trait LateDeductionRule: Send + Sync {
    /// Stable identifier recorded in the audit trail.
    fn rule_id(&self) -> &'static str;

    /// The deduction this rule would charge.
    fn evaluate(&self, summary: &LatenessSummary, rates: &DerivedRates) -> Decimal;
}

/// Charges lateness per day over the threshold (`DAILY_RATE`) or per minute
/// beyond the grace period (`PER_MINUTE`).
#[derive(Debug, Clone, Copy)]
pub struct StandardLateRule {
    method: LateDeductionMethod,
}

impl StandardLateRule {
    /// Creates the rule for a deduction method.
    pub fn new(method: LateDeductionMethod) -> Self {
        Self { method }
    }
}

impl LateDeductionRule for StandardLateRule {
    fn rule_id(&self) -> &'static str {
        "standard_late"
    }

    fn evaluate(&self, summary: &LatenessSummary, rates: &DerivedRates) -> Decimal {
        match self.method {
            LateDeductionMethod::DailyRate if summary.days_over_threshold > 0 => {
                rates.daily_rate * Decimal::from(summary.days_over_threshold)
            }
            // PER_MINUTE, or DAILY_RATE with no day over the threshold.
            _ => {
                Decimal::from(summary.effective_late_minutes) * rates.hourly_rate
                    / MINUTES_PER_HOUR
            }
        }
    }
}

/// Charges one full day per `threshold` late events.
#[derive(Debug, Clone, Copy)]
pub struct CumulativeLateRule {
    threshold: u32,
}

impl CumulativeLateRule {
    /// Creates the rule. A zero threshold is rejected by settings validation.
    pub fn new(threshold: u32) -> Self {
        Self {
            threshold: threshold.max(1),
        }
    }
}

impl LateDeductionRule for CumulativeLateRule {
    fn rule_id(&self) -> &'static str {
        "cumulative_late"
    }

    fn evaluate(&self, summary: &LatenessSummary, rates: &DerivedRates) -> Decimal {
        let full_days = summary.late_event_count / self.threshold;
        rates.daily_rate * Decimal::from(full_days)
    }
}

/// The late rules a tenant's settings enable, standard rule first.
pub fn late_rules_for(late: &LateSettings) -> Vec<Box<dyn LateDeductionRule>> {
    let mut rules: Vec<Box<dyn LateDeductionRule>> =
        vec![Box::new(StandardLateRule::new(late.method))];
    if let Some(threshold) = late.cumulative_threshold {
        rules.push(Box::new(CumulativeLateRule::new(threshold)));
    }
    rules
}

/// The result of the late deduction selection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LateDeduction {
    /// The deduction charged.
    pub amount: Decimal,
    /// The rule that produced it, `None` when no rule is configured.
    pub rule_id: Option<String>,
    /// The aggregated lateness.
    pub summary: LatenessSummary,
    /// The audit step recording the selection.
    pub audit_step: AuditStep,
}

/// Evaluates every rule and keeps the single most punitive one.
///
/// A later rule replaces the current choice only when strictly greater, so
/// with the rules from [`late_rules_for`] the cumulative rule wins only when
/// it charges more than the standard rule.
pub fn select_late_deduction(
    rules: &[Box<dyn LateDeductionRule>],
    summary: LatenessSummary,
    rates: &DerivedRates,
    step_number: u32,
) -> LateDeduction {
    let mut chosen: Option<(&'static str, Decimal)> = None;
    let mut candidates = serde_json::Map::new();

    for rule in rules {
        let amount = rule.evaluate(&summary, rates);
        candidates.insert(
            rule.rule_id().to_string(),
            serde_json::Value::String(amount.to_string()),
        );
        match chosen {
            Some((_, best)) if amount <= best => {}
            _ => chosen = Some((rule.rule_id(), amount)),
        }
    }

    let (rule_id, amount) = match chosen {
        Some((id, amount)) => (Some(id.to_string()), amount),
        None => (None, Decimal::ZERO),
    };

    let reasoning = match &rule_id {
        Some(id) if amount > Decimal::ZERO => format!(
            "{} late events ({} effective minutes, {} days over threshold); {} charges {}",
            summary.late_event_count,
            summary.effective_late_minutes,
            summary.days_over_threshold,
            id,
            amount.round_dp(2)
        ),
        _ => "No lateness beyond the grace period".to_string(),
    };

    let audit_step = AuditStep {
        step_number,
        rule_id: "late_deduction".to_string(),
        rule_name: "Late Deduction".to_string(),
        setting_ref: "late".to_string(),
        input: serde_json::json!({
            "effective_late_minutes": summary.effective_late_minutes,
            "late_event_count": summary.late_event_count,
            "days_over_threshold": summary.days_over_threshold,
            "daily_rate": rates.daily_rate.to_string(),
            "hourly_rate": rates.hourly_rate.to_string()
        }),
        output: serde_json::json!({
            "candidates": candidates,
            "selected_rule": rule_id,
            "amount": amount.to_string()
        }),
        reasoning,
    };

    LateDeduction {
        amount,
        rule_id,
        summary,
        audit_step,
    }
}

/// Computes the late deduction for a set of records under a tenant's policy.
pub fn calculate_late_deduction(
    records: &[AttendanceRecord],
    late: &LateSettings,
    rates: &DerivedRates,
    step_number: u32,
) -> LateDeduction {
    let summary = LatenessSummary::from_records(records, late);
    select_late_deduction(&late_rules_for(late), summary, rates, step_number)
}

/// The result of the absence deduction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AbsenceDeduction {
    /// ABSENT and UNPAID_LEAVE days.
    pub absent_days: u32,
    /// Absent days times the daily rate.
    pub amount: Decimal,
    /// The audit step recording the calculation.
    pub audit_step: AuditStep,
}

/// Charges one daily rate per absent or unpaid-leave day.
pub fn calculate_absence_deduction(
    records: &[AttendanceRecord],
    rates: &DerivedRates,
    step_number: u32,
) -> AbsenceDeduction {
    let absent_days = records.iter().filter(|r| r.status.is_absence()).count() as u32;
    let amount = rates.daily_rate * Decimal::from(absent_days);

    let audit_step = AuditStep {
        step_number,
        rule_id: "absence_deduction".to_string(),
        rule_name: "Absence Deduction".to_string(),
        setting_ref: "calculation_method".to_string(),
        input: serde_json::json!({
            "absent_days": absent_days,
            "daily_rate": rates.daily_rate.to_string()
        }),
        output: serde_json::json!({
            "amount": amount.to_string()
        }),
        reasoning: format!(
            "{} absent days x {} = {}",
            absent_days,
            rates.daily_rate.round_dp(4),
            amount.round_dp(2)
        ),
    };

    AbsenceDeduction {
        absent_days,
        amount,
        audit_step,
    }
}

/// A deduction waiting to be applied against the cap.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeductionRequest {
    /// Decides the position in the priority order.
    pub kind: DeductionKind,
    /// Payslip line code.
    pub code: String,
    /// Payslip line description.
    pub description: String,
    /// The amount requested.
    pub amount: Decimal,
}

/// A deduction after the cap was applied.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppliedDeduction {
    /// The original request.
    pub request: DeductionRequest,
    /// The part that fit under the cap.
    pub applied: Decimal,
    /// The part that did not.
    pub clipped: Decimal,
}

/// The result of applying deductions against the cap.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CappedDeductions {
    /// Deductions in the order they consumed the cap.
    pub deductions: Vec<AppliedDeduction>,
    /// The cap: gross times max percent over 100.
    pub cap: Decimal,
    /// Sum of applied amounts. Never exceeds the cap.
    pub total_applied: Decimal,
    /// Sum of clipped amounts.
    pub total_clipped: Decimal,
    /// The audit step recording the application.
    pub audit_step: AuditStep,
}

/// Applies deductions in priority order against a running total capped at
/// `gross * max_percent / 100`.
///
/// Requests of the same kind keep their relative order.
///
/// # Errors
///
/// Returns `InvalidConfiguration` when a request's kind is missing from the
/// priority list.
pub fn apply_deductions(
    mut requests: Vec<DeductionRequest>,
    priority: &[DeductionKind],
    gross: Decimal,
    max_percent: Decimal,
    step_number: u32,
) -> EngineResult<CappedDeductions> {
    let rank = |kind: DeductionKind| priority.iter().position(|k| *k == kind);
    if let Some(missing) = requests.iter().find(|r| rank(r.kind).is_none()) {
        return Err(EngineError::invalid_config(
            "deduction_priority",
            format!("deduction kind '{}' is not in the priority list", missing.kind),
        ));
    }
    requests.sort_by_key(|r| rank(r.kind));

    let cap = (gross * max_percent / Decimal::ONE_HUNDRED).max(Decimal::ZERO);
    let mut remaining = cap;
    let mut deductions = Vec::with_capacity(requests.len());
    for request in requests {
        let applied = request.amount.min(remaining).max(Decimal::ZERO);
        let clipped = request.amount - applied;
        remaining -= applied;
        deductions.push(AppliedDeduction {
            request,
            applied,
            clipped,
        });
    }

    let total_applied: Decimal = deductions.iter().map(|d| d.applied).sum();
    let total_clipped: Decimal = deductions.iter().map(|d| d.clipped).sum();

    let reasoning = if total_clipped > Decimal::ZERO {
        format!(
            "Deductions exceed cap {}; {} applied, {} clipped",
            cap.round_dp(2),
            total_applied.round_dp(2),
            total_clipped.round_dp(2)
        )
    } else {
        format!(
            "All deductions ({}) fit under cap {}",
            total_applied.round_dp(2),
            cap.round_dp(2)
        )
    };

    let audit_step = AuditStep {
        step_number,
        rule_id: "deduction_cap".to_string(),
        rule_name: "Deduction Priority and Cap".to_string(),
        setting_ref: "max_deduction_percent".to_string(),
        input: serde_json::json!({
            "gross_salary": gross.to_string(),
            "max_deduction_percent": max_percent.to_string(),
            "priority": priority.iter().map(|k| k.as_str()).collect::<Vec<_>>(),
            "requested": deductions
                .iter()
                .map(|d| serde_json::json!({
                    "code": d.request.code,
                    "amount": d.request.amount.to_string()
                }))
                .collect::<Vec<_>>()
        }),
        output: serde_json::json!({
            "cap": cap.to_string(),
            "total_applied": total_applied.to_string(),
            "total_clipped": total_clipped.to_string()
        }),
        reasoning,
    };

    Ok(CappedDeductions {
        deductions,
        cap,
        total_applied,
        total_clipped,
        audit_step,
    })
}
