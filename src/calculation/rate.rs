//! Daily and hourly rate derivation.
//!
//! This module resolves the number of days in a pay period under the tenant's
//! calculation method and derives the daily and hourly rates every other
//! calculator works from.

use chrono::{NaiveDate, Weekday};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::config::{CalculationMethod, PayrollSettings};
use crate::error::{EngineError, EngineResult};
use crate::models::{AuditStep, PayPeriod};

/// Days in period used by the `FIXED_30` method.
pub const FIXED_PERIOD_DAYS: u32 = 30;

/// Daily and hourly rates derived from a salary.
///
/// # Example
///
/// ```
/// use payroll_engine::calculation::calculate_rates;
/// use payroll_engine::config::CalculationMethod;
/// use payroll_engine::models::PayPeriod;
/// use rust_decimal::Decimal;
///
/// let period = PayPeriod::month(2026, 3).unwrap();
/// let rates = calculate_rates(
///     Decimal::from(9000),
///     CalculationMethod::Fixed30,
///     Decimal::from(9),
///     None,
///     &period,
///     &[],
///     1,
/// )
/// .unwrap();
///
/// assert_eq!(rates.daily_rate, Decimal::from(300));
/// assert_eq!(rates.days_in_period, 30);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DerivedRates {
    /// The salary the rates were derived from.
    pub salary: Decimal,
    /// Resolved number of days in the period.
    pub days_in_period: u32,
    /// Salary divided by days in period.
    pub daily_rate: Decimal,
    /// Daily rate divided by hours per day.
    pub hourly_rate: Decimal,
    /// The audit step recording this derivation.
    pub audit_step: AuditStep,
}

/// Resolves the days in a period for a calculation method.
pub fn resolve_days_in_period(
    method: CalculationMethod,
    period: &PayPeriod,
    weekend: &[Weekday],
) -> u32 {
    match method {
        CalculationMethod::Fixed30 => FIXED_PERIOD_DAYS,
        CalculationMethod::CalendarDays => period.calendar_days(),
        CalculationMethod::WorkingDays => period.working_days(weekend),
    }
}

/// Counts the days of `[from, to]` inside the period the way the method
/// counts days. Used for proration.
///
/// `FIXED_30` counts calendar days, capped at 30.
pub fn count_days_between(
    method: CalculationMethod,
    period: &PayPeriod,
    weekend: &[Weekday],
    from: NaiveDate,
    to: NaiveDate,
) -> u32 {
    match method {
        CalculationMethod::Fixed30 => period
            .calendar_days_between(from, to)
            .min(FIXED_PERIOD_DAYS),
        CalculationMethod::CalendarDays => period.calendar_days_between(from, to),
        CalculationMethod::WorkingDays => period.working_days_between(from, to, weekend),
    }
}

/// Derives the daily and hourly rates for a salary.
///
/// `days_override`, when set, replaces the day count resolved from the
/// method.
///
/// # Errors
///
/// Returns `InvalidConfiguration` when the salary or hours per day is not
/// positive, or when the period resolves to zero days.
pub fn calculate_rates(
    salary: Decimal,
    method: CalculationMethod,
    hours_per_day: Decimal,
    days_override: Option<u32>,
    period: &PayPeriod,
    weekend: &[Weekday],
    step_number: u32,
) -> EngineResult<DerivedRates> {
    if salary <= Decimal::ZERO {
        return Err(EngineError::invalid_config(
            "salary",
            format!("salary must be greater than zero, got {}", salary),
        ));
    }
    if hours_per_day <= Decimal::ZERO {
        return Err(EngineError::invalid_config(
            "hours_per_day",
            format!("hours per day must be greater than zero, got {}", hours_per_day),
        ));
    }

    let days_in_period =
        days_override.unwrap_or_else(|| resolve_days_in_period(method, period, weekend));
    if days_in_period == 0 {
        return Err(EngineError::invalid_config(
            "days_in_period",
            format!(
                "period {} to {} has no days under {:?}",
                period.start_date, period.end_date, method
            ),
        ));
    }

    let daily_rate = salary / Decimal::from(days_in_period);
    let hourly_rate = daily_rate / hours_per_day;

    let source = if days_override.is_some() {
        "override"
    } else {
        "method"
    };
    let audit_step = AuditStep {
        step_number,
        rule_id: "rate_derivation".to_string(),
        rule_name: "Rate Derivation".to_string(),
        setting_ref: "calculation_method".to_string(),
        input: serde_json::json!({
            "salary": salary.to_string(),
            "calculation_method": method,
            "hours_per_day": hours_per_day.normalize().to_string(),
            "period_start": period.start_date.to_string(),
            "period_end": period.end_date.to_string()
        }),
        output: serde_json::json!({
            "days_in_period": days_in_period,
            "days_source": source,
            "daily_rate": daily_rate.to_string(),
            "hourly_rate": hourly_rate.to_string()
        }),
        reasoning: format!(
            "{} / {} days = {} per day; / {} hours = {} per hour",
            salary,
            days_in_period,
            daily_rate.round_dp(4),
            hours_per_day.normalize(),
            hourly_rate.round_dp(4)
        ),
    };

    Ok(DerivedRates {
        salary,
        days_in_period,
        daily_rate,
        hourly_rate,
        audit_step,
    })
}

/// Derives rates using a tenant's settings.
pub fn calculate_rates_for(
    salary: Decimal,
    settings: &PayrollSettings,
    period: &PayPeriod,
    step_number: u32,
) -> EngineResult<DerivedRates> {
    calculate_rates(
        salary,
        settings.calculation_method,
        settings.hours_per_day,
        settings.days_in_period_override,
        period,
        &settings.weekend_days,
        step_number,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{date, dec};
    use proptest::prelude::*;

    const WEEKEND: [Weekday; 2] = [Weekday::Fri, Weekday::Sat];

    fn march() -> PayPeriod {
        PayPeriod::month(2026, 3).unwrap()
    }

    // ==========================================================================
    // Day resolution
    // ==========================================================================

    #[test]
    fn test_fixed_30_ignores_month_length() {
        let feb = PayPeriod::month(2026, 2).unwrap();
        assert_eq!(resolve_days_in_period(CalculationMethod::Fixed30, &feb, &WEEKEND), 30);
        assert_eq!(resolve_days_in_period(CalculationMethod::Fixed30, &march(), &WEEKEND), 30);
    }

    #[test]
    fn test_calendar_days_uses_period_length() {
        let feb = PayPeriod::month(2026, 2).unwrap();
        assert_eq!(resolve_days_in_period(CalculationMethod::CalendarDays, &feb, &WEEKEND), 28);
        assert_eq!(
            resolve_days_in_period(CalculationMethod::CalendarDays, &march(), &WEEKEND),
            31
        );
    }

    #[test]
    fn test_working_days_excludes_weekend_and_holidays() {
        let period = march().with_holiday(date(2026, 3, 2), "Founding Day");
        assert_eq!(resolve_days_in_period(CalculationMethod::WorkingDays, &period, &WEEKEND), 22);
    }

    #[test]
    fn test_count_days_between_for_fixed_30_is_capped() {
        let period = march();
        assert_eq!(
            count_days_between(
                CalculationMethod::Fixed30,
                &period,
                &WEEKEND,
                date(2026, 1, 1),
                date(2026, 12, 31)
            ),
            30
        );
        assert_eq!(
            count_days_between(
                CalculationMethod::Fixed30,
                &period,
                &WEEKEND,
                date(2026, 3, 17),
                date(2026, 12, 31)
            ),
            15
        );
    }

    // ==========================================================================
    // Rate derivation
    // ==========================================================================

    #[test]
    fn test_fixed_30_rates() {
        let rates = calculate_rates(
            dec("9000"),
            CalculationMethod::Fixed30,
            dec("9"),
            None,
            &march(),
            &WEEKEND,
            1,
        )
        .unwrap();

        assert_eq!(rates.days_in_period, 30);
        assert_eq!(rates.daily_rate, dec("300"));
        assert_eq!(rates.hourly_rate.round_dp(2), dec("33.33"));
        assert_eq!(rates.audit_step.rule_id, "rate_derivation");
        assert_eq!(rates.audit_step.step_number, 1);
        assert_eq!(rates.audit_step.output["days_in_period"], 30);
    }

    #[test]
    fn test_override_replaces_resolved_days() {
        let rates = calculate_rates(
            dec("6000"),
            CalculationMethod::CalendarDays,
            dec("8"),
            Some(26),
            &march(),
            &WEEKEND,
            3,
        )
        .unwrap();

        assert_eq!(rates.days_in_period, 26);
        assert_eq!(rates.audit_step.output["days_source"], "override");
    }

    #[test]
    fn test_non_positive_salary_is_rejected() {
        for salary in ["0", "-100"] {
            let result = calculate_rates(
                dec(salary),
                CalculationMethod::Fixed30,
                dec("8"),
                None,
                &march(),
                &WEEKEND,
                1,
            );
            match result {
                Err(EngineError::InvalidConfiguration { field, .. }) => assert_eq!(field, "salary"),
                other => panic!("Expected InvalidConfiguration, got {:?}", other),
            }
        }
    }

    #[test]
    fn test_zero_hours_per_day_is_rejected() {
        let result = calculate_rates(
            dec("9000"),
            CalculationMethod::Fixed30,
            Decimal::ZERO,
            None,
            &march(),
            &WEEKEND,
            1,
        );
        assert!(matches!(result, Err(EngineError::InvalidConfiguration { .. })));
    }

    #[test]
    fn test_period_without_working_days_is_rejected() {
        // A single Friday with a Friday/Saturday weekend.
        let period = PayPeriod {
            start_date: date(2026, 3, 6),
            end_date: date(2026, 3, 6),
            public_holidays: vec![],
        };
        let result = calculate_rates(
            dec("9000"),
            CalculationMethod::WorkingDays,
            dec("8"),
            None,
            &period,
            &WEEKEND,
            1,
        );
        match result {
            Err(EngineError::InvalidConfiguration { field, .. }) => {
                assert_eq!(field, "days_in_period")
            }
            other => panic!("Expected InvalidConfiguration, got {:?}", other),
        }
    }

    // ==========================================================================
    // Properties
    // ==========================================================================

    proptest! {
        #[test]
        fn prop_rate_identities_hold(
            cents in 1i64..10_000_000i64,
            days in 1u32..=31,
            hours in 1i64..=24,
        ) {
            let salary = Decimal::new(cents, 2);
            let hours = Decimal::from(hours);
            let rates = calculate_rates(
                salary,
                CalculationMethod::CalendarDays,
                hours,
                Some(days),
                &march(),
                &WEEKEND,
                1,
            )
            .unwrap();

            let tolerance = Decimal::new(1, 12);
            prop_assert!((rates.daily_rate * Decimal::from(days) - salary).abs() < tolerance);
            prop_assert!((rates.hourly_rate * hours - rates.daily_rate).abs() < tolerance);
        }
    }
}
