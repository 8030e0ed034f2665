//! Shared fixtures for unit tests.

use std::str::FromStr;

use chrono::{NaiveDate, Weekday};
use rust_decimal::Decimal;

use crate::config::{
    CalculationMethod, LateDeductionMethod, LateSettings, OvertimeAllocationPolicy,
    OvertimeSettings, OvertimeSource, PayrollSettings, RoundingRule, StatutorySettings,
};
use crate::models::{
    AttendanceRecord, AttendanceStatus, EmployeeInputs, PayPeriod, SalaryAssignment,
};

pub(crate) fn dec(s: &str) -> Decimal {
    Decimal::from_str(s).unwrap()
}

pub(crate) fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

/// FIXED_30, per-minute late deductions, no cumulative rule, no overtime cap.
pub(crate) fn sample_settings() -> PayrollSettings {
    PayrollSettings {
        tenant_id: "acme".to_string(),
        calculation_method: CalculationMethod::Fixed30,
        hours_per_day: dec("8"),
        days_in_period_override: None,
        weekend_days: vec![Weekday::Fri, Weekday::Sat],
        overtime_source: OvertimeSource::BasicOnly,
        overtime: OvertimeSettings {
            multiplier: dec("1.5"),
            weekend_multiplier: dec("1.75"),
            holiday_multiplier: dec("2.0"),
            cap_enabled: false,
            cap_hours: None,
            allocation: OvertimeAllocationPolicy::HolidayFirst,
        },
        late: LateSettings {
            grace_period_minutes: 15,
            method: LateDeductionMethod::PerMinute,
            day_threshold_minutes: None,
            cumulative_threshold: None,
        },
        deduction_priority: ["ABSENCE", "LATE", "LOAN", "ADVANCE", "PENALTY", "OTHER"]
            .iter()
            .map(|k| k.to_string())
            .collect(),
        max_deduction_percent: dec("50"),
        rounding: RoundingRule::default(),
        statutory: StatutorySettings {
            employee_rate: dec("0.0975"),
            employer_rate: dec("0.1175"),
            insurable_cap: dec("45000"),
        },
    }
}

/// An open-ended 9000 base salary assignment without components.
pub(crate) fn sample_assignment(employee_id: &str) -> SalaryAssignment {
    SalaryAssignment {
        employee_id: employee_id.to_string(),
        base_salary: dec("9000"),
        effective_from: date(2025, 1, 1),
        effective_to: None,
        components: vec![],
    }
}

pub(crate) fn attendance(
    employee_id: &str,
    day: NaiveDate,
    status: AttendanceStatus,
    late_minutes: u32,
) -> AttendanceRecord {
    AttendanceRecord {
        employee_id: employee_id.to_string(),
        date: day,
        status,
        late_minutes,
        overtime_minutes: 0,
        overtime_split: None,
    }
}

/// March 2026 inputs for one employee with no attendance.
pub(crate) fn sample_inputs(employee_id: &str) -> EmployeeInputs {
    EmployeeInputs {
        employee_id: employee_id.to_string(),
        period: PayPeriod::month(2026, 3).unwrap(),
        assignment: Some(sample_assignment(employee_id)),
        attendance: vec![],
        manual_deductions: vec![],
        statutory_eligible: false,
    }
}
