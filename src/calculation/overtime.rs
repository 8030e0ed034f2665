//! Overtime aggregation, capping and pay.
//!
//! Overtime is requested in three categories. When the monthly cap bites,
//! an [`OvertimeAllocationStrategy`] decides which hours are kept; each
//! allocated hour is then paid at the hourly rate times its category
//! multiplier.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::config::{OvertimeAllocationPolicy, OvertimeSettings};
use crate::error::{EngineError, EngineResult};
use crate::models::{AttendanceRecord, AuditStep};

const MINUTES_PER_HOUR: Decimal = Decimal::from_parts(60, 0, 0, false, 0);

/// Overtime hours by category.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OvertimeHours {
    /// Working-day overtime.
    pub regular: Decimal,
    /// Weekend overtime.
    pub weekend: Decimal,
    /// Public holiday overtime.
    pub holiday: Decimal,
}

impl OvertimeHours {
    /// Creates hours from the three categories.
    pub fn new(regular: Decimal, weekend: Decimal, holiday: Decimal) -> Self {
        Self {
            regular,
            weekend,
            holiday,
        }
    }

    /// Sums the overtime of a set of attendance records.
    pub fn from_records(records: &[AttendanceRecord]) -> Self {
        let (regular, weekend, holiday) =
            records
                .iter()
                .fold((0u64, 0u64, 0u64), |(r, w, h), record| {
                    let split = record.overtime_by_category();
                    (
                        r + u64::from(split.regular_minutes),
                        w + u64::from(split.weekend_minutes),
                        h + u64::from(split.holiday_minutes),
                    )
                });
        Self {
            regular: Decimal::from(regular) / MINUTES_PER_HOUR,
            weekend: Decimal::from(weekend) / MINUTES_PER_HOUR,
            holiday: Decimal::from(holiday) / MINUTES_PER_HOUR,
        }
    }

    /// Sum of all categories.
    pub fn total(&self) -> Decimal {
        self.regular + self.weekend + self.holiday
    }
}

/// Decides which requested hours survive a cap.
///
/// Implementations must return hours that are each within the requested
/// hours of their category and that sum to exactly `allowed` whenever
/// `allowed` does not exceed the requested total.
pub trait OvertimeAllocationStrategy: Send + Sync {
    /// Stable identifier recorded in the audit trail.
    fn name(&self) -> &'static str;

    /// Allocates `allowed` hours across the requested categories.
    fn allocate(&self, requested: &OvertimeHours, allowed: Decimal) -> OvertimeHours;
}

/// Fills holiday hours first, then weekend, then regular.
#[derive(Debug, Clone, Copy, Default)]
pub struct HolidayFirstAllocation;

impl OvertimeAllocationStrategy for HolidayFirstAllocation {
    fn name(&self) -> &'static str {
        "holiday_first"
    }

    fn allocate(&self, requested: &OvertimeHours, allowed: Decimal) -> OvertimeHours {
        let mut remaining = allowed.max(Decimal::ZERO);
        let mut take = |hours: Decimal| {
            let taken = hours.min(remaining);
            remaining -= taken;
            taken
        };
        let holiday = take(requested.holiday);
        let weekend = take(requested.weekend);
        let regular = take(requested.regular);
        OvertimeHours {
            regular,
            weekend,
            holiday,
        }
    }
}

/// The strategy for an allocation policy.
pub fn allocation_strategy(policy: OvertimeAllocationPolicy) -> Box<dyn OvertimeAllocationStrategy> {
    match policy {
        OvertimeAllocationPolicy::HolidayFirst => Box::new(HolidayFirstAllocation),
    }
}

/// Overtime pay for one category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OvertimeCategoryPay {
    /// Allocated hours.
    pub hours: Decimal,
    /// Multiplier applied.
    pub multiplier: Decimal,
    /// hours x hourly rate x multiplier.
    pub amount: Decimal,
}

/// The result of the overtime calculation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OvertimeResult {
    /// Hours requested per category.
    pub requested: OvertimeHours,
    /// Hours allocated per category.
    pub allocated: OvertimeHours,
    /// Sum of requested hours.
    pub total_requested: Decimal,
    /// The cap when it bites, otherwise the requested total.
    pub total_allowed: Decimal,
    /// Pay for regular overtime.
    pub regular: OvertimeCategoryPay,
    /// Pay for weekend overtime.
    pub weekend: OvertimeCategoryPay,
    /// Pay for holiday overtime.
    pub holiday: OvertimeCategoryPay,
    /// Total overtime pay.
    pub total_pay: Decimal,
    /// The audit step recording the calculation.
    pub audit_step: AuditStep,
}

/// Caps, allocates and prices overtime.
///
/// # Errors
///
/// Returns `CalculationError` when any requested category is negative, and
/// `InvalidConfiguration` when the cap is enabled without `cap_hours`.
///
/// # Example
///
/// ```
/// use payroll_engine::calculation::{calculate_overtime, OvertimeHours};
/// use payroll_engine::config::{OvertimeAllocationPolicy, OvertimeSettings};
/// use rust_decimal::Decimal;
///
/// let settings = OvertimeSettings {
///     multiplier: Decimal::new(15, 1),
///     weekend_multiplier: Decimal::new(15, 1),
///     holiday_multiplier: Decimal::from(2),
///     cap_enabled: true,
///     cap_hours: Some(Decimal::from(5)),
///     allocation: OvertimeAllocationPolicy::HolidayFirst,
/// };
/// let requested = OvertimeHours::new(Decimal::from(4), Decimal::from(4), Decimal::ZERO);
/// let result = calculate_overtime("emp_001", requested, &settings, Decimal::from(40), 1).unwrap();
///
/// assert_eq!(result.allocated.weekend, Decimal::from(4));
/// assert_eq!(result.allocated.regular, Decimal::from(1));
/// ```
pub fn calculate_overtime(
    employee_id: &str,
    requested: OvertimeHours,
    settings: &OvertimeSettings,
    hourly_rate: Decimal,
    step_number: u32,
) -> EngineResult<OvertimeResult> {
    for (category, hours) in [
        ("regular", requested.regular),
        ("weekend", requested.weekend),
        ("holiday", requested.holiday),
    ] {
        if hours < Decimal::ZERO {
            return Err(EngineError::calculation(
                employee_id,
                format!("{} overtime hours must not be negative, got {}", category, hours),
            ));
        }
    }

    let total_requested = requested.total();
    let cap = match (settings.cap_enabled, settings.cap_hours) {
        (true, None) => {
            return Err(EngineError::invalid_config(
                "overtime.cap_hours",
                "required when cap_enabled is true",
            ));
        }
        (true, cap) => cap,
        (false, _) => None,
    };
    let (total_allowed, capped) = match cap {
        Some(cap) if total_requested > cap => (cap, true),
        _ => (total_requested, false),
    };

    let strategy = allocation_strategy(settings.allocation);
    let allocated = if total_allowed.is_zero() {
        OvertimeHours::default()
    } else if capped {
        strategy.allocate(&requested, total_allowed)
    } else {
        requested
    };

    let price = |hours: Decimal, multiplier: Decimal| OvertimeCategoryPay {
        hours,
        multiplier,
        amount: hours * hourly_rate * multiplier,
    };
    let regular = price(allocated.regular, settings.multiplier);
    let weekend = price(allocated.weekend, settings.weekend_multiplier);
    let holiday = price(allocated.holiday, settings.holiday_multiplier);
    let total_pay = regular.amount + weekend.amount + holiday.amount;

    let reasoning = if capped {
        format!(
            "{} hours requested exceeds cap of {}; allocated {} holiday, {} weekend, {} regular ({})",
            total_requested.normalize(),
            total_allowed.normalize(),
            allocated.holiday.normalize(),
            allocated.weekend.normalize(),
            allocated.regular.normalize(),
            strategy.name()
        )
    } else if total_requested.is_zero() {
        "No overtime requested".to_string()
    } else {
        format!(
            "{} overtime hours paid in full for {}",
            total_requested.normalize(),
            total_pay.round_dp(2)
        )
    };

    let audit_step = AuditStep {
        step_number,
        rule_id: "overtime".to_string(),
        rule_name: "Overtime Cap and Pay".to_string(),
        setting_ref: "overtime".to_string(),
        input: serde_json::json!({
            "requested": {
                "regular": requested.regular.normalize().to_string(),
                "weekend": requested.weekend.normalize().to_string(),
                "holiday": requested.holiday.normalize().to_string()
            },
            "cap_enabled": settings.cap_enabled,
            "cap_hours": settings.cap_hours.map(|c| c.normalize().to_string()),
            "hourly_rate": hourly_rate.to_string()
        }),
        output: serde_json::json!({
            "allocated": {
                "regular": allocated.regular.normalize().to_string(),
                "weekend": allocated.weekend.normalize().to_string(),
                "holiday": allocated.holiday.normalize().to_string()
            },
            "total_allowed": total_allowed.normalize().to_string(),
            "total_pay": total_pay.to_string()
        }),
        reasoning,
    };

    Ok(OvertimeResult {
        requested,
        allocated,
        total_requested,
        total_allowed,
        regular,
        weekend,
        holiday,
        total_pay,
        audit_step,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{AttendanceStatus, OvertimeSplit};
    use crate::test_support::{attendance, date, dec};
    use proptest::prelude::*;

    fn settings(cap: Option<&str>) -> OvertimeSettings {
        OvertimeSettings {
            multiplier: dec("1.5"),
            weekend_multiplier: dec("1.75"),
            holiday_multiplier: dec("2"),
            cap_enabled: cap.is_some(),
            cap_hours: cap.map(dec),
            allocation: OvertimeAllocationPolicy::HolidayFirst,
        }
    }

    fn hours(regular: &str, weekend: &str, holiday: &str) -> OvertimeHours {
        OvertimeHours::new(dec(regular), dec(weekend), dec(holiday))
    }

    // ==========================================================================
    // Allocation
    // ==========================================================================

    #[test]
    fn test_cap_allocates_weekend_before_regular() {
        let result =
            calculate_overtime("emp_001", hours("4", "4", "0"), &settings(Some("5")), dec("40"), 1)
                .unwrap();

        assert_eq!(result.allocated, hours("1", "4", "0"));
        assert_eq!(result.total_allowed, dec("5"));
        assert_eq!(result.total_requested, dec("8"));
    }

    #[test]
    fn test_cap_allocates_holiday_first() {
        let result =
            calculate_overtime("emp_001", hours("3", "3", "3"), &settings(Some("4")), dec("40"), 1)
                .unwrap();
        assert_eq!(result.allocated, hours("0", "1", "3"));
    }

    #[test]
    fn test_disabled_cap_pays_everything() {
        let mut s = settings(Some("5"));
        s.cap_enabled = false;
        let result = calculate_overtime("emp_001", hours("10", "4", "2"), &s, dec("40"), 1).unwrap();

        assert_eq!(result.allocated, hours("10", "4", "2"));
        assert_eq!(result.total_allowed, dec("16"));
    }

    #[test]
    fn test_zero_cap_yields_no_pay() {
        let result =
            calculate_overtime("emp_001", hours("2", "1", "1"), &settings(Some("0")), dec("40"), 1)
                .unwrap();

        assert_eq!(result.allocated, OvertimeHours::default());
        assert_eq!(result.total_pay, Decimal::ZERO);
    }

    #[test]
    fn test_enabled_cap_without_hours_is_invalid_config() {
        let mut s = settings(None);
        s.cap_enabled = true;
        let result = calculate_overtime("emp_001", hours("10", "0", "0"), &s, dec("40"), 1);

        assert!(matches!(
            result,
            Err(EngineError::InvalidConfiguration { field, .. }) if field == "overtime.cap_hours"
        ));
    }

    #[test]
    fn test_negative_hours_are_calculation_errors() {
        let result =
            calculate_overtime("emp_042", hours("-1", "0", "0"), &settings(None), dec("40"), 1);
        match result {
            Err(EngineError::CalculationError {
                employee_id,
                message,
            }) => {
                assert_eq!(employee_id, "emp_042");
                assert!(message.contains("regular"));
            }
            other => panic!("Expected CalculationError, got {:?}", other),
        }
    }

    // ==========================================================================
    // Pay
    // ==========================================================================

    #[test]
    fn test_pay_uses_category_multipliers() {
        let result =
            calculate_overtime("emp_001", hours("2", "2", "1"), &settings(None), dec("40"), 7)
                .unwrap();

        assert_eq!(result.regular.amount, dec("120"));
        assert_eq!(result.weekend.amount, dec("140"));
        assert_eq!(result.holiday.amount, dec("80"));
        assert_eq!(result.total_pay, dec("340"));
        assert_eq!(result.audit_step.step_number, 7);
        assert_eq!(result.audit_step.rule_id, "overtime");
    }

    #[test]
    fn test_hours_from_records_use_category_split() {
        let mut present = attendance("emp_001", date(2026, 3, 2), AttendanceStatus::Present, 0);
        present.overtime_minutes = 90;
        let mut rest = attendance("emp_001", date(2026, 3, 6), AttendanceStatus::RestDay, 0);
        rest.overtime_minutes = 240;
        let mut split = attendance("emp_001", date(2026, 3, 9), AttendanceStatus::Present, 0);
        split.overtime_split = Some(OvertimeSplit {
            regular_minutes: 30,
            weekend_minutes: 0,
            holiday_minutes: 120,
        });

        let total = OvertimeHours::from_records(&[present, rest, split]);
        assert_eq!(total, hours("2", "4", "2"));
    }

    proptest! {
        #[test]
        fn prop_allocation_respects_cap(
            regular in 0i64..10_000,
            weekend in 0i64..10_000,
            holiday in 0i64..10_000,
            cap in 0i64..20_000,
        ) {
            let requested = OvertimeHours::new(
                Decimal::new(regular, 2),
                Decimal::new(weekend, 2),
                Decimal::new(holiday, 2),
            );
            let cap = Decimal::new(cap, 2);
            let mut s = settings(None);
            s.cap_enabled = true;
            s.cap_hours = Some(cap);

            let result = calculate_overtime("emp_001", requested, &s, Decimal::from(40), 1).unwrap();

            prop_assert_eq!(result.allocated.total(), result.total_allowed);
            prop_assert_eq!(result.total_allowed, cap.min(requested.total()));
            prop_assert!(result.allocated.regular <= requested.regular);
            prop_assert!(result.allocated.weekend <= requested.weekend);
            prop_assert!(result.allocated.holiday <= requested.holiday);
        }
    }
}
