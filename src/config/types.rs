//! Configuration types for payroll calculation.
//!
//! This module contains the strongly-typed settings structures that are
//! deserialized from the per-tenant YAML files, together with their
//! validation rules.

use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc, Weekday};
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

use crate::error::{EngineError, EngineResult};

/// How the number of days in a pay period is counted when deriving rates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CalculationMethod {
    /// The calendar length of the period (28 to 31 for a month).
    CalendarDays,
    /// Days that are neither weekend days nor public holidays.
    WorkingDays,
    /// Always 30 days.
    #[serde(rename = "FIXED_30")]
    Fixed30,
}

/// Which salary components the overtime hourly rate is derived from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OvertimeSource {
    /// Base salary only.
    BasicOnly,
    /// Base salary plus overtime-eligible structure components.
    BasicPlusAllowances,
}

/// How the standard late deduction is charged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LateDeductionMethod {
    /// One day's pay per day late beyond the per-day threshold.
    DailyRate,
    /// Minutes late beyond the grace period, charged at the hourly rate.
    PerMinute,
}

/// How overtime hours are allocated when the monthly cap bites.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OvertimeAllocationPolicy {
    /// Holiday hours first, then weekend, then regular.
    #[default]
    HolidayFirst,
}

/// Direction used by a [`RoundingRule`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RoundingDirection {
    /// Towards positive infinity.
    Up,
    /// Towards negative infinity.
    Down,
    /// To the nearest multiple, midpoints away from zero.
    Nearest,
}

/// Rounds an amount to a multiple of `nearest` in the given direction.
///
/// # Example
///
/// ```
/// use payroll_engine::config::{RoundingDirection, RoundingRule};
/// use rust_decimal::Decimal;
/// use std::str::FromStr;
///
/// let rule = RoundingRule {
///     nearest: Decimal::from_str("0.05").unwrap(),
///     direction: RoundingDirection::Nearest,
/// };
/// assert_eq!(
///     rule.apply(Decimal::from_str("10.12").unwrap()),
///     Decimal::from_str("10.10").unwrap()
/// );
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoundingRule {
    /// The granularity, e.g. `0.01`, `1` or `5`.
    pub nearest: Decimal,
    /// The rounding direction.
    pub direction: RoundingDirection,
}

impl RoundingRule {
    /// Applies the rule to an amount.
    pub fn apply(&self, amount: Decimal) -> Decimal {
        let units = amount / self.nearest;
        let rounded = match self.direction {
            RoundingDirection::Up => units.ceil(),
            RoundingDirection::Down => units.floor(),
            RoundingDirection::Nearest => {
                units.round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
            }
        };
        rounded * self.nearest
    }
}

impl Default for RoundingRule {
    fn default() -> Self {
        Self {
            nearest: Decimal::new(1, 2),
            direction: RoundingDirection::Nearest,
        }
    }
}

/// The kinds of deduction the priority list can order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DeductionKind {
    /// Late arrival.
    Late,
    /// Absence and unpaid leave.
    Absence,
    /// Loan installment.
    Loan,
    /// Salary advance recovery.
    Advance,
    /// Disciplinary penalty.
    Penalty,
    /// Anything else supplied by the caller.
    Other,
}

impl DeductionKind {
    /// The canonical upper-case name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Late => "LATE",
            Self::Absence => "ABSENCE",
            Self::Loan => "LOAN",
            Self::Advance => "ADVANCE",
            Self::Penalty => "PENALTY",
            Self::Other => "OTHER",
        }
    }
}

impl fmt::Display for DeductionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DeductionKind {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "LATE" => Ok(Self::Late),
            "ABSENCE" => Ok(Self::Absence),
            "LOAN" => Ok(Self::Loan),
            "ADVANCE" => Ok(Self::Advance),
            "PENALTY" => Ok(Self::Penalty),
            "OTHER" => Ok(Self::Other),
            _ => Err(EngineError::invalid_config(
                "deduction_priority",
                format!("unknown deduction kind '{}'", s),
            )),
        }
    }
}

/// Overtime multipliers and the monthly cap.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OvertimeSettings {
    /// Multiplier for regular (weekday) overtime.
    pub multiplier: Decimal,
    /// Multiplier for weekend overtime.
    pub weekend_multiplier: Decimal,
    /// Multiplier for public holiday overtime.
    pub holiday_multiplier: Decimal,
    /// Whether the monthly cap is enforced.
    #[serde(default)]
    pub cap_enabled: bool,
    /// Monthly cap in hours.
    #[serde(default)]
    pub cap_hours: Option<Decimal>,
    /// Allocation policy when the cap bites.
    #[serde(default)]
    pub allocation: OvertimeAllocationPolicy,
}

/// Late-arrival policy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LateSettings {
    /// Minutes of lateness forgiven each day.
    #[serde(default)]
    pub grace_period_minutes: u32,
    /// How the standard late deduction is charged.
    pub method: LateDeductionMethod,
    /// Lateness above which a day counts for the daily-rate method.
    /// Falls back to the grace period when absent.
    #[serde(default)]
    pub day_threshold_minutes: Option<u32>,
    /// Number of late events that costs one full day. Absent disables the
    /// cumulative rule.
    #[serde(default)]
    pub cumulative_threshold: Option<u32>,
}

impl LateSettings {
    /// The per-day threshold used by the daily-rate method.
    pub fn effective_day_threshold(&self) -> u32 {
        self.day_threshold_minutes
            .unwrap_or(self.grace_period_minutes)
    }
}

/// Social-insurance contribution rates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatutorySettings {
    /// Employee share as a fraction (e.g. `0.0975`).
    pub employee_rate: Decimal,
    /// Employer share as a fraction.
    pub employer_rate: Decimal,
    /// Maximum insurable salary per month.
    pub insurable_cap: Decimal,
}

fn default_hours_per_day() -> Decimal {
    Decimal::from(8)
}

fn default_weekend_days() -> Vec<Weekday> {
    vec![Weekday::Fri, Weekday::Sat]
}

/// The complete payroll policy of one tenant.
///
/// Instances are immutable once handed out by the
/// [`SettingsRegistry`](super::SettingsRegistry); replacing a tenant's
/// settings produces a new snapshot and never alters one already in use.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PayrollSettings {
    /// The tenant these settings belong to.
    pub tenant_id: String,
    /// How days in the period are counted.
    pub calculation_method: CalculationMethod,
    /// Working hours per day used to derive the hourly rate.
    #[serde(default = "default_hours_per_day")]
    pub hours_per_day: Decimal,
    /// Overrides the resolved days-in-period when set.
    #[serde(default)]
    pub days_in_period_override: Option<u32>,
    /// Weekly rest days excluded by the working-days method.
    #[serde(default = "default_weekend_days")]
    pub weekend_days: Vec<Weekday>,
    /// Which components feed the overtime rate.
    pub overtime_source: OvertimeSource,
    /// Overtime multipliers and cap.
    pub overtime: OvertimeSettings,
    /// Late-arrival policy.
    pub late: LateSettings,
    /// Deduction kinds in the order they consume the deduction cap.
    pub deduction_priority: Vec<String>,
    /// Maximum share of gross salary that discretionary deductions may take.
    pub max_deduction_percent: Decimal,
    /// Rounding applied once to the net salary. Every tenant states its own.
    pub rounding: RoundingRule,
    /// Social-insurance rates and cap.
    pub statutory: StatutorySettings,
}

impl PayrollSettings {
    /// Resolves the priority list into deduction kinds.
    ///
    /// Fails with `InvalidConfiguration` on an unknown or repeated kind.
    pub fn deduction_priority(&self) -> EngineResult<Vec<DeductionKind>> {
        let mut seen = HashSet::new();
        let mut kinds = Vec::with_capacity(self.deduction_priority.len());
        for raw in &self.deduction_priority {
            let kind: DeductionKind = raw.parse()?;
            if !seen.insert(kind) {
                return Err(EngineError::invalid_config(
                    "deduction_priority",
                    format!("deduction kind '{}' listed more than once", kind),
                ));
            }
            kinds.push(kind);
        }
        Ok(kinds)
    }

    /// Checks every rule the calculators rely on.
    pub fn validate(&self) -> EngineResult<()> {
        if self.tenant_id.trim().is_empty() {
            return Err(EngineError::invalid_config("tenant_id", "must not be empty"));
        }
        if self.hours_per_day <= Decimal::ZERO {
            return Err(EngineError::invalid_config(
                "hours_per_day",
                "must be greater than zero",
            ));
        }
        if self.days_in_period_override == Some(0) {
            return Err(EngineError::invalid_config(
                "days_in_period_override",
                "must be greater than zero",
            ));
        }
        let distinct_weekend: HashSet<Weekday> = self.weekend_days.iter().copied().collect();
        if distinct_weekend.len() >= 7 {
            return Err(EngineError::invalid_config(
                "weekend_days",
                "at least one working day is required",
            ));
        }

        let overtime = &self.overtime;
        for (field, value) in [
            ("overtime.multiplier", overtime.multiplier),
            ("overtime.weekend_multiplier", overtime.weekend_multiplier),
            ("overtime.holiday_multiplier", overtime.holiday_multiplier),
        ] {
            if value < Decimal::ZERO {
                return Err(EngineError::invalid_config(field, "must not be negative"));
            }
        }
        match (overtime.cap_enabled, overtime.cap_hours) {
            (true, None) => {
                return Err(EngineError::invalid_config(
                    "overtime.cap_hours",
                    "required when cap_enabled is true",
                ));
            }
            (_, Some(cap)) if cap < Decimal::ZERO => {
                return Err(EngineError::invalid_config(
                    "overtime.cap_hours",
                    "must not be negative",
                ));
            }
            _ => {}
        }

        if self.late.cumulative_threshold == Some(0) {
            return Err(EngineError::invalid_config(
                "late.cumulative_threshold",
                "must be greater than zero",
            ));
        }

        self.deduction_priority()?;

        if self.max_deduction_percent < Decimal::ZERO
            || self.max_deduction_percent > Decimal::ONE_HUNDRED
        {
            return Err(EngineError::invalid_config(
                "max_deduction_percent",
                "must be between 0 and 100",
            ));
        }

        if self.rounding.nearest <= Decimal::ZERO {
            return Err(EngineError::invalid_config(
                "rounding.nearest",
                "must be greater than zero",
            ));
        }

        let statutory = &self.statutory;
        for (field, rate) in [
            ("statutory.employee_rate", statutory.employee_rate),
            ("statutory.employer_rate", statutory.employer_rate),
        ] {
            if rate < Decimal::ZERO || rate > Decimal::ONE {
                return Err(EngineError::invalid_config(field, "must be between 0 and 1"));
            }
        }
        if statutory.insurable_cap <= Decimal::ZERO {
            return Err(EngineError::invalid_config(
                "statutory.insurable_cap",
                "must be greater than zero",
            ));
        }

        Ok(())
    }
}

fn default_sweep_interval_hours() -> u64 {
    6
}

fn default_threshold_days() -> i64 {
    3
}

/// Schedule of the stuck-submission sweep.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DetectorConfig {
    /// Hours between sweeps.
    #[serde(default = "default_sweep_interval_hours")]
    pub sweep_interval_hours: u64,
    /// Days a submission may sit in the in-flight state before it is stuck.
    #[serde(default = "default_threshold_days")]
    pub threshold_days: i64,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            sweep_interval_hours: default_sweep_interval_hours(),
            threshold_days: default_threshold_days(),
        }
    }
}

impl DetectorConfig {
    /// Checks the schedule is usable.
    pub fn validate(&self) -> EngineResult<()> {
        if self.sweep_interval_hours == 0 {
            return Err(EngineError::invalid_config(
                "sweep_interval_hours",
                "must be greater than zero",
            ));
        }
        if self.sweep_interval_hours.checked_mul(3600).is_none() {
            return Err(EngineError::invalid_config(
                "sweep_interval_hours",
                "is too large",
            ));
        }
        if self.threshold_days <= 0 {
            return Err(EngineError::invalid_config(
                "threshold_days",
                "must be greater than zero",
            ));
        }
        let reachable = chrono::Duration::try_days(self.threshold_days)
            .and_then(|age| DateTime::<Utc>::UNIX_EPOCH.checked_sub_signed(age));
        if reachable.is_none() {
            return Err(EngineError::invalid_config("threshold_days", "is too large"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::sample_settings;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    #[test]
    fn test_sample_settings_are_valid() {
        assert!(sample_settings().validate().is_ok());
    }

    #[test]
    fn test_deserialize_settings_yaml() {
        let yaml = r#"
tenant_id: acme
calculation_method: FIXED_30
overtime_source: BASIC_PLUS_ALLOWANCES
overtime:
  multiplier: "1.5"
  weekend_multiplier: "1.75"
  holiday_multiplier: "2"
  cap_enabled: true
  cap_hours: "40"
late:
  grace_period_minutes: 10
  method: DAILY_RATE
  cumulative_threshold: 3
deduction_priority: [ABSENCE, LATE, LOAN]
max_deduction_percent: "50"
rounding:
  nearest: "1"
  direction: DOWN
statutory:
  employee_rate: "0.0975"
  employer_rate: "0.1175"
  insurable_cap: "45000"
"#;
        let settings: PayrollSettings = serde_yaml::from_str(yaml).unwrap();

        assert_eq!(settings.calculation_method, CalculationMethod::Fixed30);
        assert_eq!(settings.overtime_source, OvertimeSource::BasicPlusAllowances);
        assert_eq!(settings.hours_per_day, dec("8"));
        assert_eq!(settings.weekend_days, vec![Weekday::Fri, Weekday::Sat]);
        assert_eq!(settings.overtime.cap_hours, Some(dec("40")));
        assert_eq!(settings.late.method, LateDeductionMethod::DailyRate);
        assert_eq!(settings.late.cumulative_threshold, Some(3));
        assert_eq!(settings.late.effective_day_threshold(), 10);
        assert_eq!(settings.rounding.direction, RoundingDirection::Down);
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn test_deduction_priority_resolves_kinds_in_order() {
        let settings = sample_settings();
        let kinds = settings.deduction_priority().unwrap();
        assert_eq!(kinds[0], DeductionKind::Absence);
        assert_eq!(kinds[1], DeductionKind::Late);
        assert_eq!(kinds.len(), 6);
    }

    #[test]
    fn test_unknown_deduction_kind_is_invalid_configuration() {
        let mut settings = sample_settings();
        settings.deduction_priority.push("GARNISHMENT".to_string());

        match settings.deduction_priority() {
            Err(EngineError::InvalidConfiguration { field, message }) => {
                assert_eq!(field, "deduction_priority");
                assert!(message.contains("GARNISHMENT"));
            }
            other => panic!("Expected InvalidConfiguration, got {:?}", other),
        }
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_duplicate_deduction_kind_is_rejected() {
        let mut settings = sample_settings();
        settings.deduction_priority.push("late".to_string());
        assert!(matches!(
            settings.deduction_priority(),
            Err(EngineError::InvalidConfiguration { .. })
        ));
    }

    #[test]
    fn test_cap_enabled_without_cap_is_rejected() {
        let mut settings = sample_settings();
        settings.overtime.cap_enabled = true;
        match settings.validate() {
            Err(EngineError::InvalidConfiguration { field, .. }) => {
                assert_eq!(field, "overtime.cap_hours");
            }
            other => panic!("Expected InvalidConfiguration, got {:?}", other),
        }
    }

    #[test]
    fn test_out_of_range_values_are_rejected() {
        let mut settings = sample_settings();
        settings.max_deduction_percent = dec("120");
        assert!(settings.validate().is_err());

        let mut settings = sample_settings();
        settings.hours_per_day = Decimal::ZERO;
        assert!(settings.validate().is_err());

        let mut settings = sample_settings();
        settings.statutory.employee_rate = dec("1.5");
        assert!(settings.validate().is_err());

        let mut settings = sample_settings();
        settings.rounding.nearest = Decimal::ZERO;
        assert!(settings.validate().is_err());

        let mut settings = sample_settings();
        settings.late.cumulative_threshold = Some(0);
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_rounding_directions() {
        let up = RoundingRule {
            nearest: dec("1"),
            direction: RoundingDirection::Up,
        };
        let down = RoundingRule {
            nearest: dec("1"),
            direction: RoundingDirection::Down,
        };
        let nearest = RoundingRule {
            nearest: dec("5"),
            direction: RoundingDirection::Nearest,
        };

        assert_eq!(up.apply(dec("100.01")), dec("101"));
        assert_eq!(down.apply(dec("100.99")), dec("100"));
        assert_eq!(nearest.apply(dec("102.5")), dec("105"));
        assert_eq!(nearest.apply(dec("102.4")), dec("100"));
        // Negative nets round with the same direction semantics.
        assert_eq!(up.apply(dec("-10.5")), dec("-10"));
        assert_eq!(down.apply(dec("-10.5")), dec("-11"));
    }

    #[test]
    fn test_settings_without_rounding_do_not_parse() {
        let yaml = r#"
tenant_id: acme
calculation_method: FIXED_30
overtime_source: BASIC_ONLY
overtime:
  multiplier: "1.5"
  weekend_multiplier: "1.75"
  holiday_multiplier: "2"
  cap_enabled: false
late:
  grace_period_minutes: 10
  method: PER_MINUTE
deduction_priority: [ABSENCE, LATE]
max_deduction_percent: "50"
statutory:
  employee_rate: "0.0975"
  employer_rate: "0.1175"
  insurable_cap: "45000"
"#;
        let err = serde_yaml::from_str::<PayrollSettings>(yaml).unwrap_err();
        assert!(err.to_string().contains("rounding"), "{}", err);
    }

    #[test]
    fn test_rounding_to_cents_by_default() {
        let rule = RoundingRule::default();
        assert_eq!(rule.apply(dec("1234.565")), dec("1234.57"));
        assert_eq!(rule.apply(dec("1234.564")), dec("1234.56"));
    }

    #[test]
    fn test_deduction_kind_parsing_is_case_insensitive() {
        assert_eq!("absence".parse::<DeductionKind>().unwrap(), DeductionKind::Absence);
        assert_eq!(" Loan ".parse::<DeductionKind>().unwrap(), DeductionKind::Loan);
        assert_eq!(DeductionKind::Advance.to_string(), "ADVANCE");
    }

    #[test]
    fn test_detector_config_defaults() {
        let config: DetectorConfig = serde_yaml::from_str("{}").unwrap();
        assert_eq!(config.sweep_interval_hours, 6);
        assert_eq!(config.threshold_days, 3);
        assert!(config.validate().is_ok());

        let bad = DetectorConfig {
            sweep_interval_hours: 0,
            threshold_days: 3,
        };
        assert!(bad.validate().is_err());

        let far_back = DetectorConfig {
            sweep_interval_hours: 6,
            threshold_days: 1_000_000_000,
        };
        assert!(far_back.validate().is_err());
    }
}
