//! Pay period and public holiday models.
//!
//! This module contains the [`PayPeriod`] and [`PublicHoliday`] types and the
//! day-counting helpers the rate calculator and proration rely on.

use chrono::{Datelike, NaiveDate, Weekday};
use serde::{Deserialize, Serialize};

use crate::error::{EngineError, EngineResult};

/// Represents a public holiday within a pay period.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublicHoliday {
    /// The date of the public holiday.
    pub date: NaiveDate,
    /// The name of the public holiday (e.g., "National Day").
    pub name: String,
}

/// Represents a pay period with its date range and associated public holidays.
///
/// # Example
///
/// ```
/// use payroll_engine::models::PayPeriod;
/// use chrono::NaiveDate;
///
/// let period = PayPeriod::month(2026, 2).unwrap();
/// assert_eq!(period.end_date, NaiveDate::from_ymd_opt(2026, 2, 28).unwrap());
/// assert_eq!(period.calendar_days(), 28);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PayPeriod {
    /// The start date of the pay period (inclusive).
    pub start_date: NaiveDate,
    /// The end date of the pay period (inclusive).
    pub end_date: NaiveDate,
    /// Public holidays that fall within this pay period.
    #[serde(default)]
    pub public_holidays: Vec<PublicHoliday>,
}

impl PayPeriod {
    /// Creates the pay period covering one calendar month.
    pub fn month(year: i32, month: u32) -> EngineResult<Self> {
        let start_date = NaiveDate::from_ymd_opt(year, month, 1).ok_or_else(|| {
            EngineError::invalid_config("pay_period", format!("invalid month {}-{}", year, month))
        })?;
        let next_month = if month == 12 {
            NaiveDate::from_ymd_opt(year + 1, 1, 1)
        } else {
            NaiveDate::from_ymd_opt(year, month + 1, 1)
        };
        let end_date = next_month
            .and_then(|d| d.pred_opt())
            .ok_or_else(|| {
                EngineError::invalid_config("pay_period", format!("invalid month {}-{}", year, month))
            })?;

        Ok(Self {
            start_date,
            end_date,
            public_holidays: Vec::new(),
        })
    }

    /// Adds a public holiday to the period.
    pub fn with_holiday(mut self, date: NaiveDate, name: impl Into<String>) -> Self {
        self.public_holidays.push(PublicHoliday {
            date,
            name: name.into(),
        });
        self
    }

    /// Checks if a given date falls within this pay period (inclusive).
    pub fn contains_date(&self, date: NaiveDate) -> bool {
        date >= self.start_date && date <= self.end_date
    }

    /// Checks if a given date is a public holiday within this pay period.
    pub fn is_public_holiday(&self, date: NaiveDate) -> bool {
        self.public_holidays.iter().any(|h| h.date == date)
    }

    /// Number of calendar days in the period.
    pub fn calendar_days(&self) -> u32 {
        self.calendar_days_between(self.start_date, self.end_date)
    }

    /// Number of working days in the period.
    pub fn working_days(&self, weekend: &[Weekday]) -> u32 {
        self.working_days_between(self.start_date, self.end_date, weekend)
    }

    /// Calendar days of `[from, to]` clipped to the period.
    pub fn calendar_days_between(&self, from: NaiveDate, to: NaiveDate) -> u32 {
        let from = from.max(self.start_date);
        let to = to.min(self.end_date);
        if from > to {
            return 0;
        }
        ((to - from).num_days() + 1) as u32
    }

    /// Working days of `[from, to]` clipped to the period: days that are not a
    /// weekend day and not a public holiday.
    pub fn working_days_between(&self, from: NaiveDate, to: NaiveDate, weekend: &[Weekday]) -> u32 {
        let from = from.max(self.start_date);
        let to = to.min(self.end_date);
        if from > to {
            return 0;
        }
        from.iter_days()
            .take_while(|d| *d <= to)
            .filter(|d| !weekend.contains(&d.weekday()) && !self.is_public_holiday(*d))
            .count() as u32
    }
}
