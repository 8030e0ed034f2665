//! Attendance model and related types.
//!
//! Attendance records are read-only input to the calculation: one record per
//! employee per day, carrying lateness and overtime in minutes.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// What happened on an attendance day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AttendanceStatus {
    /// The employee worked.
    Present,
    /// Unexcused absence.
    Absent,
    /// Approved leave without pay.
    UnpaidLeave,
    /// Approved leave with pay.
    PaidLeave,
    /// Weekly rest day.
    RestDay,
    /// Public holiday.
    Holiday,
}

impl AttendanceStatus {
    /// Whether the day is charged as an absence.
    pub fn is_absence(&self) -> bool {
        matches!(self, Self::Absent | Self::UnpaidLeave)
    }
}

/// Overtime minutes split by category.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OvertimeSplit {
    /// Regular (working day) overtime minutes.
    #[serde(default)]
    pub regular_minutes: u32,
    /// Weekend overtime minutes.
    #[serde(default)]
    pub weekend_minutes: u32,
    /// Public holiday overtime minutes.
    #[serde(default)]
    pub holiday_minutes: u32,
}

/// One employee's attendance on one day.
///
/// # Example
///
/// ```
/// use payroll_engine::models::{AttendanceRecord, AttendanceStatus};
/// use chrono::NaiveDate;
///
/// let record = AttendanceRecord {
///     employee_id: "emp_001".to_string(),
///     date: NaiveDate::from_ymd_opt(2026, 3, 2).unwrap(),
///     status: AttendanceStatus::Present,
///     late_minutes: 20,
///     overtime_minutes: 90,
///     overtime_split: None,
/// };
/// assert_eq!(record.overtime_by_category().regular_minutes, 90);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttendanceRecord {
    /// The employee the record belongs to.
    pub employee_id: String,
    /// The attendance day.
    pub date: NaiveDate,
    /// What happened that day.
    pub status: AttendanceStatus,
    /// Minutes late at clock-in.
    #[serde(default)]
    pub late_minutes: u32,
    /// Total overtime minutes.
    #[serde(default)]
    pub overtime_minutes: u32,
    /// Explicit category split; takes precedence over `overtime_minutes`.
    #[serde(default)]
    pub overtime_split: Option<OvertimeSplit>,
}

impl AttendanceRecord {
    /// Returns the overtime minutes of the day by category.
    ///
    /// Without an explicit split, overtime on a holiday counts as holiday
    /// overtime, on a rest day as weekend overtime, otherwise as regular.
    pub fn overtime_by_category(&self) -> OvertimeSplit {
        if let Some(split) = self.overtime_split {
            return split;
        }
        match self.status {
            AttendanceStatus::Holiday => OvertimeSplit {
                holiday_minutes: self.overtime_minutes,
                ..OvertimeSplit::default()
            },
            AttendanceStatus::RestDay => OvertimeSplit {
                weekend_minutes: self.overtime_minutes,
                ..OvertimeSplit::default()
            },
            _ => OvertimeSplit {
                regular_minutes: self.overtime_minutes,
                ..OvertimeSplit::default()
            },
        }
    }
}
