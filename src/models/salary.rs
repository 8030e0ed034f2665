//! Salary assignment and structure models.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

fn default_true() -> bool {
    true
}

/// A fixed monthly earning in a salary structure (housing, transport, ...).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StructureComponent {
    /// Short code, e.g. `HOUSING`.
    pub code: String,
    /// Display name.
    pub name: String,
    /// Full monthly amount.
    pub amount: Decimal,
    /// Whether the amount is scaled for a partial period.
    #[serde(default = "default_true")]
    pub prorate: bool,
    /// Whether the amount counts towards insurable salary.
    #[serde(default)]
    pub insurable: bool,
    /// Whether the amount feeds the overtime rate under
    /// `BASIC_PLUS_ALLOWANCES`.
    #[serde(default)]
    pub overtime_eligible: bool,
}

/// An employee's base salary and structure for a date range.
///
/// The assigning collaborator guarantees at most one active assignment per
/// employee at any time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SalaryAssignment {
    /// The employee the assignment belongs to.
    pub employee_id: String,
    /// Monthly base salary.
    pub base_salary: Decimal,
    /// First day the assignment applies.
    pub effective_from: NaiveDate,
    /// Last day the assignment applies; open-ended when absent.
    #[serde(default)]
    pub effective_to: Option<NaiveDate>,
    /// Structure earnings paid on top of the base salary.
    #[serde(default)]
    pub components: Vec<StructureComponent>,
}

impl SalaryAssignment {
    /// The last day of the assignment, `NaiveDate::MAX` when open-ended.
    pub fn effective_until(&self) -> NaiveDate {
        self.effective_to.unwrap_or(NaiveDate::MAX)
    }

    /// Whether the assignment applies on a date.
    pub fn is_active_on(&self, date: NaiveDate) -> bool {
        date >= self.effective_from && date <= self.effective_until()
    }

    /// Base salary plus insurable components.
    pub fn insurable_amount(&self) -> Decimal {
        self.base_salary
            + self
                .components
                .iter()
                .filter(|c| c.insurable)
                .map(|c| c.amount)
                .sum::<Decimal>()
    }

    /// Base salary plus overtime-eligible components.
    pub fn overtime_base(&self) -> Decimal {
        self.base_salary
            + self
                .components
                .iter()
                .filter(|c| c.overtime_eligible)
                .map(|c| c.amount)
                .sum::<Decimal>()
    }
}
