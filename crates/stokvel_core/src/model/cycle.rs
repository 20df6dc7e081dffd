//! Contribution/payout cycle record.
//!
//! # Invariants
//! - `start_date < end_date`.
//! - At most one cycle per club has status `active`; that cycle is the
//!   club's current cycle.

use super::rule::{ContributionRule, ContributionType};
use super::stokvel::StokvelId;
use super::validation::{require_text, ModelValidationError};
use chrono::{Datelike, NaiveDate};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub type CycleId = Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CycleStatus {
    Planned,
    Active,
    Completed,
    Cancelled,
}

impl CycleStatus {
    pub fn as_db_str(self) -> &'static str {
        match self {
            Self::Planned => "planned",
            Self::Active => "active",
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
        }
    }

    pub fn from_db_str(value: &str) -> Option<Self> {
        match value {
            "planned" => Some(Self::Planned),
            "active" => Some(Self::Active),
            "completed" => Some(Self::Completed),
            "cancelled" => Some(Self::Cancelled),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cycle {
    pub id: CycleId,
    pub stokvel_id: StokvelId,
    pub name: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub status: CycleStatus,
    /// Filled in by storage when the cycle is created.
    pub expected_total_contributions: Decimal,
    pub description: String,
}

impl Cycle {
    /// Creates a planned cycle covering `start_date..=end_date`.
    pub fn new(
        stokvel_id: StokvelId,
        name: impl Into<String>,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            stokvel_id,
            name: name.into(),
            start_date,
            end_date,
            status: CycleStatus::Planned,
            expected_total_contributions: Decimal::ZERO,
            description: String::new(),
        }
    }

    pub fn validate(&self) -> Result<(), ModelValidationError> {
        require_text("name", &self.name)?;
        if self.end_date <= self.start_date {
            return Err(ModelValidationError::InvalidDateRange { field: "end_date" });
        }
        Ok(())
    }

    /// Whether this is the club's current cycle.
    pub fn is_current(&self) -> bool {
        self.status == CycleStatus::Active
    }

    /// Whether `date` falls inside the cycle's calendar window.
    pub fn covers(&self, date: NaiveDate) -> bool {
        self.start_date <= date && date <= self.end_date
    }

    /// Whole calendar months between start and end month.
    pub fn duration_months(&self) -> i32 {
        months_between(self.start_date, self.end_date)
    }

    /// Progress through the cycle as a percentage rounded to one decimal.
    ///
    /// Planned cycles report 0, completed or cancelled cycles report 100.
    pub fn progress_percentage(&self, today: NaiveDate) -> f64 {
        match self.status {
            CycleStatus::Planned => return 0.0,
            CycleStatus::Completed | CycleStatus::Cancelled => return 100.0,
            CycleStatus::Active => {}
        }

        if today < self.start_date {
            return 0.0;
        }
        if today > self.end_date {
            return 100.0;
        }

        let total_days = (self.end_date - self.start_date).num_days();
        if total_days <= 0 {
            return 0.0;
        }
        let elapsed_days = (today - self.start_date).num_days();
        let percentage = elapsed_days as f64 / total_days as f64 * 100.0;
        (percentage * 10.0).round() / 10.0
    }
}

/// Expected regular contributions over a cycle window.
///
/// Sums the regular rules in effect on `start_date`, multiplied by the
/// number of months in the window and the number of active members.
///
/// Persisted amounts are not re-validated here; a total that does not fit
/// a `Decimal` yields `AmountOverflow`.
pub fn expected_cycle_contributions(
    rules: &[ContributionRule],
    start_date: NaiveDate,
    end_date: NaiveDate,
    active_members: usize,
) -> Result<Decimal, ModelValidationError> {
    let overflow = || ModelValidationError::AmountOverflow("expected_total_contributions");
    let monthly = rules
        .iter()
        .filter(|rule| rule.contribution_type == ContributionType::Regular)
        .filter(|rule| rule.is_active_for_date(start_date))
        .try_fold(Decimal::ZERO, |total, rule| total.checked_add(rule.amount))
        .ok_or_else(overflow)?;

    let months = months_between(start_date, end_date).max(0);
    monthly
        .checked_mul(Decimal::from(months))
        .and_then(|total| total.checked_mul(Decimal::from(active_members as u64)))
        .ok_or_else(overflow)
}

fn months_between(start: NaiveDate, end: NaiveDate) -> i32 {
    (end.year() - start.year()) * 12 + end.month() as i32 - start.month() as i32
}

#[cfg(test)]
mod tests {
    use super::{expected_cycle_contributions, Cycle, CycleStatus};
    use crate::model::rule::{ContributionRule, ContributionType};
    use crate::model::validation::ModelValidationError;
    use chrono::NaiveDate;
    use rust_decimal::Decimal;
    use uuid::Uuid;

    fn date(year: i32, month: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(year, month, day).expect("valid test date")
    }

    fn cycle_2025() -> Cycle {
        Cycle::new(Uuid::new_v4(), "2025", date(2025, 1, 1), date(2025, 12, 31))
    }

    #[test]
    fn progress_depends_on_status_then_dates() {
        let mut cycle = cycle_2025();
        assert_eq!(cycle.progress_percentage(date(2025, 6, 1)), 0.0);

        cycle.status = CycleStatus::Active;
        assert_eq!(cycle.progress_percentage(date(2024, 12, 1)), 0.0);
        assert_eq!(cycle.progress_percentage(date(2026, 1, 1)), 100.0);
        // 181 of 364 days elapsed.
        assert_eq!(cycle.progress_percentage(date(2025, 7, 1)), 49.7);

        cycle.status = CycleStatus::Cancelled;
        assert_eq!(cycle.progress_percentage(date(2025, 7, 1)), 100.0);
    }

    #[test]
    fn duration_counts_month_boundaries() {
        assert_eq!(cycle_2025().duration_months(), 11);
    }

    #[test]
    fn end_before_start_is_rejected() {
        let cycle = Cycle::new(Uuid::new_v4(), "bad", date(2025, 5, 1), date(2025, 5, 1));
        assert!(cycle.validate().is_err());
    }

    #[test]
    fn expected_contributions_use_regular_rules_only() {
        let stokvel_id = Uuid::new_v4();
        let regular = ContributionRule::new(
            stokvel_id,
            "Monthly",
            ContributionType::Regular,
            Decimal::from(500),
            date(2024, 1, 1),
        );
        let registration = ContributionRule::new(
            stokvel_id,
            "Joining fee",
            ContributionType::Registration,
            Decimal::from(200),
            date(2024, 1, 1),
        );

        let total = expected_cycle_contributions(
            &[regular, registration],
            date(2025, 1, 1),
            date(2025, 7, 1),
            4,
        );
        assert_eq!(total, Ok(Decimal::from(500 * 6 * 4)));
    }

    #[test]
    fn oversized_persisted_amount_reports_overflow() {
        let mut huge = ContributionRule::new(
            Uuid::new_v4(),
            "Monthly",
            ContributionType::Regular,
            Decimal::ZERO,
            date(2024, 1, 1),
        );
        huge.amount = Decimal::MAX;

        let total =
            expected_cycle_contributions(&[huge], date(2025, 1, 1), date(2025, 12, 31), 3);
        assert_eq!(
            total,
            Err(ModelValidationError::AmountOverflow(
                "expected_total_contributions"
            ))
        );
    }
}
