//! Contribution calendar helpers.
//!
//! Due days are configured as a day-of-month in `1..=31`; months shorter
//! than the configured day fall due on their last day.

use crate::model::stokvel::Constitution;
use chrono::{Datelike, Months, NaiveDate};

/// Last calendar day of `year-month`, or `None` for an invalid month.
pub fn month_end_date(year: i32, month: u32) -> Option<NaiveDate> {
    let first = NaiveDate::from_ymd_opt(year, month, 1)?;
    let next = first.checked_add_months(Months::new(1))?;
    next.pred_opt()
}

/// Due date for `year-month`, clamped to the end of short months.
pub fn due_date_for_month(year: i32, month: u32, due_day: u8) -> Option<NaiveDate> {
    let end = month_end_date(year, month)?;
    let day = u32::from(due_day).clamp(1, end.day());
    NaiveDate::from_ymd_opt(year, month, day)
}

/// Due date of the month containing `date` under a club's constitution.
pub fn contribution_due_date(constitution: &Constitution, date: NaiveDate) -> Option<NaiveDate> {
    due_date_for_month(date.year(), date.month(), constitution.contribution_due_day)
}

/// Whole days a payment made on `paid_on` is past `due_on` (0 when on time).
pub fn days_late(due_on: NaiveDate, paid_on: NaiveDate) -> u32 {
    let days = (paid_on - due_on).num_days();
    u32::try_from(days.max(0)).unwrap_or(u32::MAX)
}

#[cfg(test)]
mod tests {
    use super::{contribution_due_date, days_late, due_date_for_month, month_end_date};
    use crate::model::stokvel::Constitution;
    use chrono::NaiveDate;

    fn date(year: i32, month: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(year, month, day).expect("valid test date")
    }

    #[test]
    fn month_end_handles_leap_years() {
        assert_eq!(month_end_date(2024, 2), Some(date(2024, 2, 29)));
        assert_eq!(month_end_date(2025, 2), Some(date(2025, 2, 28)));
        assert_eq!(month_end_date(2025, 12), Some(date(2025, 12, 31)));
        assert_eq!(month_end_date(2025, 13), None);
    }

    #[test]
    fn due_day_is_clamped_to_short_months() {
        assert_eq!(due_date_for_month(2025, 4, 31), Some(date(2025, 4, 30)));
        assert_eq!(due_date_for_month(2025, 2, 30), Some(date(2025, 2, 28)));
        assert_eq!(due_date_for_month(2025, 5, 15), Some(date(2025, 5, 15)));
    }

    #[test]
    fn constitution_default_is_due_at_month_end() {
        let constitution = Constitution::default();
        assert_eq!(
            contribution_due_date(&constitution, date(2025, 6, 3)),
            Some(date(2025, 6, 30))
        );
    }

    #[test]
    fn early_payments_are_not_late() {
        assert_eq!(days_late(date(2025, 6, 30), date(2025, 6, 1)), 0);
        assert_eq!(days_late(date(2025, 6, 30), date(2025, 7, 3)), 3);
    }
}
