use std::fmt;

use chrono::{Datelike, Months, NaiveDate};
use serde::{Deserialize, Serialize};

/// A calendar month, the unit every payment and refund is billed against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct BillingMonth {
    pub year: i32,
    pub month: u32,
}

impl BillingMonth {
    pub fn new(year: i32, month: u32) -> Self {
        Self { year, month }
    }

    pub fn of(date: NaiveDate) -> Self {
        Self {
            year: date.year(),
            month: date.month(),
        }
    }

    /// `None` when `month` is outside 1..=12.
    pub fn first_day(&self) -> Option<NaiveDate> {
        NaiveDate::from_ymd_opt(self.year, self.month, 1)
    }

    pub fn last_day(&self) -> Option<NaiveDate> {
        self.first_day()
            .and_then(|first| first.checked_add_months(Months::new(1)))
            .and_then(|next| next.pred_opt())
    }

    pub fn plus(&self, months: u32) -> Self {
        let index = self.year as i64 * 12 + (self.month as i64 - 1) + months as i64;
        Self {
            year: index.div_euclid(12) as i32,
            month: index.rem_euclid(12) as u32 + 1,
        }
    }

    pub fn next(&self) -> Self {
        self.plus(1)
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        Self::of(date) == *self
    }

    /// The day a charge for this month is nominally due. Days past the end of
    /// the month are clamped to its last day.
    pub fn due_date(&self, due_day: u32) -> Option<NaiveDate> {
        let last = self.last_day()?;
        let day = due_day.clamp(1, last.day());
        NaiveDate::from_ymd_opt(self.year, self.month, day)
    }
}

impl fmt::Display for BillingMonth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn plus_rolls_over_year_end() {
        let month = BillingMonth::new(2026, 11);
        assert_eq!(month.plus(1), BillingMonth::new(2026, 12));
        assert_eq!(month.plus(2), BillingMonth::new(2027, 1));
        assert_eq!(month.plus(14), BillingMonth::new(2028, 1));
    }

    #[test]
    fn last_day_handles_leap_years() {
        assert_eq!(BillingMonth::new(2028, 2).last_day(), Some(date(2028, 2, 29)));
        assert_eq!(BillingMonth::new(2026, 2).last_day(), Some(date(2026, 2, 28)));
        assert_eq!(BillingMonth::new(2026, 12).last_day(), Some(date(2026, 12, 31)));
        assert_eq!(BillingMonth::new(2026, 13).last_day(), None);
    }

    #[test]
    fn due_date_is_clamped_into_the_month() {
        assert_eq!(BillingMonth::new(2026, 2).due_date(31), Some(date(2026, 2, 28)));
        assert_eq!(BillingMonth::new(2026, 4).due_date(31), Some(date(2026, 4, 30)));
        assert_eq!(BillingMonth::new(2026, 4).due_date(10), Some(date(2026, 4, 10)));
        assert_eq!(BillingMonth::new(2026, 4).due_date(0), Some(date(2026, 4, 1)));
    }

    #[test]
    fn display_is_zero_padded() {
        assert_eq!(BillingMonth::new(2026, 3).to_string(), "2026-03");
    }
}
