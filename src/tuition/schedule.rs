use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

use super::{BillingMonth, TuitionError};

/// Weekdays on which a course meets, 0 = Sunday through 6 = Saturday.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WeeklySchedule {
    days: u8,
}

impl WeeklySchedule {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn from_day_indices<I>(indices: I) -> Result<Self, TuitionError>
    where
        I: IntoIterator<Item = i64>,
    {
        let mut schedule = Self::empty();
        for index in indices {
            if !(0..=6).contains(&index) {
                return Err(TuitionError::InvalidWeekday(index));
            }
            schedule.days |= 1 << index;
        }
        Ok(schedule)
    }

    pub fn is_empty(&self) -> bool {
        self.days == 0
    }

    pub fn meets_on(&self, date: NaiveDate) -> bool {
        self.days & (1 << date.weekday().num_days_from_sunday()) != 0
    }

    pub fn day_indices(&self) -> Vec<u32> {
        (0..7).filter(|i| self.days & (1 << i) != 0).collect()
    }
}

/// Scheduled sessions between `start` and `end`, both inclusive. A reversed
/// range is empty.
pub fn count_scheduled_occurrences(schedule: &WeeklySchedule, start: NaiveDate, end: NaiveDate) -> u32 {
    if schedule.is_empty() || start > end {
        return 0;
    }
    start
        .iter_days()
        .take_while(|day| *day <= end)
        .filter(|day| schedule.meets_on(*day))
        .count() as u32
}

pub fn count_occurrences_in_month(schedule: &WeeklySchedule, year: i32, month: u32) -> u32 {
    let billing_month = BillingMonth::new(year, month);
    match (billing_month.first_day(), billing_month.last_day()) {
        (Some(first), Some(last)) => count_scheduled_occurrences(schedule, first, last),
        _ => 0,
    }
}

/// Sessions from `from` (or the 1st, if later) through the end of the month.
pub fn count_occurrences_from_date_to_month_end(
    schedule: &WeeklySchedule,
    from: NaiveDate,
    year: i32,
    month: u32,
) -> u32 {
    let billing_month = BillingMonth::new(year, month);
    match (billing_month.first_day(), billing_month.last_day()) {
        (Some(first), Some(last)) => count_scheduled_occurrences(schedule, from.max(first), last),
        _ => 0,
    }
}

/// Sessions from the 1st of the month through `to` (or the month end, if earlier).
pub fn count_occurrences_from_month_start_to_date(
    schedule: &WeeklySchedule,
    to: NaiveDate,
    year: i32,
    month: u32,
) -> u32 {
    let billing_month = BillingMonth::new(year, month);
    match (billing_month.first_day(), billing_month.last_day()) {
        (Some(first), Some(last)) => count_scheduled_occurrences(schedule, first, to.min(last)),
        _ => 0,
    }
}
