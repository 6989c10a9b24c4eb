//! Calendar arithmetic behind tuition billing.
//!
//! Everything here is pure: a course meets on a fixed set of weekdays, and a
//! partial month is billed or refunded by the share of that month's scheduled
//! sessions falling inside or outside the attended window.

pub mod month;
pub mod proration;
pub mod schedule;

use thiserror::Error;

pub use month::BillingMonth;
pub use proration::{compute_refund, final_refund_amount, first_invoice_amount, prorate_first_month};
pub use schedule::{
    WeeklySchedule, count_occurrences_from_date_to_month_end, count_occurrences_from_month_start_to_date,
    count_occurrences_in_month, count_scheduled_occurrences,
};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TuitionError {
    #[error("weekday index {0} is outside 0..=6")]
    InvalidWeekday(i64),
}
