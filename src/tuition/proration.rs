use chrono::NaiveDate;

use super::schedule::{
    count_occurrences_from_date_to_month_end, count_occurrences_from_month_start_to_date,
    count_occurrences_in_month,
};
use super::{BillingMonth, WeeklySchedule};

/// `round(fee * numerator / denominator)`, half-up, in exact integer math.
fn scale_fee(monthly_fee: i64, numerator: u32, denominator: u32) -> i64 {
    if denominator == 0 {
        return 0;
    }
    let scaled = 2 * monthly_fee as i128 * numerator as i128 + denominator as i128;
    scaled.div_euclid(2 * denominator as i128) as i64
}

/// Share of `monthly_fee` owed for the sessions from `first_class_date` to the
/// end of the month.
pub fn prorate_first_month(
    monthly_fee: i64,
    schedule: &WeeklySchedule,
    first_class_date: NaiveDate,
    year: i32,
    month: u32,
) -> i64 {
    let total = count_occurrences_in_month(schedule, year, month);
    if total == 0 {
        return 0;
    }
    let remaining = count_occurrences_from_date_to_month_end(schedule, first_class_date, year, month);
    scale_fee(monthly_fee, remaining, total)
}

/// Share of `monthly_fee` for the sessions after `last_class_date` in the month.
pub fn compute_refund(
    monthly_fee: i64,
    schedule: &WeeklySchedule,
    last_class_date: NaiveDate,
    year: i32,
    month: u32,
) -> i64 {
    let total = count_occurrences_in_month(schedule, year, month);
    if total == 0 {
        return 0;
    }
    let attended = count_occurrences_from_month_start_to_date(schedule, last_class_date, year, month);
    scale_fee(monthly_fee, total.saturating_sub(attended), total)
}

/// The collapsed first invoice: the rest of the first month plus all of the
/// following month.
pub fn first_invoice_amount(monthly_fee: i64, schedule: &WeeklySchedule, first_class_date: NaiveDate) -> i64 {
    let month = BillingMonth::of(first_class_date);
    prorate_first_month(monthly_fee, schedule, first_class_date, month.year, month.month) + monthly_fee
}

/// Refund owed when the last class falls in `BillingMonth::of(last_class_date)`.
/// Leaving in the month billing started also returns the prepaid next month.
pub fn final_refund_amount(
    monthly_fee: i64,
    schedule: &WeeklySchedule,
    billing_start: NaiveDate,
    last_class_date: NaiveDate,
) -> i64 {
    let month = BillingMonth::of(last_class_date);
    let mut refund = compute_refund(monthly_fee, schedule, last_class_date, month.year, month.month);
    if month.contains(billing_start) {
        refund += monthly_fee;
    }
    refund
}
