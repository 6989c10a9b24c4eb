use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum PaymentKind {
    Payment,
    Refund,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum PaymentStatus {
    Pending,
    Confirmed,
    Cancelled,
}

/// A charge or a refund. Refunds carry a negative `amount`.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Payment {
    pub id: String,
    pub student_id: String,
    pub course_id: String,
    pub amount: i64,
    pub payment_method: Option<String>,
    pub payment_date: NaiveDate,
    pub status: PaymentStatus,
    #[serde(rename = "type")]
    #[sqlx(rename = "type")]
    pub kind: PaymentKind,
    pub created_at: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewPayment {
    pub student_id: String,
    pub course_id: String,
    pub amount: i64,
    pub payment_date: NaiveDate,
    pub status: PaymentStatus,
    pub kind: PaymentKind,
}

impl NewPayment {
    pub fn pending_charge(student_id: &str, course_id: &str, amount: i64, payment_date: NaiveDate) -> Self {
        Self {
            student_id: student_id.to_string(),
            course_id: course_id.to_string(),
            amount,
            payment_date,
            status: PaymentStatus::Pending,
            kind: PaymentKind::Payment,
        }
    }

    /// `magnitude` is the positive refund; it is stored negated.
    pub fn pending_refund(student_id: &str, course_id: &str, magnitude: i64, payment_date: NaiveDate) -> Self {
        Self {
            student_id: student_id.to_string(),
            course_id: course_id.to_string(),
            amount: -magnitude,
            payment_date,
            status: PaymentStatus::Pending,
            kind: PaymentKind::Refund,
        }
    }
}
