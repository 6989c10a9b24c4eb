use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::tuition::WeeklySchedule;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Course {
    pub id: String,
    pub name: String,
    pub monthly_tuition_fee: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Enrollment {
    pub id: String,
    pub student_id: String,
    pub course_id: String,
    pub enrolled_on: NaiveDate,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewEnrollmentRequest {
    pub course_id: String,
}

/// An enrollment joined with what billing needs from its course.
#[derive(Debug, Clone, Serialize)]
pub struct EnrolledCourse {
    pub course_id: String,
    pub monthly_tuition_fee: i64,
    pub schedule: WeeklySchedule,
    pub enrolled_on: NaiveDate,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProrationQuery {
    pub first_class_date: NaiveDate,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProrationPreview {
    pub course_id: String,
    pub monthly_tuition_fee: i64,
    pub first_class_date: NaiveDate,
    pub sessions_in_month: u32,
    pub sessions_remaining: u32,
    pub prorated_amount: i64,
    pub first_invoice_amount: i64,
}
