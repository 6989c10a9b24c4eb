pub mod repository;

use async_trait::async_trait;
use chrono::NaiveDate;
use sqlx::SqlitePool;

use crate::error::AppError;
use crate::models::{Course, EnrolledCourse, Enrollment, NewPayment, Payment, PaymentKind, Student, StudentStatus};
use crate::tuition::{BillingMonth, WeeklySchedule};

/// The record store billing reconciles against.
///
/// Every call is an independent round trip that may fail; callers decide
/// whether a failure aborts their work or is only logged.
#[async_trait]
pub trait BillingStore: Send + Sync {
    async fn fetch_student(&self, student_id: &str) -> Result<Option<Student>, AppError>;
    async fn fetch_active_student_ids(&self) -> Result<Vec<String>, AppError>;
    async fn set_first_class_date(&self, student_id: &str, date: Option<NaiveDate>) -> Result<(), AppError>;
    async fn set_last_class_date(&self, student_id: &str, date: Option<NaiveDate>) -> Result<(), AppError>;
    async fn set_status(
        &self,
        student_id: &str,
        status: StudentStatus,
        last_class_date: Option<NaiveDate>,
    ) -> Result<(), AppError>;
    async fn latest_attendance_date(&self, student_id: &str) -> Result<Option<NaiveDate>, AppError>;

    async fn fetch_course(&self, course_id: &str) -> Result<Option<(Course, WeeklySchedule)>, AppError>;
    async fn fetch_enrolled_courses(&self, student_id: &str) -> Result<Vec<EnrolledCourse>, AppError>;
    async fn insert_enrollment(
        &self,
        student_id: &str,
        course_id: &str,
        enrolled_on: NaiveDate,
    ) -> Result<Enrollment, AppError>;
    async fn delete_enrollment(&self, student_id: &str, course_id: &str) -> Result<bool, AppError>;

    async fn fetch_payments(&self, student_id: &str) -> Result<Vec<Payment>, AppError>;
    async fn find_payment_in_month(
        &self,
        student_id: &str,
        course_id: &str,
        kind: PaymentKind,
        month: BillingMonth,
    ) -> Result<Option<Payment>, AppError>;
    async fn insert_payment(&self, payment: &NewPayment) -> Result<Payment, AppError>;
    async fn update_payment(&self, payment_id: &str, amount: i64, payment_date: NaiveDate) -> Result<(), AppError>;
    async fn delete_payment(&self, payment_id: &str) -> Result<u64, AppError>;
    async fn delete_payments_before(
        &self,
        student_id: &str,
        course_id: &str,
        kind: PaymentKind,
        date: NaiveDate,
    ) -> Result<u64, AppError>;
    async fn delete_payments_after(&self, student_id: &str, kind: PaymentKind, date: NaiveDate) -> Result<u64, AppError>;
    async fn delete_pending_course_payments_after(
        &self,
        student_id: &str,
        course_id: &str,
        date: NaiveDate,
    ) -> Result<u64, AppError>;
    async fn delete_payments_in_month(
        &self,
        student_id: &str,
        course_id: &str,
        kind: PaymentKind,
        month: BillingMonth,
    ) -> Result<u64, AppError>;
    async fn delete_refunds(&self, student_id: &str) -> Result<u64, AppError>;
}

#[derive(Clone)]
pub struct SqliteStore {
    db: SqlitePool,
}

impl SqliteStore {
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }
}

fn found(updated: bool) -> Result<(), AppError> {
    if updated { Ok(()) } else { Err(AppError::NotFound) }
}

#[async_trait]
impl BillingStore for SqliteStore {
    async fn fetch_student(&self, student_id: &str) -> Result<Option<Student>, AppError> {
        Ok(repository::find_student_by_id(&self.db, student_id).await?)
    }

    async fn fetch_active_student_ids(&self) -> Result<Vec<String>, AppError> {
        Ok(repository::fetch_active_student_ids(&self.db).await?)
    }

    async fn set_first_class_date(&self, student_id: &str, date: Option<NaiveDate>) -> Result<(), AppError> {
        found(repository::update_first_class_date(&self.db, student_id, date).await?)
    }

    async fn set_last_class_date(&self, student_id: &str, date: Option<NaiveDate>) -> Result<(), AppError> {
        found(repository::update_last_class_date(&self.db, student_id, date).await?)
    }

    async fn set_status(
        &self,
        student_id: &str,
        status: StudentStatus,
        last_class_date: Option<NaiveDate>,
    ) -> Result<(), AppError> {
        found(repository::update_status(&self.db, student_id, status, last_class_date).await?)
    }

    async fn latest_attendance_date(&self, student_id: &str) -> Result<Option<NaiveDate>, AppError> {
        Ok(repository::latest_attendance_date(&self.db, student_id).await?)
    }

    async fn fetch_course(&self, course_id: &str) -> Result<Option<(Course, WeeklySchedule)>, AppError> {
        let Some(course) = repository::find_course_by_id(&self.db, course_id).await? else {
            return Ok(None);
        };
        let schedule = repository::fetch_course_schedule(&self.db, course_id).await?;
        Ok(Some((course, schedule)))
    }

    async fn fetch_enrolled_courses(&self, student_id: &str) -> Result<Vec<EnrolledCourse>, AppError> {
        repository::fetch_enrolled_courses(&self.db, student_id).await
    }

    async fn insert_enrollment(
        &self,
        student_id: &str,
        course_id: &str,
        enrolled_on: NaiveDate,
    ) -> Result<Enrollment, AppError> {
        repository::insert_enrollment(&self.db, student_id, course_id, enrolled_on)
            .await
            .map_err(|e| match e {
                sqlx::Error::Database(db_err) if db_err.is_unique_violation() => {
                    AppError::Conflict(format!("student {} is already enrolled in {}", student_id, course_id))
                }
                other => AppError::Database(other),
            })
    }

    async fn delete_enrollment(&self, student_id: &str, course_id: &str) -> Result<bool, AppError> {
        Ok(repository::delete_enrollment(&self.db, student_id, course_id).await?)
    }

    async fn fetch_payments(&self, student_id: &str) -> Result<Vec<Payment>, AppError> {
        Ok(repository::fetch_payments(&self.db, student_id).await?)
    }

    async fn find_payment_in_month(
        &self,
        student_id: &str,
        course_id: &str,
        kind: PaymentKind,
        month: BillingMonth,
    ) -> Result<Option<Payment>, AppError> {
        repository::find_payment_in_month(&self.db, student_id, course_id, kind, month).await
    }

    async fn insert_payment(&self, payment: &NewPayment) -> Result<Payment, AppError> {
        Ok(repository::insert_payment(&self.db, payment).await?)
    }

    async fn update_payment(&self, payment_id: &str, amount: i64, payment_date: NaiveDate) -> Result<(), AppError> {
        found(repository::update_payment_amount(&self.db, payment_id, amount, payment_date).await?)
    }

    async fn delete_payment(&self, payment_id: &str) -> Result<u64, AppError> {
        Ok(repository::delete_payment(&self.db, payment_id).await?)
    }

    async fn delete_payments_before(
        &self,
        student_id: &str,
        course_id: &str,
        kind: PaymentKind,
        date: NaiveDate,
    ) -> Result<u64, AppError> {
        Ok(repository::delete_payments_before(&self.db, student_id, course_id, kind, date).await?)
    }

    async fn delete_payments_after(&self, student_id: &str, kind: PaymentKind, date: NaiveDate) -> Result<u64, AppError> {
        Ok(repository::delete_payments_after(&self.db, student_id, kind, date).await?)
    }

    async fn delete_pending_course_payments_after(
        &self,
        student_id: &str,
        course_id: &str,
        date: NaiveDate,
    ) -> Result<u64, AppError> {
        Ok(repository::delete_pending_course_payments_after(&self.db, student_id, course_id, date).await?)
    }

    async fn delete_payments_in_month(
        &self,
        student_id: &str,
        course_id: &str,
        kind: PaymentKind,
        month: BillingMonth,
    ) -> Result<u64, AppError> {
        repository::delete_payments_in_month(&self.db, student_id, course_id, kind, month).await
    }

    async fn delete_refunds(&self, student_id: &str) -> Result<u64, AppError> {
        Ok(repository::delete_refunds(&self.db, student_id).await?)
    }
}
