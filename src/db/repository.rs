use chrono::{NaiveDate, Utc};
use sqlx::{FromRow, SqlitePool};
use uuid::Uuid;

use crate::error::AppError;
use crate::models::{
    Course, EnrolledCourse, Enrollment, NewPayment, Payment, PaymentKind, PaymentStatus, Student, StudentStatus,
};
use crate::tuition::{BillingMonth, WeeklySchedule};

#[derive(Debug, FromRow)]
struct EnrollmentRow {
    course_id: String,
    enrolled_on: NaiveDate,
    monthly_tuition_fee: i64,
}

pub async fn find_student_by_id(db: &SqlitePool, id: &str) -> Result<Option<Student>, sqlx::Error> {
    sqlx::query_as::<_, Student>(
        "SELECT id, name, status, enrollment_date, first_class_date, last_class_date, payment_due_day FROM students WHERE id = ?"
    )
    .bind(id)
    .fetch_optional(db)
    .await
}

pub async fn fetch_active_student_ids(db: &SqlitePool) -> Result<Vec<String>, sqlx::Error> {
    sqlx::query_scalar::<_, String>("SELECT id FROM students WHERE status = 'active' ORDER BY id")
        .fetch_all(db)
        .await
}

pub async fn update_first_class_date(
    db: &SqlitePool,
    id: &str,
    first_class_date: Option<NaiveDate>,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("UPDATE students SET first_class_date = ? WHERE id = ?")
        .bind(first_class_date)
        .bind(id)
        .execute(db)
        .await?
        .rows_affected();

    Ok(result > 0)
}

pub async fn update_last_class_date(
    db: &SqlitePool,
    id: &str,
    last_class_date: Option<NaiveDate>,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("UPDATE students SET last_class_date = ? WHERE id = ?")
        .bind(last_class_date)
        .bind(id)
        .execute(db)
        .await?
        .rows_affected();

    Ok(result > 0)
}

pub async fn update_status(
    db: &SqlitePool,
    id: &str,
    status: StudentStatus,
    last_class_date: Option<NaiveDate>,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("UPDATE students SET status = ?, last_class_date = ? WHERE id = ?")
        .bind(status)
        .bind(last_class_date)
        .bind(id)
        .execute(db)
        .await?
        .rows_affected();

    Ok(result > 0)
}

pub async fn latest_attendance_date(db: &SqlitePool, student_id: &str) -> Result<Option<NaiveDate>, sqlx::Error> {
    sqlx::query_scalar::<_, NaiveDate>(
        "SELECT date FROM attendance WHERE student_id = ? ORDER BY date DESC LIMIT 1"
    )
    .bind(student_id)
    .fetch_optional(db)
    .await
}

pub async fn find_course_by_id(db: &SqlitePool, id: &str) -> Result<Option<Course>, sqlx::Error> {
    sqlx::query_as::<_, Course>("SELECT id, name, monthly_tuition_fee FROM courses WHERE id = ?")
        .bind(id)
        .fetch_optional(db)
        .await
}

pub async fn fetch_course_schedule(db: &SqlitePool, course_id: &str) -> Result<WeeklySchedule, AppError> {
    let days = sqlx::query_scalar::<_, i64>("SELECT day_of_week FROM course_schedules WHERE course_id = ?")
        .bind(course_id)
        .fetch_all(db)
        .await?;

    Ok(WeeklySchedule::from_day_indices(days)?)
}

pub async fn fetch_enrolled_courses(db: &SqlitePool, student_id: &str) -> Result<Vec<EnrolledCourse>, AppError> {
    let rows = sqlx::query_as::<_, EnrollmentRow>(
        r#"
        SELECT e.course_id, e.enrolled_on, c.monthly_tuition_fee
        FROM course_enrollments e
        JOIN courses c ON c.id = e.course_id
        WHERE e.student_id = ?
        ORDER BY e.enrolled_on, e.course_id
        "#
    )
    .bind(student_id)
    .fetch_all(db)
    .await?;

    let mut courses = Vec::with_capacity(rows.len());
    for row in rows {
        let schedule = fetch_course_schedule(db, &row.course_id).await?;
        courses.push(EnrolledCourse {
            course_id: row.course_id,
            monthly_tuition_fee: row.monthly_tuition_fee,
            schedule,
            enrolled_on: row.enrolled_on,
        });
    }
    Ok(courses)
}

pub async fn insert_enrollment(
    db: &SqlitePool,
    student_id: &str,
    course_id: &str,
    enrolled_on: NaiveDate,
) -> Result<Enrollment, sqlx::Error> {
    let id = Uuid::new_v4().to_string();

    sqlx::query(
        "INSERT INTO course_enrollments (id, student_id, course_id, enrolled_on) VALUES (?, ?, ?, ?)"
    )
    .bind(&id)
    .bind(student_id)
    .bind(course_id)
    .bind(enrolled_on)
    .execute(db)
    .await?;

    Ok(Enrollment {
        id,
        student_id: student_id.to_string(),
        course_id: course_id.to_string(),
        enrolled_on,
    })
}

pub async fn delete_enrollment(db: &SqlitePool, student_id: &str, course_id: &str) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM course_enrollments WHERE student_id = ? AND course_id = ?")
        .bind(student_id)
        .bind(course_id)
        .execute(db)
        .await?
        .rows_affected();

    Ok(result > 0)
}

pub async fn fetch_payments(db: &SqlitePool, student_id: &str) -> Result<Vec<Payment>, sqlx::Error> {
    sqlx::query_as::<_, Payment>(
        r#"
        SELECT id, student_id, course_id, amount, payment_method, payment_date, status, type, created_at
        FROM payments
        WHERE student_id = ?
        ORDER BY payment_date, course_id, type
        "#
    )
    .bind(student_id)
    .fetch_all(db)
    .await
}

pub async fn find_payment_in_month(
    db: &SqlitePool,
    student_id: &str,
    course_id: &str,
    kind: PaymentKind,
    month: BillingMonth,
) -> Result<Option<Payment>, AppError> {
    let (first, last) = month_bounds(month)?;

    let payment = sqlx::query_as::<_, Payment>(
        r#"
        SELECT id, student_id, course_id, amount, payment_method, payment_date, status, type, created_at
        FROM payments
        WHERE student_id = ? AND course_id = ? AND type = ?
          AND payment_date >= ? AND payment_date <= ?
        ORDER BY created_at
        LIMIT 1
        "#
    )
    .bind(student_id)
    .bind(course_id)
    .bind(kind)
    .bind(first)
    .bind(last)
    .fetch_optional(db)
    .await?;

    Ok(payment)
}

pub async fn insert_payment(db: &SqlitePool, new: &NewPayment) -> Result<Payment, sqlx::Error> {
    let id = Uuid::new_v4().to_string();
    let now = Utc::now().to_rfc3339();

    sqlx::query(
        r#"
        INSERT INTO payments
            (id, student_id, course_id, amount, payment_method, payment_date, status, type, created_at)
        VALUES (?, ?, ?, ?, NULL, ?, ?, ?, ?)
        "#
    )
    .bind(&id)
    .bind(&new.student_id)
    .bind(&new.course_id)
    .bind(new.amount)
    .bind(new.payment_date)
    .bind(new.status)
    .bind(new.kind)
    .bind(&now)
    .execute(db)
    .await?;

    Ok(Payment {
        id,
        student_id: new.student_id.clone(),
        course_id: new.course_id.clone(),
        amount: new.amount,
        payment_method: None,
        payment_date: new.payment_date,
        status: new.status,
        kind: new.kind,
        created_at: now,
    })
}

pub async fn update_payment_amount(
    db: &SqlitePool,
    id: &str,
    amount: i64,
    payment_date: NaiveDate,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("UPDATE payments SET amount = ?, payment_date = ? WHERE id = ?")
        .bind(amount)
        .bind(payment_date)
        .bind(id)
        .execute(db)
        .await?
        .rows_affected();

    Ok(result > 0)
}

pub async fn delete_payment(db: &SqlitePool, id: &str) -> Result<u64, sqlx::Error> {
    let result = sqlx::query("DELETE FROM payments WHERE id = ?")
        .bind(id)
        .execute(db)
        .await?;

    Ok(result.rows_affected())
}

/// Deletes `kind` records of one course dated strictly before `date`.
pub async fn delete_payments_before(
    db: &SqlitePool,
    student_id: &str,
    course_id: &str,
    kind: PaymentKind,
    date: NaiveDate,
) -> Result<u64, sqlx::Error> {
    let result = sqlx::query(
        "DELETE FROM payments WHERE student_id = ? AND course_id = ? AND type = ? AND payment_date < ?"
    )
    .bind(student_id)
    .bind(course_id)
    .bind(kind)
    .bind(date)
    .execute(db)
    .await?;

    Ok(result.rows_affected())
}

/// Deletes `kind` records of every course dated strictly after `date`.
pub async fn delete_payments_after(
    db: &SqlitePool,
    student_id: &str,
    kind: PaymentKind,
    date: NaiveDate,
) -> Result<u64, sqlx::Error> {
    let result = sqlx::query("DELETE FROM payments WHERE student_id = ? AND type = ? AND payment_date > ?")
        .bind(student_id)
        .bind(kind)
        .bind(date)
        .execute(db)
        .await?;

    Ok(result.rows_affected())
}

pub async fn delete_pending_course_payments_after(
    db: &SqlitePool,
    student_id: &str,
    course_id: &str,
    date: NaiveDate,
) -> Result<u64, sqlx::Error> {
    let result = sqlx::query(
        r#"
        DELETE FROM payments
        WHERE student_id = ? AND course_id = ? AND type = ? AND status = ? AND payment_date > ?
        "#
    )
    .bind(student_id)
    .bind(course_id)
    .bind(PaymentKind::Payment)
    .bind(PaymentStatus::Pending)
    .bind(date)
    .execute(db)
    .await?;

    Ok(result.rows_affected())
}

pub async fn delete_payments_in_month(
    db: &SqlitePool,
    student_id: &str,
    course_id: &str,
    kind: PaymentKind,
    month: BillingMonth,
) -> Result<u64, AppError> {
    let (first, last) = month_bounds(month)?;

    let result = sqlx::query(
        r#"
        DELETE FROM payments
        WHERE student_id = ? AND course_id = ? AND type = ?
          AND payment_date >= ? AND payment_date <= ?
        "#
    )
    .bind(student_id)
    .bind(course_id)
    .bind(kind)
    .bind(first)
    .bind(last)
    .execute(db)
    .await?;

    Ok(result.rows_affected())
}

pub async fn delete_refunds(db: &SqlitePool, student_id: &str) -> Result<u64, sqlx::Error> {
    let result = sqlx::query("DELETE FROM payments WHERE student_id = ? AND type = ?")
        .bind(student_id)
        .bind(PaymentKind::Refund)
        .execute(db)
        .await?;

    Ok(result.rows_affected())
}

fn month_bounds(month: BillingMonth) -> Result<(NaiveDate, NaiveDate), AppError> {
    match (month.first_day(), month.last_day()) {
        (Some(first), Some(last)) => Ok((first, last)),
        _ => Err(AppError::BadRequest(format!("invalid billing month {}", month))),
    }
}
