#![allow(dead_code)]

use std::sync::Arc;

use academy_billing::clock::FixedClock;
use academy_billing::db::{BillingStore, SqliteStore};
use academy_billing::models::Payment;
use academy_billing::services::{BillingPolicy, BillingService};
use chrono::NaiveDate;
use sqlx::SqlitePool;
use sqlx::sqlite::SqlitePoolOptions;

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

/// A single-connection in-memory database so every query sees the same data.
pub async fn setup_db() -> SqlitePool {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect("sqlite::memory:")
        .await
        .expect("Failed to create database");

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("Failed to run migrations");

    pool
}

pub fn service(pool: &SqlitePool, today: NaiveDate, policy: BillingPolicy) -> BillingService {
    let store: Arc<dyn BillingStore> = Arc::new(SqliteStore::new(pool.clone()));
    BillingService::new(store, Arc::new(FixedClock(today)), policy)
}

pub async fn insert_student(
    pool: &SqlitePool,
    id: &str,
    enrollment_date: NaiveDate,
    first_class_date: Option<NaiveDate>,
    payment_due_day: i64,
) {
    sqlx::query(
        r#"
        INSERT INTO students (id, name, status, enrollment_date, first_class_date, last_class_date, payment_due_day)
        VALUES (?, ?, 'active', ?, ?, NULL, ?)
        "#,
    )
    .bind(id)
    .bind(format!("Student {}", id))
    .bind(enrollment_date)
    .bind(first_class_date)
    .bind(payment_due_day)
    .execute(pool)
    .await
    .expect("Failed to insert student");
}

pub async fn insert_course(pool: &SqlitePool, id: &str, fee: i64, days: &[i64]) {
    sqlx::query("INSERT INTO courses (id, name, monthly_tuition_fee) VALUES (?, ?, ?)")
        .bind(id)
        .bind(format!("Course {}", id))
        .bind(fee)
        .execute(pool)
        .await
        .expect("Failed to insert course");

    for day in days {
        sqlx::query("INSERT INTO course_schedules (course_id, day_of_week, start_time, end_time) VALUES (?, ?, '16:00', '17:30')")
            .bind(id)
            .bind(day)
            .execute(pool)
            .await
            .expect("Failed to insert schedule");
    }
}

pub async fn insert_enrollment(pool: &SqlitePool, student_id: &str, course_id: &str, enrolled_on: NaiveDate) {
    sqlx::query("INSERT INTO course_enrollments (id, student_id, course_id, enrolled_on) VALUES (?, ?, ?, ?)")
        .bind(format!("{}-{}", student_id, course_id))
        .bind(student_id)
        .bind(course_id)
        .bind(enrolled_on)
        .execute(pool)
        .await
        .expect("Failed to insert enrollment");
}

pub async fn insert_attendance(pool: &SqlitePool, student_id: &str, on: NaiveDate) {
    sqlx::query("INSERT INTO attendance (student_id, date, status) VALUES (?, ?, 'present')")
        .bind(student_id)
        .bind(on)
        .execute(pool)
        .await
        .expect("Failed to insert attendance");
}

pub async fn payments(pool: &SqlitePool, student_id: &str) -> Vec<Payment> {
    SqliteStore::new(pool.clone())
        .fetch_payments(student_id)
        .await
        .expect("Failed to fetch payments")
}
