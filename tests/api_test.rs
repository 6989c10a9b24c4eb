mod common;

use std::sync::Arc;

use academy_billing::api::router;
use academy_billing::clock::FixedClock;
use academy_billing::db::{BillingStore, SqliteStore};
use academy_billing::services::{BillingPolicy, BillingService};
use academy_billing::state::AppState;
use axum::body::Body;
use axum::http::{Method, Request, StatusCode};
use axum::Router;
use common::*;
use serde_json::{Value, json};
use tower::ServiceExt;

async fn app() -> (Router, sqlx::SqlitePool) {
    let pool = setup_db().await;
    insert_student(&pool, "s1", date(2026, 1, 20), Some(date(2026, 2, 17)), 10).await;
    insert_course(&pool, "piano", 300_000, &[2]).await;

    let store: Arc<dyn BillingStore> = Arc::new(SqliteStore::new(pool.clone()));
    let billing = Arc::new(BillingService::new(
        store.clone(),
        Arc::new(FixedClock(date(2026, 2, 1))),
        BillingPolicy::default(),
    ));
    let state = AppState {
        db: pool.clone(),
        store,
        billing,
    };
    (router(state), pool)
}

async fn call(app: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

#[tokio::test]
async fn health_reports_ok() {
    let (app, _pool) = app().await;
    let (status, _) = call(&app, Method::GET, "/health", None).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn enrolling_returns_the_reconcile_report() {
    let (app, _pool) = app().await;

    let (status, body) = call(
        &app,
        Method::POST,
        "/students/s1/enrollments",
        Some(json!({ "course_id": "piano" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["created"], 11);
    assert_eq!(body["failed"], 0);

    let (status, body) = call(&app, Method::GET, "/students/s1/payments", None).await;
    assert_eq!(status, StatusCode::OK);
    let rows = body.as_array().unwrap();
    assert_eq!(rows.len(), 11);
    assert_eq!(rows[0]["amount"], 450_000);
    assert_eq!(rows[0]["type"], "payment");
    assert_eq!(rows[0]["status"], "pending");
    assert_eq!(rows[0]["payment_date"], "2026-02-10");
}

#[tokio::test]
async fn enrolling_twice_conflicts() {
    let (app, _pool) = app().await;
    let body = json!({ "course_id": "piano" });

    let (status, _) = call(&app, Method::POST, "/students/s1/enrollments", Some(body.clone())).await;
    assert_eq!(status, StatusCode::CREATED);
    let (status, body) = call(&app, Method::POST, "/students/s1/enrollments", Some(body)).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "409 Conflict");
}

#[tokio::test]
async fn unknown_student_is_not_found() {
    let (app, _pool) = app().await;

    let (status, body) = call(&app, Method::GET, "/students/ghost/payments", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["message"], "Not Found");

    let (status, _) = call(
        &app,
        Method::PUT,
        "/students/ghost/first-class-date",
        Some(json!({ "first_class_date": "2026-03-01" })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn deactivate_and_reactivate_round_trip() {
    let (app, pool) = app().await;
    call(&app, Method::POST, "/students/s1/enrollments", Some(json!({ "course_id": "piano" }))).await;

    let (status, body) = call(
        &app,
        Method::POST,
        "/students/s1/deactivate",
        Some(json!({ "last_class_date": "2026-02-17" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["created"], 1);

    let (status, _) = call(&app, Method::POST, "/students/s1/deactivate", None).await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, _) = call(&app, Method::POST, "/students/s1/reactivate", None).await;
    assert_eq!(status, StatusCode::OK);

    let student = SqliteStore::new(pool.clone()).fetch_student("s1").await.unwrap().unwrap();
    assert!(student.is_active());
    assert_eq!(student.last_class_date, None);
}

#[tokio::test]
async fn deactivate_without_a_body_uses_the_default_last_class() {
    let (app, pool) = app().await;
    call(&app, Method::POST, "/students/s1/enrollments", Some(json!({ "course_id": "piano" }))).await;

    let (status, _) = call(&app, Method::POST, "/students/s1/deactivate", None).await;
    assert_eq!(status, StatusCode::OK);

    let student = SqliteStore::new(pool.clone()).fetch_student("s1").await.unwrap().unwrap();
    assert!(!student.is_active());
    assert_eq!(student.last_class_date, Some(date(2026, 2, 1)));
}

#[tokio::test]
async fn first_class_date_can_be_cleared() {
    let (app, pool) = app().await;
    call(&app, Method::POST, "/students/s1/enrollments", Some(json!({ "course_id": "piano" }))).await;

    let (status, _) = call(
        &app,
        Method::PUT,
        "/students/s1/first-class-date",
        Some(json!({ "first_class_date": null })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let student = SqliteStore::new(pool.clone()).fetch_student("s1").await.unwrap().unwrap();
    assert_eq!(student.first_class_date, None);
}

#[tokio::test]
async fn withdrawing_removes_the_enrollment() {
    let (app, _pool) = app().await;
    call(&app, Method::POST, "/students/s1/enrollments", Some(json!({ "course_id": "piano" }))).await;

    let (status, _) = call(&app, Method::DELETE, "/students/s1/enrollments/piano", None).await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = call(&app, Method::DELETE, "/students/s1/enrollments/piano", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn proration_preview_for_third_tuesday() {
    let (app, _pool) = app().await;

    let (status, body) = call(
        &app,
        Method::GET,
        "/courses/piano/proration?first_class_date=2026-02-17",
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["sessions_in_month"], 4);
    assert_eq!(body["sessions_remaining"], 2);
    assert_eq!(body["prorated_amount"], 150_000);
    assert_eq!(body["first_invoice_amount"], 450_000);

    let (status, _) = call(&app, Method::GET, "/courses/cello/proration?first_class_date=2026-02-17", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
