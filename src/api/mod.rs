use axum::Json;
use axum::extract::{Path, Query};
use axum::routing::{post, put};
use axum::{Router, extract::State, http::StatusCode, routing::get};

use crate::error::AppError;
use crate::models::*;
use crate::services::ReconcileReport;
use crate::state::AppState;
use crate::tuition::{
    BillingMonth, count_occurrences_from_date_to_month_end, count_occurrences_in_month, first_invoice_amount,
    prorate_first_month,
};

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/students/{id}/enrollments", post(create_enrollment))
        .route("/students/{id}/enrollments/{course_id}", axum::routing::delete(remove_enrollment))
        .route("/students/{id}/first-class-date", put(change_first_class_date))
        .route("/students/{id}/last-class-date", put(change_last_class_date))
        .route("/students/{id}/deactivate", post(deactivate_student))
        .route("/students/{id}/reactivate", post(reactivate_student))
        .route("/students/{id}/payments", get(list_payments))
        .route("/courses/{id}/proration", get(preview_proration))
        .with_state(state)
}

async fn health(State(state): State<AppState>) -> Result<StatusCode, AppError> {
    sqlx::query("select 1").execute(&state.db).await?;
    Ok(StatusCode::OK)
}

async fn require_student(state: &AppState, id: &str) -> Result<Student, AppError> {
    state.store.fetch_student(id).await?.ok_or(AppError::NotFound)
}

async fn create_enrollment(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<NewEnrollmentRequest>,
) -> Result<(StatusCode, Json<ReconcileReport>), AppError> {
    let report = state.billing.enroll(&id, &req.course_id).await?;
    Ok((StatusCode::CREATED, Json(report)))
}

async fn remove_enrollment(
    State(state): State<AppState>,
    Path((id, course_id)): Path<(String, String)>,
) -> Result<Json<ReconcileReport>, AppError> {
    let report = state.billing.withdraw(&id, &course_id).await?;
    Ok(Json(report))
}

async fn change_first_class_date(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<FirstClassDateRequest>,
) -> Result<Json<ReconcileReport>, AppError> {
    require_student(&state, &id).await?;
    let report = state.billing.first_class_date_changed(&id, req.first_class_date).await;
    Ok(Json(report))
}

async fn change_last_class_date(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<LastClassDateRequest>,
) -> Result<Json<ReconcileReport>, AppError> {
    require_student(&state, &id).await?;
    let report = state.billing.last_class_date_changed(&id, req.last_class_date).await;
    Ok(Json(report))
}

async fn deactivate_student(
    State(state): State<AppState>,
    Path(id): Path<String>,
    req: Option<Json<DeactivateRequest>>,
) -> Result<Json<ReconcileReport>, AppError> {
    let req = req.map(|Json(req)| req).unwrap_or_default();
    let student = require_student(&state, &id).await?;
    if !student.is_active() {
        return Err(AppError::Conflict(format!("student {} is already inactive", id)));
    }
    let report = state.billing.deactivate(&id, req.last_class_date).await;
    Ok(Json(report))
}

async fn reactivate_student(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ReconcileReport>, AppError> {
    let student = require_student(&state, &id).await?;
    if student.is_active() {
        return Err(AppError::Conflict(format!("student {} is already active", id)));
    }
    let report = state.billing.reactivate(&id).await;
    Ok(Json(report))
}

async fn list_payments(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Vec<Payment>>, AppError> {
    require_student(&state, &id).await?;
    let payments = state.store.fetch_payments(&id).await?;
    Ok(Json(payments))
}

async fn preview_proration(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(query): Query<ProrationQuery>,
) -> Result<Json<ProrationPreview>, AppError> {
    let (course, schedule) = state.store.fetch_course(&id).await?.ok_or(AppError::NotFound)?;
    let date = query.first_class_date;
    let month = BillingMonth::of(date);

    Ok(Json(ProrationPreview {
        course_id: course.id,
        monthly_tuition_fee: course.monthly_tuition_fee,
        first_class_date: date,
        sessions_in_month: count_occurrences_in_month(&schedule, month.year, month.month),
        sessions_remaining: count_occurrences_from_date_to_month_end(&schedule, date, month.year, month.month),
        prorated_amount: prorate_first_month(course.monthly_tuition_fee, &schedule, date, month.year, month.month),
        first_invoice_amount: first_invoice_amount(course.monthly_tuition_fee, &schedule, date),
    }))
}
