//! Report endpoints - the API surface.
//!
//! Everyone sees only their own submissions; SuperAdmin sees all. A report
//! is filed against a task the author can see.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use uuid::Uuid;

use crate::app::AppState;
use crate::authz::Surface;
use crate::errors::{AppError, AppResult};
use crate::jwt::AuthUser;
use crate::models::report::{Report, ReportCreateRequest, ReportStatus, ReportUpdateRequest};
use crate::models::task::Task;
use crate::store;
use crate::utils::utc_now;

#[utoipa::path(
    get,
    path = "/reports",
    tag = "Reports",
    responses((status = 200, description = "List visible reports", body = [Report])),
    security(("bearerAuth" = []))
)]
pub async fn list_reports(State(state): State<AppState>, auth: AuthUser) -> AppResult<Json<Vec<Report>>> {
    let filter = state.engine.report_filter(Some(&auth.principal), Surface::Api);
    let reports: Vec<Report> = store::list_reports(&state.pool, filter)
        .await?
        .into_iter()
        .map(Report::try_from)
        .collect::<Result<_, _>>()?;

    Ok(Json(reports))
}

#[utoipa::path(
    post,
    path = "/reports",
    tag = "Reports",
    request_body = ReportCreateRequest,
    responses(
        (status = 201, description = "Report submitted", body = Report),
        (status = 404, description = "Task absent or not visible to the caller")
    ),
    security(("bearerAuth" = []))
)]
pub async fn create_report(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(payload): Json<ReportCreateRequest>,
) -> AppResult<(StatusCode, Json<Report>)> {
    if !state
        .engine
        .can_create_report(Some(&auth.principal), Surface::Api)
        .is_allow()
    {
        return Err(AppError::forbidden("not allowed to submit reports"));
    }

    let task: Task = store::fetch_task(&state.pool, payload.task_id).await?.try_into()?;
    let task_filter = state.engine.task_filter(Some(&auth.principal), Surface::Api);
    if !task_filter.permits(task.owner_ref()) {
        return Err(AppError::not_found("task not found"));
    }

    let now = utc_now();
    let report_id = Uuid::new_v4();

    sqlx::query(
        "INSERT INTO reports (id, task_id, user_id, details, status, submitted_at, created_at, updated_at) \
         VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(report_id)
    .bind(task.id)
    .bind(auth.user_id())
    .bind(&payload.details)
    .bind(ReportStatus::NotReviewed.as_str())
    .bind(now)
    .bind(now)
    .bind(now)
    .execute(&state.pool)
    .await?;

    let report: Report = store::fetch_report(&state.pool, report_id).await?.try_into()?;

    Ok((StatusCode::CREATED, Json(report)))
}

#[utoipa::path(
    get,
    path = "/reports/{id}",
    tag = "Reports",
    params(("id" = Uuid, Path, description = "Report id")),
    responses((status = 200, description = "Report detail", body = Report)),
    security(("bearerAuth" = []))
)]
pub async fn get_report(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<Report>> {
    let report = fetch_visible_report(&state, &auth, id).await?;
    Ok(Json(report))
}

#[utoipa::path(
    put,
    path = "/reports/{id}",
    tag = "Reports",
    params(("id" = Uuid, Path, description = "Report id")),
    request_body = ReportUpdateRequest,
    responses((status = 200, description = "Report updated", body = Report)),
    security(("bearerAuth" = []))
)]
pub async fn update_report(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<ReportUpdateRequest>,
) -> AppResult<Json<Report>> {
    let mut report = fetch_visible_report(&state, &auth, id).await?;

    if !state
        .engine
        .can_modify_report(Some(&auth.principal), Surface::Api, report.owner_ref())
        .is_allow()
    {
        return Err(AppError::forbidden("not allowed to modify this report"));
    }

    if let Some(details) = payload.details {
        report.details = details;
    }
    if let Some(status) = payload.status {
        report.status = status;
    }

    let now = utc_now();
    sqlx::query(
        "UPDATE reports SET details = ?, status = ?, updated_at = ? WHERE id = ? AND deleted_at IS NULL",
    )
    .bind(&report.details)
    .bind(report.status.as_str())
    .bind(now)
    .bind(report.id)
    .execute(&state.pool)
    .await?;

    report.updated_at = now;
    Ok(Json(report))
}

#[utoipa::path(
    delete,
    path = "/reports/{id}",
    tag = "Reports",
    params(("id" = Uuid, Path, description = "Report id")),
    responses((status = 204, description = "Report soft deleted")),
    security(("bearerAuth" = []))
)]
pub async fn delete_report(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<StatusCode> {
    let report = fetch_visible_report(&state, &auth, id).await?;

    if !state
        .engine
        .can_modify_report(Some(&auth.principal), Surface::Api, report.owner_ref())
        .is_allow()
    {
        return Err(AppError::forbidden("not allowed to modify this report"));
    }

    let now = utc_now();
    let affected = sqlx::query("UPDATE reports SET deleted_at = ?, updated_at = ? WHERE id = ? AND deleted_at IS NULL")
        .bind(now)
        .bind(now)
        .bind(report.id)
        .execute(&state.pool)
        .await?;

    if affected.rows_affected() == 0 {
        return Err(AppError::not_found("report not found"));
    }

    Ok(StatusCode::NO_CONTENT)
}

async fn fetch_visible_report(state: &AppState, auth: &AuthUser, id: Uuid) -> AppResult<Report> {
    let report: Report = store::fetch_report(&state.pool, id).await?.try_into()?;

    let filter = state.engine.report_filter(Some(&auth.principal), Surface::Api);
    if !filter.permits(report.owner_ref()) {
        return Err(AppError::not_found("report not found"));
    }

    Ok(report)
}
