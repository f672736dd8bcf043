//! Project endpoints - the API surface.
//!
//! Listing applies the engine's visibility filter; a project outside the
//! caller's scope reads as absent. Mutations re-fetch the stored row and
//! re-check the permission against it before writing, so a reassignment
//! that happened after the caller's last read is honored.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use uuid::Uuid;

use crate::app::AppState;
use crate::authz::Surface;
use crate::errors::{AppError, AppResult};
use crate::jwt::AuthUser;
use crate::models::project::{Project, ProjectCreateRequest, ProjectUpdateRequest};
use crate::models::WorkStatus;
use crate::store;
use crate::utils::utc_now;

#[utoipa::path(
    get,
    path = "/projects",
    tag = "Projects",
    responses((status = 200, description = "List visible projects", body = [Project])),
    security(("bearerAuth" = []))
)]
pub async fn list_projects(State(state): State<AppState>, auth: AuthUser) -> AppResult<Json<Vec<Project>>> {
    let filter = state.engine.project_filter(Some(&auth.principal), Surface::Api);
    let projects: Vec<Project> = store::list_projects(&state.pool, filter)
        .await?
        .into_iter()
        .map(Project::try_from)
        .collect::<Result<_, _>>()?;

    Ok(Json(projects))
}

#[utoipa::path(
    post,
    path = "/projects",
    tag = "Projects",
    request_body = ProjectCreateRequest,
    responses(
        (status = 201, description = "Project created", body = Project),
        (status = 403, description = "Caller's role may not create projects")
    ),
    security(("bearerAuth" = []))
)]
pub async fn create_project(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(payload): Json<ProjectCreateRequest>,
) -> AppResult<(StatusCode, Json<Project>)> {
    if !state.engine.can_create_project(Some(&auth.principal)).is_allow() {
        return Err(AppError::forbidden("not allowed to create projects"));
    }
    if payload.end_date < payload.start_date {
        return Err(AppError::bad_request("end_date must be >= start_date"));
    }

    let now = utc_now();
    let project_id = Uuid::new_v4();
    let status = payload.status.unwrap_or(WorkStatus::Pending);

    sqlx::query(
        "INSERT INTO projects (id, name, description, created_by, assigned_to, status, start_date, end_date, created_at, updated_at) \
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(project_id)
    .bind(&payload.name)
    .bind(payload.description.as_deref().unwrap_or(""))
    .bind(auth.user_id())
    .bind(payload.assigned_to)
    .bind(status.as_str())
    .bind(payload.start_date)
    .bind(payload.end_date)
    .bind(now)
    .bind(now)
    .execute(&state.pool)
    .await?;

    let project: Project = store::fetch_project(&state.pool, project_id).await?.try_into()?;

    Ok((StatusCode::CREATED, Json(project)))
}

#[utoipa::path(
    get,
    path = "/projects/{id}",
    tag = "Projects",
    params(("id" = Uuid, Path, description = "Project id")),
    responses((status = 200, description = "Project detail", body = Project)),
    security(("bearerAuth" = []))
)]
pub async fn get_project(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<Project>> {
    let project = fetch_visible_project(&state, &auth, id).await?;
    Ok(Json(project))
}

#[utoipa::path(
    put,
    path = "/projects/{id}",
    tag = "Projects",
    params(("id" = Uuid, Path, description = "Project id")),
    request_body = ProjectUpdateRequest,
    responses(
        (status = 200, description = "Project updated", body = Project),
        (status = 403, description = "Visible but not modifiable by the caller")
    ),
    security(("bearerAuth" = []))
)]
pub async fn update_project(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<ProjectUpdateRequest>,
) -> AppResult<Json<Project>> {
    let mut project = fetch_visible_project(&state, &auth, id).await?;

    if !state
        .engine
        .can_modify_project(Some(&auth.principal), project.owner_ref())
        .is_allow()
    {
        return Err(AppError::forbidden("not allowed to modify this project"));
    }

    if let Some(name) = payload.name {
        project.name = name;
    }
    if let Some(description) = payload.description {
        project.description = description;
    }
    if let Some(assigned_to) = payload.assigned_to {
        project.assigned_to = Some(assigned_to);
    }
    if let Some(status) = payload.status {
        project.status = status;
    }
    if let Some(start_date) = payload.start_date {
        project.start_date = start_date;
    }
    if let Some(end_date) = payload.end_date {
        project.end_date = end_date;
    }
    if project.end_date < project.start_date {
        return Err(AppError::bad_request("end_date must be >= start_date"));
    }

    let now = utc_now();
    sqlx::query(
        "UPDATE projects SET name = ?, description = ?, assigned_to = ?, status = ?, start_date = ?, end_date = ?, updated_at = ? \
         WHERE id = ? AND deleted_at IS NULL",
    )
    .bind(&project.name)
    .bind(&project.description)
    .bind(project.assigned_to)
    .bind(project.status.as_str())
    .bind(project.start_date)
    .bind(project.end_date)
    .bind(now)
    .bind(project.id)
    .execute(&state.pool)
    .await?;

    project.updated_at = now;
    Ok(Json(project))
}

#[utoipa::path(
    delete,
    path = "/projects/{id}",
    tag = "Projects",
    params(("id" = Uuid, Path, description = "Project id")),
    responses(
        (status = 204, description = "Project and its tasks soft deleted"),
        (status = 403, description = "Visible but not deletable by the caller")
    ),
    security(("bearerAuth" = []))
)]
pub async fn delete_project(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<StatusCode> {
    let project = fetch_visible_project(&state, &auth, id).await?;

    if !state
        .engine
        .can_delete_project(Some(&auth.principal), project.owner_ref())
        .is_allow()
    {
        return Err(AppError::forbidden("not allowed to delete this project"));
    }

    // Cascade: tasks belong to the project, reports belong to its tasks.
    let now = utc_now();
    let mut tx = state.pool.begin().await?;

    sqlx::query(
        "UPDATE reports SET deleted_at = ?, updated_at = ? \
         WHERE deleted_at IS NULL AND task_id IN (SELECT id FROM tasks WHERE project_id = ?)",
    )
    .bind(now)
    .bind(now)
    .bind(project.id)
    .execute(&mut *tx)
    .await?;

    sqlx::query("UPDATE tasks SET deleted_at = ?, updated_at = ? WHERE project_id = ? AND deleted_at IS NULL")
        .bind(now)
        .bind(now)
        .bind(project.id)
        .execute(&mut *tx)
        .await?;

    let affected = sqlx::query("UPDATE projects SET deleted_at = ?, updated_at = ? WHERE id = ? AND deleted_at IS NULL")
        .bind(now)
        .bind(now)
        .bind(project.id)
        .execute(&mut *tx)
        .await?;

    if affected.rows_affected() == 0 {
        return Err(AppError::not_found("project not found"));
    }

    tx.commit().await?;

    Ok(StatusCode::NO_CONTENT)
}

/// Fetch the freshest stored row and apply the caller's visibility filter.
/// Out-of-scope projects read as absent, not forbidden.
async fn fetch_visible_project(state: &AppState, auth: &AuthUser, id: Uuid) -> AppResult<Project> {
    let project: Project = store::fetch_project(&state.pool, id).await?.try_into()?;

    let filter = state.engine.project_filter(Some(&auth.principal), Surface::Api);
    if !filter.permits(project.owner_ref()) {
        return Err(AppError::not_found("project not found"));
    }

    Ok(project)
}
