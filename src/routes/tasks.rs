//! Task endpoints - the API surface.
//!
//! Visibility follows assignment (who handed the task out, who holds it);
//! assignment changes are validated against the candidate's stored role.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;
use uuid::Uuid;

use crate::app::AppState;
use crate::authz::{validate_assignment, Principal, Surface};
use crate::errors::{AppError, AppResult};
use crate::jwt::AuthUser;
use crate::models::task::{Task, TaskCreateRequest, TaskUpdateRequest};
use crate::models::WorkStatus;
use crate::store;
use crate::utils::utc_now;

#[derive(Debug, Deserialize)]
pub struct TaskListQuery {
    pub project_id: Option<Uuid>,
}

#[utoipa::path(
    get,
    path = "/tasks",
    tag = "Tasks",
    params(("project_id" = Option<Uuid>, Query, description = "Narrow to one project")),
    responses((status = 200, description = "List visible tasks", body = [Task])),
    security(("bearerAuth" = []))
)]
pub async fn list_tasks(
    State(state): State<AppState>,
    auth: AuthUser,
    Query(query): Query<TaskListQuery>,
) -> AppResult<Json<Vec<Task>>> {
    let filter = state.engine.task_filter(Some(&auth.principal), Surface::Api);
    let tasks: Vec<Task> = store::list_tasks(&state.pool, filter, query.project_id)
        .await?
        .into_iter()
        .map(Task::try_from)
        .collect::<Result<_, _>>()?;

    Ok(Json(tasks))
}

#[utoipa::path(
    post,
    path = "/tasks",
    tag = "Tasks",
    request_body = TaskCreateRequest,
    responses(
        (status = 201, description = "Task created", body = Task),
        (status = 400, description = "Assignment violates the role rules")
    ),
    security(("bearerAuth" = []))
)]
pub async fn create_task(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(payload): Json<TaskCreateRequest>,
) -> AppResult<(StatusCode, Json<Task>)> {
    if !state
        .engine
        .can_create_task(Some(&auth.principal), Surface::Api)
        .is_allow()
    {
        return Err(AppError::forbidden("not allowed to create tasks"));
    }

    // The parent project must exist and be visible to the caller.
    let project: crate::models::project::Project =
        store::fetch_project(&state.pool, payload.project_id).await?.try_into()?;
    let project_filter = state.engine.project_filter(Some(&auth.principal), Surface::Api);
    if !project_filter.permits(project.owner_ref()) {
        return Err(AppError::not_found("project not found"));
    }

    check_assignment(&state, &auth.principal, payload.assigned_to).await?;

    let now = utc_now();
    let task_id = Uuid::new_v4();
    let status = payload.status.unwrap_or(WorkStatus::Pending);

    sqlx::query(
        "INSERT INTO tasks (id, project_id, name, description, assigned_by, assigned_to, status, due_date, completion_date, created_at, updated_at) \
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(task_id)
    .bind(payload.project_id)
    .bind(&payload.name)
    .bind(payload.description.as_deref().unwrap_or(""))
    .bind(auth.user_id())
    .bind(payload.assigned_to)
    .bind(status.as_str())
    .bind(payload.due_date)
    .bind(payload.completion_date)
    .bind(now)
    .bind(now)
    .execute(&state.pool)
    .await?;

    let task: Task = store::fetch_task(&state.pool, task_id).await?.try_into()?;

    Ok((StatusCode::CREATED, Json(task)))
}

#[utoipa::path(
    get,
    path = "/tasks/{id}",
    tag = "Tasks",
    params(("id" = Uuid, Path, description = "Task id")),
    responses((status = 200, description = "Task detail", body = Task)),
    security(("bearerAuth" = []))
)]
pub async fn get_task(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<Task>> {
    let task = fetch_visible_task(&state, &auth, id).await?;
    Ok(Json(task))
}

#[utoipa::path(
    put,
    path = "/tasks/{id}",
    tag = "Tasks",
    params(("id" = Uuid, Path, description = "Task id")),
    request_body = TaskUpdateRequest,
    responses(
        (status = 200, description = "Task updated", body = Task),
        (status = 400, description = "Assignment violates the role rules")
    ),
    security(("bearerAuth" = []))
)]
pub async fn update_task(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<TaskUpdateRequest>,
) -> AppResult<Json<Task>> {
    let mut task = fetch_visible_task(&state, &auth, id).await?;

    if !state
        .engine
        .can_modify_task(Some(&auth.principal), Surface::Api, task.owner_ref())
        .is_allow()
    {
        return Err(AppError::forbidden("not allowed to modify this task"));
    }

    if let Some(assigned_to) = payload.assigned_to {
        if Some(assigned_to) != task.assigned_to {
            check_assignment(&state, &auth.principal, Some(assigned_to)).await?;
        }
        task.assigned_to = Some(assigned_to);
    }
    if let Some(name) = payload.name {
        task.name = name;
    }
    if let Some(description) = payload.description {
        task.description = description;
    }
    if let Some(status) = payload.status {
        task.status = status;
    }
    if let Some(due_date) = payload.due_date {
        task.due_date = due_date;
    }
    if let Some(completion_date) = payload.completion_date {
        task.completion_date = Some(completion_date);
    }

    let now = utc_now();
    sqlx::query(
        "UPDATE tasks SET name = ?, description = ?, assigned_to = ?, status = ?, due_date = ?, completion_date = ?, updated_at = ? \
         WHERE id = ? AND deleted_at IS NULL",
    )
    .bind(&task.name)
    .bind(&task.description)
    .bind(task.assigned_to)
    .bind(task.status.as_str())
    .bind(task.due_date)
    .bind(task.completion_date)
    .bind(now)
    .bind(task.id)
    .execute(&state.pool)
    .await?;

    task.updated_at = now;
    Ok(Json(task))
}

#[utoipa::path(
    delete,
    path = "/tasks/{id}",
    tag = "Tasks",
    params(("id" = Uuid, Path, description = "Task id")),
    responses((status = 204, description = "Task and its reports soft deleted")),
    security(("bearerAuth" = []))
)]
pub async fn delete_task(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<StatusCode> {
    let task = fetch_visible_task(&state, &auth, id).await?;

    if !state
        .engine
        .can_modify_task(Some(&auth.principal), Surface::Api, task.owner_ref())
        .is_allow()
    {
        return Err(AppError::forbidden("not allowed to modify this task"));
    }

    let now = utc_now();
    let mut tx = state.pool.begin().await?;

    sqlx::query("UPDATE reports SET deleted_at = ?, updated_at = ? WHERE task_id = ? AND deleted_at IS NULL")
        .bind(now)
        .bind(now)
        .bind(task.id)
        .execute(&mut *tx)
        .await?;

    let affected = sqlx::query("UPDATE tasks SET deleted_at = ?, updated_at = ? WHERE id = ? AND deleted_at IS NULL")
        .bind(now)
        .bind(now)
        .bind(task.id)
        .execute(&mut *tx)
        .await?;

    if affected.rows_affected() == 0 {
        return Err(AppError::not_found("task not found"));
    }

    tx.commit().await?;

    Ok(StatusCode::NO_CONTENT)
}

async fn fetch_visible_task(state: &AppState, auth: &AuthUser, id: Uuid) -> AppResult<Task> {
    let task: Task = store::fetch_task(&state.pool, id).await?.try_into()?;

    let filter = state.engine.task_filter(Some(&auth.principal), Surface::Api);
    if !filter.permits(task.owner_ref()) {
        return Err(AppError::not_found("task not found"));
    }

    Ok(task)
}

/// Resolve the candidate assignee and run the role-pair rule. A missing
/// candidate id is a plain bad request, not a rule violation.
async fn check_assignment(
    state: &AppState,
    assigner: &Principal,
    assigned_to: Option<Uuid>,
) -> AppResult<()> {
    let Some(candidate_id) = assigned_to else {
        return Ok(());
    };

    let candidate = state
        .directory
        .principal(candidate_id)
        .await?
        .ok_or_else(|| AppError::bad_request("assigned user not found"))?;

    validate_assignment(assigner, Some(&candidate))?;
    Ok(())
}
