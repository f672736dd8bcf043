//! Repository layer: principal lookup and filter-driven list queries.
//!
//! The policy engine hands back filter values; this module is the only place
//! that turns them into SQL. Detail fetches return the freshest live row so
//! handlers can re-check permissions right before writing.

use async_trait::async_trait;
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::authz::{Principal, ProjectFilter, ReportFilter, Role, TaskFilter, UserFilter};
use crate::errors::{AppError, AppResult};
use crate::models::project::DbProject;
use crate::models::report::DbReport;
use crate::models::task::DbTask;
use crate::models::user::DbUser;

/// Lookup of live principals by id, the seam between authentication and the
/// authorization core. Trait-shaped so handlers and tests can depend on the
/// interface rather than the pool.
#[async_trait]
pub trait UserDirectory: Send + Sync {
    /// Returns the principal for a non-deleted account, active or not.
    async fn principal(&self, user_id: Uuid) -> AppResult<Option<Principal>>;
}

pub struct SqliteDirectory {
    pool: SqlitePool,
}

impl SqliteDirectory {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserDirectory for SqliteDirectory {
    async fn principal(&self, user_id: Uuid) -> AppResult<Option<Principal>> {
        let row = sqlx::query_as::<_, (String, bool)>(
            "SELECT role, is_active FROM users WHERE id = ? AND deleted_at IS NULL",
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        let Some((role, is_active)) = row else {
            return Ok(None);
        };
        let role = Role::parse(&role)
            .ok_or_else(|| AppError::internal(format!("unknown role '{role}'")))?;

        Ok(Some(Principal {
            user_id,
            role,
            active: is_active,
        }))
    }
}

const USER_COLUMNS: &str =
    "id, name, email, password_hash, role, is_active, created_at, updated_at, deleted_at";
const PROJECT_COLUMNS: &str = "id, name, description, created_by, assigned_to, status, \
     start_date, end_date, created_at, updated_at, deleted_at";
const TASK_COLUMNS: &str = "id, project_id, name, description, assigned_by, assigned_to, \
     status, due_date, completion_date, created_at, updated_at, deleted_at";
const REPORT_COLUMNS: &str =
    "id, task_id, user_id, details, status, submitted_at, created_at, updated_at, deleted_at";

pub async fn list_users(pool: &SqlitePool, filter: UserFilter) -> AppResult<Vec<DbUser>> {
    match filter {
        UserFilter::Nothing => Ok(Vec::new()),
        UserFilter::All => {
            let sql = format!(
                "SELECT {USER_COLUMNS} FROM users WHERE deleted_at IS NULL ORDER BY email"
            );
            Ok(sqlx::query_as::<_, DbUser>(&sql).fetch_all(pool).await?)
        }
        UserFilter::Roles(roles) => {
            let placeholders = vec!["?"; roles.len()].join(", ");
            let sql = format!(
                "SELECT {USER_COLUMNS} FROM users WHERE role IN ({placeholders}) \
                 AND deleted_at IS NULL ORDER BY email"
            );
            let mut query = sqlx::query_as::<_, DbUser>(&sql);
            for role in roles {
                query = query.bind(role.as_str());
            }
            Ok(query.fetch_all(pool).await?)
        }
    }
}

pub async fn fetch_user(pool: &SqlitePool, user_id: Uuid) -> AppResult<DbUser> {
    let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE id = ? AND deleted_at IS NULL");
    sqlx::query_as::<_, DbUser>(&sql)
        .bind(user_id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| AppError::not_found("user not found"))
}

pub async fn list_projects(pool: &SqlitePool, filter: ProjectFilter) -> AppResult<Vec<DbProject>> {
    let base = format!(
        "SELECT {PROJECT_COLUMNS} FROM projects WHERE deleted_at IS NULL"
    );
    let rows = match filter {
        ProjectFilter::Nothing => return Ok(Vec::new()),
        ProjectFilter::All => {
            let sql = format!("{base} ORDER BY created_at DESC");
            sqlx::query_as::<_, DbProject>(&sql).fetch_all(pool).await?
        }
        ProjectFilter::CreatedByOrAssignedTo(id) => {
            let sql = format!("{base} AND (created_by = ? OR assigned_to = ?) ORDER BY created_at DESC");
            sqlx::query_as::<_, DbProject>(&sql)
                .bind(id)
                .bind(id)
                .fetch_all(pool)
                .await?
        }
        ProjectFilter::AssignedTo(id) => {
            let sql = format!("{base} AND assigned_to = ? ORDER BY created_at DESC");
            sqlx::query_as::<_, DbProject>(&sql).bind(id).fetch_all(pool).await?
        }
    };
    Ok(rows)
}

pub async fn fetch_project(pool: &SqlitePool, project_id: Uuid) -> AppResult<DbProject> {
    let sql = format!("SELECT {PROJECT_COLUMNS} FROM projects WHERE id = ? AND deleted_at IS NULL");
    sqlx::query_as::<_, DbProject>(&sql)
        .bind(project_id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| AppError::not_found("project not found"))
}

pub async fn list_tasks(
    pool: &SqlitePool,
    filter: TaskFilter,
    project_id: Option<Uuid>,
) -> AppResult<Vec<DbTask>> {
    let mut sql = format!("SELECT {TASK_COLUMNS} FROM tasks WHERE deleted_at IS NULL");
    if project_id.is_some() {
        sql.push_str(" AND project_id = ?");
    }
    match filter {
        TaskFilter::Nothing => return Ok(Vec::new()),
        TaskFilter::All => {}
        TaskFilter::AssignedByOrTo(_) => sql.push_str(" AND (assigned_by = ? OR assigned_to = ?)"),
        TaskFilter::AssignedTo(_) => sql.push_str(" AND assigned_to = ?"),
    }
    sql.push_str(" ORDER BY due_date ASC, created_at DESC");

    let mut query = sqlx::query_as::<_, DbTask>(&sql);
    if let Some(project_id) = project_id {
        query = query.bind(project_id);
    }
    match filter {
        TaskFilter::All | TaskFilter::Nothing => {}
        TaskFilter::AssignedByOrTo(id) => {
            query = query.bind(id).bind(id);
        }
        TaskFilter::AssignedTo(id) => {
            query = query.bind(id);
        }
    }
    Ok(query.fetch_all(pool).await?)
}

pub async fn fetch_task(pool: &SqlitePool, task_id: Uuid) -> AppResult<DbTask> {
    let sql = format!("SELECT {TASK_COLUMNS} FROM tasks WHERE id = ? AND deleted_at IS NULL");
    sqlx::query_as::<_, DbTask>(&sql)
        .bind(task_id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| AppError::not_found("task not found"))
}

pub async fn list_reports(pool: &SqlitePool, filter: ReportFilter) -> AppResult<Vec<DbReport>> {
    let base = format!("SELECT {REPORT_COLUMNS} FROM reports WHERE deleted_at IS NULL");
    let rows = match filter {
        ReportFilter::Nothing => return Ok(Vec::new()),
        ReportFilter::All => {
            let sql = format!("{base} ORDER BY submitted_at DESC");
            sqlx::query_as::<_, DbReport>(&sql).fetch_all(pool).await?
        }
        ReportFilter::AuthoredBy(id) => {
            let sql = format!("{base} AND user_id = ? ORDER BY submitted_at DESC");
            sqlx::query_as::<_, DbReport>(&sql).bind(id).fetch_all(pool).await?
        }
    };
    Ok(rows)
}

pub async fn fetch_report(pool: &SqlitePool, report_id: Uuid) -> AppResult<DbReport> {
    let sql = format!("SELECT {REPORT_COLUMNS} FROM reports WHERE id = ? AND deleted_at IS NULL");
    sqlx::query_as::<_, DbReport>(&sql)
        .bind(report_id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| AppError::not_found("report not found"))
}
