use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::authz::TaskRef;
use crate::errors::AppError;

use super::WorkStatus;

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Task {
    pub id: Uuid,
    pub project_id: Uuid,
    pub name: String,
    pub description: String,
    pub assigned_by: Uuid,
    pub assigned_to: Option<Uuid>,
    pub status: WorkStatus,
    pub due_date: NaiveDate,
    pub completion_date: Option<NaiveDate>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

impl Task {
    pub fn owner_ref(&self) -> TaskRef {
        TaskRef {
            assigned_by: self.assigned_by,
            assigned_to: self.assigned_to,
        }
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct DbTask {
    pub id: Uuid,
    pub project_id: Uuid,
    pub name: String,
    pub description: String,
    pub assigned_by: Uuid,
    pub assigned_to: Option<Uuid>,
    pub status: String,
    pub due_date: NaiveDate,
    pub completion_date: Option<NaiveDate>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

impl TryFrom<DbTask> for Task {
    type Error = AppError;

    fn try_from(value: DbTask) -> Result<Self, Self::Error> {
        let status = WorkStatus::parse(&value.status)
            .ok_or_else(|| AppError::internal(format!("unknown task status '{}'", value.status)))?;

        Ok(Task {
            id: value.id,
            project_id: value.project_id,
            name: value.name,
            description: value.description,
            assigned_by: value.assigned_by,
            assigned_to: value.assigned_to,
            status,
            due_date: value.due_date,
            completion_date: value.completion_date,
            created_at: value.created_at,
            updated_at: value.updated_at,
            deleted_at: value.deleted_at,
        })
    }
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct TaskCreateRequest {
    pub project_id: Uuid,
    #[schema(example = "Collect zoning data")]
    pub name: String,
    #[schema(example = "Pull the current zoning shapefiles for the district.")]
    pub description: Option<String>,
    pub assigned_to: Option<Uuid>,
    #[schema(example = "pending")]
    pub status: Option<WorkStatus>,
    #[schema(example = "2026-10-10")]
    pub due_date: NaiveDate,
    pub completion_date: Option<NaiveDate>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct TaskUpdateRequest {
    pub name: Option<String>,
    pub description: Option<String>,
    pub assigned_to: Option<Uuid>,
    pub status: Option<WorkStatus>,
    pub due_date: Option<NaiveDate>,
    pub completion_date: Option<NaiveDate>,
}
