use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::authz::ProjectRef;
use crate::errors::AppError;

use super::WorkStatus;

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Project {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    pub created_by: Uuid,
    pub assigned_to: Option<Uuid>,
    pub status: WorkStatus,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

impl Project {
    pub fn owner_ref(&self) -> ProjectRef {
        ProjectRef {
            created_by: self.created_by,
            assigned_to: self.assigned_to,
        }
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct DbProject {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    pub created_by: Uuid,
    pub assigned_to: Option<Uuid>,
    pub status: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

impl TryFrom<DbProject> for Project {
    type Error = AppError;

    fn try_from(value: DbProject) -> Result<Self, Self::Error> {
        let status = WorkStatus::parse(&value.status)
            .ok_or_else(|| AppError::internal(format!("unknown project status '{}'", value.status)))?;

        Ok(Project {
            id: value.id,
            name: value.name,
            description: value.description,
            created_by: value.created_by,
            assigned_to: value.assigned_to,
            status,
            start_date: value.start_date,
            end_date: value.end_date,
            created_at: value.created_at,
            updated_at: value.updated_at,
            deleted_at: value.deleted_at,
        })
    }
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct ProjectCreateRequest {
    #[schema(example = "Riverside survey")]
    pub name: String,
    #[schema(example = "Baseline survey of the riverside district.")]
    pub description: Option<String>,
    pub assigned_to: Option<Uuid>,
    #[schema(example = "pending")]
    pub status: Option<WorkStatus>,
    #[schema(example = "2026-09-01")]
    pub start_date: NaiveDate,
    #[schema(example = "2026-12-15")]
    pub end_date: NaiveDate,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct ProjectUpdateRequest {
    pub name: Option<String>,
    pub description: Option<String>,
    pub assigned_to: Option<Uuid>,
    pub status: Option<WorkStatus>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
}
