use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::authz::ReportRef;
use crate::errors::AppError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ReportStatus {
    Reviewed,
    NotReviewed,
}

impl ReportStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            ReportStatus::Reviewed => "reviewed",
            ReportStatus::NotReviewed => "not_reviewed",
        }
    }

    pub fn parse(value: &str) -> Option<ReportStatus> {
        match value {
            "reviewed" => Some(ReportStatus::Reviewed),
            "not_reviewed" => Some(ReportStatus::NotReviewed),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Report {
    pub id: Uuid,
    pub task_id: Uuid,
    pub user_id: Uuid,
    pub details: String,
    pub status: ReportStatus,
    pub submitted_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

impl Report {
    pub fn owner_ref(&self) -> ReportRef {
        ReportRef { author: self.user_id }
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct DbReport {
    pub id: Uuid,
    pub task_id: Uuid,
    pub user_id: Uuid,
    pub details: String,
    pub status: String,
    pub submitted_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

impl TryFrom<DbReport> for Report {
    type Error = AppError;

    fn try_from(value: DbReport) -> Result<Self, Self::Error> {
        let status = ReportStatus::parse(&value.status)
            .ok_or_else(|| AppError::internal(format!("unknown report status '{}'", value.status)))?;

        Ok(Report {
            id: value.id,
            task_id: value.task_id,
            user_id: value.user_id,
            details: value.details,
            status,
            submitted_at: value.submitted_at,
            created_at: value.created_at,
            updated_at: value.updated_at,
            deleted_at: value.deleted_at,
        })
    }
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct ReportCreateRequest {
    pub task_id: Uuid,
    #[schema(example = "Survey of block 4 complete; two parcels disputed.")]
    pub details: String,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct ReportUpdateRequest {
    pub details: Option<String>,
    #[schema(example = "reviewed")]
    pub status: Option<ReportStatus>,
}
