use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;

#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum LeaveType {
    Annual,
    Sick,
    Personal,
    Unpaid,
}

impl LeaveType {
    pub fn as_str(&self) -> &str {
        match self {
            LeaveType::Annual => "annual",
            LeaveType::Sick => "sick",
            LeaveType::Personal => "personal",
            LeaveType::Unpaid => "unpaid",
        }
    }
}

#[derive(Debug, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Leave {
    #[schema(example = 1)]
    pub id: u64,
    #[schema(example = "lin.wei")]
    pub account: String,
    #[schema(example = "LD")]
    pub department: String,
    #[schema(example = "C")]
    pub position: String,
    #[schema(example = "annual")]
    pub leave_type: String,
    #[schema(example = "2026-09-01T09:00:00Z", value_type = String, format = "date-time")]
    pub start_at: DateTime<Utc>,
    #[schema(example = "2026-09-01T18:00:00Z", value_type = String, format = "date-time")]
    pub end_at: DateTime<Utc>,
    /// Hours, half-hour granularity.
    #[schema(example = 8.0)]
    pub duration_hours: f64,
    #[schema(example = "family trip", nullable = true)]
    pub reason: Option<String>,
    #[schema(example = "pending")]
    pub status: String,
    #[schema(example = "2026-08-20T10:00:00Z", value_type = String, format = "date-time")]
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize, Deserialize, FromRow, ToSchema)]
pub struct LeaveApproval {
    #[schema(example = 1)]
    pub leave_id: u64,
    #[schema(example = "chen.yu")]
    pub approver_account: String,
    #[schema(example = "approved")]
    pub status: String,
    #[schema(example = "ok", nullable = true)]
    pub comment: Option<String>,
    #[schema(example = "2026-08-21T10:00:00Z", value_type = String, format = "date-time")]
    pub created_at: Option<DateTime<Utc>>,
}
