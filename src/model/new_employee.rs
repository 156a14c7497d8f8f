use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;

/// Onboarding record. Always created as a clerk (position C) in the
/// submitting supervisor's department.
#[derive(Debug, Serialize, Deserialize, FromRow, ToSchema)]
pub struct NewEmployee {
    #[schema(example = 1)]
    pub id: u64,
    #[schema(example = "Wu Kai")]
    pub name: String,
    #[schema(example = "wu.kai@gmail.com")]
    pub email: String,
    #[schema(example = "LD")]
    pub department: String,
    #[schema(example = "C")]
    pub position: String,
    #[schema(example = "2026-10-01", value_type = String, format = "date")]
    pub start_date: NaiveDate,
    #[schema(example = "transfer from branch office", nullable = true)]
    pub notes: Option<String>,
    #[schema(example = "pending")]
    pub status: String,
    #[schema(example = "lin.wei")]
    pub submitted_by: String,
    #[schema(example = "2026-08-20T10:00:00Z", value_type = String, format = "date-time")]
    pub created_at: Option<DateTime<Utc>>,
    #[schema(example = "2026-08-20T10:00:00Z", value_type = String, format = "date-time")]
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize, Deserialize, FromRow, ToSchema)]
pub struct NewEmployeeApproval {
    #[schema(example = 1)]
    pub new_employee_id: u64,
    #[schema(example = "chou.an")]
    pub approver_account: String,
    #[schema(example = "approved")]
    pub status: String,
    #[schema(example = "headcount confirmed")]
    pub comment: String,
    #[schema(example = "2026-08-21T10:00:00Z", value_type = String, format = "date-time")]
    pub created_at: Option<DateTime<Utc>>,
}
