use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;

/// Staff directory entry. The password hash never leaves the auth layer.
#[derive(Debug, Serialize, Deserialize, FromRow, ToSchema)]
#[schema(
    example = json!({
        "id": 1,
        "name": "Lin Wei",
        "account": "lin.wei",
        "department": "LD",
        "position": "S",
        "email": "lin.wei@bank.example",
        "extension": "2104",
        "created_at": "2024-01-01T00:00:00Z"
    })
)]
pub struct User {
    #[schema(example = 1)]
    pub id: u64,

    #[schema(example = "Lin Wei")]
    pub name: String,

    #[schema(example = "lin.wei")]
    pub account: String,

    #[schema(example = "LD")]
    pub department: String,

    #[schema(example = "S")]
    pub position: String,

    #[schema(example = "lin.wei@bank.example", nullable = true)]
    pub email: Option<String>,

    #[schema(example = "2104", nullable = true)]
    pub extension: Option<String>,

    #[schema(example = "2024-01-01T00:00:00Z", value_type = String, format = "date-time")]
    pub created_at: Option<DateTime<Utc>>,
}
