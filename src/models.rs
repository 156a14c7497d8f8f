use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;

use crate::model::codes::{Department, Position};

#[derive(Deserialize, ToSchema)]
pub struct RegisterReq {
    #[schema(example = "Lin Wei")]
    pub name: String,
    #[schema(example = "lin.wei")]
    pub account: String,
    #[schema(example = "s3cret!")]
    pub password: String,
    #[schema(example = "LD")]
    pub department: Department,
    #[schema(example = "C")]
    pub position: Position,
    #[schema(example = "lin.wei@bank.example", nullable = true)]
    pub email: Option<String>,
    #[schema(example = "2104", nullable = true)]
    pub extension: Option<String>,
}

#[derive(Deserialize, ToSchema)]
pub struct LoginReqDto {
    #[schema(example = "lin.wei")]
    pub account: String,
    #[schema(example = "s3cret!")]
    pub password: String,
}

#[derive(FromRow)]
pub struct UserSql {
    pub id: u64, // matches BIGINT UNSIGNED
    pub account: String,
    pub password: String,
    pub department: String,
    pub position: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub user_id: u64,
    /// Account name.
    pub sub: String,
    pub department: Department,
    pub position: Position,
    pub exp: usize,
    pub jti: String,

    pub token_type: TokenType,
}

#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub enum TokenType {
    Access,
    Refresh,
}
