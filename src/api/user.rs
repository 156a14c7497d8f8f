use crate::auth::auth::AuthUser;
use crate::model::user::User;
use crate::utils::account_cache;
use crate::utils::account_filter;
use actix_web::{HttpResponse, Responder, web};
use serde::{Deserialize, Serialize};
use serde_json::json;
use sqlx::MySqlPool;
use tracing::error;
use utoipa::{IntoParams, ToSchema};

#[derive(Deserialize, IntoParams, ToSchema)]
pub struct UserQuery {
    /// Pagination page number (start with 1)
    #[schema(example = 1)]
    pub page: Option<u64>,
    /// Pagination per page number
    #[schema(example = 20)]
    pub per_page: Option<u64>,
    /// Filter by department code
    #[schema(example = "LD")]
    pub department: Option<String>,
}

#[derive(Serialize, ToSchema)]
pub struct UserListResponse {
    pub data: Vec<User>,
    #[schema(example = 1)]
    pub page: u32,
    #[schema(example = 20)]
    pub per_page: u32,
    #[schema(example = 1)]
    pub total: i64,
}

/// Staff directory (passwords never included)
#[utoipa::path(
    get,
    path = "/api/users",
    params(UserQuery),
    responses(
        (status = 200, description = "Paginated staff list", body = UserListResponse),
        (status = 401, description = "Unauthorized")
    ),
    security(("bearer_auth" = [])),
    tag = "Users"
)]
pub async fn list_users(
    _auth: AuthUser,
    pool: web::Data<MySqlPool>,
    query: web::Query<UserQuery>,
) -> actix_web::Result<impl Responder> {
    let per_page = query.per_page.unwrap_or(20).clamp(1, 100);
    let page = query.page.unwrap_or(1).max(1);
    let offset = (page - 1) * per_page;

    let mut where_sql = String::from(" WHERE 1=1");
    let mut dept_bind: Option<&str> = None;

    if let Some(department) = query.department.as_deref() {
        where_sql.push_str(" AND department = ?");
        dept_bind = Some(department);
    }

    let count_sql = format!("SELECT COUNT(*) FROM users{}", where_sql);
    let mut count_q = sqlx::query_scalar::<_, i64>(&count_sql);
    if let Some(d) = dept_bind {
        count_q = count_q.bind(d);
    }

    let total = count_q.fetch_one(pool.get_ref()).await.map_err(|e| {
        error!(error = %e, "Failed to count users");
        actix_web::error::ErrorInternalServerError("Internal Server Error")
    })?;

    let data_sql = format!(
        r#"
        SELECT id, name, account, department, position, email, extension, created_at
        FROM users
        {}
        ORDER BY id
        LIMIT ? OFFSET ?
        "#,
        where_sql
    );

    let mut data_q = sqlx::query_as::<_, User>(&data_sql);
    if let Some(d) = dept_bind {
        data_q = data_q.bind(d);
    }

    let users = data_q
        .bind(per_page)
        .bind(offset)
        .fetch_all(pool.get_ref())
        .await
        .map_err(|e| {
            error!(error = %e, "Failed to fetch user list");
            actix_web::error::ErrorInternalServerError("Internal Server Error")
        })?;

    Ok(HttpResponse::Ok().json(UserListResponse {
        data: users,
        page: page as u32,
        per_page: per_page as u32,
        total,
    }))
}

/// Delete a user by account
#[utoipa::path(
    delete,
    path = "/api/users/{account}",
    params(
        ("account" = String, Path, description = "Account of the user to delete")
    ),
    responses(
        (status = 200, description = "Successfully deleted"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "User not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Users"
)]
pub async fn delete_user(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<String>,
) -> actix_web::Result<impl Responder> {
    auth.require_manager()?;

    let account = path.into_inner();

    let result = sqlx::query("DELETE FROM users WHERE account = ?")
        .bind(&account)
        .execute(pool.get_ref())
        .await
        .map_err(|e| {
            error!(error = %e, account, "Failed to delete user");
            actix_web::error::ErrorInternalServerError("Internal Server Error")
        })?;

    if result.rows_affected() == 0 {
        return Ok(HttpResponse::NotFound().json(json!({
            "message": "User not found"
        })));
    }

    // the account name becomes available again
    account_filter::remove(&account);
    account_cache::ACCOUNT_CACHE
        .invalidate(&account.to_lowercase())
        .await;

    Ok(HttpResponse::Ok().json(json!({
        "message": "Successfully deleted"
    })))
}
