use crate::auth::auth::AuthUser;
use crate::model::codes::Position;
use crate::model::leave::{Leave, LeaveApproval, LeaveType};
use actix_web::{HttpResponse, Responder, web};
use chrono::{DateTime, Datelike, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use sqlx::MySqlPool;
use tracing::error;
use utoipa::{IntoParams, ToSchema};

/// Annual leave entitlement, days per calendar year.
const ANNUAL_LEAVE_DAYS: f64 = 14.0;
const HOURS_PER_DAY: f64 = 8.0;

#[derive(Deserialize, ToSchema)]
pub struct CreateLeave {
    #[schema(example = "annual")]
    pub leave_type: LeaveType,
    #[schema(example = "2026-09-01T09:00:00Z", value_type = String, format = "date-time")]
    pub start_at: DateTime<Utc>,
    #[schema(example = "2026-09-01T18:00:00Z", value_type = String, format = "date-time")]
    pub end_at: DateTime<Utc>,
    /// Hours, half-hour granularity.
    #[schema(example = 8.0)]
    pub duration_hours: f64,
    #[schema(example = "family trip", nullable = true)]
    pub reason: Option<String>,
}

#[derive(Deserialize, IntoParams, ToSchema)]
pub struct LeaveFilter {
    /// Filter by leave status
    #[schema(example = "pending")]
    pub status: Option<String>,
    /// Pagination page number (start with 1)
    #[schema(example = 1)]
    pub page: Option<u64>,
    /// Pagination per page number
    #[schema(example = 10)]
    pub per_page: Option<u64>,
}

#[derive(Serialize, ToSchema)]
pub struct LeaveWithApprovals {
    #[serde(flatten)]
    pub leave: Leave,
    pub approvals: Vec<LeaveApproval>,
}

#[derive(Serialize, ToSchema)]
pub struct LeaveListResponse {
    pub data: Vec<LeaveWithApprovals>,
    #[schema(example = 1)]
    pub page: u32,
    #[schema(example = 10)]
    pub per_page: u32,
    #[schema(example = 1)]
    pub total: i64,
}

#[derive(Deserialize, ToSchema)]
pub struct ReviewLeave {
    #[schema(example = "ok", nullable = true)]
    pub comment: Option<String>,
}

#[derive(Serialize, ToSchema)]
pub struct AnnualRemaining {
    #[schema(example = 11.5)]
    pub remaining_days: f64,
    #[schema(example = 2.5)]
    pub used_days: f64,
    #[schema(example = 2026)]
    pub year: i32,
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Entitlement arithmetic shared by apply-time checks and the balance endpoint.
fn annual_summary(used_hours: f64, year: i32) -> AnnualRemaining {
    let used_days = used_hours / HOURS_PER_DAY;
    AnnualRemaining {
        remaining_days: round2(ANNUAL_LEAVE_DAYS - used_days),
        used_days: round2(used_days),
        year,
    }
}

async fn approved_annual_hours(
    account: &str,
    year: i32,
    pool: &MySqlPool,
) -> Result<f64, sqlx::Error> {
    sqlx::query_scalar::<_, f64>(
        r#"
        SELECT COALESCE(SUM(duration_hours), 0)
        FROM leaves
        WHERE account = ?
        AND leave_type = 'annual'
        AND status = 'approved'
        AND YEAR(start_at) = ?
        "#,
    )
    .bind(account)
    .bind(year)
    .fetch_one(pool)
    .await
}

/* =========================
Apply for leave
========================= */
#[utoipa::path(
    post,
    path = "/api/leave",
    request_body = CreateLeave,
    responses(
        (status = 201, description = "Leave request submitted", body = Object, example = json!({
            "message": "Leave request submitted",
            "status": "pending"
        })),
        (status = 400, description = "Bad request"),
        (status = 401, description = "Unauthorized")
    ),
    security(("bearer_auth" = [])),
    tag = "Leave"
)]
pub async fn create_leave(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    payload: web::Json<CreateLeave>,
) -> actix_web::Result<impl Responder> {
    // 1. validate duration
    if payload.duration_hours < 0.5 {
        return Ok(HttpResponse::BadRequest().json(json!({
            "message": "Leave cannot be shorter than half an hour"
        })));
    }

    // 2. validate dates
    if payload.end_at <= payload.start_at {
        return Ok(HttpResponse::BadRequest().json(json!({
            "message": "end_at must be after start_at"
        })));
    }

    // 3. annual leave balance check
    if matches!(payload.leave_type, LeaveType::Annual) {
        let year = payload.start_at.year();
        let used_hours = approved_annual_hours(&auth.account, year, pool.get_ref())
            .await
            .map_err(|e| {
                error!(error = %e, "Failed to sum annual leave");
                actix_web::error::ErrorInternalServerError("Internal Server Error")
            })?;

        let summary = annual_summary(used_hours, year);
        let requested_days = payload.duration_hours / HOURS_PER_DAY;
        if requested_days > summary.remaining_days {
            return Ok(HttpResponse::BadRequest().json(json!({
                "message": "Not enough annual leave remaining",
                "remaining_days": summary.remaining_days,
                "requested_hours": payload.duration_hours
            })));
        }
    }

    // 4. insert request
    sqlx::query(
        r#"
        INSERT INTO leaves
            (account, department, position, leave_type, start_at, end_at, duration_hours, reason, status)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, 'pending')
        "#,
    )
    .bind(&auth.account)
    .bind(auth.department.as_str())
    .bind(auth.position.as_str())
    .bind(payload.leave_type.as_str())
    .bind(payload.start_at)
    .bind(payload.end_at)
    .bind(payload.duration_hours)
    .bind(&payload.reason)
    .execute(pool.get_ref())
    .await
    .map_err(|e| {
        error!(error = %e, account = %auth.account, "Failed to create leave request");
        actix_web::error::ErrorInternalServerError("Internal Server Error")
    })?;

    Ok(HttpResponse::Created().json(json!({
        "message": "Leave request submitted",
        "status": "pending"
    })))
}

/* =========================
Leave list
========================= */
// Supervisors see their whole department, everyone else their own requests.
#[utoipa::path(
    get,
    path = "/api/leave",
    params(LeaveFilter),
    responses(
        (status = 200, description = "Paginated leave list", body = LeaveListResponse),
        (status = 401, description = "Unauthorized")
    ),
    security(("bearer_auth" = [])),
    tag = "Leave"
)]
pub async fn leave_list(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    query: web::Query<LeaveFilter>,
) -> actix_web::Result<impl Responder> {
    let per_page = query.per_page.unwrap_or(10).min(100);
    let page = query.page.unwrap_or(1).max(1);
    let offset = (page - 1) * per_page;

    let mut where_sql = String::new();
    let mut binds: Vec<String> = Vec::new();

    if auth.position == Position::S {
        where_sql.push_str(" WHERE department = ?");
        binds.push(auth.department.as_str().to_string());
    } else {
        where_sql.push_str(" WHERE account = ?");
        binds.push(auth.account.clone());
    }

    if let Some(status) = query.status.as_deref() {
        where_sql.push_str(" AND status = ?");
        binds.push(status.to_string());
    }

    let count_sql = format!("SELECT COUNT(*) FROM leaves{}", where_sql);
    let mut count_q = sqlx::query_scalar::<_, i64>(&count_sql);
    for b in &binds {
        count_q = count_q.bind(b);
    }

    let total = count_q.fetch_one(pool.get_ref()).await.map_err(|e| {
        error!(error = %e, "Failed to count leave requests");
        actix_web::error::ErrorInternalServerError("Internal Server Error")
    })?;

    let data_sql = format!(
        r#"
        SELECT id, account, department, position, leave_type, start_at, end_at,
               duration_hours, reason, status, created_at
        FROM leaves
        {}
        ORDER BY created_at DESC
        LIMIT ? OFFSET ?
        "#,
        where_sql
    );

    let mut data_q = sqlx::query_as::<_, Leave>(&data_sql);
    for b in &binds {
        data_q = data_q.bind(b);
    }

    let leaves = data_q
        .bind(per_page)
        .bind(offset)
        .fetch_all(pool.get_ref())
        .await
        .map_err(|e| {
            error!(error = %e, "Failed to fetch leave list");
            actix_web::error::ErrorInternalServerError("Internal Server Error")
        })?;

    // attach approval chains for the returned page in one query
    let mut data = Vec::with_capacity(leaves.len());
    if leaves.is_empty() {
        return Ok(HttpResponse::Ok().json(LeaveListResponse {
            data,
            page: page as u32,
            per_page: per_page as u32,
            total,
        }));
    }

    let placeholders = vec!["?"; leaves.len()].join(", ");
    let approvals_sql = format!(
        r#"
        SELECT leave_id, approver_account, status, comment, created_at
        FROM leave_approvals
        WHERE leave_id IN ({})
        ORDER BY created_at
        "#,
        placeholders
    );

    let mut approvals_q = sqlx::query_as::<_, LeaveApproval>(&approvals_sql);
    for leave in &leaves {
        approvals_q = approvals_q.bind(leave.id);
    }

    let mut approvals = approvals_q.fetch_all(pool.get_ref()).await.map_err(|e| {
        error!(error = %e, "Failed to fetch leave approvals");
        actix_web::error::ErrorInternalServerError("Internal Server Error")
    })?;

    for leave in leaves {
        let (mine, rest): (Vec<_>, Vec<_>) =
            approvals.into_iter().partition(|a| a.leave_id == leave.id);
        approvals = rest;
        data.push(LeaveWithApprovals {
            leave,
            approvals: mine,
        });
    }

    Ok(HttpResponse::Ok().json(LeaveListResponse {
        data,
        page: page as u32,
        per_page: per_page as u32,
        total,
    }))
}

/* =========================
Annual leave balance
========================= */
#[utoipa::path(
    get,
    path = "/api/leave/annual-remaining",
    responses(
        (status = 200, description = "Remaining annual leave for the current year", body = AnnualRemaining),
        (status = 401, description = "Unauthorized")
    ),
    security(("bearer_auth" = [])),
    tag = "Leave"
)]
pub async fn annual_remaining(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
) -> actix_web::Result<impl Responder> {
    let year = Utc::now().year();

    let used_hours = approved_annual_hours(&auth.account, year, pool.get_ref())
        .await
        .map_err(|e| {
            error!(error = %e, "Failed to sum annual leave");
            actix_web::error::ErrorInternalServerError("Internal Server Error")
        })?;

    Ok(HttpResponse::Ok().json(annual_summary(used_hours, year)))
}

async fn review_leave(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    leave_id: u64,
    decision: &str,
    comment: Option<String>,
) -> actix_web::Result<HttpResponse> {
    auth.require_supervisor()?;

    let leave = sqlx::query_as::<_, (String, String)>(
        "SELECT department, status FROM leaves WHERE id = ?",
    )
    .bind(leave_id)
    .fetch_optional(pool.get_ref())
    .await
    .map_err(|e| {
        error!(error = %e, leave_id, "Failed to fetch leave request");
        actix_web::error::ErrorInternalServerError("Internal Server Error")
    })?;

    let (department, status) = match leave {
        Some(row) => row,
        None => {
            return Ok(HttpResponse::NotFound().json(json!({
                "message": "Leave request not found"
            })));
        }
    };

    if department != auth.department.as_str() {
        return Ok(HttpResponse::Forbidden().json(json!({
            "message": "Cannot review another department's leave request"
        })));
    }

    if status != "pending" {
        return Ok(HttpResponse::BadRequest().json(json!({
            "message": "Leave request already processed"
        })));
    }

    let result = sqlx::query("UPDATE leaves SET status = ? WHERE id = ? AND status = 'pending'")
        .bind(decision)
        .bind(leave_id)
        .execute(pool.get_ref())
        .await
        .map_err(|e| {
            error!(error = %e, leave_id, "Leave review failed");
            actix_web::error::ErrorInternalServerError("Internal Server Error")
        })?;

    if result.rows_affected() == 0 {
        return Ok(HttpResponse::BadRequest().json(json!({
            "message": "Leave request already processed"
        })));
    }

    sqlx::query(
        r#"
        INSERT INTO leave_approvals (leave_id, approver_account, status, comment)
        VALUES (?, ?, ?, ?)
        "#,
    )
    .bind(leave_id)
    .bind(&auth.account)
    .bind(decision)
    .bind(&comment)
    .execute(pool.get_ref())
    .await
    .map_err(|e| {
        error!(error = %e, leave_id, "Failed to record leave approval");
        actix_web::error::ErrorInternalServerError("Internal Server Error")
    })?;

    Ok(HttpResponse::Ok().json(json!({
        "message": format!("Leave request {}", decision),
        "leave_id": leave_id
    })))
}

/* =========================
Approve leave (supervisor)
========================= */
#[utoipa::path(
    put,
    path = "/api/leave/{id}/approve",
    params(("id" = u64, Path, description = "ID of the leave request")),
    request_body = ReviewLeave,
    responses(
        (status = 200, description = "Leave approved"),
        (status = 400, description = "Already processed"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Leave"
)]
pub async fn approve_leave(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
    payload: web::Json<ReviewLeave>,
) -> actix_web::Result<impl Responder> {
    review_leave(
        auth,
        pool,
        path.into_inner(),
        "approved",
        payload.into_inner().comment,
    )
    .await
}

/* =========================
Reject leave (supervisor)
========================= */
#[utoipa::path(
    put,
    path = "/api/leave/{id}/reject",
    params(("id" = u64, Path, description = "ID of the leave request")),
    request_body = ReviewLeave,
    responses(
        (status = 200, description = "Leave rejected"),
        (status = 400, description = "Already processed"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Leave"
)]
pub async fn reject_leave(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
    payload: web::Json<ReviewLeave>,
) -> actix_web::Result<impl Responder> {
    review_leave(
        auth,
        pool,
        path.into_inner(),
        "rejected",
        payload.into_inner().comment,
    )
    .await
}

/* =========================
Cancel leave (applicant)
========================= */
#[utoipa::path(
    post,
    path = "/api/leave/{id}/cancel",
    params(("id" = u64, Path, description = "ID of the leave request")),
    responses(
        (status = 200, description = "Leave cancelled"),
        (status = 400, description = "Only pending requests can be cancelled"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Only the applicant can cancel"),
        (status = 404, description = "Not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Leave"
)]
pub async fn cancel_leave(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
) -> actix_web::Result<impl Responder> {
    let leave_id = path.into_inner();

    let leave = sqlx::query_as::<_, (String, String)>(
        "SELECT account, status FROM leaves WHERE id = ?",
    )
    .bind(leave_id)
    .fetch_optional(pool.get_ref())
    .await
    .map_err(|e| {
        error!(error = %e, leave_id, "Failed to fetch leave request");
        actix_web::error::ErrorInternalServerError("Internal Server Error")
    })?;

    let (account, status) = match leave {
        Some(row) => row,
        None => {
            return Ok(HttpResponse::NotFound().json(json!({
                "message": "Leave request not found"
            })));
        }
    };

    if account != auth.account {
        return Ok(HttpResponse::Forbidden().json(json!({
            "message": "Only the applicant can cancel a leave request"
        })));
    }

    if status != "pending" {
        return Ok(HttpResponse::BadRequest().json(json!({
            "message": "Only pending leave requests can be cancelled"
        })));
    }

    sqlx::query("UPDATE leaves SET status = 'cancelled' WHERE id = ?")
        .bind(leave_id)
        .execute(pool.get_ref())
        .await
        .map_err(|e| {
            error!(error = %e, leave_id, "Failed to cancel leave");
            actix_web::error::ErrorInternalServerError("Internal Server Error")
        })?;

    Ok(HttpResponse::Ok().json(json!({
        "message": "Leave request cancelled",
        "leave_id": leave_id
    })))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn annual_summary_converts_hours_to_days() {
        let summary = annual_summary(20.0, 2026);
        assert_eq!(summary.used_days, 2.5);
        assert_eq!(summary.remaining_days, 11.5);
        assert_eq!(summary.year, 2026);
    }

    #[test]
    fn annual_summary_rounds_to_two_decimals() {
        // 1 hour used => 0.125 days, rounded to 0.13
        let summary = annual_summary(1.0, 2026);
        assert_eq!(summary.used_days, 0.13);
        assert_eq!(summary.remaining_days, 13.88);
    }

    #[test]
    fn fresh_year_has_full_entitlement() {
        let summary = annual_summary(0.0, 2026);
        assert_eq!(summary.used_days, 0.0);
        assert_eq!(summary.remaining_days, ANNUAL_LEAVE_DAYS);
    }
}
