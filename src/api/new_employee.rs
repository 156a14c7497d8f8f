use crate::auth::auth::AuthUser;
use crate::model::loan::ReviewDecision;
use crate::model::new_employee::NewEmployee;
use crate::utils::validate;
use actix_web::{HttpResponse, Responder, web};
use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use sqlx::MySqlPool;
use tracing::error;
use utoipa::{IntoParams, ToSchema};

#[derive(Deserialize, ToSchema)]
pub struct NewEmployeeDraft {
    #[schema(example = "Wu Kai")]
    pub name: String,
    #[schema(example = "wu.kai@gmail.com")]
    pub email: String,
    #[schema(example = "2026-10-01", value_type = String, format = "date")]
    pub start_date: NaiveDate,
    #[schema(example = "transfer from branch office", nullable = true)]
    pub notes: Option<String>,
}

#[derive(Deserialize, ToSchema)]
pub struct SubmitNewEmployees {
    pub employees: Vec<NewEmployeeDraft>,
}

#[derive(Deserialize, IntoParams, ToSchema)]
pub struct NewEmployeeFilter {
    /// Filter by onboarding status
    #[schema(example = "pending")]
    pub status: Option<String>,
    /// Pagination page number (start with 1)
    #[schema(example = 1)]
    pub page: Option<u64>,
    /// Pagination per page number
    #[schema(example = 10)]
    pub per_page: Option<u64>,
}

#[derive(Serialize, sqlx::FromRow, ToSchema)]
pub struct NewEmployeeWithSubmitter {
    #[serde(flatten)]
    #[sqlx(flatten)]
    pub record: NewEmployee,
    /// Name of the submitting supervisor, joined from the users table.
    #[schema(example = "Lin Wei", nullable = true)]
    pub submitter_name: Option<String>,
}

#[derive(Serialize, ToSchema)]
pub struct NewEmployeeListResponse {
    pub data: Vec<NewEmployeeWithSubmitter>,
    #[schema(example = 1)]
    pub page: u32,
    #[schema(example = 10)]
    pub per_page: u32,
    #[schema(example = 1)]
    pub total: i64,
}

#[derive(Deserialize, ToSchema)]
pub struct ApproveNewEmployee {
    #[schema(example = "approved")]
    pub status: ReviewDecision,
    #[schema(example = "headcount confirmed")]
    pub comment: String,
}

fn validate_draft(draft: &NewEmployeeDraft, today: NaiveDate) -> Result<(), String> {
    let len = draft.name.trim().chars().count();
    if !(2..=20).contains(&len) {
        return Err(format!("Name must be 2-20 characters: {}", draft.name));
    }
    if !validate::is_valid_onboarding_email(&draft.email) {
        return Err(format!("Invalid onboarding email: {}", draft.email));
    }
    if draft.start_date < today {
        return Err(format!("Start date cannot be in the past: {}", draft.start_date));
    }
    if let Some(notes) = &draft.notes {
        if notes.chars().count() > 200 {
            return Err("Notes cannot exceed 200 characters".to_string());
        }
    }
    Ok(())
}

/* =========================
Submit batch (supervisor)
========================= */
#[utoipa::path(
    post,
    path = "/api/new-employees/submit",
    request_body = SubmitNewEmployees,
    responses(
        (status = 201, description = "Batch accepted", body = Object, example = json!({
            "message": "Submitted 2 new employee records"
        })),
        (status = 400, description = "Validation failure"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Supervisor only")
    ),
    security(("bearer_auth" = [])),
    tag = "NewEmployees"
)]
pub async fn submit(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    payload: web::Json<SubmitNewEmployees>,
) -> actix_web::Result<impl Responder> {
    auth.require_supervisor()?;

    if payload.employees.is_empty() {
        return Ok(HttpResponse::BadRequest().json(json!({
            "message": "At least one employee record is required"
        })));
    }

    let today = Utc::now().date_naive();
    for draft in &payload.employees {
        if let Err(msg) = validate_draft(draft, today) {
            return Ok(HttpResponse::BadRequest().json(json!({ "message": msg })));
        }
    }

    // New hires always start as clerks in the submitter's department.
    for draft in &payload.employees {
        sqlx::query(
            r#"
            INSERT INTO new_employees
                (name, email, department, position, start_date, notes, status, submitted_by)
            VALUES (?, ?, ?, 'C', ?, ?, 'pending', ?)
            "#,
        )
        .bind(draft.name.trim())
        .bind(draft.email.to_lowercase())
        .bind(auth.department.as_str())
        .bind(draft.start_date)
        .bind(&draft.notes)
        .bind(&auth.account)
        .execute(pool.get_ref())
        .await
        .map_err(|e| {
            error!(error = %e, submitter = %auth.account, "Failed to insert new employee");
            actix_web::error::ErrorInternalServerError("Internal Server Error")
        })?;
    }

    Ok(HttpResponse::Created().json(json!({
        "message": format!("Submitted {} new employee records", payload.employees.len())
    })))
}

async fn fetch_page(
    pool: &MySqlPool,
    where_sql: &str,
    binds: &[String],
    per_page: u64,
    offset: u64,
) -> Result<(i64, Vec<NewEmployeeWithSubmitter>), sqlx::Error> {
    let count_sql = format!("SELECT COUNT(*) FROM new_employees n{}", where_sql);
    let mut count_q = sqlx::query_scalar::<_, i64>(&count_sql);
    for b in binds {
        count_q = count_q.bind(b);
    }
    let total = count_q.fetch_one(pool).await?;

    let data_sql = format!(
        r#"
        SELECT n.id, n.name, n.email, n.department, n.position, n.start_date,
               n.notes, n.status, n.submitted_by, n.created_at, n.updated_at,
               u.name AS submitter_name
        FROM new_employees n
        LEFT JOIN users u ON u.account = n.submitted_by
        {}
        ORDER BY n.created_at DESC
        LIMIT ? OFFSET ?
        "#,
        where_sql
    );

    let mut data_q = sqlx::query_as::<_, NewEmployeeWithSubmitter>(&data_sql);
    for b in binds {
        data_q = data_q.bind(b);
    }
    let records = data_q.bind(per_page).bind(offset).fetch_all(pool).await?;

    Ok((total, records))
}

/* =========================
List (supervisor, own department)
========================= */
#[utoipa::path(
    get,
    path = "/api/new-employees",
    params(NewEmployeeFilter),
    responses(
        (status = 200, description = "Paginated onboarding list", body = NewEmployeeListResponse),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Supervisor only")
    ),
    security(("bearer_auth" = [])),
    tag = "NewEmployees"
)]
pub async fn list(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    query: web::Query<NewEmployeeFilter>,
) -> actix_web::Result<impl Responder> {
    auth.require_supervisor()?;

    let per_page = query.per_page.unwrap_or(10).min(100);
    let page = query.page.unwrap_or(1).max(1);
    let offset = (page - 1) * per_page;

    let mut where_sql = String::from(" WHERE n.department = ?");
    let mut binds = vec![auth.department.as_str().to_string()];

    if let Some(status) = query.status.as_deref() {
        where_sql.push_str(" AND n.status = ?");
        binds.push(status.to_string());
    }

    let (total, data) = fetch_page(pool.get_ref(), &where_sql, &binds, per_page, offset)
        .await
        .map_err(|e| {
            error!(error = %e, "Failed to fetch new employee list");
            actix_web::error::ErrorInternalServerError("Internal Server Error")
        })?;

    Ok(HttpResponse::Ok().json(NewEmployeeListResponse {
        data,
        page: page as u32,
        per_page: per_page as u32,
        total,
    }))
}

/* =========================
Pending queue (manager)
========================= */
#[utoipa::path(
    get,
    path = "/api/new-employees/pending",
    params(NewEmployeeFilter),
    responses(
        (status = 200, description = "Pending onboarding requests for the manager's department", body = NewEmployeeListResponse),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Manager only")
    ),
    security(("bearer_auth" = [])),
    tag = "NewEmployees"
)]
pub async fn pending(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    query: web::Query<NewEmployeeFilter>,
) -> actix_web::Result<impl Responder> {
    auth.require_manager()?;

    let per_page = query.per_page.unwrap_or(10).min(100);
    let page = query.page.unwrap_or(1).max(1);
    let offset = (page - 1) * per_page;

    let where_sql = " WHERE n.department = ? AND n.status = 'pending'";
    let binds = vec![auth.department.as_str().to_string()];

    let (total, data) = fetch_page(pool.get_ref(), where_sql, &binds, per_page, offset)
        .await
        .map_err(|e| {
            error!(error = %e, "Failed to fetch pending new employees");
            actix_web::error::ErrorInternalServerError("Internal Server Error")
        })?;

    Ok(HttpResponse::Ok().json(NewEmployeeListResponse {
        data,
        page: page as u32,
        per_page: per_page as u32,
        total,
    }))
}

/* =========================
Approve / reject (manager)
========================= */
#[utoipa::path(
    post,
    path = "/api/new-employees/{id}/approve",
    params(("id" = u64, Path, description = "Onboarding record ID")),
    request_body = ApproveNewEmployee,
    responses(
        (status = 200, description = "Decision recorded"),
        (status = 400, description = "Already processed or missing comment"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Manager of the same department only"),
        (status = 404, description = "Record not found")
    ),
    security(("bearer_auth" = [])),
    tag = "NewEmployees"
)]
pub async fn approve(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
    payload: web::Json<ApproveNewEmployee>,
) -> actix_web::Result<impl Responder> {
    auth.require_manager()?;

    if payload.comment.trim().is_empty() {
        return Ok(HttpResponse::BadRequest().json(json!({
            "message": "Comment is required"
        })));
    }

    let id = path.into_inner();

    let record = sqlx::query_as::<_, (String, String)>(
        "SELECT department, status FROM new_employees WHERE id = ?",
    )
    .bind(id)
    .fetch_optional(pool.get_ref())
    .await
    .map_err(|e| {
        error!(error = %e, id, "Failed to fetch new employee record");
        actix_web::error::ErrorInternalServerError("Internal Server Error")
    })?;

    let (department, status) = match record {
        Some(row) => row,
        None => {
            return Ok(HttpResponse::NotFound().json(json!({
                "message": "New employee record not found"
            })));
        }
    };

    if department != auth.department.as_str() {
        return Ok(HttpResponse::Forbidden().json(json!({
            "message": "Cannot review another department's onboarding request"
        })));
    }

    if status != "pending" {
        return Ok(HttpResponse::BadRequest().json(json!({
            "message": "Request already processed"
        })));
    }

    sqlx::query("UPDATE new_employees SET status = ?, updated_at = NOW() WHERE id = ?")
        .bind(payload.status.as_str())
        .bind(id)
        .execute(pool.get_ref())
        .await
        .map_err(|e| {
            error!(error = %e, id, "Failed to update onboarding status");
            actix_web::error::ErrorInternalServerError("Internal Server Error")
        })?;

    sqlx::query(
        r#"
        INSERT INTO new_employee_approvals (new_employee_id, approver_account, status, comment)
        VALUES (?, ?, ?, ?)
        "#,
    )
    .bind(id)
    .bind(&auth.account)
    .bind(payload.status.as_str())
    .bind(&payload.comment)
    .execute(pool.get_ref())
    .await
    .map_err(|e| {
        error!(error = %e, id, "Failed to record onboarding approval");
        actix_web::error::ErrorInternalServerError("Internal Server Error")
    })?;

    Ok(HttpResponse::Ok().json(json!({
        "message": format!("New employee request {}", payload.status.as_str()),
        "id": id
    })))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn draft(name: &str, email: &str, start: NaiveDate) -> NewEmployeeDraft {
        NewEmployeeDraft {
            name: name.to_string(),
            email: email.to_string(),
            start_date: start,
            notes: None,
        }
    }

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 8, 30).unwrap()
    }

    #[test]
    fn valid_draft_passes() {
        let d = draft("Wu Kai", "wu.kai@gmail.com", today());
        assert!(validate_draft(&d, today()).is_ok());
    }

    #[rstest]
    #[case("W", false)] // too short
    #[case("Wu", true)]
    #[case("WuKaiWuKaiWuKaiWuKai", true)] // exactly 20
    #[case("WuKaiWuKaiWuKaiWuKaiX", false)] // 21
    fn name_length_bounds(#[case] name: &str, #[case] ok: bool) {
        let d = draft(name, "wu.kai@gmail.com", today());
        assert_eq!(validate_draft(&d, today()).is_ok(), ok);
    }

    #[test]
    fn start_date_must_not_be_in_the_past() {
        let yesterday = today().pred_opt().unwrap();
        let d = draft("Wu Kai", "wu.kai@gmail.com", yesterday);
        assert!(validate_draft(&d, today()).is_err());

        let tomorrow = today().succ_opt().unwrap();
        let d = draft("Wu Kai", "wu.kai@gmail.com", tomorrow);
        assert!(validate_draft(&d, today()).is_ok());
    }

    #[test]
    fn bad_email_is_rejected() {
        let d = draft("Wu Kai", "wu kai@gmail.com", today());
        assert!(validate_draft(&d, today()).is_err());
    }

    #[test]
    fn overlong_notes_are_rejected() {
        let mut d = draft("Wu Kai", "wu.kai@gmail.com", today());
        d.notes = Some("x".repeat(201));
        assert!(validate_draft(&d, today()).is_err());

        d.notes = Some("x".repeat(200));
        assert!(validate_draft(&d, today()).is_ok());
    }
}
