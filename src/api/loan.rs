use crate::auth::auth::AuthUser;
use crate::config::Config;
use crate::model::codes::{Department, Position};
use crate::model::loan::{
    LoanApplication, LoanPurpose, LoanReview, LoanStatus, ReviewDecision, after_supervisor_review,
};
use crate::utils::validate;
use actix_web::{HttpResponse, Responder, web};
use chrono::{Datelike, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use sqlx::MySqlPool;
use tracing::error;
use utoipa::{IntoParams, ToSchema};

const MIN_LOAN_AMOUNT: i64 = 10_000;
const ALLOWED_TERMS: [i32; 5] = [12, 24, 36, 48, 60];

#[derive(Deserialize, ToSchema)]
pub struct CustomerInfo {
    #[schema(example = "Chang Mei")]
    pub name: String,
    #[schema(example = "A123456789")]
    pub id_number: String,
    #[schema(example = "0912345678")]
    pub phone: String,
    #[schema(example = "chang.mei@mail.example")]
    pub email: String,
    #[schema(example = "No. 7, Sec. 2, Rd.")]
    pub address: String,
}

#[derive(Deserialize, ToSchema)]
pub struct LoanInfo {
    #[schema(example = "house")]
    pub purpose: LoanPurpose,
    #[schema(example = 6000000)]
    pub amount: i64,
    #[schema(example = 36)]
    pub term_months: i32,
    #[schema(example = 52000)]
    pub monthly_income: i64,
}

#[derive(Deserialize, ToSchema)]
pub struct CreateLoan {
    pub customer: CustomerInfo,
    pub loan: LoanInfo,
}

#[derive(Deserialize, IntoParams, ToSchema)]
pub struct LoanFilter {
    /// Filter by application status
    #[schema(example = "pending")]
    pub status: Option<String>,
    /// Only applications at or above this amount
    #[schema(example = 1000000)]
    pub min_amount: Option<i64>,
    /// Pagination page number (start with 1)
    #[schema(example = 1)]
    pub page: Option<u64>,
    /// Pagination per page number
    #[schema(example = 10)]
    pub per_page: Option<u64>,
}

#[derive(Deserialize, IntoParams, ToSchema)]
pub struct PageQuery {
    #[schema(example = 1)]
    pub page: Option<u64>,
    #[schema(example = 10)]
    pub per_page: Option<u64>,
}

#[derive(Deserialize, ToSchema)]
pub struct ReviewRequest {
    #[schema(example = "approved")]
    pub status: ReviewDecision,
    #[schema(example = "income verified", nullable = true)]
    pub comment: Option<String>,
}

#[derive(Serialize, sqlx::FromRow, ToSchema)]
pub struct LoanWithEmployee {
    #[serde(flatten)]
    #[sqlx(flatten)]
    pub application: LoanApplication,
    /// Name of the submitting employee, joined from the users table.
    #[schema(example = "Lin Wei", nullable = true)]
    pub employee_name: Option<String>,
}

#[derive(Serialize, ToSchema)]
pub struct LoanEntry {
    #[serde(flatten)]
    pub application: LoanWithEmployee,
    pub reviews: Vec<LoanReview>,
}

#[derive(Serialize, ToSchema)]
pub struct LoanListResponse {
    pub data: Vec<LoanEntry>,
    #[schema(example = 1)]
    pub page: u32,
    #[schema(example = 10)]
    pub per_page: u32,
    #[schema(example = 1)]
    pub total: i64,
}

#[derive(Serialize, Default, ToSchema)]
pub struct LoanStats {
    #[schema(example = 3)]
    pub pending_loans: i64,
    #[schema(example = 1)]
    pub processing_loans: i64,
    #[schema(example = 12)]
    pub completed_loans: i64,
    #[schema(example = 4)]
    pub rejected_loans: i64,
}

/// Next application number for a `L{yyyy}{mm}` prefix given the current
/// maximum. Sequence restarts every month; the suffix is zero-padded to
/// three digits and simply widens past 999.
fn next_application_no(prefix: &str, last: Option<&str>) -> String {
    let seq = last
        .and_then(|no| no.get(prefix.len()..))
        .and_then(|tail| tail.parse::<u32>().ok())
        .map(|n| n + 1)
        .unwrap_or(1);
    format!("{}{:03}", prefix, seq)
}

fn validate_loan(payload: &CreateLoan) -> Result<(), &'static str> {
    let customer = &payload.customer;
    if customer.name.trim().is_empty() || customer.address.trim().is_empty() {
        return Err("Customer name and address are required");
    }
    if !validate::is_valid_id_number(&customer.id_number) {
        return Err("Invalid national ID format");
    }
    if !validate::is_valid_phone(&customer.phone) {
        return Err("Invalid phone number format");
    }
    if !validate::is_valid_email(&customer.email) {
        return Err("Invalid email format");
    }

    let loan = &payload.loan;
    if loan.amount < MIN_LOAN_AMOUNT {
        return Err("Amount below the 10,000 minimum");
    }
    if !ALLOWED_TERMS.contains(&loan.term_months) {
        return Err("Term must be one of 12, 24, 36, 48, 60 months");
    }
    if loan.monthly_income < 0 {
        return Err("Monthly income cannot be negative");
    }
    Ok(())
}

/* =========================
Submit application (lending dept)
========================= */
#[utoipa::path(
    post,
    path = "/api/loan",
    request_body = CreateLoan,
    responses(
        (status = 201, description = "Application submitted", body = Object, example = json!({
            "message": "Loan application submitted",
            "application_no": "L202608001"
        })),
        (status = 400, description = "Validation failure"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Lending department only")
    ),
    security(("bearer_auth" = [])),
    tag = "Loan"
)]
pub async fn create_loan(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    payload: web::Json<CreateLoan>,
) -> actix_web::Result<impl Responder> {
    auth.require_department(Department::LD)?;

    if let Err(msg) = validate_loan(&payload) {
        return Ok(HttpResponse::BadRequest().json(json!({ "message": msg })));
    }

    // Monthly sequence. Read-then-increment, same as the paper process this
    // replaced; concurrent submissions are resolved by the unique index.
    let now = Utc::now();
    let prefix = format!("L{}{:02}", now.year(), now.month());

    let last = sqlx::query_scalar::<_, Option<String>>(
        "SELECT MAX(application_no) FROM loan_applications WHERE application_no LIKE ?",
    )
    .bind(format!("{}%", prefix))
    .fetch_one(pool.get_ref())
    .await
    .map_err(|e| {
        error!(error = %e, "Failed to read application number sequence");
        actix_web::error::ErrorInternalServerError("Internal Server Error")
    })?;

    let application_no = next_application_no(&prefix, last.as_deref());

    sqlx::query(
        r#"
        INSERT INTO loan_applications
            (application_no, account, department, customer_name, customer_id_number,
             customer_phone, customer_email, customer_address, purpose, amount,
             term_months, monthly_income, status)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, 'pending')
        "#,
    )
    .bind(&application_no)
    .bind(&auth.account)
    .bind(auth.department.as_str())
    .bind(&payload.customer.name)
    .bind(&payload.customer.id_number)
    .bind(&payload.customer.phone)
    .bind(&payload.customer.email)
    .bind(&payload.customer.address)
    .bind(payload.loan.purpose.as_str())
    .bind(payload.loan.amount)
    .bind(payload.loan.term_months)
    .bind(payload.loan.monthly_income)
    .execute(pool.get_ref())
    .await
    .map_err(|e| {
        error!(error = %e, account = %auth.account, "Failed to create loan application");
        actix_web::error::ErrorInternalServerError("Internal Server Error")
    })?;

    Ok(HttpResponse::Created().json(json!({
        "message": "Loan application submitted",
        "application_no": application_no
    })))
}

async fn fetch_entries(
    pool: &MySqlPool,
    where_sql: &str,
    binds: &[String],
    per_page: u64,
    offset: u64,
) -> Result<(i64, Vec<LoanEntry>), sqlx::Error> {
    let count_sql = format!(
        "SELECT COUNT(*) FROM loan_applications l{}",
        where_sql
    );
    let mut count_q = sqlx::query_scalar::<_, i64>(&count_sql);
    for b in binds {
        count_q = count_q.bind(b);
    }
    let total = count_q.fetch_one(pool).await?;

    let data_sql = format!(
        r#"
        SELECT l.id, l.application_no, l.account, l.department, l.customer_name,
               l.customer_id_number, l.customer_phone, l.customer_email,
               l.customer_address, l.purpose, l.amount, l.term_months,
               l.monthly_income, l.status, l.created_at,
               u.name AS employee_name
        FROM loan_applications l
        LEFT JOIN users u ON u.account = l.account
        {}
        ORDER BY l.created_at DESC
        LIMIT ? OFFSET ?
        "#,
        where_sql
    );

    let mut data_q = sqlx::query_as::<_, LoanWithEmployee>(&data_sql);
    for b in binds {
        data_q = data_q.bind(b);
    }
    let applications = data_q.bind(per_page).bind(offset).fetch_all(pool).await?;

    if applications.is_empty() {
        return Ok((total, Vec::new()));
    }

    let placeholders = vec!["?"; applications.len()].join(", ");
    let reviews_sql = format!(
        r#"
        SELECT loan_id, reviewer_account, reviewer_name, reviewer_position,
               status, comment, created_at
        FROM loan_reviews
        WHERE loan_id IN ({})
        ORDER BY created_at
        "#,
        placeholders
    );

    let mut reviews_q = sqlx::query_as::<_, LoanReview>(&reviews_sql);
    for app in &applications {
        reviews_q = reviews_q.bind(app.application.id);
    }
    let mut reviews = reviews_q.fetch_all(pool).await?;

    let mut entries = Vec::with_capacity(applications.len());
    for application in applications {
        let (mine, rest): (Vec<_>, Vec<_>) = reviews
            .into_iter()
            .partition(|r| r.loan_id == application.application.id);
        reviews = rest;
        entries.push(LoanEntry {
            application,
            reviews: mine,
        });
    }

    Ok((total, entries))
}

/* =========================
Application list (lending dept)
========================= */
// Clerks only see their own submissions.
#[utoipa::path(
    get,
    path = "/api/loan",
    params(LoanFilter),
    responses(
        (status = 200, description = "Paginated application list", body = LoanListResponse),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Lending department only")
    ),
    security(("bearer_auth" = [])),
    tag = "Loan"
)]
pub async fn loan_list(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    query: web::Query<LoanFilter>,
) -> actix_web::Result<impl Responder> {
    auth.require_department(Department::LD)?;

    let per_page = query.per_page.unwrap_or(10).min(100);
    let page = query.page.unwrap_or(1).max(1);
    let offset = (page - 1) * per_page;

    let mut where_sql = String::from(" WHERE 1=1");
    let mut binds: Vec<String> = Vec::new();

    if auth.position == Position::C {
        where_sql.push_str(" AND l.account = ?");
        binds.push(auth.account.clone());
    }

    if let Some(status) = query.status.as_deref() {
        where_sql.push_str(" AND l.status = ?");
        binds.push(status.to_string());
    }

    if let Some(min_amount) = query.min_amount {
        where_sql.push_str(" AND l.amount >= ?");
        binds.push(min_amount.to_string());
    }

    let (total, data) = fetch_entries(pool.get_ref(), &where_sql, &binds, per_page, offset)
        .await
        .map_err(|e| {
            error!(error = %e, "Failed to fetch loan applications");
            actix_web::error::ErrorInternalServerError("Internal Server Error")
        })?;

    Ok(HttpResponse::Ok().json(LoanListResponse {
        data,
        page: page as u32,
        per_page: per_page as u32,
        total,
    }))
}

struct ReviewContext {
    loan_id: u64,
    amount: i64,
    status: String,
}

async fn load_review_context(
    pool: &MySqlPool,
    loan_id: u64,
) -> actix_web::Result<Option<ReviewContext>> {
    let row = sqlx::query_as::<_, (i64, String)>(
        "SELECT amount, status FROM loan_applications WHERE id = ?",
    )
    .bind(loan_id)
    .fetch_optional(pool)
    .await
    .map_err(|e| {
        error!(error = %e, loan_id, "Failed to fetch loan application");
        actix_web::error::ErrorInternalServerError("Internal Server Error")
    })?;

    Ok(row.map(|(amount, status)| ReviewContext {
        loan_id,
        amount,
        status,
    }))
}

async fn has_already_reviewed(
    pool: &MySqlPool,
    loan_id: u64,
    reviewer: &str,
) -> actix_web::Result<bool> {
    sqlx::query_scalar::<_, bool>(
        "SELECT EXISTS(SELECT 1 FROM loan_reviews WHERE loan_id = ? AND reviewer_account = ?)",
    )
    .bind(loan_id)
    .bind(reviewer)
    .fetch_one(pool)
    .await
    .map_err(|e| {
        error!(error = %e, loan_id, "Failed to check review chain");
        actix_web::error::ErrorInternalServerError("Internal Server Error").into()
    })
}

async fn reviewer_name(pool: &MySqlPool, account: &str) -> actix_web::Result<String> {
    sqlx::query_scalar::<_, String>("SELECT name FROM users WHERE account = ?")
        .bind(account)
        .fetch_optional(pool)
        .await
        .map_err(|e| {
            error!(error = %e, account, "Failed to fetch reviewer");
            actix_web::error::ErrorInternalServerError("Internal Server Error")
        })?
        .ok_or_else(|| actix_web::error::ErrorNotFound("Reviewer account not found"))
}

async fn record_review(
    pool: &MySqlPool,
    ctx: &ReviewContext,
    auth: &AuthUser,
    name: &str,
    request: &ReviewRequest,
    new_status: LoanStatus,
) -> actix_web::Result<()> {
    sqlx::query(
        r#"
        INSERT INTO loan_reviews
            (loan_id, reviewer_account, reviewer_name, reviewer_position, status, comment)
        VALUES (?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(ctx.loan_id)
    .bind(&auth.account)
    .bind(name)
    .bind(auth.position.as_str())
    .bind(request.status.as_str())
    .bind(&request.comment)
    .execute(pool)
    .await
    .map_err(|e| {
        error!(error = %e, loan_id = ctx.loan_id, "Failed to record review");
        actix_web::error::ErrorInternalServerError("Internal Server Error")
    })?;

    sqlx::query("UPDATE loan_applications SET status = ? WHERE id = ?")
        .bind(new_status.as_str())
        .bind(ctx.loan_id)
        .execute(pool)
        .await
        .map_err(|e| {
            error!(error = %e, loan_id = ctx.loan_id, "Failed to update loan status");
            actix_web::error::ErrorInternalServerError("Internal Server Error")
        })?;

    Ok(())
}

/* =========================
Supervisor review
========================= */
#[utoipa::path(
    post,
    path = "/api/loan/{id}/supervisor-review",
    params(("id" = u64, Path, description = "Loan application ID")),
    request_body = ReviewRequest,
    responses(
        (status = 200, description = "Review recorded"),
        (status = 400, description = "Wrong state or duplicate reviewer"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Lending supervisors only"),
        (status = 404, description = "Application not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Loan"
)]
pub async fn supervisor_review(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    config: web::Data<Config>,
    path: web::Path<u64>,
    payload: web::Json<ReviewRequest>,
) -> actix_web::Result<impl Responder> {
    auth.require_department(Department::LD)?;
    auth.require_supervisor()?;

    let loan_id = path.into_inner();

    let ctx = match load_review_context(pool.get_ref(), loan_id).await? {
        Some(ctx) => ctx,
        None => {
            return Ok(HttpResponse::NotFound().json(json!({
                "message": "Loan application not found"
            })));
        }
    };

    if ctx.status != LoanStatus::Pending.as_str() {
        return Ok(HttpResponse::BadRequest().json(json!({
            "message": "Application already reviewed"
        })));
    }

    if has_already_reviewed(pool.get_ref(), loan_id, &auth.account).await? {
        return Ok(HttpResponse::BadRequest().json(json!({
            "message": "You have already reviewed this application"
        })));
    }

    let name = reviewer_name(pool.get_ref(), &auth.account).await?;

    let new_status =
        after_supervisor_review(payload.status, ctx.amount, config.manager_review_threshold);

    record_review(pool.get_ref(), &ctx, &auth, &name, &payload, new_status).await?;

    Ok(HttpResponse::Ok().json(json!({
        "message": "Review recorded",
        "loan_id": loan_id,
        "status": new_status.as_str()
    })))
}

/* =========================
Manager review (final)
========================= */
#[utoipa::path(
    post,
    path = "/api/loan/{id}/manager-review",
    params(("id" = u64, Path, description = "Loan application ID")),
    request_body = ReviewRequest,
    responses(
        (status = 200, description = "Final review recorded"),
        (status = 400, description = "Wrong state, below threshold or duplicate reviewer"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Lending managers only"),
        (status = 404, description = "Application not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Loan"
)]
pub async fn manager_review(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    config: web::Data<Config>,
    path: web::Path<u64>,
    payload: web::Json<ReviewRequest>,
) -> actix_web::Result<impl Responder> {
    auth.require_department(Department::LD)?;
    auth.require_manager()?;

    let loan_id = path.into_inner();

    let ctx = match load_review_context(pool.get_ref(), loan_id).await? {
        Some(ctx) => ctx,
        None => {
            return Ok(HttpResponse::NotFound().json(json!({
                "message": "Loan application not found"
            })));
        }
    };

    if ctx.status != LoanStatus::Processing.as_str() {
        return Ok(HttpResponse::BadRequest().json(json!({
            "message": "Application is not awaiting manager review"
        })));
    }

    if ctx.amount < config.manager_review_threshold {
        return Ok(HttpResponse::BadRequest().json(json!({
            "message": "Amount below the manager review threshold"
        })));
    }

    if has_already_reviewed(pool.get_ref(), loan_id, &auth.account).await? {
        return Ok(HttpResponse::BadRequest().json(json!({
            "message": "You have already reviewed this application"
        })));
    }

    let name = reviewer_name(pool.get_ref(), &auth.account).await?;

    // manager review is final
    let new_status = match payload.status {
        ReviewDecision::Approved => LoanStatus::Approved,
        ReviewDecision::Rejected => LoanStatus::Rejected,
    };

    record_review(pool.get_ref(), &ctx, &auth, &name, &payload, new_status).await?;

    Ok(HttpResponse::Ok().json(json!({
        "message": "Review recorded",
        "loan_id": loan_id,
        "status": new_status.as_str()
    })))
}

/* =========================
Review history (S/M)
========================= */
#[utoipa::path(
    get,
    path = "/api/loan/review-history",
    params(PageQuery),
    responses(
        (status = 200, description = "Applications with at least one review", body = LoanListResponse),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Lending supervisors/managers only")
    ),
    security(("bearer_auth" = [])),
    tag = "Loan"
)]
pub async fn review_history(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    query: web::Query<PageQuery>,
) -> actix_web::Result<impl Responder> {
    auth.require_department(Department::LD)?;
    auth.require_reviewer()?;

    let per_page = query.per_page.unwrap_or(10).min(100);
    let page = query.page.unwrap_or(1).max(1);
    let offset = (page - 1) * per_page;

    let where_sql = " WHERE EXISTS(SELECT 1 FROM loan_reviews r WHERE r.loan_id = l.id)";

    let (total, data) = fetch_entries(pool.get_ref(), where_sql, &[], per_page, offset)
        .await
        .map_err(|e| {
            error!(error = %e, "Failed to fetch review history");
            actix_web::error::ErrorInternalServerError("Internal Server Error")
        })?;

    Ok(HttpResponse::Ok().json(LoanListResponse {
        data,
        page: page as u32,
        per_page: per_page as u32,
        total,
    }))
}

/* =========================
Status counters
========================= */
#[utoipa::path(
    get,
    path = "/api/loan/stats",
    responses(
        (status = 200, description = "Application counts by status", body = LoanStats),
        (status = 401, description = "Unauthorized")
    ),
    security(("bearer_auth" = [])),
    tag = "Loan"
)]
pub async fn loan_stats(
    _auth: AuthUser,
    pool: web::Data<MySqlPool>,
) -> actix_web::Result<impl Responder> {
    let rows = sqlx::query_as::<_, (String, i64)>(
        "SELECT status, COUNT(*) FROM loan_applications GROUP BY status",
    )
    .fetch_all(pool.get_ref())
    .await
    .map_err(|e| {
        error!(error = %e, "Failed to compute loan stats");
        actix_web::error::ErrorInternalServerError("Internal Server Error")
    })?;

    let mut stats = LoanStats::default();
    for (status, count) in rows {
        match status.as_str() {
            "pending" => stats.pending_loans = count,
            "processing" => stats.processing_loans = count,
            "approved" => stats.completed_loans = count,
            "rejected" => stats.rejected_loans = count,
            _ => {}
        }
    }

    Ok(HttpResponse::Ok().json(stats))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn valid_payload() -> CreateLoan {
        CreateLoan {
            customer: CustomerInfo {
                name: "Chang Mei".into(),
                id_number: "A123456789".into(),
                phone: "0912345678".into(),
                email: "chang.mei@mail.example".into(),
                address: "No. 7, Sec. 2, Rd.".into(),
            },
            loan: LoanInfo {
                purpose: LoanPurpose::House,
                amount: 6_000_000,
                term_months: 36,
                monthly_income: 52_000,
            },
        }
    }

    #[test]
    fn sequence_starts_at_one_for_a_fresh_month() {
        assert_eq!(next_application_no("L202608", None), "L202608001");
    }

    #[test]
    fn sequence_increments_from_the_current_maximum() {
        assert_eq!(
            next_application_no("L202608", Some("L202608007")),
            "L202608008"
        );
        assert_eq!(
            next_application_no("L202612", Some("L202612099")),
            "L202612100"
        );
    }

    #[test]
    fn sequence_widens_past_the_thousandth_application() {
        // busy months keep working, the suffix just grows a digit
        assert_eq!(
            next_application_no("L202608", Some("L202608999")),
            "L2026081000"
        );
        assert_eq!(
            next_application_no("L202608", Some("L2026081000")),
            "L2026081001"
        );
    }

    #[test]
    fn malformed_maximum_falls_back_to_one() {
        assert_eq!(next_application_no("L202608", Some("junk")), "L202608001");
    }

    #[test]
    fn valid_payload_passes() {
        assert!(validate_loan(&valid_payload()).is_ok());
    }

    #[rstest]
    #[case(9_999, false)]
    #[case(10_000, true)]
    #[case(10_001, true)]
    fn amount_minimum(#[case] amount: i64, #[case] ok: bool) {
        let mut payload = valid_payload();
        payload.loan.amount = amount;
        assert_eq!(validate_loan(&payload).is_ok(), ok);
    }

    #[rstest]
    #[case(12, true)]
    #[case(60, true)]
    #[case(18, false)]
    #[case(0, false)]
    fn term_must_be_in_catalogue(#[case] term: i32, #[case] ok: bool) {
        let mut payload = valid_payload();
        payload.loan.term_months = term;
        assert_eq!(validate_loan(&payload).is_ok(), ok);
    }

    #[test]
    fn bad_customer_fields_are_rejected() {
        let mut payload = valid_payload();
        payload.customer.id_number = "X999".into();
        assert!(validate_loan(&payload).is_err());

        let mut payload = valid_payload();
        payload.customer.phone = "12345".into();
        assert!(validate_loan(&payload).is_err());

        let mut payload = valid_payload();
        payload.customer.email = "not-an-email".into();
        assert!(validate_loan(&payload).is_err());

        let mut payload = valid_payload();
        payload.loan.monthly_income = -1;
        assert!(validate_loan(&payload).is_err());
    }
}
