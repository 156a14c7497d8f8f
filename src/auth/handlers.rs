use crate::{
    auth::{
        jwt::{generate_access_token, generate_refresh_token, verify_token},
        password::{hash_password, verify_password},
    },
    config::Config,
    model::codes::{Department, Position},
    models::{LoginReqDto, RegisterReq, TokenType, UserSql},
};
use actix_web::{HttpRequest, HttpResponse, Responder, web};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use sqlx::MySqlPool;
use std::str::FromStr;
use tracing::{debug, error, info, instrument};

use crate::utils::account_cache;
use crate::utils::account_filter;

/// Checks the required fields and returns the normalized account name.
fn validate_registration(req: &RegisterReq) -> Result<&str, &'static str> {
    let account = req.account.trim();
    if req.name.trim().is_empty() || account.is_empty() || req.password.is_empty() {
        return Err("name, account and password must not be empty");
    }
    Ok(account)
}

/// Inserts a new user and keeps the Cuckoo filter/cache in sync
async fn insert_user(req: &RegisterReq, account: &str, pool: &MySqlPool) -> Result<(), HttpResponse> {
    let hashed = hash_password(&req.password);

    let result = sqlx::query(
        r#"
        INSERT INTO users (name, account, password, department, position, email, extension)
        VALUES (?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&req.name)
    .bind(account)
    .bind(&hashed)
    .bind(req.department.as_str())
    .bind(req.position.as_str())
    .bind(&req.email)
    .bind(&req.extension)
    .execute(pool)
    .await;

    match result {
        Ok(_) => {
            // keep the availability structures warm for the next registration
            account_filter::insert(account);
            account_cache::mark_taken(account).await;
            Ok(())
        }
        Err(e) => {
            if let sqlx::Error::Database(db_err) = &e {
                if db_err.code() == Some("23000".into()) {
                    return Err(HttpResponse::Conflict().json(json!({
                        "message": "Account already exists"
                    })));
                }
            }

            error!(error = %e, "Failed to register user");
            Err(HttpResponse::InternalServerError().json(json!({
                "message": "Failed to register user"
            })))
        }
    }
}

/// true  => account AVAILABLE
/// false => account TAKEN
pub async fn is_account_available(account: &str, pool: &MySqlPool) -> bool {
    let account = account.to_lowercase();

    // 1. Cuckoo filter, fast negative
    if !account_filter::might_exist(&account) {
        return true;
    }

    // 2. Moka cache, fast positive
    if account_cache::is_taken(&account).await {
        return false;
    }

    // 3. Database fallback
    let exists = sqlx::query_scalar::<_, bool>(
        "SELECT EXISTS(SELECT 1 FROM users WHERE account = ? LIMIT 1)",
    )
    .bind(&account)
    .fetch_one(pool)
    .await
    .unwrap_or(true); // fail-safe

    !exists
}

/// User registration handler
#[utoipa::path(
    post,
    path = "/auth/register",
    request_body = RegisterReq,
    responses(
        (status = 201, description = "User registered successfully"),
        (status = 400, description = "Missing or invalid fields"),
        (status = 409, description = "Account already taken")
    ),
    tag = "Auth"
)]
pub async fn register(user: web::Json<RegisterReq>, pool: web::Data<MySqlPool>) -> impl Responder {
    let account = match validate_registration(&user) {
        Ok(account) => account,
        Err(msg) => {
            return HttpResponse::BadRequest().json(json!({ "message": msg }));
        }
    };

    if !is_account_available(account, pool.get_ref()).await {
        return HttpResponse::Conflict().json(json!({
            "message": "Account already taken"
        }));
    }

    // Safe to insert after DB check
    match insert_user(&user, account, pool.get_ref()).await {
        Ok(_) => HttpResponse::Created().json(json!({
            "message": "User registered successfully"
        })),
        Err(err_resp) => err_resp,
    }
}

#[derive(Serialize, Deserialize)]
struct LoginResponse {
    access_token: String,
    refresh_token: String,
}

/// Returns the lock expiry if the account is currently locked out.
async fn lockout_expiry(account: &str, pool: &MySqlPool) -> Result<Option<DateTime<Utc>>, sqlx::Error> {
    let locked_until = sqlx::query_scalar::<_, Option<DateTime<Utc>>>(
        "SELECT locked_until FROM login_attempts WHERE account = ?",
    )
    .bind(account)
    .fetch_optional(pool)
    .await?;

    Ok(locked_until
        .flatten()
        .filter(|until| *until > Utc::now()))
}

/// The lockout threshold decision, kept separate from the counter SQL.
fn lockout_reached(failed_count: u32, max_failures: u32) -> bool {
    failed_count >= max_failures
}

/// Bump the failure counter, locking the account once the threshold is hit.
async fn record_login_failure(account: &str, config: &Config, pool: &MySqlPool) {
    let bump = sqlx::query(
        r#"
        INSERT INTO login_attempts (account, failed_count)
        VALUES (?, 1)
        ON DUPLICATE KEY UPDATE failed_count = failed_count + 1
        "#,
    )
    .bind(account)
    .execute(pool)
    .await;

    if let Err(e) = bump {
        error!(error = %e, account, "Failed to record login failure");
        return;
    }

    let failed: u32 = sqlx::query_scalar(
        "SELECT failed_count FROM login_attempts WHERE account = ?",
    )
    .bind(account)
    .fetch_one(pool)
    .await
    .unwrap_or(0);

    if lockout_reached(failed, config.lockout_max_failures) {
        if let Err(e) = sqlx::query(
            "UPDATE login_attempts SET locked_until = DATE_ADD(NOW(), INTERVAL ? SECOND) WHERE account = ?",
        )
        .bind(config.lockout_secs as i64)
        .bind(account)
        .execute(pool)
        .await
        {
            error!(error = %e, account, "Failed to set account lock");
        } else {
            info!(account, failed, "Account locked after repeated failures");
        }
    }
}

#[utoipa::path(
    post,
    path = "/auth/login",
    request_body = LoginReqDto,
    responses(
        (status = 200, description = "Access and refresh token pair"),
        (status = 401, description = "Invalid credentials"),
        (status = 403, description = "Account temporarily locked")
    ),
    tag = "Auth"
)]
#[instrument(
    name = "auth_login",
    skip(pool, config, user),
    fields(account = %user.account)
)]
pub async fn login(
    user: web::Json<LoginReqDto>,
    pool: web::Data<MySqlPool>,
    config: web::Data<Config>,
) -> impl Responder {
    info!("Login request received");

    // 1. Basic validation
    if user.account.trim().is_empty() || user.password.is_empty() {
        info!("Validation failed: empty account or password");
        return HttpResponse::BadRequest().json(json!({
            "message": "account and password required"
        }));
    }

    // 2. Lockout gate before anything else
    match lockout_expiry(&user.account, pool.get_ref()).await {
        Ok(Some(until)) => {
            info!(%until, "Login rejected: account locked");
            return HttpResponse::Forbidden().json(json!({
                "message": "Account temporarily locked, try again later"
            }));
        }
        Ok(None) => {}
        Err(e) => {
            error!(error = %e, "Database error while checking lockout");
            return HttpResponse::InternalServerError().finish();
        }
    }

    debug!("Fetching user from database");

    // 3. Fetch user
    let db_user = match sqlx::query_as::<_, UserSql>(
        r#"
        SELECT id, account, password, department, position
        FROM users
        WHERE account = ?
        "#,
    )
    .bind(&user.account)
    .fetch_optional(pool.get_ref())
    .await
    {
        Ok(Some(user)) => {
            debug!(user_id = user.id, "User found");
            user
        }
        Ok(None) => {
            info!("Invalid credentials: user not found");
            record_login_failure(&user.account, &config, pool.get_ref()).await;
            return HttpResponse::Unauthorized().json(json!({
                "message": "Invalid credentials"
            }));
        }
        Err(e) => {
            error!(error = %e, "Database error while fetching user");
            return HttpResponse::InternalServerError().finish();
        }
    };

    // 4. Verify password
    debug!("Verifying password");

    if let Err(e) = verify_password(&user.password, &db_user.password) {
        info!(error = %e, "Invalid credentials: password mismatch");
        record_login_failure(&user.account, &config, pool.get_ref()).await;
        return HttpResponse::Unauthorized().json(json!({
            "message": "Invalid credentials"
        }));
    }

    debug!("Password verified");

    let (department, position) = match (
        Department::from_str(&db_user.department),
        Position::from_str(&db_user.position),
    ) {
        (Ok(d), Ok(p)) => (d, p),
        _ => {
            error!(
                department = %db_user.department,
                position = %db_user.position,
                "Stored department/position code is invalid"
            );
            return HttpResponse::InternalServerError().finish();
        }
    };

    // 5. Successful login clears the failure counter
    if let Err(e) = sqlx::query("DELETE FROM login_attempts WHERE account = ?")
        .bind(&user.account)
        .execute(pool.get_ref())
        .await
    {
        error!(error = %e, "Failed to clear login attempts");
        // intentionally not failing login
    }

    // 6. Generate tokens
    debug!("Generating access token");

    let access_token = generate_access_token(
        db_user.id,
        db_user.account.clone(),
        department,
        position,
        &config.jwt_secret,
        config.access_token_ttl,
    );

    debug!("Generating refresh token");

    let (refresh_token, refresh_claims) = generate_refresh_token(
        db_user.id,
        db_user.account.clone(),
        department,
        position,
        &config.jwt_secret,
        config.refresh_token_ttl,
    );

    // 7. Store refresh token
    debug!(
        user_id = db_user.id,
        jti = %refresh_claims.jti,
        "Storing refresh token"
    );

    if let Err(e) = sqlx::query(
        r#"
        INSERT INTO refresh_tokens (user_id, jti, expires_at)
        VALUES (?, ?, FROM_UNIXTIME(?))
        "#,
    )
    .bind(db_user.id)
    .bind(&refresh_claims.jti)
    .bind(refresh_claims.exp as i64)
    .execute(pool.get_ref())
    .await
    {
        error!(error = %e, "Failed to store refresh token");
        return HttpResponse::InternalServerError().finish();
    }

    // 8. Update last_login_at (non-fatal)
    debug!("Updating last_login_at");

    if let Err(e) = sqlx::query("UPDATE users SET last_login_at = NOW() WHERE account = ?")
        .bind(&user.account)
        .execute(pool.get_ref())
        .await
    {
        error!(error = %e, "Failed to update last_login_at");
        // intentionally not failing login
    }

    info!("Login successful");

    HttpResponse::Ok().json(LoginResponse {
        access_token,
        refresh_token,
    })
}

#[derive(sqlx::FromRow)]
struct RefreshTokenRow {
    id: u64,
    user_id: u64,
    revoked: i8,
}

#[utoipa::path(
    post,
    path = "/auth/refresh",
    responses(
        (status = 200, description = "Rotated token pair"),
        (status = 401, description = "Invalid, expired or revoked refresh token")
    ),
    security(("bearer_auth" = [])),
    tag = "Auth"
)]
pub async fn refresh_token(
    req: HttpRequest,
    pool: web::Data<MySqlPool>,
    config: web::Data<Config>,
) -> impl Responder {
    let header = match req.headers().get("Authorization") {
        Some(h) => h.to_str().unwrap_or(""),
        None => return HttpResponse::Unauthorized().body("No token"),
    };

    let token = match header.strip_prefix("Bearer ") {
        Some(t) => t,
        None => return HttpResponse::Unauthorized().body("Invalid token"),
    };

    let claims = match verify_token(token, &config.jwt_secret) {
        Ok(c) => c,
        Err(_) => return HttpResponse::Unauthorized().finish(),
    };

    if claims.token_type != TokenType::Refresh {
        return HttpResponse::Unauthorized().finish();
    }

    // find refresh token in DB
    let record = match sqlx::query_as::<_, RefreshTokenRow>(
        r#"
        SELECT id, user_id, revoked
        FROM refresh_tokens
        WHERE jti = ?
        "#,
    )
    .bind(&claims.jti)
    .fetch_optional(pool.get_ref())
    .await
    {
        Ok(r) => r,
        Err(e) => {
            error!(error = %e, "Failed to look up refresh token");
            return HttpResponse::InternalServerError().finish();
        }
    };

    let record = match record {
        Some(r) if r.revoked == 0 => r,
        _ => return HttpResponse::Unauthorized().finish(),
    };

    // revoke old refresh token
    if let Err(e) = sqlx::query("UPDATE refresh_tokens SET revoked = TRUE WHERE id = ?")
        .bind(record.id)
        .execute(pool.get_ref())
        .await
    {
        error!(error = %e, "Failed to revoke refresh token");
        return HttpResponse::InternalServerError().finish();
    }

    // issue new refresh token
    let (new_refresh_token, new_claims) = generate_refresh_token(
        claims.user_id,
        claims.sub.clone(),
        claims.department,
        claims.position,
        &config.jwt_secret,
        config.refresh_token_ttl,
    );

    if let Err(e) = sqlx::query(
        r#"
        INSERT INTO refresh_tokens (user_id, jti, expires_at)
        VALUES (?, ?, FROM_UNIXTIME(?))
        "#,
    )
    .bind(record.user_id)
    .bind(&new_claims.jti)
    .bind(new_claims.exp as i64)
    .execute(pool.get_ref())
    .await
    {
        error!(error = %e, "Failed to store rotated refresh token");
        return HttpResponse::InternalServerError().finish();
    }

    // new access token
    let access_token = generate_access_token(
        claims.user_id,
        claims.sub.clone(),
        claims.department,
        claims.position,
        &config.jwt_secret,
        config.access_token_ttl,
    );

    HttpResponse::Ok().json(serde_json::json!({
        "access_token": access_token,
        "refresh_token": new_refresh_token
    }))
}

#[utoipa::path(
    post,
    path = "/auth/logout",
    responses(
        (status = 204, description = "Refresh token revoked (idempotent)")
    ),
    security(("bearer_auth" = [])),
    tag = "Auth"
)]
pub async fn logout(
    req: HttpRequest,
    pool: web::Data<MySqlPool>,
    config: web::Data<Config>,
) -> impl Responder {
    let header = match req.headers().get("Authorization") {
        Some(h) => h.to_str().unwrap_or(""),
        None => return HttpResponse::NoContent().finish(),
    };

    let token = match header.strip_prefix("Bearer ") {
        Some(t) => t,
        None => return HttpResponse::NoContent().finish(),
    };

    let claims = match verify_token(token, &config.jwt_secret) {
        Ok(c) => c,
        Err(_) => return HttpResponse::NoContent().finish(),
    };

    // only refresh tokens can logout
    if claims.token_type != TokenType::Refresh {
        return HttpResponse::NoContent().finish();
    }

    // revoke refresh token (idempotent)
    let _ = sqlx::query("UPDATE refresh_tokens SET revoked = 1 WHERE jti = ?")
        .bind(&claims.jti)
        .execute(pool.get_ref())
        .await;

    // success (even if token didn't exist)
    HttpResponse::NoContent().finish()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn register_req(name: &str, account: &str, password: &str) -> RegisterReq {
        RegisterReq {
            name: name.to_string(),
            account: account.to_string(),
            password: password.to_string(),
            department: Department::LD,
            position: Position::C,
            email: None,
            extension: None,
        }
    }

    #[test]
    fn five_failures_lock_the_account() {
        assert!(!lockout_reached(4, 5));
        assert!(lockout_reached(5, 5));
        assert!(lockout_reached(6, 5));
    }

    #[test]
    fn lock_threshold_is_configurable() {
        assert!(lockout_reached(3, 3));
        assert!(!lockout_reached(3, 10));
    }

    #[test]
    fn registration_trims_the_account() {
        let req = register_req("Lin Wei", "  lin.wei ", "s3cret!");
        assert_eq!(validate_registration(&req), Ok("lin.wei"));
    }

    #[test]
    fn registration_rejects_blank_fields() {
        assert!(validate_registration(&register_req("", "lin.wei", "s3cret!")).is_err());
        assert!(validate_registration(&register_req("Lin Wei", "   ", "s3cret!")).is_err());
        assert!(validate_registration(&register_req("Lin Wei", "lin.wei", "")).is_err());
    }
}
