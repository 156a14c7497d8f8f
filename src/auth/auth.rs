use crate::config::Config;
use crate::model::codes::{Department, Position};
use crate::models::Claims;
use actix_web::{FromRequest, HttpRequest, dev::Payload, error::ErrorUnauthorized, web::Data};
use futures::future::{Ready, ready};
use jsonwebtoken::decode;
use jsonwebtoken::{DecodingKey, Validation};

pub struct AuthUser {
    pub user_id: u64,
    pub account: String,
    pub department: Department,
    pub position: Position,
}

impl FromRequest for AuthUser {
    type Error = actix_web::Error;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        let token = match req
            .headers()
            .get("Authorization")
            .and_then(|h| h.to_str().ok())
            .and_then(|h| h.strip_prefix("Bearer "))
        {
            Some(t) => t,
            None => return ready(Err(ErrorUnauthorized("Missing token"))),
        };

        let config = match req.app_data::<Data<Config>>() {
            Some(c) => c,
            None => {
                return ready(Err(actix_web::error::ErrorInternalServerError(
                    "Config missing",
                )));
            }
        };

        let data = match decode::<Claims>(
            token,
            &DecodingKey::from_secret(config.jwt_secret.as_bytes()),
            &Validation::default(),
        ) {
            Ok(d) => d,
            Err(_) => return ready(Err(ErrorUnauthorized("Invalid token"))),
        };

        ready(Ok(AuthUser {
            user_id: data.claims.user_id,
            account: data.claims.sub,
            department: data.claims.department,
            position: data.claims.position,
        }))
    }
}

impl AuthUser {
    pub fn require_manager(&self) -> actix_web::Result<()> {
        if self.position == Position::M {
            Ok(())
        } else {
            Err(actix_web::error::ErrorForbidden("Manager only"))
        }
    }

    pub fn require_supervisor(&self) -> actix_web::Result<()> {
        if self.position == Position::S {
            Ok(())
        } else {
            Err(actix_web::error::ErrorForbidden("Supervisor only"))
        }
    }

    /// Supervisor or manager.
    pub fn require_reviewer(&self) -> actix_web::Result<()> {
        if matches!(self.position, Position::S | Position::M) {
            Ok(())
        } else {
            Err(actix_web::error::ErrorForbidden("Supervisor/Manager only"))
        }
    }

    pub fn require_department(&self, department: Department) -> actix_web::Result<()> {
        if self.department == department {
            Ok(())
        } else {
            Err(actix_web::error::ErrorForbidden(
                "Wrong department for this operation",
            ))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::jwt::generate_access_token;
    use actix_web::{App, HttpResponse, Responder, test as actix_test, web};

    fn test_config() -> Config {
        Config {
            database_url: String::new(),
            jwt_secret: "extractor-test-secret".to_string(),
            server_addr: String::new(),
            access_token_ttl: 60,
            refresh_token_ttl: 60,
            rate_login_per_min: 60,
            rate_register_per_min: 60,
            rate_refresh_per_min: 60,
            rate_protected_per_min: 60,
            lockout_max_failures: 5,
            lockout_secs: 900,
            manager_review_threshold: 5_000_000,
            api_prefix: "/api".to_string(),
        }
    }

    async fn whoami(auth: AuthUser) -> impl Responder {
        HttpResponse::Ok().json(serde_json::json!({
            "account": auth.account,
            "department": auth.department,
            "position": auth.position,
        }))
    }

    #[actix_web::test]
    async fn extractor_accepts_valid_bearer_token() {
        let config = test_config();
        let token = generate_access_token(
            1,
            "lin.wei".to_string(),
            Department::LD,
            Position::S,
            &config.jwt_secret,
            60,
        );

        let app = actix_test::init_service(
            App::new()
                .app_data(web::Data::new(config))
                .route("/whoami", web::get().to(whoami)),
        )
        .await;

        let req = actix_test::TestRequest::get()
            .uri("/whoami")
            .insert_header(("Authorization", format!("Bearer {}", token)))
            .to_request();
        let resp = actix_test::call_service(&app, req).await;
        assert!(resp.status().is_success());

        let body: serde_json::Value = actix_test::read_body_json(resp).await;
        assert_eq!(body["account"], "lin.wei");
        assert_eq!(body["department"], "LD");
        assert_eq!(body["position"], "S");
    }

    #[actix_web::test]
    async fn extractor_rejects_missing_and_garbage_tokens() {
        let app = actix_test::init_service(
            App::new()
                .app_data(web::Data::new(test_config()))
                .route("/whoami", web::get().to(whoami)),
        )
        .await;

        let req = actix_test::TestRequest::get().uri("/whoami").to_request();
        let resp = actix_test::call_service(&app, req).await;
        assert_eq!(resp.status(), actix_web::http::StatusCode::UNAUTHORIZED);

        let req = actix_test::TestRequest::get()
            .uri("/whoami")
            .insert_header(("Authorization", "Bearer not-a-jwt"))
            .to_request();
        let resp = actix_test::call_service(&app, req).await;
        assert_eq!(resp.status(), actix_web::http::StatusCode::UNAUTHORIZED);
    }

    #[test]
    fn authorization_helpers() {
        let clerk = AuthUser {
            user_id: 1,
            account: "a".into(),
            department: Department::LD,
            position: Position::C,
        };
        assert!(clerk.require_manager().is_err());
        assert!(clerk.require_reviewer().is_err());
        assert!(clerk.require_department(Department::LD).is_ok());
        assert!(clerk.require_department(Department::FD).is_err());

        let supervisor = AuthUser {
            user_id: 2,
            account: "b".into(),
            department: Department::LD,
            position: Position::S,
        };
        assert!(supervisor.require_supervisor().is_ok());
        assert!(supervisor.require_reviewer().is_ok());
        assert!(supervisor.require_manager().is_err());
    }
}
