use crate::{
    api::{leave, loan, new_employee, user},
    auth::{handlers, middleware::auth_middleware},
    config::Config,
};
use actix_governor::{
    Governor, GovernorConfigBuilder, PeerIpKeyExtractor, governor::middleware::NoOpMiddleware,
};
use actix_web::{middleware::from_fn, web};
use std::sync::Arc;

pub fn configure(cfg: &mut web::ServiceConfig, config: Config) {
    // Helper to build per-route limiter
    fn build_limiter(requests_per_min: u32) -> Governor<PeerIpKeyExtractor, NoOpMiddleware> {
        let per_ms = if requests_per_min == 0 {
            1
        } else {
            60_000 / requests_per_min as u64
        };
        let cfg = GovernorConfigBuilder::default()
            .per_millisecond(per_ms)
            .burst_size(requests_per_min)
            .key_extractor(PeerIpKeyExtractor)
            .finish()
            .unwrap();
        Governor::new(&cfg)
    }

    let login_limiter = Arc::new(build_limiter(config.rate_login_per_min));
    let register_limiter = Arc::new(build_limiter(config.rate_register_per_min));
    let refresh_limiter = Arc::new(build_limiter(config.rate_refresh_per_min));
    let protected_limiter = Arc::new(build_limiter(config.rate_protected_per_min));

    // Public routes
    cfg.service(
        web::scope("/auth")
            .service(
                web::resource("/login")
                    .wrap(login_limiter.clone())
                    .route(web::post().to(handlers::login)),
            )
            .service(
                web::resource("/register")
                    .wrap(register_limiter.clone())
                    .route(web::post().to(handlers::register)),
            )
            .service(
                web::resource("/refresh")
                    .wrap(refresh_limiter.clone())
                    .route(web::post().to(handlers::refresh_token)),
            )
            .service(
                web::resource("/logout")
                    .wrap(login_limiter.clone())
                    .route(web::post().to(handlers::logout)),
            ),
    );

    // Protected routes
    cfg.service(
        web::scope(&config.api_prefix)
            .wrap(from_fn(auth_middleware))
            // authentication
            .wrap(protected_limiter) // rate limiting
            .service(
                web::scope("/users")
                    // /users
                    .service(web::resource("").route(web::get().to(user::list_users)))
                    // /users/{account}
                    .service(
                        web::resource("/{account}").route(web::delete().to(user::delete_user)),
                    ),
            )
            .service(
                web::scope("/leave")
                    // /leave
                    .service(
                        web::resource("")
                            .route(web::get().to(leave::leave_list))
                            .route(web::post().to(leave::create_leave)),
                    )
                    // /leave/annual-remaining
                    .service(
                        web::resource("/annual-remaining")
                            .route(web::get().to(leave::annual_remaining)),
                    )
                    // /leave/{id}/approve
                    .service(
                        web::resource("/{id}/approve")
                            .route(web::put().to(leave::approve_leave)),
                    )
                    // /leave/{id}/reject
                    .service(
                        web::resource("/{id}/reject").route(web::put().to(leave::reject_leave)),
                    )
                    // /leave/{id}/cancel
                    .service(
                        web::resource("/{id}/cancel").route(web::post().to(leave::cancel_leave)),
                    ),
            )
            .service(
                web::scope("/loan")
                    // /loan
                    .service(
                        web::resource("")
                            .route(web::get().to(loan::loan_list))
                            .route(web::post().to(loan::create_loan)),
                    )
                    // /loan/review-history
                    .service(
                        web::resource("/review-history")
                            .route(web::get().to(loan::review_history)),
                    )
                    // /loan/stats
                    .service(web::resource("/stats").route(web::get().to(loan::loan_stats)))
                    // /loan/{id}/supervisor-review
                    .service(
                        web::resource("/{id}/supervisor-review")
                            .route(web::post().to(loan::supervisor_review)),
                    )
                    // /loan/{id}/manager-review
                    .service(
                        web::resource("/{id}/manager-review")
                            .route(web::post().to(loan::manager_review)),
                    ),
            )
            .service(
                web::scope("/new-employees")
                    // /new-employees
                    .service(web::resource("").route(web::get().to(new_employee::list)))
                    // /new-employees/submit
                    .service(
                        web::resource("/submit").route(web::post().to(new_employee::submit)),
                    )
                    // /new-employees/pending
                    .service(
                        web::resource("/pending").route(web::get().to(new_employee::pending)),
                    )
                    // /new-employees/{id}/approve
                    .service(
                        web::resource("/{id}/approve")
                            .route(web::post().to(new_employee::approve)),
                    ),
            ),
    );
}

// LOGIN
//  ├─ access_token (15 min)
//  └─ refresh_token (7 days)
//
// API REQUEST
//  └─ Authorization: Bearer access_token
//
// ACCESS EXPIRED
//  └─ POST /refresh with refresh_token
//       └─ returns new access_token
