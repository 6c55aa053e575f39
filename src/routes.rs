use crate::{
    api::{attendance, employee, files, leave_request, privilege, report, shift, work_unit},
    auth::{handlers, middleware::auth_middleware},
    config::{Config, ConfigError},
    error::AppError,
};
use actix_governor::{
    Governor, GovernorConfigBuilder, PeerIpKeyExtractor, governor::middleware::NoOpMiddleware,
};
use actix_web::{HttpResponse, middleware::from_fn, web};
use std::sync::Arc;

type Limiter = Arc<Governor<PeerIpKeyExtractor, NoOpMiddleware>>;

/// Per-route limiters, built once so every worker shares the same buckets.
#[derive(Clone)]
pub struct RateLimiters {
    login: Limiter,
    refresh: Limiter,
    attendance: Limiter,
    protected: Limiter,
}

// Helper to build per-route limiter
fn build_limiter(key: &'static str, requests_per_min: u32) -> Result<Limiter, ConfigError> {
    let requests_per_min = requests_per_min.max(1);
    let per_ms = (60_000 / requests_per_min as u64).max(1);

    let cfg = GovernorConfigBuilder::default()
        .per_millisecond(per_ms)
        .burst_size(requests_per_min)
        .key_extractor(PeerIpKeyExtractor)
        .finish()
        .ok_or(ConfigError::Invalid {
            key,
            value: requests_per_min.to_string(),
        })?;
    Ok(Arc::new(Governor::new(&cfg)))
}

impl RateLimiters {
    pub fn from_config(config: &Config) -> Result<Self, ConfigError> {
        Ok(Self {
            login: build_limiter("RATE_LOGIN_PER_MIN", config.rate_login_per_min)?,
            refresh: build_limiter("RATE_REFRESH_PER_MIN", config.rate_refresh_per_min)?,
            attendance: build_limiter("RATE_ATTENDANCE_PER_MIN", config.rate_attendance_per_min)?,
            protected: build_limiter("RATE_PROTECTED_PER_MIN", config.rate_protected_per_min)?,
        })
    }
}

async fn health() -> HttpResponse {
    HttpResponse::Ok().json(serde_json::json!({ "status": "ok" }))
}

pub fn configure(cfg: &mut web::ServiceConfig, config: &Config, limiters: RateLimiters) {
    // base64 photos are a third larger than the file
    let json_limit = config.max_upload_bytes / 3 * 4 + 16 * 1024;
    cfg.app_data(
        web::JsonConfig::default()
            .limit(json_limit)
            .error_handler(|err, _req| AppError::BadRequest(err.to_string()).into()),
    );
    cfg.app_data(
        web::QueryConfig::default()
            .error_handler(|err, _req| AppError::BadRequest(err.to_string()).into()),
    );
    cfg.app_data(
        web::PathConfig::default()
            .error_handler(|err, _req| AppError::BadRequest(err.to_string()).into()),
    );

    cfg.route("/health", web::get().to(health));

    // Public routes
    cfg.service(
        web::scope("/auth")
            .service(
                web::resource("/login")
                    .wrap(limiters.login.clone())
                    .route(web::post().to(handlers::login)),
            )
            .service(
                web::resource("/refresh")
                    .wrap(limiters.refresh.clone())
                    .route(web::post().to(handlers::refresh_token)),
            )
            .service(
                web::resource("/logout")
                    .wrap(limiters.refresh.clone())
                    .route(web::post().to(handlers::logout)),
            ),
    );

    // Protected routes
    cfg.service(
        web::scope(&config.api_prefix)
            .wrap(from_fn(auth_middleware)) // authentication
            .wrap(limiters.protected.clone()) // rate limiting
            .service(web::resource("/me").route(web::get().to(handlers::me)))
            .service(web::resource("/me/password").route(web::put().to(handlers::change_password)))
            .service(
                web::scope("/attendance")
                    .service(
                        web::resource("/check-in")
                            .wrap(limiters.attendance.clone())
                            .route(web::post().to(attendance::check_in)),
                    )
                    .service(
                        web::resource("/check-out")
                            .wrap(limiters.attendance.clone())
                            .route(web::post().to(attendance::check_out)),
                    )
                    .service(web::resource("/today").route(web::get().to(attendance::today)))
                    .service(web::resource("/history").route(web::get().to(attendance::history)))
                    .service(
                        web::resource("/close-day").route(web::post().to(attendance::close_day)),
                    ),
            )
            .service(
                web::scope("/leave")
                    // /leave
                    .service(
                        web::resource("")
                            .route(web::get().to(leave_request::leave_list))
                            .route(web::post().to(leave_request::create_leave)),
                    )
                    // /leave/{id}
                    .service(web::resource("/{id}").route(web::get().to(leave_request::get_leave)))
                    .service(
                        web::resource("/{id}/approve")
                            .route(web::put().to(leave_request::approve_leave)),
                    )
                    .service(
                        web::resource("/{id}/reject")
                            .route(web::put().to(leave_request::reject_leave)),
                    )
                    .service(
                        web::resource("/{id}/cancel")
                            .route(web::put().to(leave_request::cancel_leave)),
                    ),
            )
            .service(
                web::scope("/employees")
                    .service(
                        web::resource("")
                            .route(web::post().to(employee::create_employee))
                            .route(web::get().to(employee::list_employees)),
                    )
                    .service(
                        web::resource("/{id}")
                            .route(web::patch().to(employee::update_employee))
                            .route(web::get().to(employee::get_employee))
                            .route(web::delete().to(employee::delete_employee)),
                    ),
            )
            .service(
                web::scope("/shifts")
                    .service(
                        web::resource("")
                            .route(web::post().to(shift::create_shift))
                            .route(web::get().to(shift::list_shifts)),
                    )
                    .service(
                        web::resource("/{id}")
                            .route(web::get().to(shift::get_shift))
                            .route(web::put().to(shift::update_shift))
                            .route(web::delete().to(shift::delete_shift)),
                    ),
            )
            .service(
                web::scope("/work-units")
                    .service(
                        web::resource("")
                            .route(web::post().to(work_unit::create_work_unit))
                            .route(web::get().to(work_unit::list_work_units)),
                    )
                    .service(
                        web::resource("/{id}")
                            .route(web::get().to(work_unit::get_work_unit))
                            .route(web::put().to(work_unit::update_work_unit))
                            .route(web::delete().to(work_unit::delete_work_unit)),
                    ),
            )
            .service(
                web::resource("/privileges/{user_id}")
                    .route(web::get().to(privilege::get_privileges))
                    .route(web::put().to(privilege::set_privileges)),
            )
            .service(
                web::scope("/reports")
                    .service(web::resource("/summary").route(web::get().to(report::day_summary)))
                    .service(
                        web::resource("/attendance")
                            .route(web::get().to(report::attendance_report)),
                    ),
            )
            .service(
                web::resource("/files/{kind}/{name}").route(web::get().to(files::get_file)),
            ),
    );
}

// LOGIN
//  ├─ access_token (15 min)
//  └─ refresh_token (7 days)

// API REQUEST
//  └─ Authorization: Bearer access_token

// ACCESS EXPIRED
//  └─ POST /auth/refresh with Authorization: Bearer refresh_token
//       └─ returns a new token pair, the old refresh token is revoked
