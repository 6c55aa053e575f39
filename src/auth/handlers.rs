use crate::{
    auth::{
        auth::AuthUser,
        jwt::{TokenSubject, generate_access_token, generate_refresh_token, verify_token},
        password::{hash_password, verify_password},
    },
    config::Config,
    error::{AppError, AppResult},
    model::{privilege::PrivilegeSet, role::Role},
    models::{LoginReqDto, LoginResponse, MessageResponse, SessionUser, TokenType, UserSql},
};
use actix_web::{HttpRequest, HttpResponse, web};
use serde::Deserialize;
use sqlx::MySqlPool;
use tracing::{debug, error, info, instrument};
use utoipa::ToSchema;

/// Privileges granted to a user; admins implicitly hold all of them.
pub async fn load_privileges(
    pool: &MySqlPool,
    user_id: u64,
    role: Role,
) -> Result<Vec<crate::model::privilege::Privilege>, sqlx::Error> {
    if role == Role::Admin {
        return Ok(crate::model::privilege::Privilege::all());
    }
    if role == Role::Employee {
        return Ok(Vec::new());
    }

    let set = sqlx::query_as::<_, PrivilegeSet>(
        r#"
        SELECT manage_employees, manage_shifts, manage_work_units, approve_leave, view_reports
        FROM user_privileges
        WHERE user_id = ?
        "#,
    )
    .bind(user_id)
    .fetch_optional(pool)
    .await?;

    Ok(set.unwrap_or_default().to_list())
}

/// Issues an access/refresh pair and records the refresh `jti`.
async fn issue_session(
    pool: &MySqlPool,
    config: &Config,
    subject: TokenSubject,
) -> AppResult<LoginResponse> {
    let role = Role::from_id(subject.role)
        .ok_or_else(|| AppError::Unauthorized("Invalid role".into()))?;

    debug!("Generating access token");
    let access_token = generate_access_token(&subject, &config.jwt_secret, config.access_token_ttl)
        .map_err(|e| AppError::Internal(format!("token encoding failed: {e}")))?;

    debug!("Generating refresh token");
    let (refresh_token, refresh_claims) =
        generate_refresh_token(&subject, &config.jwt_secret, config.refresh_token_ttl)
            .map_err(|e| AppError::Internal(format!("token encoding failed: {e}")))?;

    debug!(
        user_id = subject.user_id,
        jti = %refresh_claims.jti,
        "Storing refresh token"
    );

    sqlx::query(
        r#"
        INSERT INTO refresh_tokens (user_id, jti, expires_at)
        VALUES (?, ?, FROM_UNIXTIME(?))
        "#,
    )
    .bind(subject.user_id)
    .bind(&refresh_claims.jti)
    .bind(refresh_claims.exp as i64)
    .execute(pool)
    .await
    .map_err(|e| {
        error!(error = %e, "Failed to store refresh token");
        AppError::Database(e)
    })?;

    Ok(LoginResponse {
        access_token,
        refresh_token,
        token_type: "Bearer".to_string(),
        expires_in: config.access_token_ttl,
        user: SessionUser {
            id: subject.user_id,
            username: subject.username,
            role,
            employee_id: subject.employee_id,
            privileges: subject.privileges,
        },
    })
}

fn bearer_token(req: &HttpRequest) -> Option<&str> {
    req.headers()
        .get("Authorization")
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
}

#[utoipa::path(
    post,
    path = "/auth/login",
    request_body = LoginReqDto,
    responses(
        (status = 200, description = "Logged in", body = LoginResponse),
        (status = 400, description = "Username or password missing"),
        (status = 401, description = "Invalid credentials")
    ),
    tag = "Auth"
)]
#[instrument(
    name = "auth_login",
    skip(pool, config, user),
    fields(username = %user.username)
)]
pub async fn login(
    user: web::Json<LoginReqDto>,
    pool: web::Data<MySqlPool>,
    config: web::Data<Config>,
) -> AppResult<HttpResponse> {
    info!("Login request received");

    if user.username.trim().is_empty() || user.password.is_empty() {
        info!("Validation failed: empty username or password");
        return Err(AppError::BadRequest("Username or password required".into()));
    }

    debug!("Fetching user from database");

    let db_user = sqlx::query_as::<_, UserSql>(
        r#"
        SELECT id, username, password, role_id, employee_id, is_active
        FROM users
        WHERE username = ?
        "#,
    )
    .bind(user.username.trim())
    .fetch_optional(pool.get_ref())
    .await
    .map_err(|e| {
        error!(error = %e, "Database error while fetching user");
        AppError::Database(e)
    })?;

    let Some(db_user) = db_user else {
        info!("Invalid credentials: user not found");
        return Err(AppError::Unauthorized("Invalid credentials".into()));
    };

    if !db_user.is_active {
        info!(user_id = db_user.id, "Login refused: account disabled");
        return Err(AppError::Unauthorized("Invalid credentials".into()));
    }

    debug!("Verifying password");
    if let Err(e) = verify_password(&user.password, &db_user.password) {
        info!(error = %e, "Invalid credentials: password mismatch");
        return Err(AppError::Unauthorized("Invalid credentials".into()));
    }

    let role = Role::from_id(db_user.role_id)
        .ok_or_else(|| AppError::Unauthorized("Invalid role".into()))?;
    let privileges = load_privileges(pool.get_ref(), db_user.id, role).await?;

    let session = issue_session(
        pool.get_ref(),
        &config,
        TokenSubject {
            user_id: db_user.id,
            username: db_user.username,
            role: db_user.role_id,
            employee_id: db_user.employee_id,
            privileges,
        },
    )
    .await?;

    if let Err(e) = sqlx::query("UPDATE users SET last_login_at = NOW() WHERE id = ?")
        .bind(db_user.id)
        .execute(pool.get_ref())
        .await
    {
        error!(error = %e, "Failed to update last_login_at");
        // intentionally not failing login
    }

    info!("Login successful");
    Ok(HttpResponse::Ok().json(session))
}

#[utoipa::path(
    post,
    path = "/auth/refresh",
    responses(
        (status = 200, description = "Rotated token pair", body = LoginResponse),
        (status = 401, description = "Missing, invalid, or revoked refresh token")
    ),
    security(("bearer_auth" = [])),
    tag = "Auth"
)]
pub async fn refresh_token(
    req: HttpRequest,
    pool: web::Data<MySqlPool>,
    config: web::Data<Config>,
) -> AppResult<HttpResponse> {
    let token = bearer_token(&req).ok_or_else(|| AppError::Unauthorized("No token".into()))?;

    let claims = verify_token(token, &config.jwt_secret)
        .map_err(|_| AppError::Unauthorized("Invalid token".into()))?;

    if claims.token_type != TokenType::Refresh {
        return Err(AppError::Unauthorized("Refresh token required".into()));
    }

    // revoke first so a replayed token cannot rotate twice
    let revoked = sqlx::query(
        r#"
        UPDATE refresh_tokens
        SET revoked = TRUE
        WHERE jti = ? AND revoked = FALSE AND expires_at > NOW()
        "#,
    )
    .bind(&claims.jti)
    .execute(pool.get_ref())
    .await?;

    if revoked.rows_affected() == 0 {
        info!(user_id = claims.user_id, "Refresh token unknown or already revoked");
        return Err(AppError::Unauthorized("Refresh token revoked".into()));
    }

    let active = sqlx::query_scalar::<_, bool>("SELECT is_active FROM users WHERE id = ?")
        .bind(claims.user_id)
        .fetch_optional(pool.get_ref())
        .await?
        .unwrap_or(false);
    if !active {
        return Err(AppError::Unauthorized("Account disabled".into()));
    }

    let role = Role::from_id(claims.role)
        .ok_or_else(|| AppError::Unauthorized("Invalid role".into()))?;
    let mut subject = TokenSubject::from(&claims);
    subject.privileges = load_privileges(pool.get_ref(), claims.user_id, role).await?;

    let session = issue_session(pool.get_ref(), &config, subject).await?;
    Ok(HttpResponse::Ok().json(session))
}

#[utoipa::path(
    post,
    path = "/auth/logout",
    responses((status = 204, description = "Refresh token revoked (idempotent)")),
    security(("bearer_auth" = [])),
    tag = "Auth"
)]
pub async fn logout(
    req: HttpRequest,
    pool: web::Data<MySqlPool>,
    config: web::Data<Config>,
) -> HttpResponse {
    let Some(token) = bearer_token(&req) else {
        return HttpResponse::NoContent().finish();
    };

    let claims = match verify_token(token, &config.jwt_secret) {
        Ok(c) => c,
        Err(_) => return HttpResponse::NoContent().finish(),
    };

    // only refresh tokens can logout
    if claims.token_type != TokenType::Refresh {
        return HttpResponse::NoContent().finish();
    }

    if let Err(e) = sqlx::query("UPDATE refresh_tokens SET revoked = TRUE WHERE jti = ?")
        .bind(&claims.jti)
        .execute(pool.get_ref())
        .await
    {
        error!(error = %e, "Failed to revoke refresh token on logout");
    }

    HttpResponse::NoContent().finish()
}

#[utoipa::path(
    get,
    path = "/api/me",
    responses(
        (status = 200, description = "Current user", body = SessionUser),
        (status = 401, description = "Unauthorized")
    ),
    security(("bearer_auth" = [])),
    tag = "Auth"
)]
pub async fn me(auth: AuthUser) -> HttpResponse {
    HttpResponse::Ok().json(SessionUser {
        id: auth.user_id,
        username: auth.username,
        role: auth.role,
        employee_id: auth.employee_id,
        privileges: auth.privileges,
    })
}

#[derive(Deserialize, ToSchema)]
pub struct ChangePassword {
    pub current_password: String,
    #[schema(example = "n3w-s3cret!")]
    pub new_password: String,
}

pub const MIN_PASSWORD_LEN: usize = 8;

#[utoipa::path(
    put,
    path = "/api/me/password",
    request_body = ChangePassword,
    responses(
        (status = 200, description = "Password changed", body = MessageResponse),
        (status = 400, description = "New password too short"),
        (status = 401, description = "Current password wrong")
    ),
    security(("bearer_auth" = [])),
    tag = "Auth"
)]
pub async fn change_password(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    body: web::Json<ChangePassword>,
) -> AppResult<HttpResponse> {
    if body.new_password.chars().count() < MIN_PASSWORD_LEN {
        return Err(AppError::BadRequest(format!(
            "New password must be at least {MIN_PASSWORD_LEN} characters"
        )));
    }

    let current: String = sqlx::query_scalar("SELECT password FROM users WHERE id = ?")
        .bind(auth.user_id)
        .fetch_optional(pool.get_ref())
        .await?
        .ok_or_else(|| AppError::Unauthorized("Unknown user".into()))?;

    verify_password(&body.current_password, &current)
        .map_err(|_| AppError::Unauthorized("Current password is incorrect".into()))?;

    let hashed = hash_password(&body.new_password)
        .map_err(|e| AppError::Internal(format!("password hashing failed: {e}")))?;

    sqlx::query("UPDATE users SET password = ? WHERE id = ?")
        .bind(hashed)
        .bind(auth.user_id)
        .execute(pool.get_ref())
        .await?;

    // sign out every other device
    sqlx::query("UPDATE refresh_tokens SET revoked = TRUE WHERE user_id = ?")
        .bind(auth.user_id)
        .execute(pool.get_ref())
        .await?;

    info!(user_id = auth.user_id, "Password changed");
    Ok(HttpResponse::Ok().json(MessageResponse::new("Password changed")))
}
