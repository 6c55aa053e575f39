use crate::{
    auth::auth::AuthUser,
    error::{AppError, AppResult},
    model::{
        privilege::{Privilege, PrivilegeSet},
        role::Role,
        user::User,
    },
};
use actix_web::{HttpResponse, web};
use serde::Serialize;
use sqlx::MySqlPool;
use tracing::info;
use utoipa::ToSchema;

#[derive(Debug, Serialize, ToSchema)]
pub struct PrivilegeResponse {
    #[schema(example = 7)]
    pub user_id: u64,
    #[schema(example = "hr_siti")]
    pub username: String,
    pub role: Role,
    /// Effective grants: admins hold everything, employees nothing.
    pub privileges: PrivilegeSet,
}

/// Grants as they apply to a user of the given role.
pub fn effective_privileges(role: Role, stored: PrivilegeSet) -> PrivilegeSet {
    match role {
        Role::Admin => PrivilegeSet {
            manage_employees: true,
            manage_shifts: true,
            manage_work_units: true,
            approve_leave: true,
            view_reports: true,
        },
        Role::Hr => stored,
        Role::Employee => PrivilegeSet::default(),
    }
}

async fn fetch_user(pool: &MySqlPool, user_id: u64) -> AppResult<(User, Role)> {
    let user = sqlx::query_as::<_, User>(
        r#"
        SELECT id, username, password, role_id, employee_id, is_active, last_login_at
        FROM users
        WHERE id = ?
        "#,
    )
    .bind(user_id)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| AppError::NotFound("User not found".into()))?;

    let role = Role::from_id(user.role_id)
        .ok_or_else(|| AppError::Internal(format!("user {} has unknown role {}", user.id, user.role_id)))?;
    Ok((user, role))
}

async fn stored_privileges(pool: &MySqlPool, user_id: u64) -> Result<PrivilegeSet, sqlx::Error> {
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
    Ok(set.unwrap_or_default())
}

#[utoipa::path(
    get,
    path = "/api/privileges/{user_id}",
    params(("user_id" = u64, Path, description = "User ID")),
    responses(
        (status = 200, description = "Effective privileges", body = PrivilegeResponse),
        (status = 403, description = "Admin only"),
        (status = 404, description = "User not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Privilege"
)]
pub async fn get_privileges(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
) -> AppResult<HttpResponse> {
    auth.require_admin()?;
    let (user, role) = fetch_user(pool.get_ref(), path.into_inner()).await?;
    let stored = stored_privileges(pool.get_ref(), user.id).await?;

    Ok(HttpResponse::Ok().json(PrivilegeResponse {
        user_id: user.id,
        username: user.username,
        role,
        privileges: effective_privileges(role, stored),
    }))
}

/// Replaces an HR user's grants. Takes effect at their next login or refresh.
#[utoipa::path(
    put,
    path = "/api/privileges/{user_id}",
    params(("user_id" = u64, Path, description = "User ID")),
    request_body = PrivilegeSet,
    responses(
        (status = 200, description = "Privileges replaced", body = PrivilegeResponse),
        (status = 400, description = "User is not HR"),
        (status = 403, description = "Admin only"),
        (status = 404, description = "User not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Privilege"
)]
pub async fn set_privileges(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
    body: web::Json<PrivilegeSet>,
) -> AppResult<HttpResponse> {
    auth.require_admin()?;
    let (user, role) = fetch_user(pool.get_ref(), path.into_inner()).await?;

    if role != Role::Hr {
        return Err(AppError::BadRequest(format!(
            "Privileges can only be granted to HR users, this user is {role}"
        )));
    }

    let set = body.into_inner();
    sqlx::query(
        r#"
        INSERT INTO user_privileges
            (user_id, manage_employees, manage_shifts, manage_work_units, approve_leave, view_reports)
        VALUES (?, ?, ?, ?, ?, ?)
        ON DUPLICATE KEY UPDATE
            manage_employees = VALUES(manage_employees),
            manage_shifts = VALUES(manage_shifts),
            manage_work_units = VALUES(manage_work_units),
            approve_leave = VALUES(approve_leave),
            view_reports = VALUES(view_reports)
        "#,
    )
    .bind(user.id)
    .bind(set.manage_employees)
    .bind(set.manage_shifts)
    .bind(set.manage_work_units)
    .bind(set.approve_leave)
    .bind(set.view_reports)
    .execute(pool.get_ref())
    .await?;

    let granted: Vec<Privilege> = set.to_list();
    info!(user_id = user.id, ?granted, granted_by = auth.user_id, "Privileges replaced");

    Ok(HttpResponse::Ok().json(PrivilegeResponse {
        user_id: user.id,
        username: user.username,
        role,
        privileges: set,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grants() -> PrivilegeSet {
        PrivilegeSet {
            approve_leave: true,
            ..Default::default()
        }
    }

    #[test]
    fn test_admin_effective_privileges_are_complete() {
        let set = effective_privileges(Role::Admin, PrivilegeSet::default());
        assert_eq!(set.to_list(), Privilege::all());
    }

    #[test]
    fn test_hr_keeps_stored_grants() {
        assert_eq!(effective_privileges(Role::Hr, grants()), grants());
    }

    #[test]
    fn test_employee_grants_are_ignored() {
        assert_eq!(
            effective_privileges(Role::Employee, grants()),
            PrivilegeSet::default()
        );
    }
}
