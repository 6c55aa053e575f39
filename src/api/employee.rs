use crate::{
    auth::{auth::AuthUser, handlers::MIN_PASSWORD_LEN, password::hash_password},
    error::{AppError, AppResult},
    model::{employee::Employee, privilege::Privilege, role::Role},
    models::MessageResponse,
    utils::{
        assignment_cache::AssignmentCache,
        db_utils::{
            ColumnKind, Patchable, SqlUpdate, SqlValue, build_update_sql, execute_update,
            page_window,
        },
    },
};
use actix_web::{HttpResponse, web};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::MySqlPool;
use tracing::{debug, error, info};
use utoipa::{IntoParams, ToSchema};

/// Login to create together with the employee.
#[derive(Deserialize, Serialize, ToSchema)]
pub struct NewAccount {
    #[schema(example = "siti")]
    pub username: String,
    #[schema(example = "s3cret-pass")]
    pub password: String,
}

#[derive(Deserialize, Serialize, ToSchema)]
pub struct CreateEmployee {
    #[schema(example = "EMP-001")]
    pub employee_code: String,
    #[schema(example = "Siti Rahayu")]
    pub full_name: String,
    #[schema(example = "siti.rahayu@company.co.id", format = "email")]
    pub email: String,
    #[schema(example = "+6281234567890")]
    pub phone: Option<String>,
    #[schema(example = 1)]
    pub work_unit_id: Option<u64>,
    #[schema(example = 2)]
    pub shift_id: Option<u64>,
    pub account: Option<NewAccount>,
}

pub const EMPLOYEE_STATUSES: &[&str] = &["active", "inactive"];

const PATCHABLE: &[Patchable] = &[
    Patchable::required("employee_code", ColumnKind::Text),
    Patchable::required("full_name", ColumnKind::Text),
    Patchable::required("email", ColumnKind::Text),
    Patchable::nullable("phone", ColumnKind::Text),
    Patchable::nullable("work_unit_id", ColumnKind::OptionalId),
    Patchable::nullable("shift_id", ColumnKind::OptionalId),
    Patchable::required("status", ColumnKind::Text),
];

fn valid_email(email: &str) -> bool {
    match email.split_once('@') {
        Some((local, domain)) => !local.is_empty() && domain.contains('.') && !domain.starts_with('.'),
        None => false,
    }
}

/// Field checks for a new employee.
pub fn validate_new_employee(payload: &CreateEmployee) -> AppResult<()> {
    if payload.employee_code.trim().is_empty() || payload.full_name.trim().is_empty() {
        return Err(AppError::BadRequest(
            "employee_code and full_name are required".into(),
        ));
    }
    if !valid_email(payload.email.trim()) {
        return Err(AppError::BadRequest("Invalid email".into()));
    }
    if let Some(account) = &payload.account {
        if account.username.trim().is_empty() {
            return Err(AppError::BadRequest("account.username is required".into()));
        }
        if account.password.chars().count() < MIN_PASSWORD_LEN {
            return Err(AppError::BadRequest(format!(
                "account.password must be at least {MIN_PASSWORD_LEN} characters"
            )));
        }
    }
    Ok(())
}

/// Builds the UPDATE for a patch body and checks values the allow-list
/// cannot express.
pub fn employee_update(
    employee_id: u64,
    body: &Value,
) -> AppResult<SqlUpdate> {
    let update = build_update_sql("employees", body, PATCHABLE, "id", employee_id)?;

    for column in ["employee_code", "full_name"] {
        if let Some(SqlValue::String(v)) = update.value_of(column) {
            if v.is_empty() {
                return Err(AppError::BadRequest(format!("'{column}' cannot be empty")));
            }
        }
    }
    if let Some(SqlValue::String(email)) = update.value_of("email") {
        if !valid_email(email) {
            return Err(AppError::BadRequest("Invalid email".into()));
        }
    }
    if let Some(SqlValue::String(status)) = update.value_of("status") {
        if !EMPLOYEE_STATUSES.contains(&status.as_str()) {
            return Err(AppError::BadRequest(format!(
                "status must be one of: {}",
                EMPLOYEE_STATUSES.join(", ")
            )));
        }
    }
    Ok(update)
}

#[derive(Debug, Deserialize, IntoParams, ToSchema)]
pub struct EmployeeQuery {
    pub page: Option<u32>,
    pub per_page: Option<u32>,
    pub work_unit_id: Option<u64>,
    pub shift_id: Option<u64>,
    #[schema(example = "active")]
    pub status: Option<String>,
    /// Matches name, email or employee code
    pub search: Option<String>,
}

#[derive(Serialize, ToSchema)]
pub struct EmployeeListResponse {
    pub data: Vec<Employee>,
    #[schema(example = 1)]
    pub page: u32,
    #[schema(example = 20)]
    pub per_page: u32,
    #[schema(example = 10)]
    pub total: i64,
}

#[derive(Serialize, ToSchema)]
pub struct EmployeeCreated {
    #[schema(example = 12)]
    pub id: u64,
    /// Id of the login created alongside, if any.
    #[schema(example = 7)]
    pub user_id: Option<u64>,
}

const EMPLOYEE_COLUMNS: &str =
    "id, employee_code, full_name, email, phone, work_unit_id, shift_id, status, created_at";

fn map_duplicate(e: sqlx::Error) -> AppError {
    if AppError::is_duplicate_key(&e) {
        AppError::Conflict("Employee code, email or username already exists".into())
    } else {
        error!(error = %e, "Employee write failed");
        AppError::Database(e)
    }
}

/// Create Employee
#[utoipa::path(
    post,
    path = "/api/employees",
    request_body = CreateEmployee,
    responses(
        (status = 201, description = "Employee created", body = EmployeeCreated),
        (status = 400, description = "Invalid payload"),
        (status = 403, description = "Forbidden"),
        (status = 409, description = "Duplicate code, email or username")
    ),
    tag = "Employee",
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn create_employee(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    payload: web::Json<CreateEmployee>,
) -> AppResult<HttpResponse> {
    auth.require_privilege(Privilege::ManageEmployees)?;
    validate_new_employee(&payload)?;

    let hashed = payload
        .account
        .as_ref()
        .map(|a| hash_password(&a.password))
        .transpose()
        .map_err(|e| AppError::Internal(format!("password hashing failed: {e}")))?;

    let mut tx = pool.begin().await?;

    let employee_id = sqlx::query(
        r#"
        INSERT INTO employees
        (employee_code, full_name, email, phone, work_unit_id, shift_id)
        VALUES (?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(payload.employee_code.trim())
    .bind(payload.full_name.trim())
    .bind(payload.email.trim())
    .bind(payload.phone.as_deref().map(str::trim))
    .bind(payload.work_unit_id)
    .bind(payload.shift_id)
    .execute(&mut *tx)
    .await
    .map_err(map_duplicate)?
    .last_insert_id();

    let user_id = match (&payload.account, hashed) {
        (Some(account), Some(hashed)) => Some(
            sqlx::query(
                r#"
                INSERT INTO users (username, password, role_id, employee_id)
                VALUES (?, ?, ?, ?)
                "#,
            )
            .bind(account.username.trim())
            .bind(hashed)
            .bind(Role::Employee.id())
            .bind(employee_id)
            .execute(&mut *tx)
            .await
            .map_err(map_duplicate)?
            .last_insert_id(),
        ),
        _ => None,
    };

    tx.commit().await?;

    info!(employee_id, ?user_id, created_by = auth.user_id, "Employee created");
    Ok(HttpResponse::Created().json(EmployeeCreated {
        id: employee_id,
        user_id,
    }))
}

// -------------------- Handler --------------------

#[utoipa::path(
    get,
    path = "/api/employees",
    params(EmployeeQuery),
    responses(
        (status = 200, description = "Paginated employee list", body = EmployeeListResponse),
        (status = 403, description = "Forbidden")
    ),
    tag = "Employee",
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn list_employees(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    query: web::Query<EmployeeQuery>,
) -> AppResult<HttpResponse> {
    auth.require_privilege(Privilege::ManageEmployees)?;

    let (page, per_page, offset) = page_window(query.page, query.per_page, 20);

    // ---------- build WHERE clause dynamically ----------
    let mut conditions = Vec::new();
    let mut bindings: Vec<SqlValue> = Vec::new();

    if let Some(work_unit_id) = query.work_unit_id {
        conditions.push("work_unit_id = ?");
        bindings.push(SqlValue::U64(work_unit_id));
    }

    if let Some(shift_id) = query.shift_id {
        conditions.push("shift_id = ?");
        bindings.push(SqlValue::U64(shift_id));
    }

    if let Some(status) = &query.status {
        conditions.push("status = ?");
        bindings.push(SqlValue::String(status.clone()));
    }

    if let Some(search) = query.search.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
        conditions.push("(full_name LIKE ? OR email LIKE ? OR employee_code LIKE ?)");
        let like = format!("%{search}%");
        bindings.push(SqlValue::String(like.clone()));
        bindings.push(SqlValue::String(like.clone()));
        bindings.push(SqlValue::String(like));
    }

    let where_clause = if conditions.is_empty() {
        String::new()
    } else {
        format!("WHERE {}", conditions.join(" AND "))
    };

    // ---------- total count ----------
    let count_sql = format!("SELECT COUNT(*) FROM employees {where_clause}");
    debug!(sql = %count_sql, bindings = ?bindings, "Counting employees");

    let mut count_query = sqlx::query_scalar::<_, i64>(&count_sql);
    for b in &bindings {
        count_query = match b {
            SqlValue::U64(v) => count_query.bind(*v),
            SqlValue::String(v) => count_query.bind(v.as_str()),
            _ => count_query,
        };
    }

    let total = count_query.fetch_one(pool.get_ref()).await.map_err(|e| {
        error!(error = %e, sql = %count_sql, "Failed to count employees");
        AppError::Database(e)
    })?;

    // ---------- data query ----------
    let data_sql = format!(
        "SELECT {EMPLOYEE_COLUMNS} FROM employees {where_clause} ORDER BY id DESC LIMIT ? OFFSET ?"
    );
    debug!(sql = %data_sql, page, per_page, offset, "Fetching employees");

    let mut data_query = sqlx::query_as::<_, Employee>(&data_sql);
    for b in &bindings {
        data_query = match b {
            SqlValue::U64(v) => data_query.bind(*v),
            SqlValue::String(v) => data_query.bind(v.as_str()),
            _ => data_query,
        };
    }
    data_query = data_query.bind(per_page as i64).bind(offset as i64);

    let employees = data_query.fetch_all(pool.get_ref()).await.map_err(|e| {
        error!(error = %e, sql = %data_sql, "Failed to fetch employees");
        AppError::Database(e)
    })?;

    Ok(HttpResponse::Ok().json(EmployeeListResponse {
        data: employees,
        page,
        per_page,
        total,
    }))
}

/// Update Employee
///
/// Body is a partial JSON object; only the listed columns may appear.
#[utoipa::path(
    patch,
    path = "/api/employees/{employee_id}",
    params(
        ("employee_id" = u64, Path, description = "Employee ID")
    ),
    request_body(content = Object, example = json!({ "shift_id": 2, "status": "inactive" })),
    responses(
        (status = 200, description = "Employee updated successfully", body = MessageResponse),
        (status = 400, description = "Unknown field or invalid value"),
        (status = 404, description = "Employee not found"),
        (status = 409, description = "Duplicate code or email")
    ),
    tag = "Employee",
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn update_employee(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    cache: web::Data<AssignmentCache>,
    path: web::Path<u64>,
    body: web::Json<Value>,
) -> AppResult<HttpResponse> {
    auth.require_privilege(Privilege::ManageEmployees)?;
    let employee_id = path.into_inner();

    let update = employee_update(employee_id, &body)?;
    let columns = update.columns.clone();

    let affected = execute_update(pool.get_ref(), update)
        .await
        .map_err(map_duplicate)?;

    cache.invalidate(employee_id).await;

    if affected == 0 {
        // MySQL reports 0 for unchanged rows too
        let exists = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM employees WHERE id = ?")
            .bind(employee_id)
            .fetch_one(pool.get_ref())
            .await?;
        if exists == 0 {
            return Err(AppError::NotFound("Employee not found".into()));
        }
    }

    info!(employee_id, ?columns, updated_by = auth.user_id, "Employee updated");
    Ok(HttpResponse::Ok().json(MessageResponse::new("Employee updated successfully")))
}

/// Delete Employee
#[utoipa::path(
    delete,
    path = "/api/employees/{employee_id}",
    params(
        ("employee_id" = u64, Path, description = "Employee ID")
    ),
    responses(
        (status = 200, description = "Successfully deleted", body = MessageResponse),
        (status = 404, description = "Employee not found"),
        (status = 500, description = "Internal server error")
    ),
    tag = "Employee",
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn delete_employee(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    cache: web::Data<AssignmentCache>,
    path: web::Path<u64>,
) -> AppResult<HttpResponse> {
    auth.require_privilege(Privilege::ManageEmployees)?;
    let employee_id = path.into_inner();

    let result = sqlx::query("DELETE FROM employees WHERE id = ?")
        .bind(employee_id)
        .execute(pool.get_ref())
        .await
        .map_err(|e| {
            error!(error = %e, employee_id, "Failed to delete employee");
            AppError::Database(e)
        })?;

    cache.invalidate(employee_id).await;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound("Employee not found".into()));
    }

    info!(employee_id, deleted_by = auth.user_id, "Employee deleted");
    Ok(HttpResponse::Ok().json(MessageResponse::new("Successfully deleted")))
}

/// Get Employee by ID
#[utoipa::path(
    get,
    path = "/api/employees/{employee_id}",
    params(
        ("employee_id" = u64, Path, description = "Employee ID")
    ),
    responses(
        (status = 200, description = "Employee found", body = Employee),
        (status = 404, description = "Employee not found"),
        (status = 500, description = "Internal server error")
    ),
    tag = "Employee",
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn get_employee(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
) -> AppResult<HttpResponse> {
    let employee_id = path.into_inner();
    if auth.employee_id != Some(employee_id) {
        auth.require_privilege(Privilege::ManageEmployees)?;
    }

    let sql = format!("SELECT {EMPLOYEE_COLUMNS} FROM employees WHERE id = ?");
    let employee = sqlx::query_as::<_, Employee>(&sql)
        .bind(employee_id)
        .fetch_optional(pool.get_ref())
        .await
        .map_err(|e| {
            error!(error = %e, employee_id, "Failed to fetch employee");
            AppError::Database(e)
        })?
        .ok_or_else(|| AppError::NotFound("Employee not found".into()))?;

    Ok(HttpResponse::Ok().json(employee))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn new_employee() -> CreateEmployee {
        CreateEmployee {
            employee_code: "EMP-001".into(),
            full_name: "Siti Rahayu".into(),
            email: "siti@company.co.id".into(),
            phone: None,
            work_unit_id: Some(1),
            shift_id: Some(1),
            account: None,
        }
    }

    #[test]
    fn test_new_employee_is_valid() {
        assert!(validate_new_employee(&new_employee()).is_ok());
    }

    #[test]
    fn test_rejects_bad_email_and_blank_name() {
        let mut e = new_employee();
        e.email = "siti".into();
        assert!(validate_new_employee(&e).is_err());

        let mut e = new_employee();
        e.full_name = "  ".into();
        assert!(validate_new_employee(&e).is_err());
    }

    #[test]
    fn test_account_password_has_minimum_length() {
        let mut e = new_employee();
        e.account = Some(NewAccount {
            username: "siti".into(),
            password: "short".into(),
        });
        assert!(validate_new_employee(&e).is_err());
    }

    #[test]
    fn test_patch_can_clear_shift_and_deactivate() {
        let update = employee_update(5, &json!({ "shift_id": null, "status": "inactive" })).unwrap();
        assert_eq!(update.value_of("shift_id"), Some(&SqlValue::Null));
        assert_eq!(
            update.value_of("status"),
            Some(&SqlValue::String("inactive".into()))
        );
    }

    #[test]
    fn test_patch_rejects_unknown_status_and_columns() {
        assert!(employee_update(5, &json!({ "status": "fired" })).is_err());
        assert!(employee_update(5, &json!({ "created_at": "2020-01-01" })).is_err());
        assert!(employee_update(5, &json!({ "email": "nope" })).is_err());
    }
}
