use crate::{
    auth::auth::AuthUser,
    error::{AppError, AppResult},
    model::{
        leave_request::{LeaveRequest, LeaveStatus, LeaveType},
        privilege::Privilege,
    },
    models::MessageResponse,
    utils::{
        db_utils::{page_window, sql_date},
        file_store::{FileKind, FileStore},
    },
};
use actix_web::{HttpResponse, web};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use sqlx::MySqlPool;
use tracing::{error, info};
use utoipa::{IntoParams, ToSchema};

#[derive(Deserialize, ToSchema)]
pub struct CreateLeave {
    #[schema(example = "2026-01-01", format = "date", value_type = String)]
    pub start_date: NaiveDate,
    #[schema(example = "2026-01-03", format = "date", value_type = String)]
    pub end_date: NaiveDate,
    #[schema(example = "sick")]
    pub leave_type: LeaveType, // enum ensures Swagger dropdown
    #[schema(example = "Demam")]
    pub reason: String,
    /// Optional base64 JPEG, PNG or PDF (a doctor's note, for example).
    pub attachment: Option<String>,
}

pub const MAX_REASON_LEN: usize = 500;

/// Field checks that need no database.
pub fn validate_leave(payload: &CreateLeave) -> AppResult<()> {
    sql_date("start_date", payload.start_date)?;
    sql_date("end_date", payload.end_date)?;
    if payload.start_date > payload.end_date {
        return Err(AppError::BadRequest(
            "start_date cannot be after end_date".into(),
        ));
    }
    let reason = payload.reason.trim();
    if reason.is_empty() {
        return Err(AppError::BadRequest("reason is required".into()));
    }
    if reason.chars().count() > MAX_REASON_LEN {
        return Err(AppError::BadRequest(format!(
            "reason cannot exceed {MAX_REASON_LEN} characters"
        )));
    }
    Ok(())
}

#[derive(Serialize, ToSchema)]
pub struct LeaveListResponse {
    pub data: Vec<LeaveRequest>,
    #[schema(example = 1)]
    pub page: u32,
    #[schema(example = 10)]
    pub per_page: u32,
    #[schema(example = 1)]
    pub total: i64,
}

#[derive(Deserialize, IntoParams, ToSchema)]
pub struct LeaveFilter {
    /// Filter by employee ID (ignored for employees, who only see their own)
    #[schema(example = 12)]
    pub employee_id: Option<u64>,
    /// Filter by leave status
    pub status: Option<LeaveStatus>,
    /// Pagination page number (start with 1)
    #[schema(example = 1)]
    pub page: Option<u32>,
    #[schema(example = 10)]
    pub per_page: Option<u32>,
}

#[derive(Deserialize, ToSchema, Default)]
pub struct LeaveDecision {
    #[schema(example = "Get well soon")]
    pub note: Option<String>,
}

// Helper enum for typed SQLx binding
enum FilterValue<'a> {
    U64(u64),
    Str(&'a str),
}

const LEAVE_COLUMNS: &str = r#"
    id, employee_id, start_date, end_date, leave_type, reason, attachment,
    status, decided_by, decided_at, decision_note, created_at
"#;

async fn fetch_leave(pool: &MySqlPool, leave_id: u64) -> AppResult<LeaveRequest> {
    let sql = format!("SELECT {LEAVE_COLUMNS} FROM leave_requests WHERE id = ?");
    sqlx::query_as::<_, LeaveRequest>(&sql)
        .bind(leave_id)
        .fetch_optional(pool)
        .await
        .map_err(|e| {
            error!(error = %e, leave_id, "Failed to fetch leave request");
            AppError::Database(e)
        })?
        .ok_or_else(|| AppError::NotFound("Leave request not found".into()))
}

/* =========================
Create leave request
========================= */
#[utoipa::path(
    post,
    path = "/api/leave",
    request_body(
        content = CreateLeave,
        description = "Leave request payload",
        content_type = "application/json"
    ),
    responses(
        (status = 201, description = "Leave request submitted", body = LeaveRequest),
        (status = 400, description = "Bad request"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden"),
        (status = 409, description = "Overlaps a pending or approved leave")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Leave"
)]
pub async fn create_leave(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    store: web::Data<FileStore>,
    payload: web::Json<CreateLeave>,
) -> AppResult<HttpResponse> {
    let employee_id = auth.require_employee_id()?;
    validate_leave(&payload)?;

    let attachment = payload
        .attachment
        .as_deref()
        .map(|encoded| store.decode(FileKind::Attachment, encoded))
        .transpose()?;

    let overlapping = sqlx::query_scalar::<_, i64>(
        r#"
        SELECT COUNT(*)
        FROM leave_requests
        WHERE employee_id = ?
        AND status IN ('pending', 'approved')
        AND start_date <= ?
        AND end_date >= ?
        "#,
    )
    .bind(employee_id)
    .bind(payload.end_date)
    .bind(payload.start_date)
    .fetch_one(pool.get_ref())
    .await?;

    if overlapping > 0 {
        return Err(AppError::Conflict(
            "Overlaps an existing pending or approved leave".into(),
        ));
    }

    let attachment_path = match attachment {
        Some(file) => Some(store.save(FileKind::Attachment, file).await?),
        None => None,
    };

    let result = sqlx::query(
        r#"
        INSERT INTO leave_requests
            (employee_id, start_date, end_date, leave_type, reason, attachment)
        VALUES (?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(employee_id)
    .bind(payload.start_date)
    .bind(payload.end_date)
    .bind(payload.leave_type.as_ref())
    .bind(payload.reason.trim())
    .bind(&attachment_path)
    .execute(pool.get_ref())
    .await;

    let result = match result {
        Ok(result) => result,
        Err(e) => {
            error!(error = %e, employee_id, "Failed to create leave request");
            if let Some(path) = &attachment_path {
                store.discard(path).await;
            }
            return Err(AppError::Database(e));
        }
    };

    let leave = fetch_leave(pool.get_ref(), result.last_insert_id()).await?;
    info!(employee_id, leave_id = leave.id, leave_type = %payload.leave_type, "Leave request submitted");
    Ok(HttpResponse::Created().json(leave))
}

/// Moves a pending request to `approved` or `rejected`.
async fn decide(
    auth: &AuthUser,
    pool: &MySqlPool,
    leave_id: u64,
    outcome: LeaveStatus,
    note: Option<&str>,
) -> AppResult<HttpResponse> {
    auth.require_privilege(Privilege::ApproveLeave)?;

    let note = note.map(str::trim).filter(|n| !n.is_empty());

    let result = sqlx::query(
        r#"
        UPDATE leave_requests
        SET status = ?, decided_by = ?, decided_at = NOW(), decision_note = ?
        WHERE id = ?
        AND status = 'pending'
        "#,
    )
    .bind(outcome.as_ref())
    .bind(auth.user_id)
    .bind(note)
    .bind(leave_id)
    .execute(pool)
    .await
    .map_err(|e| {
        error!(error = %e, leave_id, "Leave decision failed");
        AppError::Database(e)
    })?;

    if result.rows_affected() == 0 {
        return Err(AppError::BadRequest(
            "Leave request not found or already processed".into(),
        ));
    }

    info!(leave_id, decided_by = auth.user_id, outcome = %outcome, "Leave decided");
    Ok(HttpResponse::Ok().json(MessageResponse::new(format!("Leave {outcome}"))))
}

/* =========================
Approve leave (HR/Admin)
========================= */
#[utoipa::path(
    put,
    path = "/api/leave/{leave_id}/approve",
    params(
        ("leave_id" = u64, Path, description = "ID of the leave request to approve")
    ),
    request_body(content = LeaveDecision, description = "Optional note"),
    responses(
        (status = 200, description = "Leave approved successfully", body = MessageResponse),
        (status = 400, description = "Leave request not found or already processed"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Leave"
)]
pub async fn approve_leave(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
    body: Option<web::Json<LeaveDecision>>,
) -> AppResult<HttpResponse> {
    let note = body.and_then(|b| b.into_inner().note);
    decide(&auth, pool.get_ref(), path.into_inner(), LeaveStatus::Approved, note.as_deref()).await
}

/* =========================
Reject leave (HR/Admin)
========================= */
#[utoipa::path(
    put,
    path = "/api/leave/{leave_id}/reject",
    params(
        ("leave_id" = u64, Path, description = "ID of the leave request to reject")
    ),
    request_body(content = LeaveDecision, description = "Optional note"),
    responses(
        (status = 200, description = "Leave rejected successfully", body = MessageResponse),
        (status = 400, description = "Leave request not found or already processed"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Leave"
)]
pub async fn reject_leave(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
    body: Option<web::Json<LeaveDecision>>,
) -> AppResult<HttpResponse> {
    let note = body.and_then(|b| b.into_inner().note);
    decide(&auth, pool.get_ref(), path.into_inner(), LeaveStatus::Rejected, note.as_deref()).await
}

/* =========================
Cancel own leave (employee)
========================= */
#[utoipa::path(
    put,
    path = "/api/leave/{leave_id}/cancel",
    params(
        ("leave_id" = u64, Path, description = "ID of the leave request to cancel")
    ),
    responses(
        (status = 200, description = "Leave cancelled", body = MessageResponse),
        (status = 400, description = "Leave request not found, not yours, or already processed"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Leave"
)]
pub async fn cancel_leave(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
) -> AppResult<HttpResponse> {
    let employee_id = auth.require_employee_id()?;
    let leave_id = path.into_inner();

    let result = sqlx::query(
        r#"
        UPDATE leave_requests
        SET status = 'cancelled'
        WHERE id = ?
        AND employee_id = ?
        AND status = 'pending'
        "#,
    )
    .bind(leave_id)
    .bind(employee_id)
    .execute(pool.get_ref())
    .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::BadRequest(
            "Leave request not found or already processed".into(),
        ));
    }

    info!(leave_id, employee_id, "Leave cancelled");
    Ok(HttpResponse::Ok().json(MessageResponse::new("Leave cancelled")))
}

/// for getting a leave application details endpoint
#[utoipa::path(
    get,
    path = "/api/leave/{leave_id}",
    params(
        ("leave_id" = u64, Path, description = "ID of the leave request to fetch")
    ),
    responses(
        (status = 200, description = "Leave request found", body = LeaveRequest),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Leave request not found")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Leave"
)]
pub async fn get_leave(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
) -> AppResult<HttpResponse> {
    let leave = fetch_leave(pool.get_ref(), path.into_inner()).await?;

    let owner = auth.employee_id == Some(leave.employee_id);
    if !owner && !auth.has_privilege(Privilege::ApproveLeave) {
        // don't reveal other employees' requests
        return Err(AppError::NotFound("Leave request not found".into()));
    }

    Ok(HttpResponse::Ok().json(leave))
}

/// for getting leave applications endpoint
#[utoipa::path(
    get,
    path = "/api/leave",
    params(LeaveFilter),
    responses(
        (status = 200, description = "Paginated leave list", body = LeaveListResponse),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Leave"
)]
pub async fn leave_list(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    query: web::Query<LeaveFilter>,
) -> AppResult<HttpResponse> {
    let employee_filter = if auth.has_privilege(Privilege::ApproveLeave) {
        query.employee_id
    } else {
        Some(auth.require_employee_id()?)
    };

    let (page, per_page, offset) = page_window(query.page, query.per_page, 10);

    // -------------------------
    // WHERE clause
    // -------------------------
    let mut where_sql = String::from(" WHERE 1=1");
    let mut args: Vec<FilterValue> = Vec::new();

    if let Some(emp_id) = employee_filter {
        where_sql.push_str(" AND employee_id = ?");
        args.push(FilterValue::U64(emp_id));
    }

    if let Some(status) = &query.status {
        where_sql.push_str(" AND status = ?");
        args.push(FilterValue::Str(status.as_ref()));
    }

    // -------------------------
    // COUNT query
    // -------------------------
    let count_sql = format!("SELECT COUNT(*) FROM leave_requests{where_sql}");

    let mut count_q = sqlx::query_scalar::<_, i64>(&count_sql);
    for arg in &args {
        count_q = match arg {
            FilterValue::U64(v) => count_q.bind(*v),
            FilterValue::Str(s) => count_q.bind(*s),
        };
    }

    let total = count_q.fetch_one(pool.get_ref()).await.map_err(|e| {
        error!(error = %e, "Failed to count leave requests");
        AppError::Database(e)
    })?;

    // -------------------------
    // DATA query
    // -------------------------
    let data_sql = format!(
        r#"
        SELECT {LEAVE_COLUMNS}
        FROM leave_requests
        {where_sql}
        ORDER BY created_at DESC
        LIMIT ? OFFSET ?
        "#
    );

    let mut data_q = sqlx::query_as::<_, LeaveRequest>(&data_sql);
    for arg in args {
        data_q = match arg {
            FilterValue::U64(v) => data_q.bind(v),
            FilterValue::Str(s) => data_q.bind(s),
        };
    }

    let leaves = data_q
        .bind(per_page as i64)
        .bind(offset as i64)
        .fetch_all(pool.get_ref())
        .await
        .map_err(|e| {
            error!(error = %e, "Failed to fetch leave list");
            AppError::Database(e)
        })?;

    Ok(HttpResponse::Ok().json(LeaveListResponse {
        data: leaves,
        page,
        per_page,
        total,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn leave(start: (i32, u32, u32), end: (i32, u32, u32), reason: &str) -> CreateLeave {
        CreateLeave {
            start_date: NaiveDate::from_ymd_opt(start.0, start.1, start.2).unwrap(),
            end_date: NaiveDate::from_ymd_opt(end.0, end.1, end.2).unwrap(),
            leave_type: LeaveType::Sick,
            reason: reason.into(),
            attachment: None,
        }
    }

    #[test]
    fn test_single_day_leave_is_valid() {
        assert!(validate_leave(&leave((2026, 1, 5), (2026, 1, 5), "Demam")).is_ok());
    }

    #[test]
    fn test_end_before_start_is_rejected() {
        let err = validate_leave(&leave((2026, 1, 5), (2026, 1, 4), "Demam")).unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));
    }

    #[test]
    fn test_dates_outside_mysql_range_are_rejected() {
        let err = validate_leave(&leave((-1, 1, 5), (2026, 1, 5), "Demam")).unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));
        assert!(validate_leave(&leave((2026, 1, 5), (10000, 1, 5), "Demam")).is_err());
    }

    #[test]
    fn test_blank_reason_is_rejected() {
        assert!(validate_leave(&leave((2026, 1, 5), (2026, 1, 6), "   ")).is_err());
    }

    #[test]
    fn test_overlong_reason_is_rejected() {
        let reason = "x".repeat(MAX_REASON_LEN + 1);
        assert!(validate_leave(&leave((2026, 1, 5), (2026, 1, 6), &reason)).is_err());
    }

    #[test]
    fn test_create_payload_parses_permission_type() {
        let payload: CreateLeave = serde_json::from_value(serde_json::json!({
            "start_date": "2026-02-01",
            "end_date": "2026-02-01",
            "leave_type": "permission",
            "reason": "Family event"
        }))
        .unwrap();
        assert_eq!(payload.leave_type, LeaveType::Permission);
        assert!(payload.attachment.is_none());
    }
}
