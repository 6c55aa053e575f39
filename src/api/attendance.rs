use crate::{
    auth::auth::AuthUser,
    core::{
        AttendanceStatus, CivilClock, CoreError, GeoPoint, Missing, ZoneCheck, evaluate_zone,
        resolve_status,
    },
    error::{AppError, AppResult},
    model::{
        assignment::{ASSIGNMENT_SELECT, EmployeeAssignment},
        attendance::Attendance,
        privilege::Privilege,
    },
    utils::{
        assignment_cache::AssignmentCache,
        db_utils::{optional_sql_date, page_window},
        file_store::{FileKind, FileStore},
    },
};
use actix_web::{HttpResponse, web};
use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};
use sqlx::MySqlPool;
use tracing::{error, info, warn};
use utoipa::{IntoParams, ToSchema};

/// Devices send coordinates either as JSON numbers or as numeric strings.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum CoordinateInput {
    Number(f64),
    Text(String),
}

impl CoordinateInput {
    fn as_text(&self) -> String {
        match self {
            CoordinateInput::Number(n) => n.to_string(),
            CoordinateInput::Text(s) => s.clone(),
        }
    }
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct AttendanceSubmission {
    #[schema(example = "-6.200000", value_type = String)]
    pub latitude: CoordinateInput,
    #[schema(example = "106.816666", value_type = String)]
    pub longitude: CoordinateInput,
    /// Base64 JPEG/PNG taken by the device camera.
    #[schema(example = "/9j/4AAQSkZJRgABAQ...")]
    pub photo: String,
}

impl AttendanceSubmission {
    pub fn point(&self) -> AppResult<GeoPoint> {
        Ok(GeoPoint::parse(
            &self.latitude.as_text(),
            &self.longitude.as_text(),
        )?)
    }
}

/// What a successful check-in will record.
#[derive(Debug, Clone, PartialEq)]
pub struct CheckInDecision {
    pub status: AttendanceStatus,
    pub zone: ZoneCheck,
    pub work_unit_id: u64,
}

fn require_active(assignment: &EmployeeAssignment) -> AppResult<()> {
    if assignment.is_active() {
        Ok(())
    } else {
        Err(AppError::Forbidden("Employee is not active".into()))
    }
}

/// Accepts or rejects a check-in and classifies it.
pub fn decide_check_in(
    assignment: &EmployeeAssignment,
    point: GeoPoint,
    now: NaiveTime,
) -> AppResult<CheckInDecision> {
    require_active(assignment)?;

    let zone = assignment.zone()?;
    let schedule = assignment.schedule()?;
    let work_unit_id = assignment
        .work_unit_id
        .ok_or(CoreError::ConfigurationMissing(Missing::WorkUnitZone))?;

    let check = evaluate_zone(point, &zone);
    if !check.inside {
        return Err(AppError::OutsideZone {
            distance_meters: check.distance_meters,
            radius_meters: check.radius_meters,
        });
    }

    Ok(CheckInDecision {
        status: resolve_status(Some(now), &schedule),
        zone: check,
        work_unit_id,
    })
}

/// Validates a check-out against today's record and the work unit.
pub fn decide_check_out(
    assignment: &EmployeeAssignment,
    record: Option<&Attendance>,
    point: GeoPoint,
) -> AppResult<ZoneCheck> {
    require_active(assignment)?;

    let record = record.ok_or(AppError::NotCheckedIn)?;
    if record.check_in.is_none() {
        return Err(AppError::NotCheckedIn);
    }
    if record.check_out.is_some() {
        return Err(AppError::AlreadyCheckedOut);
    }
    if record.work_unit_id != assignment.work_unit_id {
        return Err(AppError::WorkUnitMismatch);
    }

    let zone = assignment.zone()?;
    let check = evaluate_zone(point, &zone);
    if !check.inside {
        return Err(AppError::OutsideZone {
            distance_meters: check.distance_meters,
            radius_meters: check.radius_meters,
        });
    }
    Ok(check)
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct CheckInResponse {
    #[schema(example = "Checked in successfully")]
    pub message: String,
    pub status: AttendanceStatus,
    #[schema(example = "2026-01-05", value_type = String, format = "date")]
    pub date: NaiveDate,
    #[schema(example = "08:57:12", value_type = String, format = "time")]
    pub time: NaiveTime,
    pub zone: ZoneCheck,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct CheckOutResponse {
    #[schema(example = "Checked out successfully")]
    pub message: String,
    #[schema(example = "17:03:40", value_type = String, format = "time")]
    pub time: NaiveTime,
    pub zone: ZoneCheck,
}

const ATTENDANCE_COLUMNS: &str = r#"
    id, employee_id, work_unit_id, date, check_in, check_out, status,
    check_in_latitude, check_in_longitude, check_in_distance_meters, check_in_photo,
    check_out_latitude, check_out_longitude, check_out_distance_meters, check_out_photo,
    created_at
"#;

async fn find_record(
    pool: &MySqlPool,
    employee_id: u64,
    date: NaiveDate,
) -> Result<Option<Attendance>, sqlx::Error> {
    let sql = format!("SELECT {ATTENDANCE_COLUMNS} FROM attendance WHERE employee_id = ? AND date = ?");
    sqlx::query_as::<_, Attendance>(&sql)
        .bind(employee_id)
        .bind(date)
        .fetch_optional(pool)
        .await
}

async fn load_assignment(
    pool: &MySqlPool,
    cache: &AssignmentCache,
    employee_id: u64,
) -> AppResult<EmployeeAssignment> {
    cache
        .get(pool, employee_id)
        .await
        .map_err(|e| {
            error!(error = %e, employee_id, "Failed to load employee assignment");
            AppError::Database(e)
        })?
        .ok_or_else(|| AppError::NotFound("Employee not found".into()))
}

/// Check-in endpoint
#[utoipa::path(
    post,
    path = "/api/attendance/check-in",
    request_body = AttendanceSubmission,
    responses(
        (status = 200, description = "Checked in successfully", body = CheckInResponse),
        (status = 400, description = "Invalid coordinates, outside the radius, or already checked in today", body = Object, example = json!({
            "message": "Outside the work unit radius",
            "code": "outside_radius",
            "distance_meters": 150.2,
            "radius_meters": 100.0
        })),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden"),
        (status = 422, description = "Work unit or shift not configured"),
        (status = 500, description = "Internal server error")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Attendance"
)]
pub async fn check_in(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    cache: web::Data<AssignmentCache>,
    store: web::Data<FileStore>,
    clock: web::Data<CivilClock>,
    payload: web::Json<AttendanceSubmission>,
) -> AppResult<HttpResponse> {
    let employee_id = auth.require_employee_id()?;
    let point = payload.point()?;
    let photo = store.decode(FileKind::CheckIn, &payload.photo)?;

    let now = clock.now();
    let assignment = load_assignment(pool.get_ref(), &cache, employee_id).await?;
    let decision = decide_check_in(&assignment, point, now.time)?;

    if find_record(pool.get_ref(), employee_id, now.date).await?.is_some() {
        return Err(AppError::AlreadyCheckedIn);
    }

    let photo_path = store.save(FileKind::CheckIn, photo).await?;

    let result = sqlx::query(
        r#"
        INSERT INTO attendance
            (employee_id, work_unit_id, date, check_in, status,
             check_in_latitude, check_in_longitude, check_in_distance_meters, check_in_photo)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(employee_id)
    .bind(decision.work_unit_id)
    .bind(now.date)
    .bind(now.time)
    .bind(decision.status.as_ref())
    .bind(point.latitude)
    .bind(point.longitude)
    .bind(decision.zone.distance_meters)
    .bind(&photo_path)
    .execute(pool.get_ref())
    .await;

    match result {
        Ok(_) => {
            info!(
                employee_id,
                status = %decision.status,
                distance_meters = decision.zone.distance_meters,
                "Checked in"
            );
            Ok(HttpResponse::Ok().json(CheckInResponse {
                message: "Checked in successfully".into(),
                status: decision.status,
                date: now.date,
                time: now.time,
                zone: decision.zone,
            }))
        }
        // Duplicate check-in for same day
        Err(e) if AppError::is_duplicate_key(&e) => {
            store.discard(&photo_path).await;
            Err(AppError::AlreadyCheckedIn)
        }
        Err(e) => {
            error!(error = %e, employee_id, "Check-in failed");
            store.discard(&photo_path).await;
            Err(AppError::Database(e))
        }
    }
}

/// Check-out endpoint
#[utoipa::path(
    post,
    path = "/api/attendance/check-out",
    request_body = AttendanceSubmission,
    responses(
        (status = 200, description = "Checked out successfully", body = CheckOutResponse),
        (status = 400, description = "No check-in today, already checked out, different work unit, or outside the radius"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden"),
        (status = 500, description = "Internal server error")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Attendance"
)]
pub async fn check_out(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    cache: web::Data<AssignmentCache>,
    store: web::Data<FileStore>,
    clock: web::Data<CivilClock>,
    payload: web::Json<AttendanceSubmission>,
) -> AppResult<HttpResponse> {
    let employee_id = auth.require_employee_id()?;
    let point = payload.point()?;
    let photo = store.decode(FileKind::CheckOut, &payload.photo)?;

    let now = clock.now();
    let assignment = load_assignment(pool.get_ref(), &cache, employee_id).await?;
    let record = find_record(pool.get_ref(), employee_id, now.date).await?;
    let zone = decide_check_out(&assignment, record.as_ref(), point)?;
    let Some(record) = record else {
        return Err(AppError::NotCheckedIn);
    };

    let photo_path = store.save(FileKind::CheckOut, photo).await?;

    let result = sqlx::query(
        r#"
        UPDATE attendance
        SET check_out = ?,
            check_out_latitude = ?,
            check_out_longitude = ?,
            check_out_distance_meters = ?,
            check_out_photo = ?
        WHERE id = ?
        AND check_out IS NULL
        "#,
    )
    .bind(now.time)
    .bind(point.latitude)
    .bind(point.longitude)
    .bind(zone.distance_meters)
    .bind(&photo_path)
    .bind(record.id)
    .execute(pool.get_ref())
    .await;

    let result = match result {
        Ok(result) => result,
        Err(e) => {
            error!(error = %e, employee_id, "Check-out failed");
            store.discard(&photo_path).await;
            return Err(AppError::Database(e));
        }
    };

    if result.rows_affected() == 0 {
        store.discard(&photo_path).await;
        return Err(AppError::AlreadyCheckedOut);
    }

    info!(employee_id, distance_meters = zone.distance_meters, "Checked out");
    Ok(HttpResponse::Ok().json(CheckOutResponse {
        message: "Checked out successfully".into(),
        time: now.time,
        zone,
    }))
}

/// Today's record for the signed-in employee, `null` if none yet.
#[utoipa::path(
    get,
    path = "/api/attendance/today",
    responses(
        (status = 200, description = "Today's attendance record or null", body = Attendance),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden")
    ),
    security(("bearer_auth" = [])),
    tag = "Attendance"
)]
pub async fn today(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    clock: web::Data<CivilClock>,
) -> AppResult<HttpResponse> {
    let employee_id = auth.require_employee_id()?;
    let record = find_record(pool.get_ref(), employee_id, clock.today()).await?;
    Ok(HttpResponse::Ok().json(record))
}

#[derive(Debug, Deserialize, IntoParams, ToSchema)]
pub struct HistoryQuery {
    #[schema(example = "2026-01-01", value_type = Option<String>, format = "date")]
    pub from: Option<NaiveDate>,
    #[schema(example = "2026-01-31", value_type = Option<String>, format = "date")]
    pub to: Option<NaiveDate>,
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}

/// `WHERE` clause for the history query; only the bounds given are applied.
pub fn history_filter(
    from: Option<NaiveDate>,
    to: Option<NaiveDate>,
) -> AppResult<(String, Vec<NaiveDate>)> {
    let from = optional_sql_date("from", from)?;
    let to = optional_sql_date("to", to)?;
    if let (Some(from), Some(to)) = (from, to) {
        if from > to {
            return Err(AppError::BadRequest("from cannot be after to".into()));
        }
    }

    let mut where_sql = String::from(" WHERE employee_id = ?");
    let mut dates = Vec::with_capacity(2);
    if let Some(from) = from {
        where_sql.push_str(" AND date >= ?");
        dates.push(from);
    }
    if let Some(to) = to {
        where_sql.push_str(" AND date <= ?");
        dates.push(to);
    }
    Ok((where_sql, dates))
}

#[derive(Serialize, ToSchema)]
pub struct AttendanceListResponse {
    pub data: Vec<Attendance>,
    #[schema(example = 1)]
    pub page: u32,
    #[schema(example = 31)]
    pub per_page: u32,
    #[schema(example = 22)]
    pub total: i64,
}

#[utoipa::path(
    get,
    path = "/api/attendance/history",
    params(HistoryQuery),
    responses(
        (status = 200, description = "Own attendance records, newest first", body = AttendanceListResponse),
        (status = 400, description = "from is after to, or a date outside 1000-01-01..9999-12-31"),
        (status = 401, description = "Unauthorized")
    ),
    security(("bearer_auth" = [])),
    tag = "Attendance"
)]
pub async fn history(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    query: web::Query<HistoryQuery>,
) -> AppResult<HttpResponse> {
    let employee_id = auth.require_employee_id()?;

    let (where_sql, dates) = history_filter(query.from, query.to)?;
    let (page, per_page, offset) = page_window(query.page, query.per_page, 31);

    let count_sql = format!("SELECT COUNT(*) FROM attendance{where_sql}");
    let mut count_q = sqlx::query_scalar::<_, i64>(&count_sql).bind(employee_id);
    for date in &dates {
        count_q = count_q.bind(*date);
    }
    let total = count_q.fetch_one(pool.get_ref()).await?;

    let sql = format!(
        "SELECT {ATTENDANCE_COLUMNS} FROM attendance{where_sql} ORDER BY date DESC LIMIT ? OFFSET ?"
    );
    let mut data_q = sqlx::query_as::<_, Attendance>(&sql).bind(employee_id);
    for date in &dates {
        data_q = data_q.bind(*date);
    }
    let data = data_q
        .bind(per_page as i64)
        .bind(offset as i64)
        .fetch_all(pool.get_ref())
        .await?;

    Ok(HttpResponse::Ok().json(AttendanceListResponse {
        data,
        page,
        per_page,
        total,
    }))
}

#[derive(Debug, Deserialize, IntoParams, ToSchema)]
pub struct CloseDayQuery {
    /// Civil date to close; defaults to today.
    #[schema(example = "2026-01-05", value_type = Option<String>, format = "date")]
    pub date: Option<NaiveDate>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CloseDayResponse {
    #[schema(example = "2026-01-05", value_type = String, format = "date")]
    pub date: NaiveDate,
    /// Employees recorded as absent by this call.
    pub marked_absent: u64,
    /// Employees skipped because their shift is not fully configured.
    pub skipped_unconfigured: u64,
}

/// Records an `absent` row for every active employee with a shift who has
/// no record and no approved leave on the given civil date.
#[utoipa::path(
    post,
    path = "/api/attendance/close-day",
    params(CloseDayQuery),
    responses(
        (status = 200, description = "Absentees recorded", body = CloseDayResponse),
        (status = 400, description = "Date is in the future"),
        (status = 403, description = "Forbidden")
    ),
    security(("bearer_auth" = [])),
    tag = "Attendance"
)]
pub async fn close_day(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    clock: web::Data<CivilClock>,
    query: web::Query<CloseDayQuery>,
) -> AppResult<HttpResponse> {
    auth.require_privilege(Privilege::ManageEmployees)?;

    let today = clock.today();
    let date = optional_sql_date("date", query.date)?.unwrap_or(today);
    if date > today {
        return Err(AppError::BadRequest("Cannot close a future date".into()));
    }

    let sql = format!(
        r#"{ASSIGNMENT_SELECT}
        WHERE e.status = 'active'
        AND e.shift_id IS NOT NULL
        AND NOT EXISTS (SELECT 1 FROM attendance a WHERE a.employee_id = e.id AND a.date = ?)
        AND NOT EXISTS (
            SELECT 1 FROM leave_requests l
            WHERE l.employee_id = e.id
            AND l.status = 'approved'
            AND ? BETWEEN l.start_date AND l.end_date
        )
        "#
    );
    let candidates = sqlx::query_as::<_, EmployeeAssignment>(&sql)
        .bind(date)
        .bind(date)
        .fetch_all(pool.get_ref())
        .await?;

    let mut marked_absent = 0u64;
    let mut skipped_unconfigured = 0u64;

    for candidate in &candidates {
        let schedule = match candidate.schedule() {
            Ok(s) => s,
            Err(e) => {
                warn!(employee_id = candidate.employee_id, error = %e, "Skipping absentee");
                skipped_unconfigured += 1;
                continue;
            }
        };
        let status = resolve_status(None, &schedule);

        let result = sqlx::query(
            r#"
            INSERT IGNORE INTO attendance (employee_id, work_unit_id, date, status)
            VALUES (?, ?, ?, ?)
            "#,
        )
        .bind(candidate.employee_id)
        .bind(candidate.work_unit_id)
        .bind(date)
        .bind(status.as_ref())
        .execute(pool.get_ref())
        .await?;

        marked_absent += result.rows_affected();
    }

    info!(%date, marked_absent, skipped_unconfigured, closed_by = auth.user_id, "Closed attendance day");
    Ok(HttpResponse::Ok().json(CloseDayResponse {
        date,
        marked_absent,
        skipped_unconfigured,
    }))
}
