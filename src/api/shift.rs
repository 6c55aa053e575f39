use crate::{
    auth::auth::AuthUser,
    core::{CoreError, minute_of_day, parse_clock_time},
    error::{AppError, AppResult},
    model::{privilege::Privilege, shift::Shift},
    models::MessageResponse,
    utils::assignment_cache::AssignmentCache,
};
use actix_web::{HttpResponse, web};
use chrono::NaiveTime;
use serde::Deserialize;
use sqlx::MySqlPool;
use tracing::{error, info};
use utoipa::ToSchema;

/// Body of create and replace.
#[derive(Debug, Deserialize, ToSchema)]
pub struct ShiftInput {
    #[schema(example = "Pagi")]
    pub name: String,
    /// `HH:MM` or `HH:MM:SS`; may be left empty while the shift is drafted.
    #[schema(example = "08:00")]
    pub start_time: Option<String>,
    #[schema(example = "17:00")]
    pub end_time: Option<String>,
    #[serde(default)]
    #[schema(example = 10)]
    pub tolerance_minutes: i32,
}

/// Parsed and checked shift columns.
#[derive(Debug, PartialEq)]
pub struct ShiftColumns {
    pub name: String,
    pub start_time: Option<NaiveTime>,
    pub end_time: Option<NaiveTime>,
    pub tolerance_minutes: i32,
}

fn parse_optional_time(raw: Option<&str>) -> AppResult<Option<NaiveTime>> {
    match raw.map(str::trim).filter(|s| !s.is_empty()) {
        Some(s) => Ok(Some(parse_clock_time(s)?)),
        None => Ok(None),
    }
}

impl ShiftInput {
    pub fn validate(&self) -> AppResult<ShiftColumns> {
        let name = self.name.trim();
        if name.is_empty() {
            return Err(AppError::BadRequest("name is required".into()));
        }
        if self.tolerance_minutes < 0 {
            return Err(CoreError::InvalidTolerance(self.tolerance_minutes as i64).into());
        }

        let start_time = parse_optional_time(self.start_time.as_deref())?;
        let end_time = parse_optional_time(self.end_time.as_deref())?;

        // shifts never cross midnight
        if let (Some(start), Some(end)) = (start_time, end_time) {
            if minute_of_day(end) <= minute_of_day(start) {
                return Err(AppError::BadRequest(
                    "end_time must be after start_time".into(),
                ));
            }
        }

        Ok(ShiftColumns {
            name: name.to_string(),
            start_time,
            end_time,
            tolerance_minutes: self.tolerance_minutes,
        })
    }
}

const SHIFT_COLUMNS: &str = "id, name, start_time, end_time, tolerance_minutes, created_at";

fn map_duplicate(e: sqlx::Error) -> AppError {
    if AppError::is_duplicate_key(&e) {
        AppError::Conflict("A shift with this name already exists".into())
    } else {
        error!(error = %e, "Shift write failed");
        AppError::Database(e)
    }
}

#[utoipa::path(
    post,
    path = "/api/shifts",
    request_body = ShiftInput,
    responses(
        (status = 201, description = "Shift created", body = Shift),
        (status = 400, description = "Invalid time or tolerance"),
        (status = 403, description = "Forbidden"),
        (status = 409, description = "Duplicate name")
    ),
    security(("bearer_auth" = [])),
    tag = "Shift"
)]
pub async fn create_shift(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    payload: web::Json<ShiftInput>,
) -> AppResult<HttpResponse> {
    auth.require_privilege(Privilege::ManageShifts)?;
    let columns = payload.validate()?;

    let id = sqlx::query(
        r#"
        INSERT INTO shifts (name, start_time, end_time, tolerance_minutes)
        VALUES (?, ?, ?, ?)
        "#,
    )
    .bind(&columns.name)
    .bind(columns.start_time)
    .bind(columns.end_time)
    .bind(columns.tolerance_minutes)
    .execute(pool.get_ref())
    .await
    .map_err(map_duplicate)?
    .last_insert_id();

    info!(shift_id = id, name = %columns.name, "Shift created");
    let shift = fetch_shift(pool.get_ref(), id).await?;
    Ok(HttpResponse::Created().json(shift))
}

async fn fetch_shift(pool: &MySqlPool, id: u64) -> AppResult<Shift> {
    let sql = format!("SELECT {SHIFT_COLUMNS} FROM shifts WHERE id = ?");
    sqlx::query_as::<_, Shift>(&sql)
        .bind(id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| AppError::NotFound("Shift not found".into()))
}

#[utoipa::path(
    get,
    path = "/api/shifts",
    responses(
        (status = 200, description = "All shifts ordered by name", body = [Shift]),
        (status = 403, description = "Forbidden")
    ),
    security(("bearer_auth" = [])),
    tag = "Shift"
)]
pub async fn list_shifts(auth: AuthUser, pool: web::Data<MySqlPool>) -> AppResult<HttpResponse> {
    auth.require_hr_or_admin()?;

    let sql = format!("SELECT {SHIFT_COLUMNS} FROM shifts ORDER BY name");
    let shifts = sqlx::query_as::<_, Shift>(&sql)
        .fetch_all(pool.get_ref())
        .await?;
    Ok(HttpResponse::Ok().json(shifts))
}

#[utoipa::path(
    get,
    path = "/api/shifts/{shift_id}",
    params(("shift_id" = u64, Path, description = "Shift ID")),
    responses(
        (status = 200, description = "Shift found", body = Shift),
        (status = 404, description = "Shift not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Shift"
)]
pub async fn get_shift(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
) -> AppResult<HttpResponse> {
    auth.require_hr_or_admin()?;
    let shift = fetch_shift(pool.get_ref(), path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(shift))
}

#[utoipa::path(
    put,
    path = "/api/shifts/{shift_id}",
    params(("shift_id" = u64, Path, description = "Shift ID")),
    request_body = ShiftInput,
    responses(
        (status = 200, description = "Shift replaced", body = Shift),
        (status = 400, description = "Invalid time or tolerance"),
        (status = 404, description = "Shift not found"),
        (status = 409, description = "Duplicate name")
    ),
    security(("bearer_auth" = [])),
    tag = "Shift"
)]
pub async fn update_shift(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    cache: web::Data<AssignmentCache>,
    path: web::Path<u64>,
    payload: web::Json<ShiftInput>,
) -> AppResult<HttpResponse> {
    auth.require_privilege(Privilege::ManageShifts)?;
    let id = path.into_inner();
    let columns = payload.validate()?;

    sqlx::query(
        r#"
        UPDATE shifts
        SET name = ?, start_time = ?, end_time = ?, tolerance_minutes = ?
        WHERE id = ?
        "#,
    )
    .bind(&columns.name)
    .bind(columns.start_time)
    .bind(columns.end_time)
    .bind(columns.tolerance_minutes)
    .bind(id)
    .execute(pool.get_ref())
    .await
    .map_err(map_duplicate)?;

    // every employee on this shift is affected
    cache.invalidate_all();

    let shift = fetch_shift(pool.get_ref(), id).await?;
    info!(shift_id = id, updated_by = auth.user_id, "Shift updated");
    Ok(HttpResponse::Ok().json(shift))
}

#[utoipa::path(
    delete,
    path = "/api/shifts/{shift_id}",
    params(("shift_id" = u64, Path, description = "Shift ID")),
    responses(
        (status = 200, description = "Shift deleted; employees on it are left without a shift", body = MessageResponse),
        (status = 404, description = "Shift not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Shift"
)]
pub async fn delete_shift(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    cache: web::Data<AssignmentCache>,
    path: web::Path<u64>,
) -> AppResult<HttpResponse> {
    auth.require_privilege(Privilege::ManageShifts)?;
    let id = path.into_inner();

    let result = sqlx::query("DELETE FROM shifts WHERE id = ?")
        .bind(id)
        .execute(pool.get_ref())
        .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound("Shift not found".into()));
    }

    cache.invalidate_all();
    info!(shift_id = id, deleted_by = auth.user_id, "Shift deleted");
    Ok(HttpResponse::Ok().json(MessageResponse::new("Shift deleted")))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input(start: Option<&str>, end: Option<&str>, tolerance: i32) -> ShiftInput {
        ShiftInput {
            name: " Pagi ".into(),
            start_time: start.map(String::from),
            end_time: end.map(String::from),
            tolerance_minutes: tolerance,
        }
    }

    #[test]
    fn test_valid_shift_is_trimmed_and_parsed() {
        let columns = input(Some("08:00"), Some("17:00:00"), 10).validate().unwrap();
        assert_eq!(columns.name, "Pagi");
        assert_eq!(columns.start_time, NaiveTime::from_hms_opt(8, 0, 0));
        assert_eq!(columns.end_time, NaiveTime::from_hms_opt(17, 0, 0));
    }

    #[test]
    fn test_draft_shift_without_times_is_allowed() {
        let columns = input(None, Some(""), 0).validate().unwrap();
        assert_eq!(columns.start_time, None);
        assert_eq!(columns.end_time, None);
    }

    #[test]
    fn test_negative_tolerance_is_rejected() {
        assert!(matches!(
            input(Some("08:00"), None, -1).validate(),
            Err(AppError::Core(CoreError::InvalidTolerance(-1)))
        ));
    }

    #[test]
    fn test_overnight_shift_is_rejected() {
        assert!(input(Some("22:00"), Some("06:00"), 0).validate().is_err());
    }

    #[test]
    fn test_malformed_time_is_rejected() {
        assert!(matches!(
            input(Some("8 o'clock"), None, 0).validate(),
            Err(AppError::Core(CoreError::InvalidClockTime(_)))
        ));
    }
}
