use crate::{
    auth::auth::AuthUser,
    core::{CoreError, GeoPoint},
    error::{AppError, AppResult},
    model::{privilege::Privilege, work_unit::WorkUnit},
    models::MessageResponse,
    utils::assignment_cache::AssignmentCache,
};
use actix_web::{HttpResponse, web};
use serde::Deserialize;
use sqlx::MySqlPool;
use tracing::{error, info};
use utoipa::ToSchema;

#[derive(Debug, Deserialize, ToSchema)]
pub struct WorkUnitInput {
    #[schema(example = "Kantor Pusat")]
    pub name: String,
    #[schema(example = "Jl. Sudirman No. 1, Jakarta")]
    pub address: Option<String>,
    #[schema(example = json!(-6.2))]
    pub latitude: Option<f64>,
    #[schema(example = 106.816666)]
    pub longitude: Option<f64>,
    #[schema(example = 100.0)]
    pub radius_meters: Option<f64>,
}

impl WorkUnitInput {
    /// Location fields may be left out entirely while the unit is set up,
    /// but a partial location is rejected.
    pub fn validate(&self) -> AppResult<()> {
        if self.name.trim().is_empty() {
            return Err(AppError::BadRequest("name is required".into()));
        }

        match (self.latitude, self.longitude) {
            (Some(lat), Some(lon)) => {
                GeoPoint::new(lat, lon)?;
            }
            (None, None) => {}
            _ => {
                return Err(AppError::BadRequest(
                    "latitude and longitude must be given together".into(),
                ));
            }
        }

        if let Some(radius) = self.radius_meters {
            if !radius.is_finite() || radius <= 0.0 {
                return Err(CoreError::InvalidRadius(radius).into());
            }
        }
        Ok(())
    }
}

const WORK_UNIT_COLUMNS: &str =
    "id, name, address, latitude, longitude, radius_meters, created_at";

fn map_duplicate(e: sqlx::Error) -> AppError {
    if AppError::is_duplicate_key(&e) {
        AppError::Conflict("A work unit with this name already exists".into())
    } else {
        error!(error = %e, "Work unit write failed");
        AppError::Database(e)
    }
}

async fn fetch_work_unit(pool: &MySqlPool, id: u64) -> AppResult<WorkUnit> {
    let sql = format!("SELECT {WORK_UNIT_COLUMNS} FROM work_units WHERE id = ?");
    sqlx::query_as::<_, WorkUnit>(&sql)
        .bind(id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| AppError::NotFound("Work unit not found".into()))
}

#[utoipa::path(
    post,
    path = "/api/work-units",
    request_body = WorkUnitInput,
    responses(
        (status = 201, description = "Work unit created", body = WorkUnit),
        (status = 400, description = "Invalid coordinates or radius"),
        (status = 403, description = "Forbidden"),
        (status = 409, description = "Duplicate name")
    ),
    security(("bearer_auth" = [])),
    tag = "Work Unit"
)]
pub async fn create_work_unit(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    payload: web::Json<WorkUnitInput>,
) -> AppResult<HttpResponse> {
    auth.require_privilege(Privilege::ManageWorkUnits)?;
    payload.validate()?;

    let id = sqlx::query(
        r#"
        INSERT INTO work_units (name, address, latitude, longitude, radius_meters)
        VALUES (?, ?, ?, ?, ?)
        "#,
    )
    .bind(payload.name.trim())
    .bind(payload.address.as_deref().map(str::trim))
    .bind(payload.latitude)
    .bind(payload.longitude)
    .bind(payload.radius_meters)
    .execute(pool.get_ref())
    .await
    .map_err(map_duplicate)?
    .last_insert_id();

    info!(work_unit_id = id, created_by = auth.user_id, "Work unit created");
    let unit = fetch_work_unit(pool.get_ref(), id).await?;
    Ok(HttpResponse::Created().json(unit))
}

#[utoipa::path(
    get,
    path = "/api/work-units",
    responses(
        (status = 200, description = "All work units ordered by name", body = [WorkUnit]),
        (status = 403, description = "Forbidden")
    ),
    security(("bearer_auth" = [])),
    tag = "Work Unit"
)]
pub async fn list_work_units(auth: AuthUser, pool: web::Data<MySqlPool>) -> AppResult<HttpResponse> {
    auth.require_hr_or_admin()?;

    let sql = format!("SELECT {WORK_UNIT_COLUMNS} FROM work_units ORDER BY name");
    let units = sqlx::query_as::<_, WorkUnit>(&sql)
        .fetch_all(pool.get_ref())
        .await?;
    Ok(HttpResponse::Ok().json(units))
}

#[utoipa::path(
    get,
    path = "/api/work-units/{work_unit_id}",
    params(("work_unit_id" = u64, Path, description = "Work unit ID")),
    responses(
        (status = 200, description = "Work unit found", body = WorkUnit),
        (status = 404, description = "Work unit not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Work Unit"
)]
pub async fn get_work_unit(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
) -> AppResult<HttpResponse> {
    auth.require_hr_or_admin()?;
    let unit = fetch_work_unit(pool.get_ref(), path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(unit))
}

#[utoipa::path(
    put,
    path = "/api/work-units/{work_unit_id}",
    params(("work_unit_id" = u64, Path, description = "Work unit ID")),
    request_body = WorkUnitInput,
    responses(
        (status = 200, description = "Work unit replaced", body = WorkUnit),
        (status = 400, description = "Invalid coordinates or radius"),
        (status = 404, description = "Work unit not found"),
        (status = 409, description = "Duplicate name")
    ),
    security(("bearer_auth" = [])),
    tag = "Work Unit"
)]
pub async fn update_work_unit(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    cache: web::Data<AssignmentCache>,
    path: web::Path<u64>,
    payload: web::Json<WorkUnitInput>,
) -> AppResult<HttpResponse> {
    auth.require_privilege(Privilege::ManageWorkUnits)?;
    let id = path.into_inner();
    payload.validate()?;

    sqlx::query(
        r#"
        UPDATE work_units
        SET name = ?, address = ?, latitude = ?, longitude = ?, radius_meters = ?
        WHERE id = ?
        "#,
    )
    .bind(payload.name.trim())
    .bind(payload.address.as_deref().map(str::trim))
    .bind(payload.latitude)
    .bind(payload.longitude)
    .bind(payload.radius_meters)
    .bind(id)
    .execute(pool.get_ref())
    .await
    .map_err(map_duplicate)?;

    cache.invalidate_all();

    let unit = fetch_work_unit(pool.get_ref(), id).await?;
    info!(work_unit_id = id, updated_by = auth.user_id, "Work unit updated");
    Ok(HttpResponse::Ok().json(unit))
}

#[utoipa::path(
    delete,
    path = "/api/work-units/{work_unit_id}",
    params(("work_unit_id" = u64, Path, description = "Work unit ID")),
    responses(
        (status = 200, description = "Work unit deleted", body = MessageResponse),
        (status = 404, description = "Work unit not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Work Unit"
)]
pub async fn delete_work_unit(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    cache: web::Data<AssignmentCache>,
    path: web::Path<u64>,
) -> AppResult<HttpResponse> {
    auth.require_privilege(Privilege::ManageWorkUnits)?;
    let id = path.into_inner();

    let result = sqlx::query("DELETE FROM work_units WHERE id = ?")
        .bind(id)
        .execute(pool.get_ref())
        .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound("Work unit not found".into()));
    }

    cache.invalidate_all();
    info!(work_unit_id = id, deleted_by = auth.user_id, "Work unit deleted");
    Ok(HttpResponse::Ok().json(MessageResponse::new("Work unit deleted")))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input(latitude: Option<f64>, longitude: Option<f64>, radius: Option<f64>) -> WorkUnitInput {
        WorkUnitInput {
            name: "Kantor Pusat".into(),
            address: None,
            latitude,
            longitude,
            radius_meters: radius,
        }
    }

    #[test]
    fn test_full_location_is_valid() {
        assert!(input(Some(-6.2), Some(106.8), Some(100.0)).validate().is_ok());
    }

    #[test]
    fn test_unlocated_unit_is_allowed() {
        assert!(input(None, None, None).validate().is_ok());
    }

    #[test]
    fn test_out_of_range_latitude_is_rejected() {
        assert!(matches!(
            input(Some(95.0), Some(106.8), Some(100.0)).validate(),
            Err(AppError::Core(CoreError::InvalidCoordinate { field: "latitude", .. }))
        ));
    }

    #[test]
    fn test_half_location_is_rejected() {
        assert!(input(Some(-6.2), None, Some(100.0)).validate().is_err());
    }

    #[test]
    fn test_non_positive_radius_is_rejected() {
        assert!(matches!(
            input(Some(-6.2), Some(106.8), Some(0.0)).validate(),
            Err(AppError::Core(CoreError::InvalidRadius(_)))
        ));
    }
}
