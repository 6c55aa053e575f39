use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::core::AttendanceStatus;

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
pub struct Attendance {
    pub id: u64,
    pub employee_id: u64,
    pub work_unit_id: Option<u64>,
    #[schema(value_type = String, format = "date")]
    pub date: NaiveDate,
    #[schema(value_type = Option<String>, format = "time")]
    pub check_in: Option<NaiveTime>,
    #[schema(value_type = Option<String>, format = "time")]
    pub check_out: Option<NaiveTime>,
    #[sqlx(try_from = "String")]
    pub status: AttendanceStatus,
    pub check_in_latitude: Option<f64>,
    pub check_in_longitude: Option<f64>,
    pub check_in_distance_meters: Option<f64>,
    pub check_in_photo: Option<String>,
    pub check_out_latitude: Option<f64>,
    pub check_out_longitude: Option<f64>,
    pub check_out_distance_meters: Option<f64>,
    pub check_out_photo: Option<String>,
    #[schema(value_type = String, format = "date-time")]
    pub created_at: DateTime<Utc>,
}
