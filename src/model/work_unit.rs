use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::core::{CoreResult, WorkUnitZone};

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
#[schema(example = json!({
    "id": 1,
    "name": "Kantor Pusat",
    "address": "Jl. Sudirman No. 1, Jakarta",
    "latitude": -6.2,
    "longitude": 106.816666,
    "radius_meters": 100.0,
    "created_at": "2026-01-01T00:00:00Z"
}))]
pub struct WorkUnit {
    pub id: u64,
    pub name: String,
    pub address: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub radius_meters: Option<f64>,
    #[schema(value_type = String, format = "date-time")]
    pub created_at: DateTime<Utc>,
}

impl WorkUnit {
    pub fn zone(&self) -> CoreResult<WorkUnitZone> {
        WorkUnitZone::from_config(self.latitude, self.longitude, self.radius_meters)
    }
}
