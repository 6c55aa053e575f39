use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
#[schema(
    example = json!({
        "id": 1,
        "employee_code": "EMP-001",
        "full_name": "Siti Rahayu",
        "email": "siti.rahayu@company.co.id",
        "phone": "+6281234567890",
        "work_unit_id": 1,
        "shift_id": 2,
        "status": "active",
        "created_at": "2026-01-01T00:00:00Z"
    })
)]
pub struct Employee {
    #[schema(example = 1)]
    pub id: u64,

    #[schema(example = "EMP-001")]
    pub employee_code: String,

    #[schema(example = "Siti Rahayu")]
    pub full_name: String,

    #[schema(example = "siti.rahayu@company.co.id")]
    pub email: String,

    #[schema(example = "+6281234567890", nullable = true)]
    pub phone: Option<String>,

    #[schema(example = 1, nullable = true)]
    pub work_unit_id: Option<u64>,

    #[schema(example = 2, nullable = true)]
    pub shift_id: Option<u64>,

    #[schema(example = "active")]
    pub status: String,

    #[schema(value_type = String, format = "date-time")]
    pub created_at: DateTime<Utc>,
}
