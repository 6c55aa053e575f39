use chrono::{DateTime, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::core::{CoreResult, ShiftSchedule};

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
pub struct Shift {
    #[schema(example = 1)]
    pub id: u64,
    #[schema(example = "Pagi")]
    pub name: String,
    #[schema(example = "08:00:00", value_type = Option<String>, format = "time")]
    pub start_time: Option<NaiveTime>,
    #[schema(example = "17:00:00", value_type = Option<String>, format = "time")]
    pub end_time: Option<NaiveTime>,
    #[schema(example = 10)]
    pub tolerance_minutes: i32,
    #[schema(value_type = String, format = "date-time")]
    pub created_at: DateTime<Utc>,
}

impl Shift {
    pub fn schedule(&self) -> CoreResult<ShiftSchedule> {
        ShiftSchedule::from_config(self.start_time, Some(self.tolerance_minutes), self.end_time)
    }
}
