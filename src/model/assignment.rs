use chrono::NaiveTime;

use crate::core::{CoreResult, ShiftSchedule, WorkUnitZone};

/// An employee's work unit and shift as needed by check-in/check-out.
///
/// Loaded with a single join; columns from the work unit and shift are
/// nullable because either may be unassigned or half configured.
#[derive(Debug, Clone, PartialEq, sqlx::FromRow)]
pub struct EmployeeAssignment {
    pub employee_id: u64,
    pub employee_status: String,
    pub work_unit_id: Option<u64>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub radius_meters: Option<f64>,
    pub shift_id: Option<u64>,
    pub start_time: Option<NaiveTime>,
    pub end_time: Option<NaiveTime>,
    pub tolerance_minutes: Option<i32>,
}

impl EmployeeAssignment {
    pub fn zone(&self) -> CoreResult<WorkUnitZone> {
        WorkUnitZone::from_config(self.latitude, self.longitude, self.radius_meters)
    }

    pub fn schedule(&self) -> CoreResult<ShiftSchedule> {
        ShiftSchedule::from_config(self.start_time, self.tolerance_minutes, self.end_time)
    }

    pub fn is_active(&self) -> bool {
        self.employee_status == "active"
    }
}

pub const ASSIGNMENT_SELECT: &str = r#"
    SELECT
        e.id AS employee_id,
        e.status AS employee_status,
        e.work_unit_id,
        w.latitude,
        w.longitude,
        w.radius_meters,
        e.shift_id,
        s.start_time,
        s.end_time,
        s.tolerance_minutes
    FROM employees e
    LEFT JOIN work_units w ON w.id = e.work_unit_id
    LEFT JOIN shifts s ON s.id = e.shift_id
"#;
