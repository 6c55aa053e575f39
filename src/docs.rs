use crate::api::attendance::{
    AttendanceListResponse, AttendanceSubmission, CheckInResponse, CheckOutResponse,
    CloseDayResponse, HistoryQuery,
};
use crate::api::employee::{CreateEmployee, EmployeeCreated, EmployeeListResponse, NewAccount};
use crate::api::leave_request::{CreateLeave, LeaveDecision, LeaveFilter, LeaveListResponse};
use crate::api::privilege::PrivilegeResponse;
use crate::api::report::{AttendanceReportItem, AttendanceReportResponse, DaySummary};
use crate::api::shift::ShiftInput;
use crate::api::work_unit::WorkUnitInput;
use crate::auth::handlers::ChangePassword;
use crate::core::{AttendanceStatus, CheckoutStatus, ZoneCheck};
use crate::model::{
    attendance::Attendance,
    employee::Employee,
    leave_request::{LeaveRequest, LeaveStatus, LeaveType},
    privilege::{Privilege, PrivilegeSet},
    role::Role,
    shift::Shift,
    work_unit::WorkUnit,
};
use crate::models::{LoginReqDto, LoginResponse, MessageResponse, SessionUser};
use utoipa::Modify;
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{OpenApi, openapi};

pub struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Presensi API",
        version = "1.0.0",
        description = r#"
## Geofenced attendance & leave management

Employees check in and out from the mobile app. A submission is accepted only
inside the assigned work unit's radius and is classified as **on_time**,
**late** or **absent** against the employee's shift.

### Key Features
- **Attendance**: check-in/check-out with photo and location, daily history
- **Leave**: request, approve/reject, cancel
- **Administration**: employees, shifts, work units, HR privileges
- **Reports**: daily dashboard counts and attendance listings

### Security
Most endpoints are protected using **JWT Bearer authentication**.
HR users act within the privileges an admin granted them.

### Response Format
- JSON-based RESTful responses
- Errors carry `message` and a machine-readable `code`
- Times are civil time in the configured zone (Asia/Jakarta by default)
"#,
    ),
    paths(
        crate::auth::handlers::login,
        crate::auth::handlers::refresh_token,
        crate::auth::handlers::logout,
        crate::auth::handlers::me,
        crate::auth::handlers::change_password,

        crate::api::attendance::check_in,
        crate::api::attendance::check_out,
        crate::api::attendance::today,
        crate::api::attendance::history,
        crate::api::attendance::close_day,

        crate::api::leave_request::leave_list,
        crate::api::leave_request::get_leave,
        crate::api::leave_request::create_leave,
        crate::api::leave_request::approve_leave,
        crate::api::leave_request::reject_leave,
        crate::api::leave_request::cancel_leave,

        crate::api::employee::create_employee,
        crate::api::employee::get_employee,
        crate::api::employee::list_employees,
        crate::api::employee::update_employee,
        crate::api::employee::delete_employee,

        crate::api::shift::create_shift,
        crate::api::shift::list_shifts,
        crate::api::shift::get_shift,
        crate::api::shift::update_shift,
        crate::api::shift::delete_shift,

        crate::api::work_unit::create_work_unit,
        crate::api::work_unit::list_work_units,
        crate::api::work_unit::get_work_unit,
        crate::api::work_unit::update_work_unit,
        crate::api::work_unit::delete_work_unit,

        crate::api::privilege::get_privileges,
        crate::api::privilege::set_privileges,

        crate::api::report::day_summary,
        crate::api::report::attendance_report,

        crate::api::files::get_file
    ),
    components(
        schemas(
            LoginReqDto,
            LoginResponse,
            SessionUser,
            MessageResponse,
            ChangePassword,
            Role,
            Privilege,
            PrivilegeSet,
            PrivilegeResponse,
            AttendanceSubmission,
            AttendanceStatus,
            CheckoutStatus,
            ZoneCheck,
            CheckInResponse,
            CheckOutResponse,
            Attendance,
            AttendanceListResponse,
            HistoryQuery,
            CloseDayResponse,
            LeaveType,
            LeaveStatus,
            LeaveRequest,
            CreateLeave,
            LeaveDecision,
            LeaveFilter,
            LeaveListResponse,
            NewAccount,
            CreateEmployee,
            EmployeeCreated,
            Employee,
            EmployeeListResponse,
            ShiftInput,
            Shift,
            WorkUnitInput,
            WorkUnit,
            DaySummary,
            AttendanceReportItem,
            AttendanceReportResponse
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Auth", description = "Login, token rotation and own account"),
        (name = "Attendance", description = "Geofenced check-in and check-out"),
        (name = "Leave", description = "Leave management APIs"),
        (name = "Employee", description = "Employee management APIs"),
        (name = "Shift", description = "Shift schedules"),
        (name = "Work Unit", description = "Work unit locations and radii"),
        (name = "Privilege", description = "HR privileges (admin only)"),
        (name = "Report", description = "Dashboard and attendance reports"),
        (name = "Files", description = "Stored photos and attachments"),
    )
)]
pub struct ApiDoc;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_openapi_documents_attendance_and_bearer_auth() {
        let doc = ApiDoc::openapi();
        assert!(doc.paths.paths.contains_key("/api/attendance/check-in"));
        assert!(doc.paths.paths.contains_key("/auth/login"));

        let components = doc.components.expect("components");
        assert!(components.security_schemes.contains_key("bearer_auth"));
        assert!(components.schemas.contains_key("LoginResponse"));
    }
}
