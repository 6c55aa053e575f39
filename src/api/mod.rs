pub mod attendance;
pub mod employee;
pub mod files;
pub mod leave_request;
pub mod privilege;
pub mod report;
pub mod shift;
pub mod work_unit;
