pub mod assignment;
pub mod attendance;
pub mod employee;
pub mod leave_request;
pub mod privilege;
pub mod role;
pub mod shift;
pub mod user;
pub mod work_unit;
