//! Pure attendance rules: geofence distance, status classification and the
//! civil clock. Nothing in here touches the database or the network.

pub mod clock;
pub mod error;
pub mod geo;
pub mod schedule;

pub use clock::{CivilClock, CivilMoment};
pub use error::{CoreError, CoreResult, Missing};
pub use geo::{GeoPoint, WorkUnitZone, ZoneCheck, distance_meters, evaluate_zone, is_within_zone};
pub use schedule::{
    AttendanceStatus, CheckoutStatus, ShiftSchedule, minute_of_day, parse_clock_time,
    resolve_checkout, resolve_status,
};
