//! Geofenced attendance and leave management.
//!
//! Employees check in and out from a mobile device; a submission is accepted
//! only inside the assigned work unit's radius and is classified against the
//! employee's shift. HR manages employees, shifts, work units, leave and
//! reports over the same API.

pub mod api;
pub mod auth;
pub mod client;
pub mod config;
pub mod core;
pub mod db;
pub mod docs;
pub mod error;
pub mod model;
pub mod models;
pub mod routes;
pub mod utils;
