//! Classifies clock-in and clock-out times against a shift.
//!
//! Times are civil time-of-day values. Callers normalize them to the same
//! clock as the shift before calling anything here.

use chrono::{NaiveTime, Timelike};
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};
use utoipa::ToSchema;

use super::error::{CoreError, CoreResult, Missing};

/// Attendance outcome for one employee on one civil day.
///
/// `on_time`, `late` and `absent` are the only representation used on the
/// wire and in storage. Use [`AttendanceStatus::display_label`] for text
/// shown to people.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema, Display, EnumString, AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum AttendanceStatus {
    OnTime,
    Late,
    Absent,
}

impl AttendanceStatus {
    pub fn display_label(self) -> &'static str {
        match self {
            AttendanceStatus::OnTime => "Tepat Waktu",
            AttendanceStatus::Late => "Terlambat",
            AttendanceStatus::Absent => "Tidak Hadir",
        }
    }
}

/// Row decoding goes through this, so an unknown stored value is an error.
impl TryFrom<String> for AttendanceStatus {
    type Error = strum::ParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// How a day ended, relative to the shift's scheduled end.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema, Display, EnumString, AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum CheckoutStatus {
    Complete,
    /// Checked out before the scheduled end.
    EarlyLeave,
    /// Checked in but never checked out.
    Incomplete,
}

impl CheckoutStatus {
    pub fn display_label(self) -> &'static str {
        match self {
            CheckoutStatus::Complete => "Lengkap",
            CheckoutStatus::EarlyLeave => "Pulang Cepat",
            CheckoutStatus::Incomplete => "Absensi Tidak Lengkap",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShiftSchedule {
    pub scheduled_start: NaiveTime,
    pub tolerance_minutes: u32,
    pub scheduled_end: Option<NaiveTime>,
}

impl ShiftSchedule {
    pub fn new(scheduled_start: NaiveTime, tolerance_minutes: u32) -> Self {
        Self {
            scheduled_start,
            tolerance_minutes,
            scheduled_end: None,
        }
    }

    pub fn with_end(mut self, scheduled_end: NaiveTime) -> Self {
        self.scheduled_end = Some(scheduled_end);
        self
    }

    /// Builds a schedule from stored shift columns. An unset tolerance is zero.
    pub fn from_config(
        scheduled_start: Option<NaiveTime>,
        tolerance_minutes: Option<i32>,
        scheduled_end: Option<NaiveTime>,
    ) -> CoreResult<Self> {
        let start =
            scheduled_start.ok_or(CoreError::ConfigurationMissing(Missing::ShiftSchedule))?;

        let tolerance = tolerance_minutes.unwrap_or(0);
        let tolerance =
            u32::try_from(tolerance).map_err(|_| CoreError::InvalidTolerance(tolerance as i64))?;

        Ok(Self {
            scheduled_start: start,
            tolerance_minutes: tolerance,
            scheduled_end,
        })
    }

    /// Last minute-of-day that still counts as on time.
    pub fn deadline_minutes(&self) -> u32 {
        minute_of_day(self.scheduled_start) + self.tolerance_minutes
    }
}

/// Parses `HH:MM` or `HH:MM:SS`.
pub fn parse_clock_time(raw: &str) -> CoreResult<NaiveTime> {
    let trimmed = raw.trim();
    NaiveTime::parse_from_str(trimmed, "%H:%M:%S")
        .or_else(|_| NaiveTime::parse_from_str(trimmed, "%H:%M"))
        .map_err(|_| CoreError::InvalidClockTime(raw.to_string()))
}

/// Minutes since midnight. Seconds are dropped.
pub fn minute_of_day(time: NaiveTime) -> u32 {
    time.hour() * 60 + time.minute()
}

pub fn resolve_status(clock_in: Option<NaiveTime>, schedule: &ShiftSchedule) -> AttendanceStatus {
    let Some(clock_in) = clock_in else {
        return AttendanceStatus::Absent;
    };

    if minute_of_day(clock_in) <= schedule.deadline_minutes() {
        AttendanceStatus::OnTime
    } else {
        AttendanceStatus::Late
    }
}

/// Returns `None` when there was no check-in at all.
pub fn resolve_checkout(
    check_in: Option<NaiveTime>,
    check_out: Option<NaiveTime>,
    schedule: &ShiftSchedule,
) -> Option<CheckoutStatus> {
    check_in?;

    let Some(check_out) = check_out else {
        return Some(CheckoutStatus::Incomplete);
    };

    match schedule.scheduled_end {
        Some(end) if minute_of_day(check_out) < minute_of_day(end) => {
            Some(CheckoutStatus::EarlyLeave)
        }
        _ => Some(CheckoutStatus::Complete),
    }
}
