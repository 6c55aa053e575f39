use chrono::{DateTime, FixedOffset, NaiveDate, NaiveTime, Offset, Utc};

/// UTC+07:00, the Asia/Jakarta civil clock. No daylight saving applies.
pub const JAKARTA_OFFSET_MINUTES: i32 = 7 * 60;

/// A civil instant: the date that keys the attendance record and the
/// time-of-day that gets classified.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CivilMoment {
    pub date: NaiveDate,
    pub time: NaiveTime,
}

#[derive(Debug, Clone, Copy)]
pub struct CivilClock {
    offset: FixedOffset,
}

impl CivilClock {
    /// Returns `None` when the offset is outside ±24h.
    pub fn from_offset_minutes(minutes: i32) -> Option<Self> {
        FixedOffset::east_opt(minutes.checked_mul(60)?).map(|offset| Self { offset })
    }

    pub fn jakarta() -> Self {
        Self::from_offset_minutes(JAKARTA_OFFSET_MINUTES).unwrap_or(Self { offset: Utc.fix() })
    }

    pub fn now(&self) -> CivilMoment {
        self.at(Utc::now())
    }

    pub fn at(&self, instant: DateTime<Utc>) -> CivilMoment {
        let local = instant.with_timezone(&self.offset);
        CivilMoment {
            date: local.date_naive(),
            time: local.time(),
        }
    }

    pub fn today(&self) -> NaiveDate {
        self.now().date
    }
}

impl Default for CivilClock {
    fn default() -> Self {
        Self::jakarta()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_late_utc_evening_is_next_civil_day_in_jakarta() {
        let clock = CivilClock::jakarta();
        let instant = Utc.with_ymd_and_hms(2026, 3, 1, 18, 30, 0).unwrap();
        let moment = clock.at(instant);
        assert_eq!(moment.date, NaiveDate::from_ymd_opt(2026, 3, 2).unwrap());
        assert_eq!(moment.time, NaiveTime::from_hms_opt(1, 30, 0).unwrap());
    }

    #[test]
    fn test_utc_morning_maps_to_jakarta_afternoon() {
        let clock = CivilClock::jakarta();
        let instant = Utc.with_ymd_and_hms(2026, 3, 1, 2, 0, 0).unwrap();
        assert_eq!(
            clock.at(instant).time,
            NaiveTime::from_hms_opt(9, 0, 0).unwrap()
        );
    }

    #[test]
    fn test_offset_out_of_range_is_rejected() {
        assert!(CivilClock::from_offset_minutes(25 * 60).is_none());
        assert!(CivilClock::from_offset_minutes(-5 * 60).is_some());
    }
}
