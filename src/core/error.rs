use strum_macros::Display;
use thiserror::Error;

/// Which piece of per-employee configuration is absent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum Missing {
    #[strum(serialize = "work unit")]
    WorkUnitZone,
    #[strum(serialize = "shift")]
    ShiftSchedule,
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum CoreError {
    /// The employee's work unit or shift is not fully set up.
    #[error("The assigned {0} is not fully configured, please contact HR")]
    ConfigurationMissing(Missing),

    #[error("Invalid {field}: {value}")]
    InvalidCoordinate { field: &'static str, value: String },

    #[error("Radius must be greater than zero, got {0}")]
    InvalidRadius(f64),

    #[error("Tolerance must not be negative, got {0}")]
    InvalidTolerance(i64),

    #[error("Invalid clock time '{0}', expected HH:MM or HH:MM:SS")]
    InvalidClockTime(String),
}

pub type CoreResult<T> = Result<T, CoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_configuration_missing_names_the_work_unit() {
        let err = CoreError::ConfigurationMissing(Missing::WorkUnitZone);
        assert_eq!(
            err.to_string(),
            "The assigned work unit is not fully configured, please contact HR"
        );
    }

    #[test]
    fn test_configuration_missing_names_the_shift() {
        let err = CoreError::ConfigurationMissing(Missing::ShiftSchedule);
        assert!(err.to_string().contains("assigned shift"));
    }

    #[test]
    fn test_invalid_coordinate_displays_field_and_value() {
        let err = CoreError::InvalidCoordinate {
            field: "latitude",
            value: "abc".to_string(),
        };
        assert_eq!(err.to_string(), "Invalid latitude: abc");
    }
}
