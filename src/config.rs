use crate::core::CivilClock;
use crate::core::clock::JAKARTA_OFFSET_MINUTES;
use dotenvy::dotenv;
use std::env;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),

    #[error("{key} has an invalid value '{value}'")]
    Invalid { key: &'static str, value: String },
}

#[derive(Clone, Debug)]
pub struct Config {
    pub database_url: String,
    pub jwt_secret: String,
    pub server_addr: String,
    pub access_token_ttl: usize,
    pub refresh_token_ttl: usize,
    pub db_max_connections: u32,
    pub run_migrations: bool,

    // Rate limiting
    pub rate_login_per_min: u32,
    pub rate_refresh_per_min: u32,
    pub rate_attendance_per_min: u32,
    pub rate_protected_per_min: u32,

    pub api_prefix: String,

    // Photos and leave attachments
    pub upload_dir: String,
    pub max_upload_bytes: usize,

    /// Offset of the civil clock that keys attendance days, in minutes east of UTC.
    pub civil_utc_offset_minutes: i32,
    pub assignment_cache_ttl_secs: u64,

    pub log_dir: String,
    pub log_level: tracing::Level,
}

fn required(key: &'static str) -> Result<String, ConfigError> {
    env::var(key).map_err(|_| ConfigError::Missing(key))
}

fn parsed_or<T: FromStr>(key: &'static str, default: T) -> Result<T, ConfigError> {
    match env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid { key, value: raw }),
        Err(_) => Ok(default),
    }
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenv().ok();

        let config = Self {
            server_addr: required("SERVER_ADDR")?,
            database_url: required("DATABASE_URL")?,
            jwt_secret: required("JWT_SECRET")?,
            access_token_ttl: parsed_or("ACCESS_TOKEN_TTL", 900)?, // 15 min
            refresh_token_ttl: parsed_or("REFRESH_TOKEN_TTL", 604_800)?, // 7 days
            db_max_connections: parsed_or("DB_MAX_CONNECTIONS", 10)?,
            run_migrations: parsed_or("RUN_MIGRATIONS", false)?,

            rate_login_per_min: parsed_or("RATE_LOGIN_PER_MIN", 60)?,
            rate_refresh_per_min: parsed_or("RATE_REFRESH_PER_MIN", 30)?,
            rate_attendance_per_min: parsed_or("RATE_ATTENDANCE_PER_MIN", 30)?,
            rate_protected_per_min: parsed_or("RATE_PROTECTED_PER_MIN", 1000)?,

            api_prefix: env::var("API_PREFIX").unwrap_or_else(|_| "/api".to_string()),

            upload_dir: env::var("UPLOAD_DIR").unwrap_or_else(|_| "uploads".to_string()),
            max_upload_bytes: parsed_or("MAX_UPLOAD_BYTES", 2 * 1024 * 1024)?,

            civil_utc_offset_minutes: parsed_or("CIVIL_UTC_OFFSET_MINUTES", JAKARTA_OFFSET_MINUTES)?,
            assignment_cache_ttl_secs: parsed_or("ASSIGNMENT_CACHE_TTL_SECS", 3600)?,

            log_dir: env::var("LOG_DIR").unwrap_or_else(|_| "logs".to_string()),
            log_level: parsed_or("LOG_LEVEL", tracing::Level::INFO)?,
        };

        // fail at startup rather than on the first check-in
        config.civil_clock()?;
        Ok(config)
    }

    pub fn civil_clock(&self) -> Result<CivilClock, ConfigError> {
        CivilClock::from_offset_minutes(self.civil_utc_offset_minutes).ok_or_else(|| {
            ConfigError::Invalid {
                key: "CIVIL_UTC_OFFSET_MINUTES",
                value: self.civil_utc_offset_minutes.to_string(),
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_key_message() {
        assert_eq!(
            ConfigError::Missing("JWT_SECRET").to_string(),
            "JWT_SECRET must be set"
        );
    }

    #[test]
    fn test_invalid_value_message() {
        let err = ConfigError::Invalid {
            key: "ACCESS_TOKEN_TTL",
            value: "soon".to_string(),
        };
        assert_eq!(err.to_string(), "ACCESS_TOKEN_TTL has an invalid value 'soon'");
    }
}
