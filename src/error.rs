//! HTTP-facing error type.
//!
//! Handlers return `Result<_, AppError>`; the `ResponseError` impl turns
//! every variant into a JSON body of the form
//! `{ "message": ..., "code": ... }` plus variant-specific fields.

use actix_web::{HttpResponse, ResponseError, http::StatusCode};
use serde_json::json;
use sqlx::mysql::MySqlDatabaseError;
use thiserror::Error;

use crate::core::CoreError;

#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Core(#[from] CoreError),

    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    Unauthorized(String),

    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    #[error("Outside the work unit radius")]
    OutsideZone {
        distance_meters: f64,
        radius_meters: f64,
    },

    #[error("Already checked in today")]
    AlreadyCheckedIn,

    #[error("No check-in found for today")]
    NotCheckedIn,

    #[error("Already checked out today")]
    AlreadyCheckedOut,

    #[error("Check-out must happen at the same work unit as check-in")]
    WorkUnitMismatch,

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

const ER_DUP_ENTRY: u16 = 1062;

fn is_duplicate_entry(number: u16) -> bool {
    number == ER_DUP_ENTRY
}

impl AppError {
    pub fn code(&self) -> &'static str {
        match self {
            AppError::Core(CoreError::ConfigurationMissing(_)) => "configuration_missing",
            AppError::Core(_) => "invalid_input",
            AppError::BadRequest(_) => "bad_request",
            AppError::Unauthorized(_) => "unauthorized",
            AppError::Forbidden(_) => "forbidden",
            AppError::NotFound(_) => "not_found",
            AppError::Conflict(_) => "conflict",
            AppError::OutsideZone { .. } => "outside_radius",
            AppError::AlreadyCheckedIn => "already_checked_in",
            AppError::NotCheckedIn => "not_checked_in",
            AppError::AlreadyCheckedOut => "already_checked_out",
            AppError::WorkUnitMismatch => "work_unit_mismatch",
            AppError::Database(_) | AppError::Internal(_) => "internal_error",
        }
    }

    /// True only for MySQL `ER_DUP_ENTRY`. Other SQLSTATE 23000 errors,
    /// such as foreign-key failures, are not duplicates.
    pub fn is_duplicate_key(err: &sqlx::Error) -> bool {
        match err {
            sqlx::Error::Database(db_err) => db_err
                .try_downcast_ref::<MySqlDatabaseError>()
                .is_some_and(|e| is_duplicate_entry(e.number())),
            _ => false,
        }
    }
}

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::Core(CoreError::ConfigurationMissing(_)) => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::Core(_)
            | AppError::BadRequest(_)
            | AppError::OutsideZone { .. }
            | AppError::AlreadyCheckedIn
            | AppError::NotCheckedIn
            | AppError::AlreadyCheckedOut
            | AppError::WorkUnitMismatch => StatusCode::BAD_REQUEST,
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::Database(_) | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let body = match self {
            AppError::OutsideZone {
                distance_meters,
                radius_meters,
            } => json!({
                "message": self.to_string(),
                "code": self.code(),
                "distance_meters": distance_meters,
                "radius_meters": radius_meters,
            }),
            AppError::Database(e) => {
                tracing::error!(error = %e, "Database error");
                json!({ "message": "Internal Server Error", "code": self.code() })
            }
            AppError::Internal(e) => {
                tracing::error!(error = %e, "Internal error");
                json!({ "message": "Internal Server Error", "code": self.code() })
            }
            _ => json!({ "message": self.to_string(), "code": self.code() }),
        };

        HttpResponse::build(self.status_code()).json(body)
    }
}

pub type AppResult<T> = Result<T, AppError>;
