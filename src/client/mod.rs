//! Typed HTTP client for the attendance API, used by device integrations
//! and smoke tests.
//!
//! ```no_run
//! # async fn demo() -> Result<(), presensi::client::ClientError> {
//! use presensi::client::{ApiClient, ClientConfig};
//!
//! let mut client = ApiClient::new(ClientConfig::new("https://presensi.example.com"))?;
//! client.login("siti", "s3cret-pass").await?;
//! let today = client.today().await?;
//! # Ok(()) }
//! ```

use reqwest::{Client, Method, StatusCode, header::AUTHORIZATION};
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

use crate::{
    api::attendance::{CheckInResponse, CheckOutResponse},
    model::attendance::Attendance,
    models::LoginResponse,
};

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(15);

/// Where the server lives and how long to wait for it.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub base_url: String,
    pub timeout: Duration,
}

impl ClientConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("HTTP request failed")]
    Transport(#[from] reqwest::Error),

    /// The server answered with an error status.
    #[error("API error: Status={status}, Code={code:?}, Message='{message}'")]
    Api {
        status: StatusCode,
        code: Option<String>,
        message: String,
        /// Present for `outside_radius`.
        distance_meters: Option<f64>,
        radius_meters: Option<f64>,
    },

    /// A success response that did not match the expected shape.
    #[error("Unexpected response shape: {detail}")]
    Schema { detail: String },

    #[error("Invalid client configuration: {0}")]
    Config(String),

    #[error("Not logged in")]
    NotLoggedIn,
}

/// Error body produced by the server for every non-2xx response.
#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: String,
    code: Option<String>,
    distance_meters: Option<f64>,
    radius_meters: Option<f64>,
}

/// Turns a raw response into `T` or the matching [`ClientError`].
pub fn decode_body<T: DeserializeOwned>(status: StatusCode, body: &[u8]) -> Result<T, ClientError> {
    if status.is_success() {
        return serde_json::from_slice(body).map_err(|e| ClientError::Schema {
            detail: e.to_string(),
        });
    }

    match serde_json::from_slice::<ErrorBody>(body) {
        Ok(err) => Err(ClientError::Api {
            status,
            code: err.code,
            message: err.message,
            distance_meters: err.distance_meters,
            radius_meters: err.radius_meters,
        }),
        Err(_) => Err(ClientError::Api {
            status,
            code: None,
            message: String::from_utf8_lossy(body).into_owned(),
            distance_meters: None,
            radius_meters: None,
        }),
    }
}

#[derive(Serialize)]
struct Credentials<'a> {
    username: &'a str,
    password: &'a str,
}

#[derive(Serialize)]
struct Submission<'a> {
    latitude: f64,
    longitude: f64,
    photo: &'a str,
}

pub struct ApiClient {
    http: Client,
    base_url: String,
    session: Option<LoginResponse>,
}

impl ApiClient {
    pub fn new(config: ClientConfig) -> Result<Self, ClientError> {
        let base_url = config.base_url.trim_end_matches('/').to_string();
        if !(base_url.starts_with("http://") || base_url.starts_with("https://")) {
            return Err(ClientError::Config(format!(
                "base_url must start with http:// or https://, got '{}'",
                config.base_url
            )));
        }

        let http = Client::builder().timeout(config.timeout).build()?;
        Ok(Self {
            http,
            base_url,
            session: None,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn session(&self) -> Option<&LoginResponse> {
        self.session.as_ref()
    }

    async fn send<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        bearer: Option<&str>,
        body: Option<&impl Serialize>,
    ) -> Result<T, ClientError> {
        let url = format!("{}{}", self.base_url, path);
        let mut request = self.http.request(method.clone(), &url);
        if let Some(token) = bearer {
            request = request.header(AUTHORIZATION, format!("Bearer {token}"));
        }
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request.send().await?;
        let status = response.status();
        debug!(%method, %url, %status, "API response");

        let bytes = response.bytes().await?;
        decode_body(status, &bytes)
    }

    fn access_token(&self) -> Result<&str, ClientError> {
        self.session
            .as_ref()
            .map(|s| s.access_token.as_str())
            .ok_or(ClientError::NotLoggedIn)
    }

    pub async fn login(&mut self, username: &str, password: &str) -> Result<&LoginResponse, ClientError> {
        let session: LoginResponse = self
            .send(
                Method::POST,
                "/auth/login",
                None,
                Some(&Credentials { username, password }),
            )
            .await?;
        Ok(self.session.insert(session))
    }

    /// Rotates the token pair using the stored refresh token.
    pub async fn refresh(&mut self) -> Result<&LoginResponse, ClientError> {
        let refresh_token = self
            .session
            .as_ref()
            .map(|s| s.refresh_token.clone())
            .ok_or(ClientError::NotLoggedIn)?;

        let session: LoginResponse = self
            .send(Method::POST, "/auth/refresh", Some(&refresh_token), None::<&()>)
            .await?;
        Ok(self.session.insert(session))
    }

    pub async fn check_in(
        &self,
        latitude: f64,
        longitude: f64,
        photo_base64: &str,
    ) -> Result<CheckInResponse, ClientError> {
        let body = Submission {
            latitude,
            longitude,
            photo: photo_base64,
        };
        self.send(
            Method::POST,
            "/api/attendance/check-in",
            Some(self.access_token()?),
            Some(&body),
        )
        .await
    }

    pub async fn check_out(
        &self,
        latitude: f64,
        longitude: f64,
        photo_base64: &str,
    ) -> Result<CheckOutResponse, ClientError> {
        let body = Submission {
            latitude,
            longitude,
            photo: photo_base64,
        };
        self.send(
            Method::POST,
            "/api/attendance/check-out",
            Some(self.access_token()?),
            Some(&body),
        )
        .await
    }

    pub async fn today(&self) -> Result<Option<Attendance>, ClientError> {
        self.send(
            Method::GET,
            "/api/attendance/today",
            Some(self.access_token()?),
            None::<&()>,
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::AttendanceStatus;
    use serde_json::json;

    fn login_body() -> Vec<u8> {
        serde_json::to_vec(&json!({
            "access_token": "a.b.c",
            "refresh_token": "d.e.f",
            "token_type": "Bearer",
            "expires_in": 900,
            "user": {
                "id": 7,
                "username": "siti",
                "role": "employee",
                "employee_id": 12,
                "privileges": []
            }
        }))
        .unwrap()
    }

    #[test]
    fn test_decodes_login_response() {
        let session: LoginResponse = decode_body(StatusCode::OK, &login_body()).unwrap();
        assert_eq!(session.token_type, "Bearer");
        assert_eq!(session.user.employee_id, Some(12));
    }

    #[test]
    fn test_success_with_wrong_shape_is_schema_error() {
        let body = br#"{"token": "a.b.c"}"#;
        let err = decode_body::<LoginResponse>(StatusCode::OK, body).unwrap_err();
        assert!(matches!(err, ClientError::Schema { .. }));
    }

    #[test]
    fn test_error_status_is_api_error_with_zone_details() {
        let body = serde_json::to_vec(&json!({
            "message": "Outside the work unit radius",
            "code": "outside_radius",
            "distance_meters": 150.2,
            "radius_meters": 100.0
        }))
        .unwrap();

        match decode_body::<CheckInResponse>(StatusCode::BAD_REQUEST, &body) {
            Err(ClientError::Api {
                status,
                code,
                distance_meters,
                ..
            }) => {
                assert_eq!(status, StatusCode::BAD_REQUEST);
                assert_eq!(code.as_deref(), Some("outside_radius"));
                assert_eq!(distance_meters, Some(150.2));
            }
            other => panic!("expected Api error, got {other:?}"),
        }
    }

    #[test]
    fn test_non_json_error_keeps_raw_text() {
        match decode_body::<LoginResponse>(StatusCode::TOO_MANY_REQUESTS, b"Too Many Requests") {
            Err(ClientError::Api { message, code, .. }) => {
                assert_eq!(message, "Too Many Requests");
                assert_eq!(code, None);
            }
            other => panic!("expected Api error, got {other:?}"),
        }
    }

    #[test]
    fn test_decodes_check_in_status() {
        let body = serde_json::to_vec(&json!({
            "message": "Checked in successfully",
            "status": "late",
            "date": "2026-01-05",
            "time": "09:31:00",
            "zone": { "distance_meters": 12.5, "radius_meters": 100.0, "inside": true }
        }))
        .unwrap();
        let res: CheckInResponse = decode_body(StatusCode::OK, &body).unwrap();
        assert_eq!(res.status, AttendanceStatus::Late);
        assert!(res.zone.inside);
    }

    #[test]
    fn test_null_today_decodes_to_none() {
        let today: Option<Attendance> = decode_body(StatusCode::OK, b"null").unwrap();
        assert!(today.is_none());
    }

    #[test]
    fn test_rejects_base_url_without_scheme() {
        assert!(matches!(
            ApiClient::new(ClientConfig::new("presensi.local")),
            Err(ClientError::Config(_))
        ));
        let client = ApiClient::new(ClientConfig::new("http://localhost:8080/")).unwrap();
        assert_eq!(client.base_url(), "http://localhost:8080");
        assert!(client.session().is_none());
    }
}
