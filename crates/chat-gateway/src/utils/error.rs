use axum::{
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use std::time::Duration;
use thiserror::Error;

/// Client-facing failures of the chat and validate handlers.
///
/// The `Display` text is exactly what the client sees; anything internal
/// is carried separately and only logged (or exposed as `details` when the
/// deployment runs in verbose mode).
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Service configuration error")]
    Configuration(String),

    #[error("Unauthorized")]
    Unauthorized,

    #[error("{0}")]
    BadRequest(String),

    #[error("Too many attempts. Please wait {} minutes.", minutes(.retry_after))]
    RateLimited { retry_after: Duration },

    #[error("An error occurred processing your request")]
    Provider { details: Option<String> },
}

fn minutes(window: &Duration) -> u64 {
    window.as_secs().div_ceil(60)
}

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Configuration(_) | ApiError::Provider { .. } => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            ApiError::Unauthorized => StatusCode::UNAUTHORIZED,
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
        }
    }

    fn details(&self) -> Option<String> {
        match self {
            ApiError::Provider { details } => details.clone(),
            _ => None,
        }
    }

    fn retry_after_header(&self) -> Option<HeaderValue> {
        match self {
            ApiError::RateLimited { retry_after } => {
                HeaderValue::from_str(&retry_after.as_secs().to_string()).ok()
            }
            _ => None,
        }
    }

    /// Body for the chat endpoint: `{error, details?}`.
    pub fn chat_body(&self) -> serde_json::Value {
        serde_json::to_value(ErrorResponse {
            error: self.to_string(),
            details: self.details(),
        })
        .unwrap_or_default()
    }

    /// Body for the code-check endpoint: `{valid: false, error}`.
    pub fn code_check_body(&self) -> serde_json::Value {
        serde_json::to_value(CodeCheckResponse {
            valid: false,
            error: self.to_string(),
        })
        .unwrap_or_default()
    }

    fn into_response_with(self, body: serde_json::Value) -> Response {
        let status = self.status_code();
        let mut response = (status, Json(body)).into_response();
        if let Some(value) = self.retry_after_header() {
            response.headers_mut().insert(header::RETRY_AFTER, value);
        }
        response
    }
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<String>,
}

#[derive(Serialize)]
struct CodeCheckResponse {
    valid: bool,
    error: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = self.chat_body();
        self.into_response_with(body)
    }
}

/// [`ApiError`] rendered in the `{valid: false, error}` shape.
#[derive(Debug)]
pub struct CodeCheckError(pub ApiError);

impl From<ApiError> for CodeCheckError {
    fn from(err: ApiError) -> Self {
        Self(err)
    }
}

impl IntoResponse for CodeCheckError {
    fn into_response(self) -> Response {
        let body = self.0.code_check_body();
        self.0.into_response_with(body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(ApiError::Configuration("x".into()).status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(ApiError::Unauthorized.status_code(), StatusCode::UNAUTHORIZED);
        assert_eq!(ApiError::BadRequest("Code is required".into()).status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(
            ApiError::RateLimited { retry_after: Duration::from_secs(900) }.status_code(),
            StatusCode::TOO_MANY_REQUESTS
        );
    }

    #[test]
    fn test_configuration_detail_is_not_exposed() {
        let body = ApiError::Configuration("ACCESS_CODES is not set".into()).chat_body();
        assert_eq!(body, serde_json::json!({ "error": "Service configuration error" }));
    }

    #[test]
    fn test_rate_limit_message_follows_window() {
        let err = ApiError::RateLimited { retry_after: Duration::from_secs(15 * 60) };
        assert_eq!(err.to_string(), "Too many attempts. Please wait 15 minutes.");
        assert_eq!(
            err.code_check_body(),
            serde_json::json!({ "valid": false, "error": "Too many attempts. Please wait 15 minutes." })
        );
    }

    #[test]
    fn test_provider_details_only_when_present() {
        let quiet = ApiError::Provider { details: None }.chat_body();
        assert!(quiet.get("details").is_none());

        let verbose = ApiError::Provider { details: Some("boom".into()) }.chat_body();
        assert_eq!(verbose["details"], "boom");
        assert_eq!(verbose["error"], "An error occurred processing your request");
    }

    #[test]
    fn test_retry_after_header() {
        let response = CodeCheckError(ApiError::RateLimited { retry_after: Duration::from_secs(60) })
            .into_response();
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(response.headers()[header::RETRY_AFTER], "60");
    }
}
