use chrono::Utc;
use tracing::{error, info, warn};

use crate::models::validate::{ValidateReply, ValidateRequest};
use crate::security::{normalize_code, AccessGate, ClientIdentity, RateLimiter};
use crate::utils::error::ApiError;

/// One-shot access-code verification behind the attempt limiter.
#[derive(Clone)]
pub struct ValidateService {
    gate: AccessGate,
    limiter: RateLimiter,
}

impl ValidateService {
    pub fn new(gate: AccessGate, limiter: RateLimiter) -> Self {
        Self { gate, limiter }
    }

    pub fn limiter(&self) -> &RateLimiter {
        &self.limiter
    }

    /// Rate limit, presence check, configuration check, comparison.
    ///
    /// A wrong code is a successful check that returns `valid: false`.
    pub fn validate(
        &self,
        request: &ValidateRequest,
        client: &ClientIdentity,
    ) -> Result<ValidateReply, ApiError> {
        let time = Utc::now().to_rfc3339();

        if self.limiter.record_attempt(client.as_str()) {
            warn!(
                outcome = "RATE_LIMITED",
                code = %logged_code(request),
                client = %client,
                time = %time,
                "[validateCode] rate limited"
            );
            return Err(ApiError::RateLimited {
                retry_after: self.limiter.window(),
            });
        }

        let Some(code) = request.code_text() else {
            warn!(
                outcome = "MISSING_CODE",
                code = %logged_code(request),
                client = %client,
                time = %time,
                "[validateCode] code missing"
            );
            return Err(ApiError::BadRequest("Code is required".to_string()));
        };

        let codes = self.gate.codes().map_err(|e| {
            error!(error = %e, "[validateCode] service configuration error");
            ApiError::Configuration(e.to_string())
        })?;

        let submitted = normalize_code(code);
        let valid = codes.contains(&submitted);
        let outcome = if valid { "PASS" } else { "FAIL" };

        info!(
            outcome,
            code = %submitted,
            client = %client,
            time = %time,
            "[validateCode] result"
        );

        Ok(ValidateReply { valid })
    }
}

/// Normalized submitted code for log lines, `none` when absent.
fn logged_code(request: &ValidateRequest) -> String {
    request
        .code_text()
        .map(normalize_code)
        .unwrap_or_else(|| "none".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn service(codes: Option<&str>) -> ValidateService {
        ValidateService::new(
            AccessGate::new(codes.map(str::to_string)),
            RateLimiter::new(10, Duration::from_secs(15 * 60)),
        )
    }

    fn request(body: &str) -> ValidateRequest {
        ValidateRequest::from_slice(body.as_bytes())
    }

    fn client(ip: &str) -> ClientIdentity {
        ClientIdentity(ip.to_string())
    }

    #[test]
    fn test_valid_code_any_casing() {
        let svc = service(Some("ABC-123, xyz-789"));
        let reply = svc.validate(&request(r#"{"code":"abc-123"}"#), &client("1.1.1.1")).unwrap();
        assert!(reply.valid);
        let reply = svc.validate(&request(r#"{"code":" XYZ-789 "}"#), &client("1.1.1.1")).unwrap();
        assert!(reply.valid);
    }

    #[test]
    fn test_wrong_code_is_not_an_error() {
        let svc = service(Some("ABC-123"));
        let reply = svc.validate(&request(r#"{"code":"ZZZ-000"}"#), &client("1.1.1.1")).unwrap();
        assert_eq!(reply, ValidateReply { valid: false });
    }

    #[test]
    fn test_missing_or_non_text_code() {
        let svc = service(Some("ABC-123"));
        for body in ["{}", r#"{"code":7}"#, r#"{"code":""}"#, "garbage"] {
            let err = svc.validate(&request(body), &client("1.1.1.1")).unwrap_err();
            assert!(matches!(err, ApiError::BadRequest(ref m) if m == "Code is required"), "{body}");
        }
    }

    #[test]
    fn test_missing_configuration_after_presence_check() {
        let svc = service(None);
        let err = svc.validate(&request(r#"{"code":"ABC"}"#), &client("1.1.1.1")).unwrap_err();
        assert!(matches!(err, ApiError::Configuration(_)));

        let err = svc.validate(&request("{}"), &client("1.1.1.1")).unwrap_err();
        assert!(matches!(err, ApiError::BadRequest(_)));
    }

    #[test]
    fn test_eleventh_attempt_is_rate_limited() {
        let svc = service(Some("ABC-123, xyz-789"));
        let body = request(r#"{"code":"ZZZ-000"}"#);

        for attempt in 1..=10 {
            let reply = svc.validate(&body, &client("9.9.9.9")).unwrap();
            assert!(!reply.valid, "attempt {attempt}");
        }

        let err = svc.validate(&body, &client("9.9.9.9")).unwrap_err();
        assert!(matches!(err, ApiError::RateLimited { .. }));

        // Other clients are unaffected.
        assert!(svc.validate(&request(r#"{"code":"abc-123"}"#), &client("8.8.8.8")).unwrap().valid);
    }

    #[test]
    fn test_rate_limit_checked_before_everything_else() {
        let svc = ValidateService::new(AccessGate::new(None), RateLimiter::new(0, Duration::from_secs(60)));
        // First attempt opens the window and is never limited.
        assert!(matches!(
            svc.validate(&request("{}"), &client("c")).unwrap_err(),
            ApiError::BadRequest(_)
        ));
        assert!(matches!(
            svc.validate(&request("{}"), &client("c")).unwrap_err(),
            ApiError::RateLimited { .. }
        ));
    }

    #[test]
    fn test_logged_code_is_normalized_or_none() {
        assert_eq!(logged_code(&request(r#"{"code":" abc-123 "}"#)), "ABC-123");
        assert_eq!(logged_code(&request(r#"{"code":""}"#)), "none");
        assert_eq!(logged_code(&request("garbage")), "none");
    }
}
