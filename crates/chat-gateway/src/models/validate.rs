use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Body of `POST /validateCode`.
#[derive(Debug, Default, Deserialize)]
pub struct ValidateRequest {
    #[serde(default)]
    pub code: Option<Value>,
}

impl ValidateRequest {
    pub fn from_slice(body: &[u8]) -> Self {
        serde_json::from_slice(body).unwrap_or_default()
    }

    /// The submitted code, if it is a non-empty JSON string.
    pub fn code_text(&self) -> Option<&str> {
        self.code
            .as_ref()
            .and_then(Value::as_str)
            .filter(|code| !code.is_empty())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ValidateReply {
    pub valid: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_code_text_requires_string() {
        assert_eq!(ValidateRequest::from_slice(br#"{"code":"abc"}"#).code_text(), Some("abc"));
        assert_eq!(ValidateRequest::from_slice(br#"{"code":42}"#).code_text(), None);
        assert_eq!(ValidateRequest::from_slice(br#"{"code":""}"#).code_text(), None);
        assert_eq!(ValidateRequest::from_slice(b"not json").code_text(), None);
    }
}
