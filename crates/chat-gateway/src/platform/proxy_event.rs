//! API-Gateway style proxy integration.
//!
//! Translates a proxy event into a chat or code-check call and the outcome
//! back into `{statusCode, headers, body}` with a JSON-encoded body. The
//! hosting runtime only has to hand events to these functions.

use axum::http::StatusCode;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

use crate::handlers::chat::ACCESS_CODE_HEADER;
use crate::models::chat::ChatRequest;
use crate::models::validate::ValidateRequest;
use crate::security::ClientIdentity;
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProxyEvent {
    #[serde(default)]
    pub headers: Option<HashMap<String, String>>,
    #[serde(default)]
    pub body: Option<String>,
    #[serde(default)]
    pub request_context: Option<RequestContext>,
}

#[derive(Debug, Default, Deserialize)]
pub struct RequestContext {
    /// REST API (v1) payloads.
    #[serde(default)]
    pub identity: Option<SourceIdentity>,
    /// HTTP API (v2) payloads.
    #[serde(default)]
    pub http: Option<SourceIdentity>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceIdentity {
    #[serde(default)]
    pub source_ip: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProxyResponse {
    pub status_code: u16,
    pub headers: HashMap<String, String>,
    pub body: String,
}

impl ProxyResponse {
    fn json(status: StatusCode, body: &Value) -> Self {
        let mut headers = HashMap::new();
        headers.insert("Content-Type".to_string(), "application/json".to_string());
        Self {
            status_code: status.as_u16(),
            headers,
            body: body.to_string(),
        }
    }
}

impl ProxyEvent {
    /// Header lookup ignoring case; gateways forward headers as sent.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .as_ref()?
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    pub fn client_identity(&self) -> ClientIdentity {
        let source_ip = self.request_context.as_ref().and_then(|ctx| {
            ctx.identity
                .as_ref()
                .or(ctx.http.as_ref())
                .and_then(|id| id.source_ip.clone())
        });
        ClientIdentity::resolve(|name| self.header(name), source_ip)
    }

    fn body_bytes(&self) -> &[u8] {
        self.body.as_deref().unwrap_or("{}").as_bytes()
    }
}

pub async fn handle_chat_event(state: &AppState, event: &ProxyEvent) -> ProxyResponse {
    let request = ChatRequest::from_slice(event.body_bytes());
    let client = event.client_identity();

    match state
        .chat
        .handle(request, event.header(ACCESS_CODE_HEADER), &client)
        .await
    {
        Ok(reply) => ProxyResponse::json(StatusCode::OK, &serde_json::json!(reply)),
        Err(err) => ProxyResponse::json(err.status_code(), &err.chat_body()),
    }
}

pub fn handle_validate_event(state: &AppState, event: &ProxyEvent) -> ProxyResponse {
    let request = ValidateRequest::from_slice(event.body_bytes());
    let client = event.client_identity();

    match state.validate.validate(&request, &client) {
        Ok(reply) => ProxyResponse::json(StatusCode::OK, &serde_json::json!(reply)),
        Err(err) => ProxyResponse::json(err.status_code(), &err.code_check_body()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Settings;
    use crate::models::chat::ProviderResult;
    use crate::providers::{MockChatProvider, ProviderKind};
    use serde_json::json;
    use std::sync::Arc;

    fn state(mock: MockChatProvider) -> AppState {
        let mut settings = Settings::default();
        settings.access.codes = Some("ABC-123".to_string());
        settings.profile.prompt = Some("PROFILE".to_string());
        AppState::with_provider(&settings, Arc::new(mock))
    }

    fn event(value: Value) -> ProxyEvent {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_client_identity_from_event() {
        let ev = event(json!({
            "headers": {"X-Forwarded-For": "198.51.100.1, 10.0.0.2"},
            "requestContext": {"identity": {"sourceIp": "10.0.0.9"}}
        }));
        assert_eq!(ev.client_identity().as_str(), "198.51.100.1");

        let ev = event(json!({"requestContext": {"http": {"sourceIp": "10.0.0.9"}}}));
        assert_eq!(ev.client_identity().as_str(), "10.0.0.9");

        assert_eq!(ProxyEvent::default().client_identity().as_str(), "unknown");
    }

    #[tokio::test]
    async fn test_chat_event_round_trip() {
        let mut mock = MockChatProvider::new();
        mock.expect_kind().return_const(ProviderKind::OpenAi);
        mock.expect_model().return_const("gpt-4o-mini".to_string());
        mock.expect_has_credential().return_const(true);
        mock.expect_generate().times(1).returning(|_, _, _| {
            Ok(ProviderResult {
                answer_text: "pong".into(),
                model_identifier: "gpt-4o-mini".into(),
            })
        });

        let ev = event(json!({
            "headers": {"X-Access-Code": "abc-123"},
            "body": "{\"question\":\"ping\"}"
        }));
        let response = handle_chat_event(&state(mock), &ev).await;

        assert_eq!(response.status_code, 200);
        assert_eq!(response.headers["Content-Type"], "application/json");
        let body: Value = serde_json::from_str(&response.body).unwrap();
        assert_eq!(body, json!({"answer": "pong", "model": "gpt-4o-mini"}));
    }

    #[tokio::test]
    async fn test_chat_event_unparseable_body_is_unauthorized_first() {
        let mut mock = MockChatProvider::new();
        mock.expect_generate().never();

        let ev = event(json!({"body": "not json"}));
        let response = handle_chat_event(&state(mock), &ev).await;

        assert_eq!(response.status_code, 401);
        assert_eq!(response.body, r#"{"error":"Unauthorized"}"#);
    }

    #[test]
    fn test_validate_event_shapes() {
        let st = state(MockChatProvider::new());

        let ok = handle_validate_event(&st, &event(json!({"body": "{\"code\":\" abc-123 \"}"})));
        assert_eq!(ok.status_code, 200);
        assert_eq!(ok.body, r#"{"valid":true}"#);

        let missing = handle_validate_event(&st, &event(json!({})));
        assert_eq!(missing.status_code, 400);
        let body: Value = serde_json::from_str(&missing.body).unwrap();
        assert_eq!(body, json!({"valid": false, "error": "Code is required"}));
    }
}
