use serde::{Deserialize, Serialize};
use serde_json::Value;

// ===== CONVERSATION =====

/// Speaker of a conversation turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Turn {
    pub role: Role,
    pub content: String,
}

impl Turn {
    pub fn user(content: impl Into<String>) -> Self {
        Self { role: Role::User, content: content.into() }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self { role: Role::Assistant, content: content.into() }
    }
}

/// Answer produced by a provider adapter for one chat request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderResult {
    pub answer_text: String,
    pub model_identifier: String,
}

// ===== REQUEST MODELS =====

/// Body of `POST /chat`. Fields stay untyped so that a wrong JSON type is
/// reported as a validation failure instead of a deserialization error.
#[derive(Debug, Default, Deserialize)]
pub struct ChatRequest {
    #[serde(default)]
    pub question: Option<Value>,
    #[serde(default)]
    pub history: Option<Value>,
}

impl ChatRequest {
    /// Parse a raw body, treating anything unparseable as an empty request.
    pub fn from_slice(body: &[u8]) -> Self {
        serde_json::from_slice(body).unwrap_or_default()
    }
}

// ===== RESPONSE MODELS =====

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChatReply {
    pub answer: String,
    pub model: String,
}

impl From<ProviderResult> for ChatReply {
    fn from(result: ProviderResult) -> Self {
        Self {
            answer: result.answer_text,
            model: result.model_identifier,
        }
    }
}
