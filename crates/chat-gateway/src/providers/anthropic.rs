use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{join_segments, send_json, AdapterSettings, ChatProvider, ProviderError, ProviderKind};
use crate::models::chat::{ProviderResult, Role, Turn};

pub const DEFAULT_MODEL: &str = "claude-3-5-sonnet-20241022";
pub const DEFAULT_BASE_URL: &str = "https://api.anthropic.com";
const API_VERSION: &str = "2023-06-01";

pub fn native_role(role: Role) -> &'static str {
    match role {
        Role::User => "user",
        Role::Assistant => "assistant",
    }
}

pub fn role_from_native(native: &str) -> Option<Role> {
    match native {
        "user" => Some(Role::User),
        "assistant" => Some(Role::Assistant),
        _ => None,
    }
}

#[derive(Debug, Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    #[serde(skip_serializing_if = "str::is_empty")]
    system: &'a str,
    messages: Vec<Message<'a>>,
}

#[derive(Debug, Serialize)]
struct Message<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    content: Vec<ContentBlock>,
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    text: Option<String>,
}

/// Anthropic Messages API. System instructions go in the `system` field.
pub struct AnthropicProvider {
    client: Client,
    settings: AdapterSettings,
}

impl AnthropicProvider {
    pub fn new(client: Client, settings: AdapterSettings) -> Self {
        Self { client, settings }
    }
}

#[async_trait]
impl ChatProvider for AnthropicProvider {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Anthropic
    }

    fn model(&self) -> String {
        self.settings.model.clone()
    }

    fn has_credential(&self) -> bool {
        self.settings.api_key.is_some()
    }

    async fn generate(
        &self,
        system_instructions: &str,
        history: &[Turn],
        question: &str,
    ) -> Result<ProviderResult, ProviderError> {
        let api_key = self.settings.require_api_key(self.kind())?;

        let messages: Vec<Message<'_>> = history
            .iter()
            .map(|turn| Message {
                role: native_role(turn.role),
                content: &turn.content,
            })
            .chain(std::iter::once(Message {
                role: native_role(Role::User),
                content: question,
            }))
            .collect();

        debug!(messages = messages.len(), model = %self.settings.model, "Calling Anthropic");

        let request = MessagesRequest {
            model: &self.settings.model,
            max_tokens: self.settings.max_tokens,
            system: system_instructions,
            messages,
        };

        let response: MessagesResponse = send_json(
            self.kind(),
            self.client
                .post(format!("{}/v1/messages", self.settings.base_url))
                .header("x-api-key", api_key)
                .header("anthropic-version", API_VERSION)
                .json(&request),
        )
        .await?;

        let answer_text = join_segments(
            response
                .content
                .iter()
                .filter(|block| block.kind == "text")
                .filter_map(|block| block.text.as_deref()),
        );

        Ok(ProviderResult {
            answer_text,
            model_identifier: self.settings.model.clone(),
        })
    }
}
