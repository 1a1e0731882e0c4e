//! OpenAI-compatible Chat Completions: OpenAI, Azure OpenAI, Ollama and any
//! server speaking the same protocol.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{send_json, AdapterSettings, ChatProvider, ProviderError, ProviderKind};
use crate::models::chat::{ProviderResult, Role, Turn};

pub const DEFAULT_MODEL: &str = "gpt-4o-mini";
pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
pub const OLLAMA_BASE_URL: &str = "http://localhost:11434/v1";
pub const OLLAMA_PLACEHOLDER_KEY: &str = "ollama";

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
struct ChatCompletionRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    messages: Vec<ChatMessage<'a>>,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: AssistantMessage,
}

#[derive(Debug, Deserialize)]
struct AssistantMessage {
    #[serde(default)]
    content: Option<String>,
}

/// System instructions are sent as a leading `system` message.
pub struct OpenAiProvider {
    kind: ProviderKind,
    client: Client,
    settings: AdapterSettings,
}

impl OpenAiProvider {
    pub fn new(kind: ProviderKind, client: Client, settings: AdapterSettings) -> Self {
        Self { kind, client, settings }
    }

    fn completions_url(&self) -> String {
        let url = format!("{}/chat/completions", self.settings.base_url);
        match &self.settings.api_version {
            Some(version) => format!("{url}?api-version={version}"),
            None => url,
        }
    }
}

#[async_trait]
impl ChatProvider for OpenAiProvider {
    fn kind(&self) -> ProviderKind {
        self.kind
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
        let api_key = self.settings.require_api_key(self.kind)?;

        let messages: Vec<ChatMessage<'_>> = std::iter::once(ChatMessage {
            role: "system",
            content: system_instructions,
        })
        .chain(history.iter().map(|turn| ChatMessage {
            role: native_role(turn.role),
            content: &turn.content,
        }))
        .chain(std::iter::once(ChatMessage {
            role: native_role(Role::User),
            content: question,
        }))
        .collect();

        debug!(
            provider = %self.kind,
            messages = messages.len(),
            model = %self.settings.model,
            "Calling chat completions"
        );

        let request = ChatCompletionRequest {
            model: &self.settings.model,
            max_tokens: self.settings.max_tokens,
            messages,
        };

        let mut builder = self
            .client
            .post(self.completions_url())
            .bearer_auth(api_key)
            .json(&request);

        // Azure OpenAI authenticates with an `api-key` header.
        if self.settings.api_version.is_some() {
            builder = builder.header("api-key", api_key);
        }

        let response: ChatCompletionResponse = send_json(self.kind, builder).await?;

        let choice = response
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| ProviderError::MalformedResponse {
                provider: self.kind.as_str(),
                message: "No choices returned".to_string(),
            })?;

        Ok(ProviderResult {
            answer_text: choice.message.content.unwrap_or_default(),
            model_identifier: self.settings.model.clone(),
        })
    }
}
