use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{join_segments, send_json, AdapterSettings, ChatProvider, ProviderError, ProviderKind};
use crate::models::chat::{ProviderResult, Role, Turn};

pub const DEFAULT_MODEL: &str = "gemini-1.5-flash";
pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Gemini calls the assistant side of a conversation `model`.
pub fn native_role(role: Role) -> &'static str {
    match role {
        Role::User => "user",
        Role::Assistant => "model",
    }
}

pub fn role_from_native(native: &str) -> Option<Role> {
    match native {
        "user" => Some(Role::User),
        "model" => Some(Role::Assistant),
        _ => None,
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<Content<'a>>,
    contents: Vec<Content<'a>>,
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<&'static str>,
    parts: Vec<Part<'a>>,
}

#[derive(Debug, Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    max_output_tokens: u32,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    #[serde(default)]
    content: Option<CandidateContent>,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
struct ResponsePart {
    #[serde(default)]
    text: Option<String>,
}

fn content<'a>(role: Option<&'static str>, text: &'a str) -> Content<'a> {
    Content {
        role,
        parts: vec![Part { text }],
    }
}

/// Google Gemini `generateContent`. System instructions go in
/// `systemInstruction`.
pub struct GeminiProvider {
    client: Client,
    settings: AdapterSettings,
}

impl GeminiProvider {
    pub fn new(client: Client, settings: AdapterSettings) -> Self {
        Self { client, settings }
    }
}

#[async_trait]
impl ChatProvider for GeminiProvider {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Gemini
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

        let contents: Vec<Content<'_>> = history
            .iter()
            .map(|turn| content(Some(native_role(turn.role)), &turn.content))
            .chain(std::iter::once(content(Some(native_role(Role::User)), question)))
            .collect();

        debug!(contents = contents.len(), model = %self.settings.model, "Calling Gemini");

        let request = GenerateContentRequest {
            system_instruction: (!system_instructions.is_empty())
                .then(|| content(None, system_instructions)),
            contents,
            generation_config: GenerationConfig {
                max_output_tokens: self.settings.max_tokens,
            },
        };

        let url = format!(
            "{}/models/{}:generateContent",
            self.settings.base_url, self.settings.model
        );

        let response: GenerateContentResponse = send_json(
            self.kind(),
            self.client
                .post(url)
                .header("x-goog-api-key", api_key)
                .json(&request),
        )
        .await?;

        let candidate = response.candidates.into_iter().next().ok_or_else(|| {
            ProviderError::MalformedResponse {
                provider: self.kind().as_str(),
                message: "No candidates returned".to_string(),
            }
        })?;

        let parts = match candidate.content {
            Some(content) => content.parts,
            None => {
                return Err(ProviderError::MalformedResponse {
                    provider: self.kind().as_str(),
                    message: format!(
                        "Candidate has no content (finishReason={})",
                        candidate.finish_reason.as_deref().unwrap_or("unknown")
                    ),
                })
            }
        };

        let answer_text = join_segments(parts.iter().filter_map(|part| part.text.as_deref()));

        Ok(ProviderResult {
            answer_text,
            model_identifier: self.settings.model.clone(),
        })
    }
}
