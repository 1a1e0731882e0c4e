//! AI backend adapters behind a uniform conversation contract.
//!
//! Every adapter turns `(system instructions, history, question)` into a
//! single answer. The only backend-specific transform visible at this
//! boundary is the role vocabulary, exposed through
//! [`ProviderKind::native_role`] and [`ProviderKind::role_from_native`].

pub mod anthropic;
pub mod error;
pub mod gemini;
pub mod openai;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

use crate::config::settings::{ProviderConfig, DEFAULT_MAX_TOKENS};
use crate::models::chat::{ProviderResult, Role, Turn};

pub use anthropic::AnthropicProvider;
pub use error::ProviderError;
pub use gemini::GeminiProvider;
pub use openai::OpenAiProvider;

/// Uniform interface over one AI backend's completion API.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ChatProvider: Send + Sync {
    fn kind(&self) -> ProviderKind;

    /// Model identifier sent to the backend (configured or default).
    fn model(&self) -> String;

    /// Whether an API key could be resolved from configuration.
    fn has_credential(&self) -> bool;

    async fn generate(
        &self,
        system_instructions: &str,
        history: &[Turn],
        question: &str,
    ) -> Result<ProviderResult, ProviderError>;
}

/// Supported backends, keyed by their `AI_PROVIDER` name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProviderKind {
    Anthropic,
    OpenAi,
    AzureOpenAi,
    Ollama,
    Gemini,
}

impl ProviderKind {
    pub const ALL: [ProviderKind; 5] = [
        ProviderKind::Anthropic,
        ProviderKind::OpenAi,
        ProviderKind::AzureOpenAi,
        ProviderKind::Ollama,
        ProviderKind::Gemini,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ProviderKind::Anthropic => "anthropic",
            ProviderKind::OpenAi => "openai",
            ProviderKind::AzureOpenAi => "azure-openai",
            ProviderKind::Ollama => "ollama",
            ProviderKind::Gemini => "gemini",
        }
    }

    /// Comma-separated list of every supported name.
    pub fn supported() -> String {
        Self::ALL
            .iter()
            .map(|kind| kind.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    }

    pub fn default_model(self) -> &'static str {
        match self {
            ProviderKind::Anthropic => anthropic::DEFAULT_MODEL,
            ProviderKind::OpenAi | ProviderKind::AzureOpenAi | ProviderKind::Ollama => {
                openai::DEFAULT_MODEL
            }
            ProviderKind::Gemini => gemini::DEFAULT_MODEL,
        }
    }

    /// Base URL used when no custom endpoint is configured.
    pub fn default_base_url(self) -> Option<&'static str> {
        match self {
            ProviderKind::Anthropic => Some(anthropic::DEFAULT_BASE_URL),
            ProviderKind::OpenAi => Some(openai::DEFAULT_BASE_URL),
            ProviderKind::AzureOpenAi => None,
            ProviderKind::Ollama => Some(openai::OLLAMA_BASE_URL),
            ProviderKind::Gemini => Some(gemini::DEFAULT_BASE_URL),
        }
    }

    /// Resolve the API key, honouring each backend's fallback variable.
    pub fn resolve_api_key(self, cfg: &ProviderConfig) -> Option<String> {
        let generic = non_empty(&cfg.api_key);
        match self {
            ProviderKind::Anthropic => generic.or_else(|| non_empty(&cfg.anthropic_api_key)),
            ProviderKind::Gemini => generic.or_else(|| non_empty(&cfg.google_api_key)),
            ProviderKind::OpenAi | ProviderKind::AzureOpenAi => generic,
            // Local Ollama does not check the key.
            ProviderKind::Ollama => generic.or_else(|| Some(openai::OLLAMA_PLACEHOLDER_KEY.to_string())),
        }
    }

    pub fn native_role(self, role: Role) -> &'static str {
        match self {
            ProviderKind::Anthropic => anthropic::native_role(role),
            ProviderKind::OpenAi | ProviderKind::AzureOpenAi | ProviderKind::Ollama => {
                openai::native_role(role)
            }
            ProviderKind::Gemini => gemini::native_role(role),
        }
    }

    pub fn role_from_native(self, native: &str) -> Option<Role> {
        match self {
            ProviderKind::Anthropic => anthropic::role_from_native(native),
            ProviderKind::OpenAi | ProviderKind::AzureOpenAi | ProviderKind::Ollama => {
                openai::role_from_native(native)
            }
            ProviderKind::Gemini => gemini::role_from_native(native),
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProviderKind {
    type Err = ProviderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let name = s.trim().to_lowercase();
        if name.is_empty() {
            return Ok(ProviderKind::Anthropic);
        }

        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str() == name)
            .ok_or_else(|| ProviderError::UnknownProvider {
                name,
                supported: Self::supported(),
            })
    }
}

/// Connection and generation settings resolved for one adapter.
#[derive(Debug, Clone)]
pub struct AdapterSettings {
    pub model: String,
    pub api_key: Option<String>,
    pub base_url: String,
    pub api_version: Option<String>,
    pub max_tokens: u32,
}

impl AdapterSettings {
    pub fn resolve(kind: ProviderKind, cfg: &ProviderConfig) -> Result<Self, ProviderError> {
        let base_url = non_empty(&cfg.endpoint)
            .or_else(|| kind.default_base_url().map(str::to_string))
            .ok_or(ProviderError::MissingEndpoint { provider: kind.as_str() })?;

        let max_tokens = if cfg.max_tokens == 0 { DEFAULT_MAX_TOKENS } else { cfg.max_tokens };

        Ok(Self {
            model: non_empty(&cfg.model).unwrap_or_else(|| kind.default_model().to_string()),
            api_key: kind.resolve_api_key(cfg),
            base_url: base_url.trim_end_matches('/').to_string(),
            api_version: non_empty(&cfg.api_version),
            max_tokens,
        })
    }

    pub(crate) fn require_api_key(&self, kind: ProviderKind) -> Result<&str, ProviderError> {
        self.api_key
            .as_deref()
            .ok_or(ProviderError::MissingCredential { provider: kind.as_str() })
    }
}

/// Name-keyed factory for the active adapter.
pub struct ProviderRegistry;

impl ProviderRegistry {
    /// Build the adapter named by `cfg.name`.
    pub fn select(cfg: &ProviderConfig) -> Result<Arc<dyn ChatProvider>, ProviderError> {
        let kind: ProviderKind = cfg.name.parse()?;
        let settings = AdapterSettings::resolve(kind, cfg)?;

        let client = Client::builder()
            .timeout(Duration::from_secs(cfg.timeout_seconds.max(1)))
            .build()
            .map_err(|source| ProviderError::Http { provider: kind.as_str(), source })?;

        info!(
            provider = %kind,
            model = %settings.model,
            base_url = %settings.base_url,
            credential = settings.api_key.is_some(),
            "AI provider selected"
        );

        let provider: Arc<dyn ChatProvider> = match kind {
            ProviderKind::Anthropic => Arc::new(AnthropicProvider::new(client, settings)),
            ProviderKind::OpenAi | ProviderKind::AzureOpenAi | ProviderKind::Ollama => {
                Arc::new(OpenAiProvider::new(kind, client, settings))
            }
            ProviderKind::Gemini => Arc::new(GeminiProvider::new(client, settings)),
        };

        Ok(provider)
    }
}

fn non_empty(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

/// Join textual response segments in order, one newline between them.
pub(crate) fn join_segments<I, S>(segments: I) -> String
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    segments
        .into_iter()
        .map(|s| s.as_ref().to_string())
        .collect::<Vec<_>>()
        .join("\n")
}

/// Send a prepared request and decode a successful JSON reply.
pub(crate) async fn send_json<T: DeserializeOwned>(
    kind: ProviderKind,
    request: RequestBuilder,
) -> Result<T, ProviderError> {
    let provider = kind.as_str();

    let response = request
        .send()
        .await
        .map_err(|source| ProviderError::Http { provider, source })?;

    let status = response.status();
    let body = response
        .text()
        .await
        .map_err(|source| ProviderError::Http { provider, source })?;

    if !status.is_success() {
        return Err(ProviderError::Upstream {
            provider,
            status: status.as_u16(),
            body,
        });
    }

    debug!(provider, status = status.as_u16(), bytes = body.len(), "Provider replied");

    serde_json::from_str(&body).map_err(|e| ProviderError::MalformedResponse {
        provider,
        message: e.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cfg(name: &str) -> ProviderConfig {
        ProviderConfig {
            name: name.to_string(),
            ..ProviderConfig::default()
        }
    }

    #[test]
    fn test_parse_names_case_insensitively() {
        assert_eq!(" Anthropic ".parse::<ProviderKind>().unwrap(), ProviderKind::Anthropic);
        assert_eq!("AZURE-OPENAI".parse::<ProviderKind>().unwrap(), ProviderKind::AzureOpenAi);
        assert_eq!("ollama".parse::<ProviderKind>().unwrap(), ProviderKind::Ollama);
        assert_eq!("".parse::<ProviderKind>().unwrap(), ProviderKind::Anthropic);
    }

    #[test]
    fn test_unknown_name_lists_supported_values() {
        let err = "cohere".parse::<ProviderKind>().unwrap_err();
        let message = err.to_string();
        assert!(message.contains("\"cohere\""));
        for kind in ProviderKind::ALL {
            assert!(message.contains(kind.as_str()), "missing {kind}");
        }
        assert!(err.is_configuration());
    }

    #[test]
    fn test_role_mapping_round_trips_for_every_backend() {
        let history = [Turn::assistant("x"), Turn::user("y")];
        for kind in ProviderKind::ALL {
            for turn in &history {
                let native = kind.native_role(turn.role);
                assert_eq!(kind.role_from_native(native), Some(turn.role), "{kind}");
            }
        }
        assert_eq!(ProviderKind::Gemini.native_role(Role::Assistant), "model");
        assert_eq!(ProviderKind::OpenAi.native_role(Role::Assistant), "assistant");
    }

    #[test]
    fn test_credential_fallbacks() {
        let mut anthropic = cfg("anthropic");
        anthropic.anthropic_api_key = Some("sk-ant".into());
        assert_eq!(ProviderKind::Anthropic.resolve_api_key(&anthropic).as_deref(), Some("sk-ant"));

        let mut gemini = cfg("gemini");
        gemini.google_api_key = Some("g-key".into());
        gemini.api_key = Some("ai-key".into());
        assert_eq!(ProviderKind::Gemini.resolve_api_key(&gemini).as_deref(), Some("ai-key"));

        assert_eq!(ProviderKind::OpenAi.resolve_api_key(&cfg("openai")), None);
        assert_eq!(ProviderKind::Ollama.resolve_api_key(&cfg("ollama")).as_deref(), Some("ollama"));
    }

    #[test]
    fn test_adapter_settings_defaults() {
        let settings = AdapterSettings::resolve(ProviderKind::Gemini, &cfg("gemini")).unwrap();
        assert_eq!(settings.model, "gemini-1.5-flash");
        assert_eq!(settings.max_tokens, 2000);
        assert!(settings.api_key.is_none());

        let mut custom = cfg("openai");
        custom.endpoint = Some("http://localhost:11434/v1/".into());
        custom.model = Some("llama3.2".into());
        custom.max_tokens = 0;
        let settings = AdapterSettings::resolve(ProviderKind::OpenAi, &custom).unwrap();
        assert_eq!(settings.base_url, "http://localhost:11434/v1");
        assert_eq!(settings.model, "llama3.2");
        assert_eq!(settings.max_tokens, DEFAULT_MAX_TOKENS);
    }

    #[test]
    fn test_select_requires_azure_endpoint() {
        let err = ProviderRegistry::select(&cfg("azure-openai")).err().unwrap();
        assert!(matches!(err, ProviderError::MissingEndpoint { .. }));
    }

    #[test]
    fn test_select_builds_each_kind() {
        for name in ["anthropic", "openai", "ollama", "gemini"] {
            let provider = ProviderRegistry::select(&cfg(name)).unwrap();
            assert_eq!(provider.kind().as_str(), name);
        }
        assert!(ProviderRegistry::select(&cfg("bard")).is_err());
    }

    #[test]
    fn test_join_segments() {
        assert_eq!(join_segments(["a", "b", "c"]), "a\nb\nc");
        assert_eq!(join_segments(Vec::<String>::new()), "");
    }
}
