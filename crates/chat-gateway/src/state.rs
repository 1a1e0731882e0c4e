use axum::extract::FromRef;
use std::sync::Arc;
use tracing::error;

use crate::config::Settings;
use crate::providers::{ChatProvider, ProviderError, ProviderRegistry};
use crate::security::{AccessGate, ForwardingPolicy, RateLimiter};
use crate::services::{ChatService, ProfileLoader, ValidateService};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub chat: Arc<ChatService>,
    pub validate: Arc<ValidateService>,
    pub forwarding: ForwardingPolicy,
}

impl AppState {
    /// Wire services from settings, selecting the configured provider.
    ///
    /// An unresolvable provider does not stop the service: code checks keep
    /// working and chat requests answer with a configuration error.
    pub fn from_settings(settings: &Settings) -> Self {
        let provider = ProviderRegistry::select(&settings.provider).inspect_err(|e| {
            error!(error = %e, provider = %settings.provider.name, "AI provider selection failed");
        });
        Self::build(settings, provider)
    }

    pub fn with_provider(settings: &Settings, provider: Arc<dyn ChatProvider>) -> Self {
        Self::build(settings, Ok(provider))
    }

    fn build(settings: &Settings, provider: Result<Arc<dyn ChatProvider>, ProviderError>) -> Self {
        let gate = AccessGate::new(settings.access.codes.clone());
        let profile = Arc::new(ProfileLoader::from_config(&settings.profile));

        let chat = ChatService::new(
            gate.clone(),
            provider,
            profile,
            settings.logging.verbose_errors(),
        );
        let validate = ValidateService::new(gate, RateLimiter::from_config(&settings.rate_limit));

        Self {
            chat: Arc::new(chat),
            validate: Arc::new(validate),
            forwarding: ForwardingPolicy {
                trust_forwarded_headers: settings.server.trust_forwarded_headers,
            },
        }
    }
}

impl FromRef<AppState> for Arc<ChatService> {
    fn from_ref(state: &AppState) -> Self {
        state.chat.clone()
    }
}

impl FromRef<AppState> for Arc<ValidateService> {
    fn from_ref(state: &AppState) -> Self {
        state.validate.clone()
    }
}

impl FromRef<AppState> for ForwardingPolicy {
    fn from_ref(state: &AppState) -> Self {
        state.forwarding
    }
}
