use serde_json::Value;
use std::error::Error as StdError;
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info, warn};

use crate::models::chat::{ChatReply, ChatRequest, Turn};
use crate::providers::{ChatProvider, ProviderError};
use crate::security::{normalize_code, AccessGate, ClientIdentity};
use crate::services::profile::ProfileLoader;
use crate::utils::error::ApiError;

const QUESTION_REQUIRED: &str = "Question is required";
const HISTORY_INVALID: &str = "History must be an array of {role, content} turns";

/// Gate check, input validation and provider dispatch for the chat endpoint.
#[derive(Clone)]
pub struct ChatService {
    gate: AccessGate,
    /// Selection failures are kept and reported per request so the rest of
    /// the service stays up.
    provider: Result<Arc<dyn ChatProvider>, Arc<ProviderError>>,
    profile: Arc<ProfileLoader>,
    verbose_errors: bool,
}

impl ChatService {
    pub fn new(
        gate: AccessGate,
        provider: Result<Arc<dyn ChatProvider>, ProviderError>,
        profile: Arc<ProfileLoader>,
        verbose_errors: bool,
    ) -> Self {
        Self {
            gate,
            provider: provider.map_err(Arc::new),
            profile,
            verbose_errors,
        }
    }

    pub fn provider(&self) -> Result<&Arc<dyn ChatProvider>, &ProviderError> {
        self.provider.as_ref().map_err(|e| &**e)
    }

    /// Access codes, a selected provider and its credential are all present.
    pub fn is_configured(&self) -> bool {
        self.gate.codes().is_ok()
            && self.provider().is_ok_and(|provider| provider.has_credential())
    }

    /// Run one chat request. Stages short-circuit on the first failure:
    /// configuration, authorization, input, credential, generation.
    pub async fn handle(
        &self,
        request: ChatRequest,
        access_code: Option<&str>,
        client: &ClientIdentity,
    ) -> Result<ChatReply, ApiError> {
        // ===== STEP 1: Access-code configuration =====
        let authorized = self.gate.is_authorized(access_code).map_err(|e| {
            error!(error = %e, "[chat] service configuration error");
            ApiError::Configuration(e.to_string())
        })?;

        // ===== STEP 2: Authorization =====
        if !authorized {
            warn!(
                client = %client,
                code = access_code.filter(|c| !c.is_empty()).unwrap_or("none"),
                "[chat] UNAUTHORIZED"
            );
            return Err(ApiError::Unauthorized);
        }

        let code = access_code.map(normalize_code).unwrap_or_default();
        info!(code = %code, client = %client, "[chat] REQUEST");

        // ===== STEP 3: Input validation =====
        let question = request
            .question
            .as_ref()
            .and_then(Value::as_str)
            .filter(|q| !q.trim().is_empty())
            .ok_or_else(|| ApiError::BadRequest(QUESTION_REQUIRED.to_string()))?;

        let history = parse_history(request.history)?;

        // ===== STEP 4: Provider selection and credential =====
        let provider = self.provider().map_err(|e| {
            error!(error = %e, "[chat] provider selection failed");
            ApiError::Configuration(e.to_string())
        })?;

        let kind = provider.kind();
        if !provider.has_credential() {
            error!(provider = %kind, "[chat] AI_API_KEY is not configured");
            return Err(ApiError::Configuration(format!(
                "AI_API_KEY is not configured for provider {kind}"
            )));
        }

        // ===== STEP 5: Dispatch =====
        let model = provider.model();
        info!(provider = %kind, model = %model, turns = history.len(), "[chat] calling provider");

        let start = Instant::now();
        match self.generate(&**provider, &history, question).await {
            Ok(reply) => {
                info!(
                    provider = %kind,
                    model = %reply.model,
                    elapsed_ms = start.elapsed().as_millis() as u64,
                    "[chat] response generated successfully"
                );
                Ok(reply)
            }
            Err(GenerateError::Provider(e)) if e.is_configuration() => {
                error!(provider = %kind, error = %e, "[chat] provider configuration error");
                Err(ApiError::Configuration(e.to_string()))
            }
            Err(e) => {
                error!(
                    provider = %kind,
                    error = %e,
                    chain = %error_chain(&e),
                    "[chat] generation failed"
                );
                Err(ApiError::Provider {
                    details: self.verbose_errors.then(|| e.to_string()),
                })
            }
        }
    }

    async fn generate(
        &self,
        provider: &dyn ChatProvider,
        history: &[Turn],
        question: &str,
    ) -> Result<ChatReply, GenerateError> {
        let profile = self.profile.load()?;
        let result = provider.generate(&profile, history, question).await?;
        Ok(result.into())
    }
}

#[derive(Debug, thiserror::Error)]
enum GenerateError {
    #[error(transparent)]
    Profile(#[from] crate::services::profile::ProfileError),

    #[error(transparent)]
    Provider(#[from] ProviderError),
}

fn parse_history(history: Option<Value>) -> Result<Vec<Turn>, ApiError> {
    match history {
        None | Some(Value::Null) => Ok(Vec::new()),
        Some(value) => serde_json::from_value(value)
            .map_err(|_| ApiError::BadRequest(HISTORY_INVALID.to_string())),
    }
}

/// Render an error and its sources as `outer: inner: root`.
fn error_chain(err: &dyn StdError) -> String {
    let mut parts = vec![err.to_string()];
    let mut source = err.source();
    while let Some(cause) = source {
        parts.push(cause.to_string());
        source = cause.source();
    }
    parts.join(": ")
}
