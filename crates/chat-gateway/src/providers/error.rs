use thiserror::Error;

#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("Unknown AI_PROVIDER \"{name}\". Supported values: {supported}")]
    UnknownProvider { name: String, supported: String },

    #[error("AI_API_KEY is not set ({provider} provider)")]
    MissingCredential { provider: &'static str },

    #[error("AI_API_ENDPOINT is required for the {provider} provider")]
    MissingEndpoint { provider: &'static str },

    #[error("Failed to call {provider} API: {source}")]
    Http {
        provider: &'static str,
        #[source]
        source: reqwest::Error,
    },

    #[error("{provider} API error: {status} - {body}")]
    Upstream {
        provider: &'static str,
        status: u16,
        body: String,
    },

    #[error("Malformed {provider} response: {message}")]
    MalformedResponse {
        provider: &'static str,
        message: String,
    },
}

impl ProviderError {
    /// Errors caused by deployment configuration rather than by the call.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            ProviderError::UnknownProvider { .. }
                | ProviderError::MissingCredential { .. }
                | ProviderError::MissingEndpoint { .. }
        )
    }
}
