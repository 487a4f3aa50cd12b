//! Language-model backends that turn a prompt into generated text.
//!
//! Every adapter reports quota or rate-limit exhaustion through the typed
//! [`BackendError::QuotaExhausted`] variant, decided from the provider's HTTP status or error
//! status code. Callers never inspect error message text to detect exhaustion.

mod gemini;
mod ollama;

pub use gemini::GeminiBackend;
pub use ollama::OllamaBackend;

use crate::config::{BackendProvider, Config, get_config};
use async_trait::async_trait;
use thiserror::Error;

/// Errors surfaced by a backend invocation.
#[derive(Debug, Error)]
pub enum BackendError {
    /// Provider quota or rate limit was hit; further invocations should not be attempted.
    #[error("Backend quota exhausted: {0}")]
    QuotaExhausted(String),
    /// Provider was unreachable or misconfigured.
    #[error("Backend unavailable: {0}")]
    Unavailable(String),
    /// Provider returned an error response.
    #[error("Failed to generate content: {0}")]
    GenerationFailed(String),
    /// Provider response could not be decoded.
    #[error("Malformed provider response: {0}")]
    InvalidResponse(String),
}

impl BackendError {
    /// Whether the provider reported quota or rate-limit exhaustion.
    pub fn is_quota_exhausted(&self) -> bool {
        matches!(self, Self::QuotaExhausted(_))
    }
}

/// Prompt plus output budget passed to a backend.
#[derive(Debug, Clone)]
pub struct BackendRequest {
    /// Fully assembled prompt.
    pub prompt: String,
    /// Cap on generated tokens.
    pub max_output_tokens: u32,
}

impl BackendRequest {
    /// Build a request from a prompt and an output cap.
    pub fn new(prompt: impl Into<String>, max_output_tokens: u32) -> Self {
        Self {
            prompt: prompt.into(),
            max_output_tokens,
        }
    }
}

/// Interface implemented by language-model providers.
#[async_trait]
pub trait Backend: Send + Sync {
    /// Generate text for the prompt, honoring the output cap.
    async fn invoke(&self, request: BackendRequest) -> Result<String, BackendError>;

    /// Short provider label used in logs.
    fn provider(&self) -> &'static str;
}

/// Build the backend selected by the global configuration.
pub fn get_backend() -> Result<Box<dyn Backend>, BackendError> {
    backend_from_config(get_config())
}

/// Build the backend described by `config`.
pub fn backend_from_config(config: &Config) -> Result<Box<dyn Backend>, BackendError> {
    match config.backend_provider {
        BackendProvider::Gemini => {
            let api_key = config.gemini_api_key.clone().ok_or_else(|| {
                BackendError::Unavailable("GEMINI_API_KEY is not configured".into())
            })?;
            let base_url = config
                .gemini_base_url
                .clone()
                .unwrap_or_else(|| gemini::DEFAULT_GEMINI_URL.to_string());
            Ok(Box::new(GeminiBackend::new(
                base_url,
                api_key,
                config.gemini_model.clone(),
            )?))
        }
        BackendProvider::Ollama => {
            let base_url = config
                .ollama_url
                .clone()
                .unwrap_or_else(|| ollama::DEFAULT_OLLAMA_URL.to_string());
            Ok(Box::new(OllamaBackend::new(
                base_url,
                config.ollama_model.clone(),
            )?))
        }
    }
}

fn build_http_client(user_agent: &str) -> Result<reqwest::Client, BackendError> {
    reqwest::Client::builder()
        .user_agent(user_agent)
        .build()
        .map_err(|error| {
            BackendError::Unavailable(format!("failed to construct HTTP client: {error}"))
        })
}
