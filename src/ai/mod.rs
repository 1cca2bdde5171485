//! Completion model integration.
//!
//! Every agent talks to the model through the [`CompletionProvider`] trait:
//! one prompt in, one reply out. Providers:
//!
//! - [`GeminiProvider`] - Google Gemini (default)
//! - [`ClaudeProvider`] - Anthropic Claude
//! - [`OllamaProvider`] - local models through Ollama
//! - [`ScriptedProvider`] - replays canned replies, no network

mod claude;
mod gemini;
mod ollama;
mod scripted;

pub use claude::ClaudeProvider;
pub use gemini::GeminiProvider;
pub use ollama::OllamaProvider;
pub use scripted::ScriptedProvider;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use crate::core::AiConfig;

/// A single completion call.
#[derive(Debug, Clone, PartialEq)]
pub struct CompletionRequest {
    /// Full prompt text, system instruction included
    pub prompt: String,
    /// Sampling temperature
    pub temperature: f32,
    /// Upper bound on generated tokens
    pub max_tokens: u32,
    /// Per-call model override
    pub model: Option<String>,
}

impl CompletionRequest {
    /// Create a request with default sampling settings.
    pub fn new(prompt: impl Into<String>) -> Self {
        Self { prompt: prompt.into(), temperature: 0.7, max_tokens: 4096, model: None }
    }

    /// Set the temperature.
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    /// Set the token limit.
    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    /// Override the provider's default model.
    pub fn with_model(mut self, model: Option<String>) -> Self {
        self.model = model;
        self
    }
}

/// Trait for text completion backends.
#[async_trait]
pub trait CompletionProvider: Send + Sync {
    /// Send one prompt and return the model's reply text.
    async fn complete(&self, request: &CompletionRequest) -> anyhow::Result<String>;

    /// Get the provider name.
    fn name(&self) -> &str;

    /// Get the default model.
    fn model(&self) -> &str;
}

/// AI error types.
#[derive(Debug, thiserror::Error)]
pub enum AIError {
    #[error("Missing credentials: {0} is not set")]
    MissingCredentials(&'static str),

    #[error("Unknown provider: {0}")]
    UnknownProvider(String),

    #[error("API error ({status}): {body}")]
    Api { status: u16, body: String },

    #[error("No response from {0}")]
    NoResponse(&'static str),
}

/// Build an HTTP client with the configured request timeout.
pub(crate) fn http_client(timeout_secs: u64) -> reqwest::Client {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .build()
        .unwrap_or_default()
}

/// Create the provider selected in the configuration.
///
/// Credentials are read from the environment (`GOOGLE_API_KEY`,
/// `ANTHROPIC_API_KEY`, `OLLAMA_HOST`).
pub fn provider_from_config(config: &AiConfig) -> anyhow::Result<Arc<dyn CompletionProvider>> {
    let provider: Arc<dyn CompletionProvider> = match config.provider.as_str() {
        "gemini" | "google" => {
            let mut provider = GeminiProvider::new()?.with_timeout(config.timeout_secs);
            if let Some(ref model) = config.model {
                provider = provider.with_model(model);
            }
            if let Some(ref url) = config.base_url {
                provider = provider.with_base_url(url);
            }
            Arc::new(provider)
        }
        "claude" | "anthropic" => {
            let mut provider = ClaudeProvider::new()?.with_timeout(config.timeout_secs);
            if let Some(ref model) = config.model {
                provider = provider.with_model(model);
            }
            if let Some(ref url) = config.base_url {
                provider = provider.with_base_url(url);
            }
            Arc::new(provider)
        }
        "ollama" => {
            let mut provider = OllamaProvider::new().with_timeout(config.timeout_secs);
            if let Some(ref model) = config.model {
                provider = provider.with_model(model);
            }
            if let Some(ref url) = config.base_url {
                provider = provider.with_base_url(url);
            }
            Arc::new(provider)
        }
        other => return Err(AIError::UnknownProvider(other.to_string()).into()),
    };

    tracing::debug!(provider = provider.name(), model = provider.model(), "Completion provider ready");
    Ok(provider)
}
