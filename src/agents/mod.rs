//! Pipeline agents.
//!
//! Each agent wraps exactly one model call per invocation: it renders a
//! prompt, asks the completion provider, and turns the free-form reply into a
//! typed result. Shared plumbing lives in [`AgentCore`]; the per-stage logic
//! lives in the [`WriterAgent`], [`ReviewerAgent`] and [`ManagerAgent`].

mod manager;
pub mod prompts;
pub mod response;
mod reviewer;
mod writer;

pub use manager::{ManagerAgent, ManagerInput, ManagerMetadata, ManagerOutput};
pub use response::{
    parse_reply, ManagerApproval, ManagerComment, ParsedReply, ReviewApproval, ReviewResult,
    StageSchema, MANAGER_SCHEMA, REVIEW_SCHEMA,
};
pub use reviewer::{ReviewMetadata, ReviewOutput, ReviewerAgent};
pub use writer::{DraftMetadata, DraftOutput, DraftSources, WriterAgent, WriterInput};

pub use crate::core::AgentConfig;

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::ai::{CompletionProvider, CompletionRequest};

/// Errors raised by a pipeline stage.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StageError {
    /// The stage input was unusable
    #[error("{0}")]
    Validation(String),

    /// The completion provider failed
    #[error("Completion failed: {0}")]
    Completion(String),
}

/// One stage of the report pipeline.
#[async_trait]
pub trait StageAgent: Send {
    /// Stage input
    type Input: Send;
    /// Stage result
    type Output: Send;

    /// Agent settings.
    fn config(&self) -> &AgentConfig;

    /// Run the stage.
    async fn process(&mut self, input: Self::Input) -> Result<Self::Output, StageError>;
}

/// Speaker of a transcript entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Prompt sent to the model
    User,
    /// Model reply
    Assistant,
}

/// One turn of an agent transcript.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    /// Who spoke
    pub role: Role,
    /// What was said
    pub content: String,
}

/// State shared by all agents: settings, provider handle and transcript.
pub struct AgentCore {
    config: AgentConfig,
    provider: Arc<dyn CompletionProvider>,
    history: Vec<HistoryEntry>,
}

impl AgentCore {
    /// Create a core with an empty transcript.
    pub fn new(config: AgentConfig, provider: Arc<dyn CompletionProvider>) -> Self {
        Self { config, provider, history: Vec::new() }
    }

    /// Agent settings.
    pub fn config(&self) -> &AgentConfig {
        &self.config
    }

    /// Transcript of this agent since the last clear.
    pub fn history(&self) -> &[HistoryEntry] {
        &self.history
    }

    /// Forget the transcript.
    pub fn clear_history(&mut self) {
        self.history.clear();
    }

    /// Send one prompt to the provider and record both turns.
    ///
    /// The system prompt, when configured, is prepended separated by a blank
    /// line.
    pub async fn generate_response(&mut self, prompt: &str) -> Result<String, StageError> {
        let full_prompt = match self.config.system_prompt.as_deref() {
            Some(system) if !system.is_empty() => format!("{}\n\n{}", system, prompt),
            _ => prompt.to_string(),
        };

        let request = CompletionRequest::new(full_prompt)
            .with_temperature(self.config.temperature)
            .with_max_tokens(self.config.max_tokens)
            .with_model(self.config.model.clone());

        tracing::debug!(
            agent = %self.config.name,
            provider = self.provider.name(),
            "Requesting completion"
        );

        self.history.push(HistoryEntry { role: Role::User, content: prompt.to_string() });

        let reply = self.provider.complete(&request).await.map_err(|e| {
            tracing::warn!(agent = %self.config.name, error = %e, "Completion failed");
            StageError::Completion(e.to_string())
        })?;

        self.history.push(HistoryEntry { role: Role::Assistant, content: reply.clone() });
        Ok(reply)
    }
}

impl std::fmt::Debug for AgentCore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AgentCore")
            .field("config", &self.config)
            .field("provider", &self.provider.name())
            .field("history", &self.history.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::ScriptedProvider;

    #[tokio::test]
    async fn test_generate_response_prepends_system_prompt() {
        let provider = Arc::new(ScriptedProvider::with_replies(["reply"]));
        let config = AgentConfig::new("Tester", "test").with_system_prompt("SYSTEM");
        let mut core = AgentCore::new(config, provider.clone());

        let reply = core.generate_response("PROMPT").await.unwrap();

        assert_eq!(reply, "reply");
        assert_eq!(provider.prompts(), vec!["SYSTEM\n\nPROMPT".to_string()]);
    }

    #[tokio::test]
    async fn test_generate_response_passes_sampling_settings() {
        let provider = Arc::new(ScriptedProvider::with_replies(["ok"]));
        let mut config = AgentConfig::new("Tester", "test").with_temperature(0.2);
        config.model = Some("custom-model".to_string());
        config.max_tokens = 256;
        let mut core = AgentCore::new(config, provider.clone());

        core.generate_response("hi").await.unwrap();

        let request = &provider.requests()[0];
        assert_eq!(request.prompt, "hi");
        assert!((request.temperature - 0.2).abs() < f32::EPSILON);
        assert_eq!(request.max_tokens, 256);
        assert_eq!(request.model.as_deref(), Some("custom-model"));
    }

    #[tokio::test]
    async fn test_history_records_turns_and_clears() {
        let provider = Arc::new(ScriptedProvider::with_replies(["one", "two"]));
        let mut core = AgentCore::new(AgentConfig::new("Tester", "test"), provider);

        core.generate_response("first").await.unwrap();
        core.generate_response("second").await.unwrap();

        let history = core.history();
        assert_eq!(history.len(), 4);
        assert_eq!(history[0], HistoryEntry { role: Role::User, content: "first".to_string() });
        assert_eq!(history[3], HistoryEntry { role: Role::Assistant, content: "two".to_string() });

        core.clear_history();
        assert!(core.history().is_empty());
    }

    #[tokio::test]
    async fn test_provider_error_maps_to_completion_error() {
        let provider = Arc::new(ScriptedProvider::new());
        provider.push_error("quota exceeded");
        let mut core = AgentCore::new(AgentConfig::new("Tester", "test"), provider);

        let err = core.generate_response("hi").await.unwrap_err();

        assert_eq!(err, StageError::Completion("quota exceeded".to_string()));
        // The prompt is recorded even when no reply arrives.
        assert_eq!(core.history().len(), 1);
    }
}
