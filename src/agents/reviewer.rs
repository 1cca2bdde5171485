//! Draft reviewer agent.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::{prompts, AgentConfig, AgentCore, HistoryEntry, ReviewResult, StageAgent, StageError};
use crate::ai::CompletionProvider;

/// Metadata of a review.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReviewMetadata {
    /// Name of the reviewing agent
    pub agent: String,
    /// Score copied from the parsed review
    pub review_score: u8,
}

/// Result of the review stage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReviewOutput {
    /// Parsed review
    pub review: ReviewResult,
    /// Review metadata
    pub metadata: ReviewMetadata,
}

/// Agent that scores a draft and suggests improvements.
pub struct ReviewerAgent {
    core: AgentCore,
}

impl ReviewerAgent {
    /// Create a reviewer.
    pub fn new(config: AgentConfig, provider: Arc<dyn CompletionProvider>) -> Self {
        Self { core: AgentCore::new(config, provider) }
    }

    /// Transcript since the last clear.
    pub fn history(&self) -> &[HistoryEntry] {
        self.core.history()
    }

    /// Forget the transcript.
    pub fn clear_history(&mut self) {
        self.core.clear_history();
    }
}

#[async_trait]
impl StageAgent for ReviewerAgent {
    type Input = String;
    type Output = ReviewOutput;

    fn config(&self) -> &AgentConfig {
        self.core.config()
    }

    async fn process(&mut self, draft: String) -> Result<ReviewOutput, StageError> {
        if draft.trim().is_empty() {
            return Err(StageError::Validation("週報ドラフトが提供されていません".to_string()));
        }

        let reply = self.core.generate_response(&prompts::review_prompt(&draft)).await?;
        let review = ReviewResult::parse(&reply);

        tracing::info!(
            agent = %self.core.config().name,
            score = review.score,
            approval = %review.approval,
            suggestions = review.suggestions.len(),
            "Review complete"
        );

        Ok(ReviewOutput {
            metadata: ReviewMetadata {
                agent: self.core.config().name.clone(),
                review_score: review.score,
            },
            review,
        })
    }
}
