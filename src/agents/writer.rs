//! Report writer agent.
//!
//! Extracts structured items from meeting notes, optionally pulls recent
//! workspace updates, and asks the model for a first draft. The same agent
//! applies review suggestions in the revision step.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};

use super::{prompts, AgentConfig, AgentCore, HistoryEntry, StageAgent, StageError};
use crate::ai::CompletionProvider;
use crate::integrations::WorkspaceSource;
use crate::notes::NoteExtractor;

/// Input of the drafting stage.
#[derive(Debug, Clone, Default)]
pub struct WriterInput {
    /// Raw meeting notes, one entry per note
    pub meeting_notes: Vec<String>,
    /// Whether to pull updates from the attached workspace source
    pub use_workspace: bool,
}

/// Where the draft's information came from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DraftSources {
    /// Number of meeting notes supplied
    pub meeting_notes_count: usize,
    /// Number of workspace items included
    pub external_items_count: usize,
}

/// Metadata of a draft.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DraftMetadata {
    /// When the draft was requested
    pub created_at: DateTime<Local>,
    /// Name of the writing agent
    pub agent: String,
    /// Input counts
    pub sources: DraftSources,
}

/// Result of the drafting stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DraftOutput {
    /// Draft report text, as returned by the model
    pub draft: String,
    /// Draft metadata
    pub metadata: DraftMetadata,
}

/// Agent that writes and revises the report.
pub struct WriterAgent {
    core: AgentCore,
    extractor: NoteExtractor,
    workspace: Option<Arc<dyn WorkspaceSource>>,
    lookback_days: u32,
}

impl WriterAgent {
    /// Create a writer without a workspace source.
    pub fn new(config: AgentConfig, provider: Arc<dyn CompletionProvider>) -> Self {
        Self {
            core: AgentCore::new(config, provider),
            extractor: NoteExtractor::new(),
            workspace: None,
            lookback_days: 7,
        }
    }

    /// Attach a workspace source queried over the last `lookback_days` days.
    pub fn with_workspace(mut self, source: Arc<dyn WorkspaceSource>, lookback_days: u32) -> Self {
        self.workspace = Some(source);
        self.lookback_days = lookback_days;
        self
    }

    /// Set or replace the workspace source.
    pub fn set_workspace(&mut self, source: Arc<dyn WorkspaceSource>, lookback_days: u32) {
        self.workspace = Some(source);
        self.lookback_days = lookback_days;
    }

    /// Whether a workspace source is attached.
    pub fn has_workspace(&self) -> bool {
        self.workspace.is_some()
    }

    /// Transcript since the last clear.
    pub fn history(&self) -> &[HistoryEntry] {
        self.core.history()
    }

    /// Forget the transcript.
    pub fn clear_history(&mut self) {
        self.core.clear_history();
    }

    /// Apply review suggestions to a draft.
    ///
    /// One model call; the reply is returned as is.
    pub async fn revise(&mut self, draft: &str, suggestions: &[String]) -> Result<String, StageError> {
        let prompt = prompts::revision_prompt(draft, suggestions);
        self.core.generate_response(&prompt).await
    }

    /// Workspace items to include, or none when disabled or failing.
    async fn fetch_updates(&self, use_workspace: bool) -> Vec<String> {
        let Some(source) = self.workspace.as_ref().filter(|_| use_workspace) else {
            return Vec::new();
        };

        let updates = source.weekly_updates(self.lookback_days).await;
        if let Some(error) = updates.error {
            tracing::warn!(source = source.name(), error = %error, "Error fetching workspace updates");
            return Vec::new();
        }

        tracing::debug!(source = source.name(), items = updates.count, "Fetched workspace updates");
        updates.items
    }
}

#[async_trait]
impl StageAgent for WriterAgent {
    type Input = WriterInput;
    type Output = DraftOutput;

    fn config(&self) -> &AgentConfig {
        self.core.config()
    }

    async fn process(&mut self, input: WriterInput) -> Result<DraftOutput, StageError> {
        let summary = self.extractor.parse_all(input.meeting_notes.as_slice());
        let external_items = self.fetch_updates(input.use_workspace).await;

        tracing::info!(
            agent = %self.core.config().name,
            notes = input.meeting_notes.len(),
            items = summary.item_count(),
            external = external_items.len(),
            "Writing draft"
        );

        let created_at = Local::now();
        let prompt = prompts::draft_prompt(&summary, &external_items, created_at.date_naive());
        let draft = self.core.generate_response(&prompt).await?;

        Ok(DraftOutput {
            draft,
            metadata: DraftMetadata {
                created_at,
                agent: self.core.config().name.clone(),
                sources: DraftSources {
                    meeting_notes_count: input.meeting_notes.len(),
                    external_items_count: external_items.len(),
                },
            },
        })
    }
}
