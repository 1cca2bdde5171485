//! Stage sequencing.
//!
//! Runs draft, review, revision and manager commentary strictly in order.
//! The first failing stage aborts the run; nothing is retried or rolled back.

use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::agents::{
    ManagerAgent, ManagerComment, ManagerInput, ReviewResult, ReviewerAgent, StageAgent,
    StageError, WriterAgent, WriterInput,
};
use crate::ai::CompletionProvider;
use crate::core::AgentsConfig;
use crate::integrations::WorkspaceSource;

/// Where a pipeline run currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PipelineStage {
    /// Writer is producing the first draft
    Drafting,
    /// Reviewer is scoring the draft
    Reviewing,
    /// Writer is applying review suggestions
    Revising,
    /// Manager is commenting on the final report
    Commenting,
    /// All stages succeeded
    Done,
    /// A stage failed
    Failed,
}

impl PipelineStage {
    /// Step number and total shown in progress output, for working stages.
    pub fn step(self) -> Option<(usize, usize)> {
        match self {
            Self::Drafting => Some((1, 4)),
            Self::Reviewing => Some((2, 4)),
            Self::Revising => Some((3, 4)),
            Self::Commenting => Some((4, 4)),
            Self::Done | Self::Failed => None,
        }
    }

    /// Label used when this stage fails.
    pub fn failure_label(self) -> &'static str {
        match self {
            Self::Drafting => "Failed to create draft",
            Self::Reviewing => "Failed to review draft",
            Self::Revising => "Failed to revise draft",
            Self::Commenting => "Failed to get manager comment",
            Self::Done | Self::Failed => "Pipeline failed",
        }
    }

    /// Get the stage name.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Drafting => "drafting",
            Self::Reviewing => "reviewing",
            Self::Revising => "revising",
            Self::Commenting => "commenting",
            Self::Done => "done",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Everything a successful run produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineResult {
    /// Unique ID of this run
    pub run_id: Uuid,
    /// First draft, before revision
    pub draft: String,
    /// Report handed to the manager
    pub final_report: String,
    /// Whether a revision call was made
    pub revised: bool,
    /// Reviewer verdict on the first draft
    pub review: ReviewResult,
    /// Manager commentary on the final report
    pub manager: ManagerComment,
    /// When the last stage finished
    pub completed_at: DateTime<Local>,
}

/// A run that stopped at a failing stage.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{error}: {details}")]
pub struct PipelineFailure {
    /// Stage that failed
    pub stage: PipelineStage,
    /// Failure label of that stage
    pub error: String,
    /// Underlying stage error
    pub details: StageError,
}

impl PipelineFailure {
    fn at(stage: PipelineStage, details: StageError) -> Self {
        Self { stage, error: stage.failure_label().to_string(), details }
    }
}

/// Sequences the writer, reviewer and manager agents.
pub struct PipelineOrchestrator {
    writer: WriterAgent,
    reviewer: ReviewerAgent,
    manager: ManagerAgent,
    stage: PipelineStage,
}

impl PipelineOrchestrator {
    /// Create an orchestrator whose agents share one provider.
    pub fn new(provider: Arc<dyn CompletionProvider>, agents: &AgentsConfig) -> Self {
        Self {
            writer: WriterAgent::new(agents.writer.clone(), Arc::clone(&provider)),
            reviewer: ReviewerAgent::new(agents.reviewer.clone(), Arc::clone(&provider)),
            manager: ManagerAgent::new(agents.manager.clone(), provider),
            stage: PipelineStage::Drafting,
        }
    }

    /// Attach a workspace source for the writer.
    pub fn with_workspace(mut self, source: Arc<dyn WorkspaceSource>, lookback_days: u32) -> Self {
        self.writer.set_workspace(source, lookback_days);
        self
    }

    /// Whether the writer has a workspace source.
    pub fn has_workspace(&self) -> bool {
        self.writer.has_workspace()
    }

    /// Stage reached by the last run.
    pub fn stage(&self) -> PipelineStage {
        self.stage
    }

    /// The writer agent.
    pub fn writer(&self) -> &WriterAgent {
        &self.writer
    }

    /// The reviewer agent.
    pub fn reviewer(&self) -> &ReviewerAgent {
        &self.reviewer
    }

    /// The manager agent.
    pub fn manager(&self) -> &ManagerAgent {
        &self.manager
    }

    /// Run the whole pipeline.
    pub async fn run(
        &mut self,
        meeting_notes: Vec<String>,
        use_workspace: bool,
    ) -> Result<PipelineResult, PipelineFailure> {
        self.run_with_progress(meeting_notes, use_workspace, |_| {}).await
    }

    /// Run the whole pipeline, reporting each stage before it starts.
    ///
    /// `on_stage` also receives the terminal `Done` or `Failed` stage.
    pub async fn run_with_progress<F>(
        &mut self,
        meeting_notes: Vec<String>,
        use_workspace: bool,
        mut on_stage: F,
    ) -> Result<PipelineResult, PipelineFailure>
    where
        F: FnMut(PipelineStage) + Send,
    {
        self.writer.clear_history();
        self.reviewer.clear_history();
        self.manager.clear_history();

        let result = self.execute(meeting_notes, use_workspace, &mut on_stage).await;

        self.stage = match &result {
            Ok(_) => PipelineStage::Done,
            Err(failure) => {
                tracing::error!(
                    stage = %failure.stage,
                    error = %failure.details,
                    "{}",
                    failure.error
                );
                PipelineStage::Failed
            }
        };
        on_stage(self.stage);

        result
    }

    async fn execute<F>(
        &mut self,
        meeting_notes: Vec<String>,
        use_workspace: bool,
        on_stage: &mut F,
    ) -> Result<PipelineResult, PipelineFailure>
    where
        F: FnMut(PipelineStage) + Send,
    {
        let run_id = Uuid::new_v4();
        tracing::info!(%run_id, notes = meeting_notes.len(), use_workspace, "Pipeline started");

        self.enter(PipelineStage::Drafting, on_stage);
        let draft = self
            .writer
            .process(WriterInput { meeting_notes, use_workspace })
            .await
            .map_err(|e| PipelineFailure::at(PipelineStage::Drafting, e))?
            .draft;

        self.enter(PipelineStage::Reviewing, on_stage);
        let review = self
            .reviewer
            .process(draft.clone())
            .await
            .map_err(|e| PipelineFailure::at(PipelineStage::Reviewing, e))?
            .review;

        self.enter(PipelineStage::Revising, on_stage);
        let (final_report, revised) = if review.suggestions.is_empty() {
            tracing::debug!("No suggestions, keeping draft as is");
            (draft.clone(), false)
        } else {
            let revised = self
                .writer
                .revise(&draft, &review.suggestions)
                .await
                .map_err(|e| PipelineFailure::at(PipelineStage::Revising, e))?;
            (revised, true)
        };

        self.enter(PipelineStage::Commenting, on_stage);
        let manager = self
            .manager
            .process(ManagerInput {
                final_report: final_report.clone(),
                review_score: Some(review.score),
            })
            .await
            .map_err(|e| PipelineFailure::at(PipelineStage::Commenting, e))?
            .comment;

        tracing::info!(%run_id, score = review.score, revised, "Pipeline finished");

        Ok(PipelineResult {
            run_id,
            draft,
            final_report,
            revised,
            review,
            manager,
            completed_at: Local::now(),
        })
    }

    fn enter<F>(&mut self, stage: PipelineStage, on_stage: &mut F)
    where
        F: FnMut(PipelineStage),
    {
        tracing::debug!(stage = %stage, "Entering stage");
        self.stage = stage;
        on_stage(stage);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agents::ReviewApproval;
    use crate::ai::ScriptedProvider;

    const REVIEW_WITH_SUGGESTIONS: &str =
        "### フィードバック\n良い内容です。\n\n### 具体的な改善提案\n1. 期限を追記する\n\n### 承認ステータス\n条件付き承認\n\n### スコア\n7/10\n";
    const REVIEW_WITHOUT_SUGGESTIONS: &str =
        "### フィードバック\n完璧です。\n\n### 承認ステータス\n承認\n\n### スコア\n9/10\n";
    const MANAGER_REPLY: &str =
        "### 総評\nお疲れさまでした。\n\n### 特に評価する点\n- 丁寧な報告\n\n### 承認ステータス\n承認\n";

    fn orchestrator(provider: &Arc<ScriptedProvider>) -> PipelineOrchestrator {
        PipelineOrchestrator::new(provider.clone(), &AgentsConfig::default())
    }

    #[tokio::test]
    async fn test_full_run_with_revision() {
        let provider = Arc::new(ScriptedProvider::with_replies([
            "draft v1",
            REVIEW_WITH_SUGGESTIONS,
            "draft v2",
            MANAGER_REPLY,
        ]));
        let mut pipeline = orchestrator(&provider);

        let result = pipeline.run(vec!["✓ 完了".to_string()], false).await.unwrap();

        assert_eq!(result.draft, "draft v1");
        assert_eq!(result.final_report, "draft v2");
        assert!(result.revised);
        assert_eq!(result.review.score, 7);
        assert_eq!(result.review.approval, ReviewApproval::ConditionallyApproved);
        assert_eq!(result.manager.evaluation_points, vec!["丁寧な報告"]);
        assert_eq!(pipeline.stage(), PipelineStage::Done);
        assert_eq!(provider.call_count(), 4);

        let prompts = provider.prompts();
        assert!(prompts[2].contains("- 期限を追記する"));
        assert!(prompts[3].contains("draft v2"));
        assert!(prompts[3].contains("7/10"));
    }

    #[tokio::test]
    async fn test_revision_skipped_without_suggestions() {
        let provider = Arc::new(ScriptedProvider::with_replies([
            "draft v1",
            REVIEW_WITHOUT_SUGGESTIONS,
            MANAGER_REPLY,
        ]));
        let mut pipeline = orchestrator(&provider);

        let result = pipeline.run(Vec::new(), false).await.unwrap();

        assert!(!result.revised);
        assert_eq!(result.final_report, result.draft);
        assert_eq!(provider.call_count(), 3);
    }

    #[tokio::test]
    async fn test_empty_revision_fails_at_manager() {
        let provider = Arc::new(ScriptedProvider::with_replies([
            "draft v1",
            REVIEW_WITH_SUGGESTIONS,
            "   ",
            MANAGER_REPLY,
        ]));
        let mut pipeline = orchestrator(&provider);

        let failure = pipeline.run(Vec::new(), false).await.unwrap_err();

        assert_eq!(failure.stage, PipelineStage::Commenting);
        assert_eq!(failure.error, "Failed to get manager comment");
        assert!(matches!(failure.details, StageError::Validation(_)));
        assert_eq!(provider.call_count(), 3);
        assert_eq!(provider.remaining(), 1);
        assert_eq!(pipeline.stage(), PipelineStage::Failed);
    }

    #[tokio::test]
    async fn test_empty_draft_fails_at_review() {
        let provider = Arc::new(ScriptedProvider::with_replies([""]));
        let mut pipeline = orchestrator(&provider);

        let failure = pipeline.run(Vec::new(), false).await.unwrap_err();

        assert_eq!(failure.error, "Failed to review draft");
        assert_eq!(provider.call_count(), 1);
    }

    #[tokio::test]
    async fn test_completion_error_labels() {
        let provider = Arc::new(ScriptedProvider::new());
        provider.push_error("offline");
        let mut pipeline = orchestrator(&provider);

        let failure = pipeline.run(Vec::new(), false).await.unwrap_err();
        assert_eq!(failure.stage, PipelineStage::Drafting);
        assert_eq!(failure.to_string(), "Failed to create draft: Completion failed: offline");

        let provider = Arc::new(ScriptedProvider::with_replies(["draft", REVIEW_WITH_SUGGESTIONS]));
        provider.push_error("offline");
        let mut pipeline = orchestrator(&provider);

        let failure = pipeline.run(Vec::new(), false).await.unwrap_err();
        assert_eq!(failure.error, "Failed to revise draft");
    }

    #[tokio::test]
    async fn test_progress_reports_each_stage() {
        let provider = Arc::new(ScriptedProvider::with_replies([
            "draft v1",
            REVIEW_WITHOUT_SUGGESTIONS,
            MANAGER_REPLY,
        ]));
        let mut pipeline = orchestrator(&provider);
        let mut seen = Vec::new();

        pipeline.run_with_progress(Vec::new(), false, |stage| seen.push(stage)).await.unwrap();

        assert_eq!(
            seen,
            vec![
                PipelineStage::Drafting,
                PipelineStage::Reviewing,
                PipelineStage::Revising,
                PipelineStage::Commenting,
                PipelineStage::Done,
            ]
        );
    }

    #[tokio::test]
    async fn test_history_cleared_between_runs() {
        let provider = Arc::new(ScriptedProvider::with_replies([
            "draft v1",
            REVIEW_WITHOUT_SUGGESTIONS,
            MANAGER_REPLY,
            "draft v1",
            REVIEW_WITHOUT_SUGGESTIONS,
            MANAGER_REPLY,
        ]));
        let mut pipeline = orchestrator(&provider);

        pipeline.run(Vec::new(), false).await.unwrap();
        pipeline.run(Vec::new(), false).await.unwrap();

        assert_eq!(pipeline.writer().history().len(), 2);
        assert_eq!(pipeline.reviewer().history().len(), 2);
        assert_eq!(pipeline.manager().history().len(), 2);
    }
}
