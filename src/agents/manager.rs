//! Manager agent: supervisory commentary on the final report.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::{
    prompts, AgentConfig, AgentCore, HistoryEntry, ManagerApproval, ManagerComment, StageAgent,
    StageError,
};
use crate::ai::CompletionProvider;

/// Input of the commenting stage.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ManagerInput {
    /// Report after revision
    pub final_report: String,
    /// Reviewer score, the only review context passed on
    pub review_score: Option<u8>,
}

/// Metadata of a manager comment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManagerMetadata {
    /// Name of the commenting agent
    pub agent: String,
    /// Sign-off copied from the parsed comment
    pub approval_status: ManagerApproval,
}

/// Result of the commenting stage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManagerOutput {
    /// Parsed manager comment
    pub comment: ManagerComment,
    /// Comment metadata
    pub metadata: ManagerMetadata,
}

/// Agent playing the supervisor who signs off on the report.
pub struct ManagerAgent {
    core: AgentCore,
}

impl ManagerAgent {
    /// Create a manager.
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
impl StageAgent for ManagerAgent {
    type Input = ManagerInput;
    type Output = ManagerOutput;

    fn config(&self) -> &AgentConfig {
        self.core.config()
    }

    async fn process(&mut self, input: ManagerInput) -> Result<ManagerOutput, StageError> {
        if input.final_report.trim().is_empty() {
            return Err(StageError::Validation("最終版の週報が提供されていません".to_string()));
        }

        let prompt = prompts::manager_prompt(&input.final_report, input.review_score);
        let reply = self.core.generate_response(&prompt).await?;
        let comment = ManagerComment::parse(&reply);

        tracing::info!(
            agent = %self.core.config().name,
            approval = %comment.approval_status,
            points = comment.evaluation_points.len(),
            "Manager comment received"
        );

        Ok(ManagerOutput {
            metadata: ManagerMetadata {
                agent: self.core.config().name.clone(),
                approval_status: comment.approval_status,
            },
            comment,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::ScriptedProvider;

    const REPLY: &str = "### 総評
よくまとまっています。

### 特に評価する点
- 進捗の可視化

### 改善提案・アドバイス
- リスク対策を具体化する

### 来週への期待
リリースの成功を期待しています。

### 承認ステータス
要確認
";

    fn input(report: &str, score: Option<u8>) -> ManagerInput {
        ManagerInput { final_report: report.to_string(), review_score: score }
    }

    #[tokio::test]
    async fn test_comment_parses_reply() {
        let provider = Arc::new(ScriptedProvider::with_replies([REPLY]));
        let mut manager = ManagerAgent::new(AgentConfig::manager(), provider.clone());

        let output = manager.process(input("最終週報", Some(8))).await.unwrap();

        assert_eq!(output.comment.comment, "よくまとまっています。");
        assert_eq!(output.comment.evaluation_points, vec!["進捗の可視化"]);
        assert_eq!(output.comment.advice, vec!["リスク対策を具体化する"]);
        assert_eq!(output.comment.expectations, "リリースの成功を期待しています。");
        assert_eq!(output.metadata.approval_status, ManagerApproval::NeedsConfirmation);

        let prompts = provider.prompts();
        assert!(prompts[0].contains("最終週報"));
        assert!(prompts[0].contains("8/10"));
    }

    #[tokio::test]
    async fn test_unknown_score_in_prompt() {
        let provider = Arc::new(ScriptedProvider::with_replies([REPLY]));
        let mut manager = ManagerAgent::new(AgentConfig::manager(), provider.clone());

        manager.process(input("最終週報", None)).await.unwrap();

        assert!(provider.prompts()[0].contains("不明/10"));
    }

    #[tokio::test]
    async fn test_empty_report_is_rejected_without_model_call() {
        let provider = Arc::new(ScriptedProvider::with_replies([REPLY]));
        let mut manager = ManagerAgent::new(AgentConfig::manager(), provider.clone());

        let err = manager.process(input("", Some(5))).await.unwrap_err();

        assert!(matches!(err, StageError::Validation(_)));
        assert_eq!(provider.call_count(), 0);
        assert!(manager.history().is_empty());
    }
}
