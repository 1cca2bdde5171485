//! Markdown report artifact.

use std::path::{Path, PathBuf};

use anyhow::Context;

use super::PipelineResult;

/// Render a finished run as markdown.
///
/// Section order: title and date, report body, review score, feedback,
/// suggestions, manager comment, evaluation points, next-week expectations,
/// approval status.
pub fn format_report(result: &PipelineResult) -> String {
    let review = &result.review;
    let manager = &result.manager;

    let mut out = format!(
        "# 週報 - {}\n\n## 週報内容\n{}\n\n---\n\n## レビュー結果\n**スコア**: {}/10\n\n### フィードバック\n{}\n\n### 改善提案\n",
        result.completed_at.format("%Y年%m月%d日"),
        result.final_report.trim(),
        review.score,
        review.feedback,
    );
    for suggestion in &review.suggestions {
        out.push_str(&format!("- {}\n", suggestion));
    }

    out.push_str(&format!("\n---\n\n## 上司コメント\n### 総評\n{}\n\n### 特に評価する点\n", manager.comment));
    for point in &manager.evaluation_points {
        out.push_str(&format!("- {}\n", point));
    }

    out.push_str(&format!(
        "\n### 来週への期待\n{}\n\n**承認ステータス**: {}\n",
        manager.expectations,
        manager.approval_status.label()
    ));

    out
}

/// Write the report to `output_dir`, creating the directory if needed.
///
/// The file is named `weekly_report_YYYYMMDD_HHMMSS.md` after the run's
/// completion time; a numeric suffix is added when that name is taken.
pub fn save_report(result: &PipelineResult, output_dir: &Path) -> anyhow::Result<PathBuf> {
    std::fs::create_dir_all(output_dir)
        .with_context(|| format!("Failed to create output directory {}", output_dir.display()))?;

    let stem = format!("weekly_report_{}", result.completed_at.format("%Y%m%d_%H%M%S"));
    let mut path = output_dir.join(format!("{}.md", stem));
    let mut suffix = 1;
    while path.exists() {
        path = output_dir.join(format!("{}_{}.md", stem, suffix));
        suffix += 1;
    }

    std::fs::write(&path, format_report(result))
        .with_context(|| format!("Failed to write report {}", path.display()))?;

    tracing::info!(path = %path.display(), "Report saved");
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agents::{ManagerApproval, ManagerComment, ReviewApproval, ReviewResult};
    use chrono::{Local, TimeZone};
    use uuid::Uuid;

    fn result() -> PipelineResult {
        PipelineResult {
            run_id: Uuid::new_v4(),
            draft: "draft".to_string(),
            final_report: "## 今週の成果\n- API完成\n".to_string(),
            revised: true,
            review: ReviewResult {
                feedback: "分かりやすいです。".to_string(),
                suggestions: vec!["期限を追記する".to_string()],
                approval: ReviewApproval::ConditionallyApproved,
                score: 8,
            },
            manager: ManagerComment {
                comment: "お疲れさまでした。".to_string(),
                evaluation_points: vec!["早期の課題共有".to_string()],
                advice: vec!["リスクを数値化する".to_string()],
                expectations: "リリース成功を期待しています。".to_string(),
                approval_status: ManagerApproval::NeedsConfirmation,
            },
            completed_at: Local.with_ymd_and_hms(2024, 12, 20, 18, 30, 5).unwrap(),
        }
    }

    #[test]
    fn test_format_report_section_order() {
        let report = format_report(&result());

        let order = [
            "# 週報 - 2024年12月20日",
            "## 週報内容\n## 今週の成果\n- API完成\n",
            "**スコア**: 8/10",
            "### フィードバック\n分かりやすいです。",
            "### 改善提案\n- 期限を追記する",
            "### 総評\nお疲れさまでした。",
            "### 特に評価する点\n- 早期の課題共有",
            "### 来週への期待\nリリース成功を期待しています。",
            "**承認ステータス**: 要確認",
        ];
        let mut last = 0;
        for section in order {
            let pos = report.find(section).unwrap_or_else(|| panic!("missing {:?}", section));
            assert!(pos >= last, "{:?} out of order", section);
            last = pos;
        }
        assert!(!report.contains("リスクを数値化する"));
    }

    #[test]
    fn test_save_report_names_and_suffixes() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let output_dir = temp_dir.path().join("reports");

        let first = save_report(&result(), &output_dir).unwrap();
        let second = save_report(&result(), &output_dir).unwrap();

        assert_eq!(first.file_name().unwrap(), "weekly_report_20241220_183005.md");
        assert_eq!(second.file_name().unwrap(), "weekly_report_20241220_183005_1.md");

        let content = std::fs::read_to_string(&first).unwrap();
        assert_eq!(content, format_report(&result()));
    }
}
