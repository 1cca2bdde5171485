//! Prompt templates for each pipeline stage.
//!
//! Every function here is pure: the same input always renders the same
//! prompt. The output-format skeletons use the header constants from
//! [`super::response::headers`], so the parser and the prompts cannot drift.

use chrono::NaiveDate;

use super::response::headers;
use crate::notes::NoteSummary;

/// Placeholder rendered for an empty list.
const EMPTY_LIST: &str = "- なし";

/// Placeholder rendered when the review score is unknown.
const UNKNOWN_SCORE: &str = "不明";

/// Render items as a markdown bullet list.
fn bullet_list(items: &[String]) -> String {
    if items.is_empty() {
        return EMPTY_LIST.to_string();
    }
    items.iter().map(|item| format!("- {}", item)).collect::<Vec<_>>().join("\n")
}

/// Prompt asking the writer for a first draft.
///
/// The workspace section is left out entirely when `external_items` is empty.
pub fn draft_prompt(summary: &NoteSummary, external_items: &[String], date: NaiveDate) -> String {
    let workspace = if external_items.is_empty() {
        String::new()
    } else {
        format!("\n### Notion更新情報\n{}\n", bullet_list(external_items))
    };

    format!(
        "以下の情報を基に、{date}の週報を作成してください。

## 収集した情報

### 成果・実績
{achievements}

### タスク状況
{tasks}

### 課題・懸念事項
{issues}
{workspace}
## 作成する週報の形式
標準の週報テンプレートに従って、簡潔かつ分かりやすくまとめてください。
各セクションには具体的な内容を記載し、進捗率や期限などの数値情報があれば含めてください。
",
        date = date.format("%Y年%m月%d日"),
        achievements = bullet_list(&summary.achievements),
        tasks = bullet_list(&summary.tasks),
        issues = bullet_list(&summary.issues),
        workspace = workspace,
    )
}

/// Prompt asking the reviewer to assess a draft.
pub fn review_prompt(draft: &str) -> String {
    format!(
        "以下の週報ドラフトをレビューしてください。

## 週報ドラフト
{draft}

## レビュー観点
1. 内容の完全性（必要な情報が含まれているか）
2. 文章の明確性（誤解を招かない表現か）
3. 構成の論理性（情報が適切に整理されているか）
4. 具体性（数値や期限が明記されているか）

## 出力形式
以下の形式でレビュー結果を提供してください：

### {feedback}
[全体的な評価と主要な改善点]

### {suggestions}
1. [改善提案1]
2. [改善提案2]
...

### {approval}
[承認/条件付き承認/要修正]

### {score}
[10点満点での評価]
",
        draft = draft.trim(),
        feedback = headers::FEEDBACK,
        suggestions = headers::SUGGESTIONS,
        approval = headers::APPROVAL_STATUS,
        score = headers::SCORE,
    )
}

/// Prompt asking the writer to apply review suggestions to a draft.
pub fn revision_prompt(draft: &str, suggestions: &[String]) -> String {
    format!(
        "以下の週報ドラフトを、レビューフィードバックに基づいて改善してください。

## 元のドラフト
{draft}

## 改善提案
{suggestions}

改善版の週報を作成してください。形式は元のドラフトと同じにしてください。
",
        draft = draft.trim(),
        suggestions = bullet_list(suggestions),
    )
}

/// Prompt asking the manager to comment on the final report.
///
/// Only the numeric review score is passed along; `None` renders as `不明`.
pub fn manager_prompt(report: &str, review_score: Option<u8>) -> String {
    let score = review_score.map_or_else(|| UNKNOWN_SCORE.to_string(), |s| s.to_string());

    format!(
        "あなたは部下の週報を確認する上司として、以下の週報に対してコメントを提供してください。

## 週報内容
{report}

## レビュー結果
スコア: {score}/10

## コメント作成のガイドライン
1. 成果を適切に評価し、具体的に褒める
2. 改善が必要な点があれば建設的にフィードバック
3. 次週への期待とアドバイスを含める
4. モチベーションを高める励ましの言葉を添える

## 出力形式
以下の形式でコメントを提供してください：

### {overall}
[全体的な評価とコメント]

### {highlights}
- [評価点1]
- [評価点2]

### {advice}
- [提案1]
- [提案2]

### {expectations}
[次週に期待することや応援メッセージ]

### {approval}
[承認/要確認]
",
        report = report.trim(),
        score = score,
        overall = headers::OVERALL,
        highlights = headers::HIGHLIGHTS,
        advice = headers::ADVICE,
        expectations = headers::EXPECTATIONS,
        approval = headers::APPROVAL_STATUS,
    )
}
