//! Parsing of semi-structured model replies.
//!
//! The reviewer and manager are asked to answer in a fixed section layout
//! (`### フィードバック`, `### スコア`, ...). Replies are never validated up
//! front: each line either switches the current section (when it contains a
//! known header phrase) or is accumulated into it. Missing or malformed
//! sections fall back to explicit defaults instead of failing.

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Header phrases shared by the prompt skeletons and the parser.
pub mod headers {
    /// Reviewer: overall feedback
    pub const FEEDBACK: &str = "フィードバック";
    /// Reviewer: concrete suggestions
    pub const SUGGESTIONS: &str = "具体的な改善提案";
    /// Reviewer: short form of the suggestions header
    pub const SUGGESTIONS_SHORT: &str = "改善提案";
    /// Reviewer and manager: approval status
    pub const APPROVAL_STATUS: &str = "承認ステータス";
    /// Reviewer: score out of ten
    pub const SCORE: &str = "スコア";
    /// Manager: overall comment
    pub const OVERALL: &str = "総評";
    /// Manager: points worth praising
    pub const HIGHLIGHTS: &str = "特に評価する点";
    /// Manager: advice
    pub const ADVICE: &str = "改善提案・アドバイス";
    /// Manager: short form of the advice header
    pub const ADVICE_SHORT: &str = "アドバイス";
    /// Manager: expectations for next week
    pub const EXPECTATIONS: &str = "来週への期待";
}

/// How lines inside a section are accumulated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SectionKind {
    /// Free text, one line per line
    Text,
    /// List items; lines without a list marker are ignored
    List,
    /// Only lines containing one of the keywords; the last one wins
    Status(&'static [&'static str]),
    /// First number found, clamped to 0..=10
    Score,
}

impl SectionKind {
    /// Whether content may follow the header on the same line (`スコア: 8`).
    fn accepts_inline(self) -> bool {
        matches!(self, Self::Status(_) | Self::Score)
    }
}

/// One section of a reply layout.
#[derive(Debug, Clone, Copy)]
pub struct SectionSpec {
    /// Field key in the parsed reply
    pub key: &'static str,
    /// Accumulation rule
    pub kind: SectionKind,
    /// Phrases that open this section
    pub headers: &'static [&'static str],
}

/// The reply layout expected from one stage.
#[derive(Debug, Clone, Copy)]
pub struct StageSchema {
    /// Schema name, for logging
    pub name: &'static str,
    /// Sections in template order
    pub sections: &'static [SectionSpec],
}

impl StageSchema {
    /// Header phrases in match priority order: longest first, then template order.
    fn headers_by_priority(&self) -> Vec<(&'static str, &'static SectionSpec)> {
        let sections: &'static [SectionSpec] = self.sections;
        let mut headers: Vec<(&'static str, &'static SectionSpec)> = sections
            .iter()
            .flat_map(|section| section.headers.iter().map(move |h| (*h, section)))
            .collect();
        headers.sort_by_key(|(phrase, _)| std::cmp::Reverse(phrase.chars().count()));
        headers
    }
}

/// Status keywords the reviewer may use.
const REVIEW_STATUS_KEYWORDS: &[&str] = &["条件付き承認", "要修正", "承認"];

/// Status keywords the manager may use.
const MANAGER_STATUS_KEYWORDS: &[&str] = &["要確認", "承認"];

/// Layout of the reviewer's reply.
pub static REVIEW_SCHEMA: StageSchema = StageSchema {
    name: "review",
    sections: &[
        SectionSpec { key: "feedback", kind: SectionKind::Text, headers: &[headers::FEEDBACK] },
        SectionSpec {
            key: "suggestions",
            kind: SectionKind::List,
            headers: &[headers::SUGGESTIONS, headers::SUGGESTIONS_SHORT],
        },
        SectionSpec {
            key: "approval",
            kind: SectionKind::Status(REVIEW_STATUS_KEYWORDS),
            headers: &[headers::APPROVAL_STATUS],
        },
        SectionSpec { key: "score", kind: SectionKind::Score, headers: &[headers::SCORE] },
    ],
};

/// Layout of the manager's reply.
pub static MANAGER_SCHEMA: StageSchema = StageSchema {
    name: "manager",
    sections: &[
        SectionSpec { key: "comment", kind: SectionKind::Text, headers: &[headers::OVERALL] },
        SectionSpec { key: "evaluation", kind: SectionKind::List, headers: &[headers::HIGHLIGHTS] },
        SectionSpec {
            key: "advice",
            kind: SectionKind::List,
            headers: &[headers::ADVICE, headers::SUGGESTIONS_SHORT, headers::ADVICE_SHORT],
        },
        SectionSpec {
            key: "expectations",
            kind: SectionKind::Text,
            headers: &[headers::EXPECTATIONS],
        },
        SectionSpec {
            key: "approval",
            kind: SectionKind::Status(MANAGER_STATUS_KEYWORDS),
            headers: &[headers::APPROVAL_STATUS],
        },
    ],
};

/// Section contents extracted from a reply.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedReply {
    text: HashMap<&'static str, String>,
    lists: HashMap<&'static str, Vec<String>>,
    statuses: HashMap<&'static str, String>,
    scores: HashMap<&'static str, u8>,
}

impl ParsedReply {
    /// Free text of a section; empty when absent.
    pub fn text(&self, key: &str) -> String {
        self.text.get(key).map(|t| t.trim().to_string()).unwrap_or_default()
    }

    /// Items of a list section; empty when absent.
    pub fn list(&self, key: &str) -> Vec<String> {
        self.lists.get(key).cloned().unwrap_or_default()
    }

    /// Last accepted status line of a section.
    pub fn status(&self, key: &str) -> Option<&str> {
        self.statuses.get(key).map(String::as_str)
    }

    /// Score of a section, if a number was found.
    pub fn score(&self, key: &str) -> Option<u8> {
        self.scores.get(key).copied()
    }

    /// Whether no section received any content.
    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
            && self.lists.is_empty()
            && self.statuses.is_empty()
            && self.scores.is_empty()
    }

    /// Keep a paragraph break inside free text that has already started.
    fn accept_blank(&mut self, section: &SectionSpec) {
        if section.kind == SectionKind::Text {
            if let Some(buffer) = self.text.get_mut(section.key) {
                buffer.push('\n');
            }
        }
    }

    fn accept(&mut self, section: &SectionSpec, line: &str) {
        match section.kind {
            SectionKind::Text => {
                let buffer = self.text.entry(section.key).or_default();
                buffer.push_str(line);
                buffer.push('\n');
            }
            SectionKind::List => {
                if let Some(item) = parse_list_item(line) {
                    self.lists.entry(section.key).or_default().push(item);
                }
            }
            SectionKind::Status(keywords) => {
                if keywords.iter().any(|k| line.contains(k)) {
                    self.statuses.insert(section.key, line.to_string());
                }
            }
            SectionKind::Score => {
                if let Some(score) = extract_score(line) {
                    self.scores.entry(section.key).or_insert(score);
                }
            }
        }
    }
}

/// Parse a model reply against a stage schema.
///
/// Never fails: a reply without any known header yields an empty result.
pub fn parse_reply(reply: &str, schema: &StageSchema) -> ParsedReply {
    let headers = schema.headers_by_priority();
    let mut parsed = ParsedReply::default();
    let mut current: Option<&SectionSpec> = None;

    for line in reply.lines() {
        let line = line.trim();
        if line.is_empty() {
            if let Some(section) = current {
                parsed.accept_blank(section);
            }
            continue;
        }

        if let Some((phrase, section)) = headers.iter().find(|(phrase, _)| line.contains(phrase)) {
            current = Some(*section);
            if section.kind.accepts_inline() {
                if let Some(rest) = inline_content(line, phrase).filter(|r| !r.is_empty()) {
                    parsed.accept(section, rest);
                }
            }
            continue;
        }

        if let Some(section) = current {
            parsed.accept(section, line);
        }
    }

    if parsed.is_empty() {
        tracing::debug!(schema = schema.name, "Reply contained no recognizable sections");
    }

    parsed
}

/// Text following `phrase: ` on a header line.
///
/// `None` unless a colon separates the header from the value, so annotated
/// headers such as `スコア（10点満点）` carry no content.
fn inline_content<'a>(line: &'a str, phrase: &str) -> Option<&'a str> {
    let (_, rest) = line.split_once(phrase)?;
    let rest = rest.trim_start_matches(|c: char| matches!(c, '*' | '#') || c.is_whitespace());
    let value = rest.strip_prefix([':', '：'])?;
    Some(value.trim_start_matches(|c: char| c == '*' || c.is_whitespace()).trim())
}

/// Strip a list marker (`-`, `*`, `・`, `•`, `1.`, `1)`) from a line.
///
/// Returns `None` for lines that are not list items.
pub fn parse_list_item(line: &str) -> Option<String> {
    let line = line.trim();
    if line.starts_with("**") {
        return None;
    }

    let rest = if let Some(rest) = line.strip_prefix(['-', '*', '・', '•']) {
        rest
    } else {
        let digits = line.chars().take_while(char::is_ascii_digit).count();
        if digits == 0 {
            return None;
        }
        line[digits..].strip_prefix(['.', ')', '．', '）', '、'])?
    };

    let item = rest.trim().trim_start_matches("[ ]").trim();
    if item.is_empty() {
        None
    } else {
        Some(item.to_string())
    }
}

/// First number in a line, clamped to the 0..=10 scale.
pub fn extract_score(line: &str) -> Option<u8> {
    let start = line.find(|c: char| c.is_ascii_digit())?;
    let digits: String = line[start..].chars().take_while(char::is_ascii_digit).collect();
    let value: u64 = digits.parse().ok()?;
    Some(value.min(10) as u8)
}

/// Score of a line, defaulting to 0 when it holds no number.
pub fn parse_score(line: &str) -> u8 {
    extract_score(line).unwrap_or(0)
}

/// Reviewer verdict.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ReviewApproval {
    /// Ready as is
    Approved,
    /// Acceptable with minor changes
    ConditionallyApproved,
    /// Must be reworked
    #[default]
    NeedsRevision,
}

impl ReviewApproval {
    /// Classify a status line.
    pub fn from_status_line(line: &str) -> Option<Self> {
        if line.contains("条件付き承認") {
            Some(Self::ConditionallyApproved)
        } else if line.contains("要修正") {
            Some(Self::NeedsRevision)
        } else if line.contains("承認") {
            Some(Self::Approved)
        } else {
            None
        }
    }

    /// Label used in prompts and reports.
    pub fn label(self) -> &'static str {
        match self {
            Self::Approved => "承認",
            Self::ConditionallyApproved => "条件付き承認",
            Self::NeedsRevision => "要修正",
        }
    }

    /// Machine-readable name.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Approved => "approved",
            Self::ConditionallyApproved => "conditionally-approved",
            Self::NeedsRevision => "needs-revision",
        }
    }
}

impl fmt::Display for ReviewApproval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Manager sign-off.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ManagerApproval {
    /// Signed off
    #[default]
    Approved,
    /// Needs a follow-up conversation
    NeedsConfirmation,
}

impl ManagerApproval {
    /// Classify a status line.
    pub fn from_status_line(line: &str) -> Option<Self> {
        if line.contains("要確認") {
            Some(Self::NeedsConfirmation)
        } else if line.contains("承認") {
            Some(Self::Approved)
        } else {
            None
        }
    }

    /// Label used in prompts and reports.
    pub fn label(self) -> &'static str {
        match self {
            Self::Approved => "承認",
            Self::NeedsConfirmation => "要確認",
        }
    }

    /// Machine-readable name.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Approved => "approved",
            Self::NeedsConfirmation => "needs-confirmation",
        }
    }
}

impl fmt::Display for ManagerApproval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Structured review of a draft.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReviewResult {
    /// Overall assessment
    pub feedback: String,
    /// Concrete improvement suggestions
    pub suggestions: Vec<String>,
    /// Verdict; `needs-revision` when the reply has none
    pub approval: ReviewApproval,
    /// Score out of ten; 0 when the reply has none
    pub score: u8,
}

impl ReviewResult {
    /// Parse a reviewer reply.
    pub fn parse(reply: &str) -> Self {
        let parsed = parse_reply(reply, &REVIEW_SCHEMA);

        Self {
            feedback: parsed.text("feedback"),
            suggestions: parsed.list("suggestions"),
            approval: parsed
                .status("approval")
                .and_then(ReviewApproval::from_status_line)
                .unwrap_or_default(),
            score: parsed.score("score").unwrap_or(0),
        }
    }

    /// Serialize in the reply layout the reviewer is asked to use.
    pub fn render(&self) -> String {
        let mut out = format!("### {}\n{}\n\n", headers::FEEDBACK, self.feedback);

        out.push_str(&format!("### {}\n", headers::SUGGESTIONS));
        for (i, suggestion) in self.suggestions.iter().enumerate() {
            out.push_str(&format!("{}. {}\n", i + 1, suggestion));
        }

        out.push_str(&format!("\n### {}\n{}\n\n", headers::APPROVAL_STATUS, self.approval.label()));
        out.push_str(&format!("### {}\n{}/10\n", headers::SCORE, self.score));
        out
    }
}

/// Structured manager commentary on a final report.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManagerComment {
    /// Overall comment
    pub comment: String,
    /// Points the manager singles out for praise
    pub evaluation_points: Vec<String>,
    /// Improvement advice
    pub advice: Vec<String>,
    /// Expectations for next week
    pub expectations: String,
    /// Sign-off; `approved` when the reply has none
    pub approval_status: ManagerApproval,
}

impl ManagerComment {
    /// Parse a manager reply.
    pub fn parse(reply: &str) -> Self {
        let parsed = parse_reply(reply, &MANAGER_SCHEMA);

        Self {
            comment: parsed.text("comment"),
            evaluation_points: parsed.list("evaluation"),
            advice: parsed.list("advice"),
            expectations: parsed.text("expectations"),
            approval_status: parsed
                .status("approval")
                .and_then(ManagerApproval::from_status_line)
                .unwrap_or_default(),
        }
    }

    /// Serialize in the reply layout the manager is asked to use.
    pub fn render(&self) -> String {
        let mut out = format!("### {}\n{}\n\n", headers::OVERALL, self.comment);

        out.push_str(&format!("### {}\n", headers::HIGHLIGHTS));
        for point in &self.evaluation_points {
            out.push_str(&format!("- {}\n", point));
        }

        out.push_str(&format!("\n### {}\n", headers::ADVICE));
        for advice in &self.advice {
            out.push_str(&format!("- {}\n", advice));
        }

        out.push_str(&format!("\n### {}\n{}\n\n", headers::EXPECTATIONS, self.expectations));
        out.push_str(&format!(
            "### {}\n{}\n",
            headers::APPROVAL_STATUS,
            self.approval_status.label()
        ));
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const REVIEW_REPLY: &str = r"
### フィードバック
全体として分かりやすい週報です。
数値情報が不足しています。

### 具体的な改善提案
1. 進捗率を追記する
2) 課題の期限を明記する
- 担当者を記載する
補足: この行はリスト項目ではありません

### 承認ステータス
条件付き承認

### スコア
7/10
";

    const MANAGER_REPLY: &str = r"
## 上司コメント

### 総評
今週もお疲れさまでした。
フェーズ1の完了は大きな成果です。

### 特に評価する点
- リリース日の早期決定
- 課題の早期共有

### 改善提案・アドバイス
- テスト計画を前倒ししましょう

### 来週への期待
リリースに向けた最終確認をお願いします。

### 承認ステータス
要確認
";

    #[test]
    fn test_parse_review_reply() {
        let review = ReviewResult::parse(REVIEW_REPLY);

        assert_eq!(review.feedback, "全体として分かりやすい週報です。\n数値情報が不足しています。");
        assert_eq!(
            review.suggestions,
            vec!["進捗率を追記する", "課題の期限を明記する", "担当者を記載する"]
        );
        assert_eq!(review.approval, ReviewApproval::ConditionallyApproved);
        assert_eq!(review.score, 7);
    }

    #[test]
    fn test_parse_manager_reply() {
        let comment = ManagerComment::parse(MANAGER_REPLY);

        assert_eq!(comment.comment, "今週もお疲れさまでした。\nフェーズ1の完了は大きな成果です。");
        assert_eq!(comment.evaluation_points, vec!["リリース日の早期決定", "課題の早期共有"]);
        assert_eq!(comment.advice, vec!["テスト計画を前倒ししましょう"]);
        assert_eq!(comment.expectations, "リリースに向けた最終確認をお願いします。");
        assert_eq!(comment.approval_status, ManagerApproval::NeedsConfirmation);
    }

    #[test]
    fn test_longer_header_wins() {
        // Both phrases occur; the suggestion list must not swallow the advice.
        let comment = ManagerComment::parse("### 特に評価する点\n- A\n### 改善提案・アドバイス\n- B");
        assert_eq!(comment.evaluation_points, vec!["A"]);
        assert_eq!(comment.advice, vec!["B"]);

        let review = ReviewResult::parse("### 具体的な改善提案\n1. X\n### スコア\n9");
        assert_eq!(review.suggestions, vec!["X"]);
        assert_eq!(review.score, 9);
    }

    #[test]
    fn test_headers_sorted_by_length() {
        let headers = MANAGER_SCHEMA.headers_by_priority();
        let lengths: Vec<usize> = headers.iter().map(|(p, _)| p.chars().count()).collect();
        assert!(lengths.windows(2).all(|w| w[0] >= w[1]));
        assert_eq!(headers[0].0, headers::ADVICE);
    }

    #[test]
    fn test_inline_score_and_status() {
        let review = ReviewResult::parse("**スコア**: 8/10\n承認ステータス：承認");
        assert_eq!(review.score, 8);
        assert_eq!(review.approval, ReviewApproval::Approved);
    }

    #[test]
    fn test_annotated_headers_are_not_content() {
        let review = ReviewResult::parse("### スコア（10点満点）\n7/10\n");
        assert_eq!(review.score, 7);

        let review = ReviewResult::parse("### 承認ステータス（承認/条件付き承認/要修正）\n");
        assert_eq!(review.approval, ReviewApproval::NeedsRevision);

        let review = ReviewResult::parse("### 承認ステータス（承認/条件付き承認/要修正）\n承認\n");
        assert_eq!(review.approval, ReviewApproval::Approved);
    }

    #[test]
    fn test_score_extraction() {
        assert_eq!(parse_score("スコア: 8/10"), 8);
        assert_eq!(parse_score("評価: なし"), 0);
        assert_eq!(parse_score("10点"), 10);
        assert_eq!(parse_score("85"), 10);
        assert_eq!(extract_score("n/a"), None);
    }

    #[test]
    fn test_first_score_line_wins() {
        let review = ReviewResult::parse("### スコア\n評価なし\n6点\n理由: 2点減点");
        assert_eq!(review.score, 6);
    }

    #[test]
    fn test_reply_without_headers_defaults() {
        let review = ReviewResult::parse("Looks good to me!");
        assert_eq!(review, ReviewResult::default());
        assert_eq!(review.approval, ReviewApproval::NeedsRevision);
        assert_eq!(review.score, 0);

        let comment = ManagerComment::parse("");
        assert_eq!(comment.approval_status, ManagerApproval::Approved);
        assert!(comment.comment.is_empty());
    }

    #[test]
    fn test_header_without_content() {
        let review = ReviewResult::parse("### フィードバック\n### 具体的な改善提案\n");
        assert!(review.feedback.is_empty());
        assert!(review.suggestions.is_empty());
    }

    #[test]
    fn test_status_requires_keyword_and_last_wins() {
        let review = ReviewResult::parse("### 承認ステータス\n検討中です\n要修正\n");
        assert_eq!(review.approval, ReviewApproval::NeedsRevision);

        let review = ReviewResult::parse("### 承認ステータス\n要修正\n最終的に承認\n");
        assert_eq!(review.approval, ReviewApproval::Approved);
    }

    #[test]
    fn test_lines_before_first_header_are_ignored() {
        let review = ReviewResult::parse("はじめに\n- 無視される\n### 具体的な改善提案\n- 採用");
        assert_eq!(review.suggestions, vec!["採用"]);
    }

    #[test]
    fn test_review_round_trip() {
        let review = ReviewResult {
            feedback: "構成は明確です。\n期限の記載が不足しています。".to_string(),
            suggestions: vec!["期限を追記する".to_string(), "担当者を明記する".to_string()],
            approval: ReviewApproval::ConditionallyApproved,
            score: 7,
        };
        assert_eq!(ReviewResult::parse(&review.render()), review);
    }

    #[test]
    fn test_multi_paragraph_round_trip() {
        let review = ReviewResult {
            feedback: "第一段落です。\n\n第二段落です。".to_string(),
            suggestions: Vec::new(),
            approval: ReviewApproval::Approved,
            score: 9,
        };
        assert_eq!(ReviewResult::parse(&review.render()), review);

        let comment = ManagerComment {
            comment: "お疲れさまでした。\n\n来週も引き続きお願いします。".to_string(),
            evaluation_points: Vec::new(),
            advice: Vec::new(),
            expectations: "品質の維持。\n\nリリース準備。".to_string(),
            approval_status: ManagerApproval::Approved,
        };
        assert_eq!(ManagerComment::parse(&comment.render()), comment);
    }

    #[test]
    fn test_manager_round_trip() {
        let comment = ManagerComment {
            comment: "よくまとまっています。".to_string(),
            evaluation_points: vec!["進捗の可視化".to_string()],
            advice: vec!["リスク対策を具体化する".to_string()],
            expectations: "リリースの成功を期待しています。".to_string(),
            approval_status: ManagerApproval::NeedsConfirmation,
        };
        assert_eq!(ManagerComment::parse(&comment.render()), comment);
    }

    #[test]
    fn test_parse_list_item() {
        assert_eq!(parse_list_item("- item").as_deref(), Some("item"));
        assert_eq!(parse_list_item("* item").as_deref(), Some("item"));
        assert_eq!(parse_list_item("・項目").as_deref(), Some("項目"));
        assert_eq!(parse_list_item("12. item").as_deref(), Some("item"));
        assert_eq!(parse_list_item("3) item").as_deref(), Some("item"));
        assert_eq!(parse_list_item("- [ ] todo").as_deref(), Some("todo"));
        assert_eq!(parse_list_item("2024年の目標"), None);
        assert_eq!(parse_list_item("**太字**"), None);
        assert_eq!(parse_list_item("plain"), None);
        assert_eq!(parse_list_item("-"), None);
    }

    #[test]
    fn test_approval_names() {
        assert_eq!(ReviewApproval::ConditionallyApproved.to_string(), "conditionally-approved");
        assert_eq!(ManagerApproval::NeedsConfirmation.to_string(), "needs-confirmation");
        assert_eq!(
            serde_json::to_string(&ReviewApproval::NeedsRevision).unwrap(),
            "\"needs-revision\""
        );
    }
}
