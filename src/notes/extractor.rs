//! Pattern-based extraction of achievements, tasks and issues.
//!
//! Notes are scanned line by line against per-category patterns (label
//! prefixes such as `課題:`, status glyphs such as `✓`, English keywords such
//! as `Done:`). When nothing matches anywhere, a second pass reads the notes
//! as sections (`### 課題` followed by `- ...` bullets).

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

/// Categorized content of one or more meeting notes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NoteSummary {
    /// Completed work and decisions
    pub achievements: Vec<String>,
    /// Open or in-progress tasks
    pub tasks: Vec<String>,
    /// Problems, risks and concerns
    pub issues: Vec<String>,
    /// The note text the lists were extracted from
    pub raw_text: String,
}

impl NoteSummary {
    /// Whether no category produced any item.
    pub fn has_no_items(&self) -> bool {
        self.achievements.is_empty() && self.tasks.is_empty() && self.issues.is_empty()
    }

    /// Total number of extracted items.
    pub fn item_count(&self) -> usize {
        self.achievements.len() + self.tasks.len() + self.issues.len()
    }

    /// Append another summary, keeping input order.
    pub fn merge(&mut self, other: Self) {
        self.achievements.extend(other.achievements);
        self.tasks.extend(other.tasks);
        self.issues.extend(other.issues);

        if !other.raw_text.is_empty() {
            if !self.raw_text.is_empty() {
                self.raw_text.push_str("\n\n");
            }
            self.raw_text.push_str(&other.raw_text);
        }
    }

    fn list_mut(&mut self, category: Category) -> &mut Vec<String> {
        match category {
            Category::Achievements => &mut self.achievements,
            Category::Tasks => &mut self.tasks,
            Category::Issues => &mut self.issues,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Category {
    Achievements,
    Tasks,
    Issues,
}

impl Category {
    const ALL: [Self; 3] = [Self::Achievements, Self::Tasks, Self::Issues];

    fn patterns(self) -> &'static [Regex] {
        match self {
            Self::Achievements => &ACHIEVEMENT_PATTERNS,
            Self::Tasks => &TASK_PATTERNS,
            Self::Issues => &ISSUE_PATTERNS,
        }
    }

    fn section_keywords(self) -> &'static [&'static str] {
        match self {
            Self::Achievements => &["成果", "実績", "完了", "achievement", "done"],
            Self::Tasks => &["タスク", "作業", "予定", "task", "todo"],
            Self::Issues => &["課題", "問題", "懸念", "issue", "problem"],
        }
    }
}

fn compile(patterns: &[&str]) -> Vec<Regex> {
    patterns.iter().map(|p| Regex::new(p).expect("note pattern must compile")).collect()
}

static ACHIEVEMENT_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    compile(&[
        r"(?i)(?:成果|実績|完了|達成)[：:]\s*(.+)",
        r"(?i)(?:✓|✔|☑)\s*(.+)",
        r"(?i)(?:done)[：:]\s*(.+)",
    ])
});

static TASK_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    compile(&[
        r"(?i)(?:タスク|作業|進行中|TODO)[：:]\s*(.+)",
        r"(?i)(?:□|▢|☐)\s*(.+)",
        r"(?i)(?:in progress|wip)[：:]\s*(.+)",
    ])
});

static ISSUE_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    compile(&[
        r"(?i)(?:課題|問題|懸念|リスク)[：:]\s*(.+)",
        r"(?i)(?:⚠\x{FE0F}?|❗|❌)\s*(.+)",
        r"(?i)(?:issue|problem)[：:]\s*(.+)",
    ])
});

static LEADING_BULLET: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[\s\x{FE0F}]*[-・●◆◇○*+]?\s*").expect("bullet pattern must compile")
});

static WHITESPACE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\s+").expect("whitespace pattern must compile"));

/// Glyphs that open a bullet line in section-style notes.
const FALLBACK_BULLETS: [char; 5] = ['-', '・', '●', '*', '+'];

/// Strip a leading bullet glyph and collapse runs of whitespace.
pub fn clean_text(text: &str) -> String {
    let stripped = LEADING_BULLET.replace(text, "");
    WHITESPACE.replace_all(&stripped, " ").trim().to_string()
}

/// Section-based extraction used when no line pattern matched.
///
/// A line containing a category keyword makes that category current; bullet
/// lines are collected into the current category.
pub fn fallback_parse<'a, I>(lines: I) -> NoteSummary
where
    I: IntoIterator<Item = &'a str>,
{
    let mut summary = NoteSummary::default();
    let mut current: Option<Category> = None;

    for line in lines {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let lower = line.to_lowercase();
        if let Some(category) = Category::ALL
            .into_iter()
            .find(|c| c.section_keywords().iter().any(|k| lower.contains(k)))
        {
            current = Some(category);
        }

        if let Some(category) = current {
            if line.starts_with(FALLBACK_BULLETS) {
                let content = clean_text(line);
                if !content.is_empty() {
                    summary.list_mut(category).push(content);
                }
            }
        }
    }

    summary
}

/// Extracts a [`NoteSummary`] from freeform meeting notes.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoteExtractor;

impl NoteExtractor {
    /// Create a new extractor.
    pub fn new() -> Self {
        Self
    }

    /// Parse a single note.
    pub fn parse(&self, text: &str) -> NoteSummary {
        let mut summary = NoteSummary::default();

        for line in text.lines() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }

            if let Some((category, content)) = Self::match_line(line) {
                summary.list_mut(category).push(content);
            }
        }

        if summary.has_no_items() {
            tracing::debug!("No note patterns matched, reading notes as sections");
            summary = fallback_parse(text.lines());
        }

        summary.raw_text = text.to_string();
        summary
    }

    /// Parse several notes and merge them in input order.
    pub fn parse_all<S: AsRef<str>>(&self, notes: &[S]) -> NoteSummary {
        let mut merged = NoteSummary::default();
        for note in notes {
            merged.merge(self.parse(note.as_ref()));
        }
        merged
    }

    /// First category/pattern match for a line, with the cleaned capture.
    fn match_line(line: &str) -> Option<(Category, String)> {
        for category in Category::ALL {
            for pattern in category.patterns() {
                if let Some(caps) = pattern.captures(line) {
                    let matched = caps.get(1).or_else(|| caps.get(0))?;
                    return Some((category, clean_text(matched.as_str())));
                }
            }
        }
        None
    }
}
