//! Meeting note intake.
//!
//! Turns loosely formatted meeting notes into categorized bullet lists
//! (achievements, tasks, issues) that the report writer can work from.

mod extractor;

pub use extractor::{clean_text, fallback_parse, NoteExtractor, NoteSummary};

use std::path::{Path, PathBuf};

/// Sample notes used when no note files are supplied on the command line.
const SAMPLE_NOTES: &str = r"
## 2024年12月20日 定例会議

### 議題
- プロジェクトA進捗確認
- 来週のリリース準備

### 決定事項
✓ プロジェクトAのフェーズ1完了
✓ リリース日を12月25日に決定

### タスク
□ ドキュメント更新（担当：田中）
□ テスト環境の準備（担当：佐藤）

### 課題
⚠ パフォーマンステストで目標値未達
⚠ リソース不足の懸念あり
";

/// Built-in sample notes.
pub fn sample_notes() -> Vec<String> {
    vec![SAMPLE_NOTES.to_string()]
}

/// Read meeting notes from disk, in the given order.
///
/// Files that are missing or unreadable are skipped with a warning.
pub fn load_meeting_notes<P: AsRef<Path>>(paths: &[P]) -> Vec<String> {
    let mut notes = Vec::with_capacity(paths.len());

    for path in paths {
        let path = path.as_ref();
        match std::fs::read_to_string(path) {
            Ok(content) => {
                tracing::info!(path = %path.display(), "Loaded meeting notes");
                notes.push(content);
            }
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "Skipping meeting notes");
            }
        }
    }

    notes
}

/// Resolve the notes to use for a run: the given files, or the sample.
pub fn resolve_notes(paths: &[PathBuf]) -> Vec<String> {
    if paths.is_empty() {
        tracing::info!("No note files given, using built-in sample notes");
        sample_notes()
    } else {
        load_meeting_notes(paths)
    }
}
