#![allow(clippy::format_push_string)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::needless_pass_by_value)]
#![allow(clippy::unused_self)]

//! # weekly-report
//!
//! Multi-agent weekly report generator.
//!
//! Meeting notes go in, a reviewed and signed-off weekly status report comes
//! out. Three agents share one completion provider:
//!
//! - **Writer**: extracts achievements, tasks and issues from the notes,
//!   optionally adds recent Notion updates, and drafts the report
//! - **Reviewer**: scores the draft and lists concrete suggestions
//! - **Manager**: comments on the revised report and signs it off
//!
//! ## Quick Start
//!
//! ```bash
//! # Generate a report from the built-in sample notes
//! weekly-report
//!
//! # From your own notes, without Notion
//! weekly-report --notes notes/2024-12-20.md --no-notion
//!
//! # Only run the note extractor
//! weekly-report extract notes/2024-12-20.md --format json
//! ```

#![forbid(unsafe_code)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
// Allow common patterns that are intentional in this codebase
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_const_for_fn)]
#![allow(clippy::doc_markdown)]
#![allow(clippy::derivable_impls)]
#![allow(clippy::return_self_not_must_use)]
#![allow(clippy::option_if_let_else)]
#![allow(clippy::significant_drop_tightening)]
#![allow(clippy::map_unwrap_or)]
#![allow(clippy::too_many_lines)]
#![allow(clippy::uninlined_format_args)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::items_after_statements)]
#![allow(clippy::redundant_closure_for_method_calls)]

pub mod agents;
pub mod ai;
pub mod core;
pub mod integrations;
pub mod notes;
pub mod pipeline;

pub use agents::{
    AgentCore, ManagerAgent, ManagerComment, ReviewResult, ReviewerAgent, StageAgent, StageError,
    WriterAgent,
};
pub use ai::{CompletionProvider, CompletionRequest, ScriptedProvider};
pub use core::{AgentConfig, Config, RunMode};
pub use integrations::{ExternalItem, NotionClient, WeeklyUpdates, WorkspaceSource};
pub use notes::{NoteExtractor, NoteSummary};
pub use pipeline::{
    format_report, save_report, PipelineFailure, PipelineOrchestrator, PipelineResult,
    PipelineStage,
};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Application name
pub const APP_NAME: &str = "weekly-report";
