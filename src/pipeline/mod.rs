//! The weekly report pipeline.
//!
//! Draft, review, revise, comment: [`PipelineOrchestrator`] drives the three
//! agents through these stages and assembles a [`PipelineResult`], which
//! [`format_report`] and [`save_report`] turn into the markdown artifact.

mod orchestrator;
mod report;

pub use orchestrator::{PipelineFailure, PipelineOrchestrator, PipelineResult, PipelineStage};
pub use report::{format_report, save_report};
