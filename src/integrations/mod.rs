//! External integrations module.
//!
//! Provides access to the workspace database the report writer pulls recent
//! updates from. Notion is the only backend today.

pub mod notion;

pub use notion::{parse_query_results, NotionClient, NotionError, NotionResult};

use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// One unit of state pulled from the workspace database.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExternalItem {
    /// Item title
    pub title: String,
    /// Workflow status, if the item has one
    pub status: Option<String>,
    /// Priority, if the item has one
    pub priority: Option<String>,
}

impl ExternalItem {
    /// Create an item with only a title.
    pub fn new(title: impl Into<String>) -> Self {
        Self { title: title.into(), status: None, priority: None }
    }

    /// Set the status.
    pub fn with_status(mut self, status: impl Into<String>) -> Self {
        self.status = Some(status.into());
        self
    }

    /// Set the priority.
    pub fn with_priority(mut self, priority: impl Into<String>) -> Self {
        self.priority = Some(priority.into());
        self
    }
}

impl fmt::Display for ExternalItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.title)?;
        if let Some(ref status) = self.status {
            write!(f, " (Status: {})", status)?;
        }
        if let Some(ref priority) = self.priority {
            write!(f, " [Priority: {}]", priority)?;
        }
        Ok(())
    }
}

/// Result of a weekly update query.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WeeklyUpdates {
    /// Rendered item lines, newest first
    pub items: Vec<String>,
    /// Number of items
    pub count: usize,
    /// Why the query failed, if it did
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl WeeklyUpdates {
    /// Successful result from fetched items.
    pub fn from_items(items: &[ExternalItem]) -> Self {
        let items: Vec<String> = items.iter().map(ToString::to_string).collect();
        Self { count: items.len(), items, error: None }
    }

    /// Failed result; no items.
    pub fn failed(error: impl Into<String>) -> Self {
        Self { items: Vec::new(), count: 0, error: Some(error.into()) }
    }
}

/// A source of recent workspace updates.
///
/// Implementations report failures through [`WeeklyUpdates::error`] rather
/// than returning an error; callers treat a failed query as "no updates".
#[async_trait]
pub trait WorkspaceSource: Send + Sync {
    /// Items edited within the last `days` days.
    async fn weekly_updates(&self, days: u32) -> WeeklyUpdates;

    /// Get the source name.
    fn name(&self) -> &str;
}
