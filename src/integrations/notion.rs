//! Notion workspace integration.
//!
//! Queries a Notion database for recently edited pages and publishes
//! finished reports back as new pages, using the Notion REST API.

use async_trait::async_trait;
use chrono::{Duration, Utc};
use serde_json::{json, Value};

use super::{ExternalItem, WeeklyUpdates, WorkspaceSource};
use crate::core::NotionConfig;

/// Notion API version sent with every request.
const NOTION_VERSION: &str = "2022-06-28";

/// Maximum characters in one rich text object.
const MAX_TEXT_CHARS: usize = 2000;

/// Maximum child blocks in one create or append request.
const MAX_BLOCKS: usize = 100;

/// Notion API client.
#[derive(Debug, Clone)]
pub struct NotionClient {
    /// Integration token
    token: String,
    /// Database holding the tracked items
    database_id: Option<String>,
    /// Property names used when reading and writing pages
    status_property: String,
    priority_property: String,
    title_property: String,
    /// API base URL
    base_url: String,
    /// HTTP client
    client: reqwest::Client,
}

/// Result type for Notion operations.
pub type NotionResult<T> = Result<T, NotionError>;

/// Error types for Notion operations.
#[derive(Debug, thiserror::Error)]
pub enum NotionError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Notion API error ({code}): {message}")]
    Api { code: String, message: String },

    #[error("Database ID not configured")]
    NotConfigured,

    #[error("Authentication required")]
    Unauthorized,

    #[error("Rate limit exceeded")]
    RateLimited,

    #[error("Unexpected response: {0}")]
    UnexpectedResponse(String),
}

impl NotionClient {
    /// Create a new Notion client.
    pub fn new(token: impl Into<String>, database_id: Option<String>) -> Self {
        let defaults = NotionConfig::default();
        Self {
            token: token.into(),
            database_id,
            status_property: defaults.status_property,
            priority_property: defaults.priority_property,
            title_property: defaults.title_property,
            base_url: "https://api.notion.com/v1".to_string(),
            client: reqwest::Client::new(),
        }
    }

    /// Create from NOTION_API_KEY and the Notion settings.
    ///
    /// Returns `None` unless both a token and a database ID are available.
    pub fn from_env(config: &NotionConfig) -> Option<Self> {
        let token = std::env::var("NOTION_API_KEY").ok().filter(|t| !t.is_empty())?;
        let database_id = config.database_id.clone().filter(|id| !id.is_empty())?;

        Some(Self::new(token, Some(database_id)).with_properties(config))
    }

    /// Use the property names from the settings.
    pub fn with_properties(mut self, config: &NotionConfig) -> Self {
        self.status_property = config.status_property.clone();
        self.priority_property = config.priority_property.clone();
        self.title_property = config.title_property.clone();
        self
    }

    /// Create with a custom API base URL.
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    /// Send a POST request and return the JSON body.
    async fn post(&self, path: &str, body: &Value) -> NotionResult<Value> {
        self.request(reqwest::Method::POST, path, body).await
    }

    /// Send a JSON request and return the JSON body.
    async fn request(
        &self,
        method: reqwest::Method,
        path: &str,
        body: &Value,
    ) -> NotionResult<Value> {
        let response = self
            .client
            .request(method, format!("{}/{}", self.base_url, path))
            .bearer_auth(&self.token)
            .header("Notion-Version", NOTION_VERSION)
            .header("Content-Type", "application/json")
            .json(body)
            .send()
            .await?;

        let status = response.status();

        if status == reqwest::StatusCode::UNAUTHORIZED {
            return Err(NotionError::Unauthorized);
        }

        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(NotionError::RateLimited);
        }

        let result: Value = response.json().await?;

        if !status.is_success() {
            let code = result.get("code").and_then(Value::as_str).unwrap_or("unknown");
            let message =
                result.get("message").and_then(Value::as_str).unwrap_or("Unknown error");
            return Err(NotionError::Api { code: code.to_string(), message: message.to_string() });
        }

        Ok(result)
    }

    /// Pages edited within the last `days` days, newest first.
    pub async fn get_weekly_updates(&self, days: u32) -> NotionResult<Vec<ExternalItem>> {
        let database_id = self.database_id.as_deref().ok_or(NotionError::NotConfigured)?;

        let start = Utc::now() - Duration::days(i64::from(days));
        let body = json!({
            "filter": {
                "timestamp": "last_edited_time",
                "last_edited_time": { "after": start.to_rfc3339() }
            },
            "sorts": [{ "timestamp": "last_edited_time", "direction": "descending" }],
            "page_size": 100
        });

        let response = self.post(&format!("databases/{}/query", database_id), &body).await?;

        let results = response
            .get("results")
            .and_then(Value::as_array)
            .ok_or_else(|| NotionError::UnexpectedResponse("missing results".to_string()))?;

        Ok(parse_query_results(results, &self.status_property, &self.priority_property))
    }

    /// Create a page in the database with the given title and body text.
    ///
    /// Blocks beyond the first request's limit are appended in follow-up
    /// requests. Returns the new page's ID.
    pub async fn create_page(&self, title: &str, content: &str) -> NotionResult<String> {
        let database_id = self.database_id.as_deref().ok_or(NotionError::NotConfigured)?;

        let mut properties = serde_json::Map::new();
        properties.insert(
            self.title_property.clone(),
            json!({ "title": [{ "text": { "content": title } }] }),
        );

        let blocks = paragraph_blocks(content);
        let mut batches = blocks.chunks(MAX_BLOCKS);
        let first: &[Value] = batches.next().unwrap_or(&[]);

        let body = json!({
            "parent": { "database_id": database_id },
            "properties": properties,
            "children": first,
        });

        let response = self.post("pages", &body).await?;

        let page_id = response
            .get("id")
            .and_then(Value::as_str)
            .map(ToString::to_string)
            .ok_or_else(|| NotionError::UnexpectedResponse("missing page id".to_string()))?;

        for batch in batches {
            tracing::debug!(page = %page_id, blocks = batch.len(), "Appending Notion blocks");
            self.request(
                reqwest::Method::PATCH,
                &format!("blocks/{}/children", page_id),
                &json!({ "children": batch }),
            )
            .await?;
        }

        Ok(page_id)
    }
}

#[async_trait]
impl WorkspaceSource for NotionClient {
    async fn weekly_updates(&self, days: u32) -> WeeklyUpdates {
        match self.get_weekly_updates(days).await {
            Ok(items) => WeeklyUpdates::from_items(&items),
            Err(e) => WeeklyUpdates::failed(e.to_string()),
        }
    }

    fn name(&self) -> &str {
        "notion"
    }
}

/// Convert database query results into items.
///
/// Pages without a title are skipped.
pub fn parse_query_results(
    results: &[Value],
    status_property: &str,
    priority_property: &str,
) -> Vec<ExternalItem> {
    let mut items = Vec::new();

    for page in results {
        let Some(properties) = page.get("properties").and_then(Value::as_object) else {
            tracing::debug!("Skipping Notion page without properties");
            continue;
        };

        let Some(title) = extract_title(properties) else {
            continue;
        };

        items.push(ExternalItem {
            title,
            status: extract_property(properties, status_property),
            priority: extract_property(properties, priority_property),
        });
    }

    items
}

/// Text of the first `title`-typed property.
fn extract_title(properties: &serde_json::Map<String, Value>) -> Option<String> {
    properties
        .values()
        .find(|prop| prop.get("type").and_then(Value::as_str) == Some("title"))
        .and_then(|prop| prop.get("title"))
        .and_then(first_text)
        .filter(|title| !title.is_empty())
}

/// Value of a select, status or rich text property.
fn extract_property(properties: &serde_json::Map<String, Value>, name: &str) -> Option<String> {
    let prop = properties.get(name)?;

    let value = match prop.get("type").and_then(Value::as_str)? {
        "select" => prop.get("select")?.get("name")?.as_str().map(ToString::to_string),
        "status" => prop.get("status")?.get("name")?.as_str().map(ToString::to_string),
        "rich_text" => first_text(prop.get("rich_text")?),
        _ => None,
    };

    value.filter(|v| !v.is_empty())
}

/// Content of the first rich text object in an array.
fn first_text(rich_text: &Value) -> Option<String> {
    let first = rich_text.as_array()?.first()?;
    first
        .get("plain_text")
        .or_else(|| first.get("text").and_then(|t| t.get("content")))
        .and_then(Value::as_str)
        .map(ToString::to_string)
}

/// Split text into paragraph blocks that respect Notion's size limits.
fn paragraph_blocks(content: &str) -> Vec<Value> {
    let chars: Vec<char> = content.chars().collect();

    chars
        .chunks(MAX_TEXT_CHARS)
        .map(|chunk| {
            let text: String = chunk.iter().collect();
            json!({
                "object": "block",
                "type": "paragraph",
                "paragraph": {
                    "rich_text": [{ "type": "text", "text": { "content": text } }]
                }
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_page() -> Value {
        json!({
            "object": "page",
            "properties": {
                "Name": {
                    "type": "title",
                    "title": [{ "plain_text": "API設計", "text": { "content": "API設計" } }]
                },
                "Status": { "type": "status", "status": { "name": "In progress" } },
                "Priority": { "type": "select", "select": { "name": "High" } }
            }
        })
    }

    #[test]
    fn test_parse_query_results() {
        let items = parse_query_results(&[sample_page()], "Status", "Priority");

        assert_eq!(items.len(), 1);
        assert_eq!(items[0].to_string(), "API設計 (Status: In progress) [Priority: High]");
    }

    #[test]
    fn test_parse_rich_text_property_and_missing_fields() {
        let page = json!({
            "properties": {
                "Task": { "type": "title", "title": [{ "text": { "content": "Docs" } }] },
                "Status": { "type": "rich_text", "rich_text": [{ "text": { "content": "Draft" } }] },
                "Priority": { "type": "select", "select": null }
            }
        });

        let items = parse_query_results(&[page], "Status", "Priority");
        assert_eq!(items[0], ExternalItem::new("Docs").with_status("Draft"));
    }

    #[test]
    fn test_parse_skips_untitled_pages() {
        let untitled = json!({
            "properties": { "Name": { "type": "title", "title": [] } }
        });
        let no_properties = json!({ "object": "page" });

        let items = parse_query_results(&[untitled, no_properties, sample_page()], "Status", "Priority");
        assert_eq!(items.len(), 1);
    }

    #[test]
    fn test_custom_property_names() {
        let page = json!({
            "properties": {
                "Name": { "type": "title", "title": [{ "plain_text": "Launch" }] },
                "状態": { "type": "select", "select": { "name": "完了" } }
            }
        });

        let items = parse_query_results(&[page], "状態", "優先度");
        assert_eq!(items[0].status.as_deref(), Some("完了"));
        assert!(items[0].priority.is_none());
    }

    #[test]
    fn test_paragraph_blocks_are_chunked() {
        let content = "あ".repeat(MAX_TEXT_CHARS + 10);
        let blocks = paragraph_blocks(&content);

        assert_eq!(blocks.len(), 2);
        let second = blocks[1]["paragraph"]["rich_text"][0]["text"]["content"].as_str().unwrap();
        assert_eq!(second.chars().count(), 10);
    }

    #[test]
    fn test_long_content_keeps_every_block() {
        let content = "a".repeat(MAX_TEXT_CHARS * MAX_BLOCKS + 1);
        let blocks = paragraph_blocks(&content);

        assert_eq!(blocks.len(), MAX_BLOCKS + 1);
        assert_eq!(blocks.chunks(MAX_BLOCKS).count(), 2);
        let last = blocks[MAX_BLOCKS]["paragraph"]["rich_text"][0]["text"]["content"].as_str().unwrap();
        assert_eq!(last, "a");
    }

    #[test]
    fn test_paragraph_blocks_empty_content() {
        assert!(paragraph_blocks("").is_empty());
    }

    #[tokio::test]
    async fn test_missing_database_id() {
        let client = NotionClient::new("secret", None);

        let err = client.get_weekly_updates(7).await.unwrap_err();
        assert!(matches!(err, NotionError::NotConfigured));

        let updates = client.weekly_updates(7).await;
        assert!(updates.items.is_empty());
        assert_eq!(updates.error.as_deref(), Some("Database ID not configured"));
    }
}
