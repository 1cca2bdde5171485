//! Configuration management.
//!
//! Handles loading configuration from TOML files. Secrets never live in the
//! file; they come from the environment (optionally through a `.env` file).

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Local config file name, looked up in the current directory.
pub const LOCAL_CONFIG_FILE: &str = ".weekly-report.toml";

/// Application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// General settings
    pub general: GeneralConfig,

    /// Completion provider settings
    pub ai: AiConfig,

    /// Per-agent settings
    pub agents: AgentsConfig,

    /// Notion workspace integration
    pub notion: NotionConfig,
}

/// Execution mode.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum RunMode {
    /// Chatty logging
    #[default]
    Development,
    /// Warnings and errors only
    Production,
}

impl RunMode {
    /// Default log filter for this mode.
    pub fn default_log_filter(self) -> &'static str {
        match self {
            Self::Development => "info",
            Self::Production => "warn",
        }
    }
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Directory reports are written to
    pub output_dir: PathBuf,

    /// Execution mode
    pub mode: RunMode,
}

/// Completion provider settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AiConfig {
    /// Provider (gemini, claude, ollama)
    pub provider: String,

    /// Model to use instead of the provider default
    pub model: Option<String>,

    /// API base URL override
    pub base_url: Option<String>,

    /// Request timeout in seconds
    pub timeout_secs: u64,
}

/// Settings for the three pipeline agents.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentsConfig {
    /// Report writer
    pub writer: AgentConfig,
    /// Draft reviewer
    pub reviewer: AgentConfig,
    /// Supervising manager
    pub manager: AgentConfig,
}

/// Immutable settings for one agent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentConfig {
    /// Agent name, reported in stage metadata
    pub name: String,

    /// Role description
    pub role: String,

    /// Model override for this agent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,

    /// Sampling temperature
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Upper bound on generated tokens
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    /// Instruction prepended to every prompt
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system_prompt: Option<String>,
}

fn default_temperature() -> f32 {
    0.7
}

fn default_max_tokens() -> u32 {
    4096
}

impl AgentConfig {
    /// Create a config with default sampling settings and no system prompt.
    pub fn new(name: impl Into<String>, role: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            role: role.into(),
            model: None,
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
            system_prompt: None,
        }
    }

    /// Set the temperature.
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    /// Set the system prompt.
    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = Some(prompt.into());
        self
    }

    /// Default report writer.
    pub fn writer() -> Self {
        Self::new("ReportWriter", "週報作成担当").with_temperature(0.7).with_system_prompt(
            "あなたは週報作成の専門家です。\n\
             議事録やNotionの更新情報から、簡潔で分かりやすい週報を作成してください。\n\
             重要な成果、進捗状況、課題を明確に整理することを心がけてください。",
        )
    }

    /// Default reviewer.
    pub fn reviewer() -> Self {
        Self::new("Reviewer", "レビュー担当").with_temperature(0.5).with_system_prompt(
            "あなたは週報のレビュー担当者です。\n\
             提出された週報の内容を確認し、以下の観点から改善提案を行ってください：\n\
             - 内容の完全性と正確性\n\
             - 文章の明確性と読みやすさ\n\
             - 重要な情報の抜け漏れ\n\
             - 構成の論理性",
        )
    }

    /// Default manager.
    pub fn manager() -> Self {
        Self::new("Manager", "上司").with_temperature(0.6).with_system_prompt(
            "あなたは部下の週報を確認する上司です。\n\
             建設的なフィードバックと励ましのコメントを提供してください。\n\
             成果を適切に評価し、次週への期待とアドバイスを含めてください。",
        )
    }
}

/// Notion integration settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NotionConfig {
    /// Whether to pull updates from Notion when credentials are present
    pub enabled: bool,

    /// Database to query (NOTION_DATABASE_ID overrides this)
    pub database_id: Option<String>,

    /// How many days back to look for edited pages
    pub lookback_days: u32,

    /// Property holding the item status
    pub status_property: String,

    /// Property holding the item priority
    pub priority_property: String,

    /// Title property used when publishing reports
    pub title_property: String,
}

impl Config {
    /// Load configuration.
    ///
    /// Looks for config in:
    /// 1. The explicit path, if given
    /// 2. `.weekly-report.toml` in current directory
    /// 3. `~/.config/weekly-report/config.toml`
    /// 4. Falls back to defaults
    ///
    /// Environment overrides are applied last.
    pub fn load(explicit: Option<&Path>) -> anyhow::Result<Self> {
        let mut config = match explicit {
            Some(path) => Self::load_from_file(path)?,
            None => Self::discover()?,
        };
        config.apply_env();
        Ok(config)
    }

    fn discover() -> anyhow::Result<Self> {
        let local_config = PathBuf::from(LOCAL_CONFIG_FILE);
        if local_config.exists() {
            return Self::load_from_file(&local_config);
        }

        if let Some(global_config) = Self::global_config_path() {
            if global_config.exists() {
                return Self::load_from_file(&global_config);
            }
        }

        Ok(Self::default())
    }

    /// Load configuration from a specific file.
    pub fn load_from_file(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("Failed to read config {}: {}", path.display(), e))?;
        let config: Self = toml::from_str(&content)
            .map_err(|e| anyhow::anyhow!("Invalid config {}: {}", path.display(), e))?;
        Ok(config)
    }

    /// Apply environment variable overrides.
    pub fn apply_env(&mut self) {
        if let Ok(database_id) = std::env::var("NOTION_DATABASE_ID") {
            if !database_id.is_empty() {
                self.notion.database_id = Some(database_id);
            }
        }
    }

    /// Get the config directory path.
    pub fn config_dir() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join("weekly-report"))
    }

    /// Get the global config file path.
    pub fn global_config_path() -> Option<PathBuf> {
        Self::config_dir().map(|d| d.join("config.toml"))
    }
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self { output_dir: PathBuf::from("output"), mode: RunMode::Development }
    }
}

impl Default for AiConfig {
    fn default() -> Self {
        Self { provider: "gemini".to_string(), model: None, base_url: None, timeout_secs: 120 }
    }
}

impl Default for AgentsConfig {
    fn default() -> Self {
        Self {
            writer: AgentConfig::writer(),
            reviewer: AgentConfig::reviewer(),
            manager: AgentConfig::manager(),
        }
    }
}

impl Default for NotionConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            database_id: None,
            lookback_days: 7,
            status_property: "Status".to_string(),
            priority_property: "Priority".to_string(),
            title_property: "Name".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.general.output_dir, PathBuf::from("output"));
        assert_eq!(config.general.mode, RunMode::Development);
        assert_eq!(config.ai.provider, "gemini");
        assert_eq!(config.agents.writer.name, "ReportWriter");
        assert_eq!(config.agents.reviewer.name, "Reviewer");
        assert_eq!(config.agents.manager.name, "Manager");
        assert_eq!(config.notion.lookback_days, 7);
    }

    #[test]
    fn test_config_serialization() {
        let config = Config::default();
        let toml_str = toml::to_string(&config).unwrap();
        assert!(toml_str.contains("[general]"));
        assert!(toml_str.contains("[agents.writer]"));
        assert!(toml_str.contains("[notion]"));
    }

    #[test]
    fn test_partial_config() {
        let toml_str = r#"
[general]
mode = "production"

[ai]
provider = "ollama"
model = "qwen2.5:14b"

[agents.reviewer]
name = "StrictReviewer"
role = "レビュー担当"
temperature = 0.2
"#;
        let config: Config = toml::from_str(toml_str).unwrap();

        assert_eq!(config.general.mode, RunMode::Production);
        assert_eq!(config.general.output_dir, PathBuf::from("output"));
        assert_eq!(config.ai.provider, "ollama");
        assert_eq!(config.ai.model.as_deref(), Some("qwen2.5:14b"));
        assert_eq!(config.ai.timeout_secs, 120);
        assert_eq!(config.agents.reviewer.name, "StrictReviewer");
        assert_eq!(config.agents.reviewer.max_tokens, 4096);
        assert!(config.agents.reviewer.system_prompt.is_none());
        // Untouched agents keep their defaults.
        assert_eq!(config.agents.manager, AgentConfig::manager());
    }

    #[test]
    fn test_load_from_file() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let path = temp_dir.path().join("config.toml");
        std::fs::write(&path, "[general]\noutput_dir = \"reports\"\n").unwrap();

        let config = Config::load_from_file(&path).unwrap();
        assert_eq!(config.general.output_dir, PathBuf::from("reports"));
    }

    #[test]
    fn test_load_from_invalid_file() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let path = temp_dir.path().join("config.toml");
        std::fs::write(&path, "[general\n").unwrap();

        let err = Config::load_from_file(&path).unwrap_err();
        assert!(err.to_string().contains("Invalid config"));
    }

    #[test]
    #[serial(notion_env)]
    fn test_env_overrides_database_id() {
        let original = std::env::var("NOTION_DATABASE_ID").ok();
        std::env::set_var("NOTION_DATABASE_ID", "db-from-env");

        let mut config = Config::default();
        config.notion.database_id = Some("db-from-file".to_string());
        config.apply_env();

        match original {
            Some(val) => std::env::set_var("NOTION_DATABASE_ID", val),
            None => std::env::remove_var("NOTION_DATABASE_ID"),
        }

        assert_eq!(config.notion.database_id.as_deref(), Some("db-from-env"));
    }

    #[test]
    fn test_run_mode_log_filter() {
        assert_eq!(RunMode::Development.default_log_filter(), "info");
        assert_eq!(RunMode::Production.default_log_filter(), "warn");
    }
}
