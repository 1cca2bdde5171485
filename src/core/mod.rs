//! Core types shared across the application.
//!
//! Currently this is the configuration layer: TOML settings for the output
//! location, the completion provider, each agent and the Notion integration.

mod config;

pub use config::{
    AgentConfig, AgentsConfig, AiConfig, Config, GeneralConfig, NotionConfig, RunMode,
    LOCAL_CONFIG_FILE,
};
