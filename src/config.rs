//! TOML configuration.
//!
//! ```toml
//! [db]
//! path = "./data/saved.sqlite"
//!
//! [panel]
//! page_size = 50
//! descending = true
//! debounce_ms = 200
//! search_fields = ["headers", "payload"]
//! ```
//!
//! Only `[db]` is required; every `[panel]` key has a default.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub db: DbConfig,
    #[serde(default)]
    pub panel: PanelConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DbConfig {
    pub path: PathBuf,
}

/// Controller tuning.
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct PanelConfig {
    /// Documents per page load.
    #[serde(default = "default_page_size")]
    pub page_size: usize,
    /// Scan keys from highest to lowest.
    #[serde(default = "default_descending")]
    pub descending: bool,
    /// Debounce window for page loads and post-delete refreshes.
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,
    /// Fields the fuzzy search phase looks at.
    #[serde(default = "default_search_fields")]
    pub search_fields: Vec<String>,
}

impl Default for PanelConfig {
    fn default() -> Self {
        Self {
            page_size: default_page_size(),
            descending: default_descending(),
            debounce_ms: default_debounce_ms(),
            search_fields: default_search_fields(),
        }
    }
}

fn default_page_size() -> usize {
    50
}
fn default_descending() -> bool {
    true
}
fn default_debounce_ms() -> u64 {
    200
}
fn default_search_fields() -> Vec<String> {
    vec!["headers".to_string(), "payload".to_string()]
}

impl PanelConfig {
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    pub fn validate(&self) -> Result<()> {
        if self.page_size == 0 {
            anyhow::bail!("panel.page_size must be > 0");
        }
        if self.search_fields.is_empty() {
            anyhow::bail!("panel.search_fields must name at least one field");
        }
        if self.search_fields.iter().any(|f| f.trim().is_empty()) {
            anyhow::bail!("panel.search_fields must not contain empty names");
        }
        Ok(())
    }
}

pub fn parse_config(content: &str) -> Result<Config> {
    let config: Config = toml::from_str(content).with_context(|| "Failed to parse config file")?;
    config.panel.validate()?;
    Ok(config)
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;
    parse_config(&content)
}
