//! Stage configuration (`stage.toml`)

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Settings for a [`StageManager`](crate::StageManager)
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct StageConfig {
    /// Name the stage advertises itself under
    #[serde(default = "default_service_name")]
    pub service_name: String,
    /// Local port tools connect to
    #[serde(default = "default_port")]
    pub port: u16,
    /// Whether incoming edits are merged; when false the stage is observe-only
    #[serde(default = "default_true")]
    pub accept_edits: bool,
    /// Largest payload accepted from a tool
    #[serde(default = "default_max_payload_bytes")]
    pub max_payload_bytes: usize,
    /// Pretty-print outgoing JSON
    #[serde(default)]
    pub pretty_json: bool,
}

fn default_service_name() -> String {
    "stgmngr".to_string()
}

fn default_port() -> u16 {
    7846
}

fn default_true() -> bool {
    true
}

fn default_max_payload_bytes() -> usize {
    1 << 20
}

impl Default for StageConfig {
    fn default() -> Self {
        Self {
            service_name: default_service_name(),
            port: default_port(),
            accept_edits: true,
            max_payload_bytes: default_max_payload_bytes(),
            pretty_json: false,
        }
    }
}

impl StageConfig {
    /// Load configuration from a TOML file
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        Self::from_toml(&content).with_context(|| format!("Failed to parse {}", path.display()))
    }

    /// Parse configuration from TOML text
    pub fn from_toml(content: &str) -> Result<Self> {
        toml::from_str(content).context("Invalid stage configuration")
    }

    /// Save configuration to a TOML file
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self)?;
        fs::write(path, content).with_context(|| format!("Failed to write {}", path.display()))?;
        Ok(())
    }
}
