//! `ledgerboard.toml`: per-workspace settings.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

pub const CONFIG_FILE: &str = "ledgerboard.toml";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Author recorded on chain records when `--author` is not given.
    pub author: String,
    /// Default tracing filter; `RUST_LOG` takes precedence.
    pub log_filter: String,
    pub chain_file: String,
    pub projects_file: String,
    pub cards_file: String,
    pub milestones_file: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            author: "local".to_string(),
            log_filter: "warn".to_string(),
            chain_file: "chain.jsonl".to_string(),
            projects_file: "projects.jsonl".to_string(),
            cards_file: "cards.jsonl".to_string(),
            milestones_file: "milestones.jsonl".to_string(),
        }
    }
}

impl Config {
    pub fn path(dir: &Path) -> PathBuf {
        dir.join(CONFIG_FILE)
    }

    /// Read the workspace config, or defaults when the file is absent.
    pub fn load(dir: &Path) -> Result<Self, String> {
        let path = Self::path(dir);
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = fs::read_to_string(&path)
            .map_err(|e| format!("failed to read {}: {e}", path.display()))?;
        toml::from_str(&content).map_err(|e| format!("failed to parse {}: {e}", path.display()))
    }

    pub fn to_toml(&self) -> Result<String, String> {
        toml::to_string_pretty(self).map_err(|e| format!("failed to encode config: {e}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_file_keeps_defaults() {
        let config: Config = toml::from_str("author = \"alice\"\n").unwrap();
        assert_eq!(config.author, "alice");
        assert_eq!(config.chain_file, "chain.jsonl");
        assert_eq!(config.log_filter, "warn");
    }

    #[test]
    fn encoded_defaults_parse_back() {
        let encoded = Config::default().to_toml().unwrap();
        let parsed: Config = toml::from_str(&encoded).unwrap();
        assert_eq!(parsed, Config::default());
    }

    #[test]
    fn missing_file_yields_defaults() {
        let dir = std::env::temp_dir().join(format!("ledgerboard-config-{}", std::process::id()));
        assert_eq!(Config::load(&dir).unwrap(), Config::default());
    }
}
