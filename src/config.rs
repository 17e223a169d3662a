use anyhow::{Context, Result};
use log::debug;
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::providers::gitlab::DEFAULT_HISTORY_LIMIT;
use crate::watch::DEFAULT_FALLBACK_TOTAL;

/// Configuration file structure for gitlabctl.
///
/// Read once at startup; command line flags take precedence over anything
/// set here.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Config {
    #[serde(default)]
    pub gitlab: GitLabConfig,

    #[serde(default)]
    pub watch: WatchConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct GitLabConfig {
    /// GitLab instance base URL
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Personal access token
    pub access_token: Option<String>,

    /// Skip TLS certificate verification
    #[serde(default)]
    pub insecure: bool,

    /// Historical jobs fetched for duration baselines
    #[serde(default = "default_history_limit")]
    pub history_limit: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct WatchConfig {
    /// Delay between two polls of the pipeline
    #[serde(default = "default_interval_ms")]
    pub poll_interval_ms: u64,

    /// Delay between two redraws of the progress view
    #[serde(default = "default_interval_ms")]
    pub render_interval_ms: u64,

    /// Expected seconds for jobs that have no history
    #[serde(default = "default_fallback_duration")]
    pub fallback_duration: u64,
}

impl Default for GitLabConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            access_token: None,
            insecure: false,
            history_limit: default_history_limit(),
        }
    }
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: default_interval_ms(),
            render_interval_ms: default_interval_ms(),
            fallback_duration: default_fallback_duration(),
        }
    }
}

fn default_base_url() -> String {
    "https://gitlab.com".to_string()
}

fn default_history_limit() -> usize {
    DEFAULT_HISTORY_LIMIT
}

fn default_interval_ms() -> u64 {
    1000
}

fn default_fallback_duration() -> u64 {
    DEFAULT_FALLBACK_TOTAL
}

const CANDIDATES: [&str; 4] = [
    ".gitlabctl.toml",
    ".gitlabctl.yaml",
    ".gitlabctl.yml",
    ".gitlabctl.json",
];

impl Config {
    /// Load configuration from a file.
    ///
    /// An explicit path must exist. Otherwise the home directory is searched
    /// for, in order:
    /// 1. ~/.gitlabctl.toml
    /// 2. ~/.gitlabctl.yaml
    /// 3. ~/.gitlabctl.yml
    /// 4. ~/.gitlabctl.json
    ///
    /// Returns default configuration if no file is found.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        if let Some(path) = path {
            return Self::load_from_path(path);
        }

        match dirs::home_dir() {
            Some(home) => Self::load_from_dir(&home),
            None => Ok(Self::default()),
        }
    }

    fn load_from_dir(dir: &Path) -> Result<Self> {
        let found = CANDIDATES
            .iter()
            .map(|candidate| dir.join(candidate))
            .find(|path| path.exists());

        match found {
            Some(path) => Self::load_from_path(&path),
            None => Ok(Self::default()),
        }
    }

    /// Load configuration from a specific file path.
    fn load_from_path(path: &Path) -> Result<Self> {
        debug!("Loading config from {}", path.display());
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let extension = path.extension().and_then(|ext| ext.to_str()).unwrap_or("");

        match extension {
            "toml" => toml::from_str(&contents)
                .with_context(|| format!("Failed to parse TOML config: {}", path.display())),
            "json" => serde_json::from_str(&contents)
                .with_context(|| format!("Failed to parse JSON config: {}", path.display())),
            "yaml" | "yml" => serde_yaml::from_str(&contents)
                .with_context(|| format!("Failed to parse YAML config: {}", path.display())),
            _ => {
                // Try TOML first, then YAML (which also covers JSON)
                toml::from_str(&contents)
                    .or_else(|_| serde_yaml::from_str(&contents))
                    .with_context(|| format!("Failed to parse config file: {}", path.display()))
            }
        }
    }
}
