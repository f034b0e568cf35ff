use anyhow::{Context, Result};
use dirs::config_dir;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Main configuration structure for repovault
#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct Config {
    /// Manifest sync behaviour
    #[serde(default)]
    pub sync: SyncConfig,

    /// GitHub listing settings
    #[serde(default)]
    pub github: GitHubConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Synchronization configuration
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct SyncConfig {
    /// File name of the manifest inside the repo path
    #[serde(default = "default_manifest_name")]
    pub manifest_name: String,

    /// Run log appended inside the sync root
    #[serde(default = "default_log_file")]
    pub log_file: String,

    /// Pause between repositories in seconds
    #[serde(default = "default_delay_secs")]
    pub delay_secs: u64,

    /// Width of the progress bar in characters
    #[serde(default = "default_progress_width")]
    pub progress_width: usize,

    /// Git executable to invoke
    #[serde(default = "default_git_binary")]
    pub git_binary: String,
}

/// GitHub configuration
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct GitHubConfig {
    /// API root, overridable for GitHub Enterprise
    #[serde(default = "default_api_url")]
    pub api_url: String,

    /// Records requested per page
    #[serde(default = "default_per_page")]
    pub per_page: u32,

    /// Personal access token; GITHUB_TOKEN is used when unset
    pub token: Option<String>,

    /// Root directory for category manifests
    #[serde(default = "default_output_path")]
    pub output_path: String,
}

/// Logging configuration
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct LoggingConfig {
    /// Log level
    #[serde(default = "default_log_level")]
    pub level: String, // "info"
}

// Default value functions
fn default_manifest_name() -> String {
    "source.txt".to_string()
}
fn default_log_file() -> String {
    "update-log.txt".to_string()
}
fn default_delay_secs() -> u64 {
    5
}
fn default_progress_width() -> usize {
    30
}
fn default_git_binary() -> String {
    "git".to_string()
}
fn default_api_url() -> String {
    "https://api.github.com".to_string()
}
fn default_per_page() -> u32 {
    100
}
fn default_output_path() -> String {
    "github-repos".to_string()
}
fn default_log_level() -> String {
    "info".to_string()
}

// Default implementations
impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            manifest_name: default_manifest_name(),
            log_file: default_log_file(),
            delay_secs: default_delay_secs(),
            progress_width: default_progress_width(),
            git_binary: default_git_binary(),
        }
    }
}

impl Default for GitHubConfig {
    fn default() -> Self {
        Self {
            api_url: default_api_url(),
            per_page: default_per_page(),
            token: None,
            output_path: default_output_path(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

impl SyncConfig {
    pub fn delay(&self) -> Duration {
        Duration::from_secs(self.delay_secs)
    }
}

impl GitHubConfig {
    /// Token from the config file, falling back to GITHUB_TOKEN
    pub fn resolve_token(&self) -> Option<String> {
        self.token
            .clone()
            .or_else(|| std::env::var("GITHUB_TOKEN").ok())
            .filter(|token| !token.trim().is_empty())
    }
}

impl Config {
    /// Load configuration from the default location, or defaults if there is none
    pub fn load_or_default() -> Result<Self> {
        let config_path = Self::default_config_path()?;

        if config_path.exists() {
            Self::load(&config_path)
        } else {
            tracing::debug!("No configuration at {:?}, using defaults", config_path);
            Ok(Self::default())
        }
    }

    /// Load configuration from a specific file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;

        let mut config: Config = serde_yaml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {:?}", path))?;

        // Expand environment variables in paths
        config.expand_paths()?;

        Ok(config)
    }

    /// Get the default configuration file path (XDG compliant)
    pub fn default_config_path() -> Result<PathBuf> {
        let config_dir = config_dir().context("Failed to get user config directory")?;

        Ok(config_dir.join("repovault").join("config.yml"))
    }

    /// Expand environment variables in configuration paths
    pub fn expand_paths(&mut self) -> Result<()> {
        self.github.output_path = shellexpand::full(&self.github.output_path)
            .context("Failed to expand output_path")?
            .into_owned();

        self.sync.git_binary = shellexpand::full(&self.sync.git_binary)
            .context("Failed to expand git_binary")?
            .into_owned();

        Ok(())
    }
}
