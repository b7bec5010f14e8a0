//! RouteAgent configuration types and loading

use eyre::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

/// Project-local config file name
const LOCAL_CONFIG: &str = ".routeagent.yml";

/// Main RouteAgent configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// LLM provider configuration
    pub llm: LlmConfig,

    /// Agent loop settings
    pub agent: AgentConfig,

    /// Checkpoint interaction settings
    pub checkpoint: CheckpointConfig,

    /// Ride data source
    pub strava: StravaConfig,

    /// Logging
    pub log: LogConfig,
}

impl Config {
    /// Validate configuration before use
    ///
    /// Only commands that talk to the model need this; `ra config` and
    /// `ra prompt` work without an API key.
    pub fn validate(&self) -> Result<()> {
        if std::env::var(&self.llm.api_key_env).is_err() {
            return Err(eyre::eyre!(
                "LLM API key not found. Set the {} environment variable.",
                self.llm.api_key_env
            ));
        }
        Ok(())
    }

    /// Load configuration with fallback chain
    pub fn load(config_path: Option<&PathBuf>) -> Result<Self> {
        debug!(?config_path, "Config::load: called");
        if let Some(path) = config_path {
            return Self::load_from_file(path).context(format!("Failed to load config from {}", path.display()));
        }

        for candidate in Self::search_paths() {
            if candidate.exists() {
                match Self::load_from_file(&candidate) {
                    Ok(config) => return Ok(config),
                    Err(e) => {
                        tracing::warn!("Failed to load config from {}: {}", candidate.display(), e);
                    }
                }
            }
        }

        tracing::info!("No config file found, using defaults");
        Ok(Self::default())
    }

    /// Read just the log settings, before logging is set up
    ///
    /// Errors fall back to defaults: a broken config file is reported
    /// properly by `load` once logging exists.
    pub fn load_log_config(config_path: Option<&PathBuf>) -> LogConfig {
        let path = match config_path {
            Some(path) => Some(path.clone()),
            None => Self::search_paths().into_iter().find(|p| p.exists()),
        };
        path.and_then(|path| fs::read_to_string(path).ok())
            .and_then(|content| serde_yaml::from_str::<Self>(&content).ok())
            .map(|config| config.log)
            .unwrap_or_default()
    }

    /// Config files tried in order when no explicit path is given
    fn search_paths() -> Vec<PathBuf> {
        let mut paths = vec![PathBuf::from(LOCAL_CONFIG)];
        if let Some(config_dir) = dirs::config_dir() {
            paths.push(config_dir.join("routeagent").join("routeagent.yml"));
        }
        paths
    }

    fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path).context("Failed to read config file")?;

        let config: Self = serde_yaml::from_str(&content).context("Failed to parse config file")?;

        tracing::info!("Loaded config from: {}", path.as_ref().display());
        Ok(config)
    }
}

/// LLM provider configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    /// Provider name (only "anthropic" is supported)
    pub provider: String,

    /// Model identifier
    pub model: String,

    /// Environment variable containing the API key
    #[serde(rename = "api-key-env")]
    pub api_key_env: String,

    /// API base URL
    #[serde(rename = "base-url")]
    pub base_url: String,

    /// Maximum tokens per response
    #[serde(rename = "max-tokens")]
    pub max_tokens: u32,

    /// Request timeout in milliseconds
    #[serde(rename = "timeout-ms")]
    pub timeout_ms: u64,
}

impl LlmConfig {
    /// Read the API key from the configured environment variable
    pub fn get_api_key(&self) -> Result<String> {
        std::env::var(&self.api_key_env).context(format!("Environment variable {} is not set", self.api_key_env))
    }
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: "anthropic".to_string(),
            model: "claude-sonnet-4-5-20250929".to_string(),
            api_key_env: "ANTHROPIC_API_KEY".to_string(),
            base_url: "https://api.anthropic.com".to_string(),
            max_tokens: 8192,
            timeout_ms: 300_000,
        }
    }
}

/// Agent loop settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentConfig {
    /// Upper bound on model calls per user message
    #[serde(rename = "max-turns")]
    pub max_turns: u32,

    /// Directory with `<name>.hbs` prompt overrides
    #[serde(rename = "prompts-dir", skip_serializing_if = "Option::is_none")]
    pub prompts_dir: Option<PathBuf>,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            max_turns: 25,
            prompts_dir: None,
        }
    }
}

/// Checkpoint interaction settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CheckpointConfig {
    /// Give up waiting for the user after this long (unset: wait forever)
    #[serde(rename = "ask-timeout-ms", skip_serializing_if = "Option::is_none")]
    pub ask_timeout_ms: Option<u64>,
}

impl CheckpointConfig {
    pub fn ask_timeout(&self) -> Option<Duration> {
        self.ask_timeout_ms.map(Duration::from_millis)
    }
}

/// Where ride history comes from
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StravaMode {
    /// Built-in fixture data
    #[default]
    Mock,
    /// No Strava tools at all
    Disabled,
}

impl std::fmt::Display for StravaMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Mock => write!(f, "mock"),
            Self::Disabled => write!(f, "disabled"),
        }
    }
}

/// Strava data source configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StravaConfig {
    pub mode: StravaMode,
}

/// Logging configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// Log level (TRACE, DEBUG, INFO, WARN, ERROR)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub level: Option<String>,

    /// Log file path (default: ~/.local/share/routeagent/logs/routeagent.log)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file: Option<PathBuf>,
}

impl LogConfig {
    pub fn file_path(&self) -> PathBuf {
        self.file.clone().unwrap_or_else(default_log_path)
    }
}

/// Default log file location
pub fn default_log_path() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("routeagent")
        .join("logs")
        .join("routeagent.log")
}
