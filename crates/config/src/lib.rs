//! Configuration loading, validation, and management for Parley.
//!
//! Loads configuration from `~/.parley/config.toml` with environment
//! variable overrides. Validates all settings at startup; a configuration
//! that fails validation is fatal.

use parley_core::agent::{Agent, Roster};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Placeholder in `prompt_template` replaced by the previous turn's text.
pub const LAST_RESPONSE_PLACEHOLDER: &str = "{last}";

/// The root configuration structure.
///
/// Maps directly to `~/.parley/config.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Generate endpoint (e.g. `http://localhost:11434/api/generate`)
    #[serde(default = "default_endpoint")]
    pub endpoint: String,

    /// Model identifier sent with every request
    #[serde(default = "default_model")]
    pub model: String,

    /// Pause between turns, in milliseconds
    #[serde(default = "default_turn_delay_ms")]
    pub turn_delay_ms: u64,

    /// TCP connect timeout, in seconds
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,

    /// Longest silence tolerated while waiting for response bytes, in
    /// seconds. A response that keeps streaming is never cut off.
    #[serde(default = "default_read_timeout_secs")]
    pub read_timeout_secs: u64,

    /// Opening utterance attributed to the first agent
    #[serde(default = "default_seed")]
    pub seed: String,

    /// Text substituted for a turn whose backend call failed
    #[serde(default = "default_fallback_response")]
    pub fallback_response: String,

    /// Printed once when the conversation is interrupted
    #[serde(default = "default_shutdown_notice")]
    pub shutdown_notice: String,

    /// Instruction wrapped around the previous turn; must contain `{last}`
    #[serde(default = "default_prompt_template")]
    pub prompt_template: String,

    /// The two personas, in speaking order
    #[serde(default = "default_agents")]
    pub agents: Vec<AgentConfig>,
}

/// One persona entry in `[[agents]]`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentConfig {
    pub id: String,
    pub persona: String,
}

fn default_endpoint() -> String {
    "http://localhost:11434/api/generate".into()
}
fn default_model() -> String {
    "qwen3:4b".into()
}
fn default_turn_delay_ms() -> u64 {
    1000
}
fn default_connect_timeout_secs() -> u64 {
    10
}
fn default_read_timeout_secs() -> u64 {
    300
}
fn default_seed() -> String {
    "Hello! Let's start a discussion. Which recent trend in artificial intelligence \
     development do you find the most interesting?"
        .into()
}
fn default_fallback_response() -> String {
    "I ran into an error, but let's keep going. What's next?".into()
}
fn default_shutdown_notice() -> String {
    "Conversation stopped by user.".into()
}
fn default_prompt_template() -> String {
    "The other agent said: \"{last}\"\n\nRespond to their statement or question, then ask \
     one new question to continue the discussion about AI technology or programming."
        .into()
}
fn default_agents() -> Vec<AgentConfig> {
    vec![
        AgentConfig {
            id: "agent-1".into(),
            persona: "You are a curious AI agent who likes to ask deep questions about \
                      artificial intelligence, programming, and technological innovation."
                .into(),
        },
        AgentConfig {
            id: "agent-2".into(),
            persona: "You are a knowledgeable AI agent who enjoys answering questions about \
                      AI and programming in detail, then asking a relevant follow-up question."
                .into(),
        },
    ]
}

impl AppConfig {
    /// Load configuration from the default path (~/.parley/config.toml).
    ///
    /// Also checks environment variables:
    /// - `PARLEY_ENDPOINT`
    /// - `PARLEY_MODEL`
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_with_env(&Self::config_dir().join("config.toml"))
    }

    /// Load from `path`, then apply environment overrides and re-validate.
    pub fn load_with_env(path: &Path) -> Result<Self, ConfigError> {
        let mut config = Self::load_from(path)?;

        if let Ok(endpoint) = std::env::var("PARLEY_ENDPOINT") {
            config.endpoint = endpoint;
        }

        if let Ok(model) = std::env::var("PARLEY_MODEL") {
            config.model = model;
        }

        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a specific file path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::info!("No config file found at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let config: Self = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Get the configuration directory path.
    pub fn config_dir() -> PathBuf {
        dirs_home().join(".parley")
    }

    /// Point the conversation at `https://<host>/api/generate`.
    pub fn with_host(mut self, host: &str) -> Self {
        self.endpoint = endpoint_for_host(host);
        self
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.endpoint.starts_with("http://") || self.endpoint.starts_with("https://")) {
            return Err(ConfigError::ValidationError(format!(
                "endpoint must be an http(s) URL, got '{}'",
                self.endpoint
            )));
        }

        for (name, value) in [
            ("model", &self.model),
            ("seed", &self.seed),
            ("fallback_response", &self.fallback_response),
        ] {
            if value.trim().is_empty() {
                return Err(ConfigError::ValidationError(format!(
                    "{name} must not be empty"
                )));
            }
        }

        if !self.prompt_template.contains(LAST_RESPONSE_PLACEHOLDER) {
            return Err(ConfigError::ValidationError(format!(
                "prompt_template must contain {LAST_RESPONSE_PLACEHOLDER}"
            )));
        }

        if self.read_timeout_secs == 0 {
            return Err(ConfigError::ValidationError(
                "read_timeout_secs must be > 0".into(),
            ));
        }

        self.roster()?;
        Ok(())
    }

    /// Build the immutable two-agent roster.
    pub fn roster(&self) -> Result<Roster, ConfigError> {
        let agents: Vec<Agent> = self
            .agents
            .iter()
            .map(|a| Agent::new(a.id.trim(), a.persona.clone()))
            .collect();
        Roster::from_slice(&agents).map_err(|e| ConfigError::ValidationError(e.to_string()))
    }

    pub fn turn_delay(&self) -> Duration {
        Duration::from_millis(self.turn_delay_ms)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    pub fn read_timeout(&self) -> Duration {
        Duration::from_secs(self.read_timeout_secs)
    }

    /// Render the configuration as TOML (for `parley config`).
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(|e| ConfigError::SerializeError(e.to_string()))
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            model: default_model(),
            turn_delay_ms: default_turn_delay_ms(),
            connect_timeout_secs: default_connect_timeout_secs(),
            read_timeout_secs: default_read_timeout_secs(),
            seed: default_seed(),
            fallback_response: default_fallback_response(),
            shutdown_notice: default_shutdown_notice(),
            prompt_template: default_prompt_template(),
            agents: default_agents(),
        }
    }
}

/// `host` may be a bare host[:port] or already carry a scheme.
pub fn endpoint_for_host(host: &str) -> String {
    let host = host.trim().trim_end_matches('/');
    if host.starts_with("http://") || host.starts_with("https://") {
        format!("{host}/api/generate")
    } else {
        format!("https://{host}/api/generate")
    }
}

/// Get the user's home directory.
fn dirs_home() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        std::env::var("USERPROFILE")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("C:\\Users\\Default"))
    }
    #[cfg(not(target_os = "windows"))]
    {
        std::env::var("HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("/tmp"))
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {path}: {reason}")]
    ReadError { path: PathBuf, reason: String },

    #[error("Failed to parse config file at {path}: {reason}")]
    ParseError { path: PathBuf, reason: String },

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),

    #[error("Failed to render config: {0}")]
    SerializeError(String),
}

impl From<ConfigError> for parley_core::Error {
    fn from(e: ConfigError) -> Self {
        parley_core::Error::Config {
            message: e.to_string(),
        }
    }
}
