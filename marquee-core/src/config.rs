// marquee-core/src/config.rs

//! Handles configuration structures and parsing for the agent library.

use serde::Deserialize;
use std::path::{Path, PathBuf};
use thiserror::Error;
use url::Url;

pub const DEFAULT_ENDPOINT: &str = "https://api.openai.com/v1/chat/completions";
pub const DEFAULT_API_KEY_ENV_VAR: &str = "OPENAI_API_KEY";

pub const DEFAULT_SYSTEM_PROMPT: &str = r#"You are a helpful AI assistant with access to tools.
When the user asks about movies to watch, respond by asking for their user id.
Once the user tells you their user id, call the tools in sequence before recommending unwatched movies:
get_user_past_reviews takes the user id, get_genres takes movie ids, and get_movies takes genres and watched movie ids.
Base recommendations on the positive reviews and the genres fetched with the tools.
Never recommend a movie the user has already watched.
Keep responses concise and engaging. You can reference previous parts of our conversation."#;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read configuration file {path:?}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse configuration TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),

    #[error("Environment variable {var} is not set. Set it to your API key, e.g. export {var}='your-api-key-here'")]
    MissingCredential { var: String },
}

impl ConfigError {
    fn invalid(msg: impl Into<String>) -> Self {
        ConfigError::Invalid(msg.into())
    }
}

/// Top-level configuration, usually read from `Marquee.toml`.
#[derive(Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct ChatConfig {
    pub system_prompt: String,
    pub model: ModelConfig,
}

/// Settings for the remote chat-completion model.
#[derive(Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct ModelConfig {
    pub model_name: String,
    pub endpoint: String,
    pub api_key_env_var: String,
    pub max_tokens: u32,
    pub temperature: f64,
    /// Upper bound on tool-call rounds in a single turn.
    pub max_tool_rounds: usize,
    pub timeout_secs: u64,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            model_name: "gpt-4o".to_string(),
            endpoint: DEFAULT_ENDPOINT.to_string(),
            api_key_env_var: DEFAULT_API_KEY_ENV_VAR.to_string(),
            max_tokens: 200,
            temperature: 0.7,
            max_tool_rounds: 8,
            timeout_secs: 60,
        }
    }
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            system_prompt: DEFAULT_SYSTEM_PROMPT.to_string(),
            model: ModelConfig::default(),
        }
    }
}

impl ChatConfig {
    pub fn from_toml_str(config_toml_content: &str) -> Result<ChatConfig, ConfigError> {
        let config: ChatConfig = match toml::from_str(config_toml_content) {
            Ok(cfg) => cfg,
            Err(e) => {
                tracing::error!(error = %e, "Failed to parse TOML content");
                return Err(e.into());
            }
        };
        config.validate()?;
        tracing::info!("Successfully parsed and validated configuration.");
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<ChatConfig, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&content)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.system_prompt.trim().is_empty() {
            return Err(ConfigError::invalid("'system_prompt' is empty."));
        }
        let model = &self.model;
        if model.model_name.trim().is_empty() {
            return Err(ConfigError::invalid("'model.model_name' is empty."));
        }
        if model.api_key_env_var.trim().is_empty() {
            return Err(ConfigError::invalid("'model.api_key_env_var' is empty."));
        }
        Url::parse(&model.endpoint).map_err(|e| {
            ConfigError::invalid(format!(
                "Invalid URL format for 'model.endpoint' ('{}'): {}",
                model.endpoint, e
            ))
        })?;
        if model.max_tokens == 0 {
            return Err(ConfigError::invalid("'model.max_tokens' must be greater than 0."));
        }
        if !(0.0..=2.0).contains(&model.temperature) {
            return Err(ConfigError::invalid(format!(
                "'model.temperature' must be between 0 and 2, got {}.",
                model.temperature
            )));
        }
        if model.max_tool_rounds == 0 {
            return Err(ConfigError::invalid("'model.max_tool_rounds' must be greater than 0."));
        }
        if model.timeout_secs == 0 {
            return Err(ConfigError::invalid("'model.timeout_secs' must be greater than 0."));
        }
        Ok(())
    }

    /// Reads the API key from the process environment.
    pub fn api_key(&self) -> Result<String, ConfigError> {
        resolve_api_key(&self.model.api_key_env_var, |var| std::env::var(var).ok())
    }
}

/// Looks up `var` and rejects missing or blank values.
pub fn resolve_api_key(
    var: &str,
    lookup: impl Fn(&str) -> Option<String>,
) -> Result<String, ConfigError> {
    match lookup(var) {
        Some(key) if !key.trim().is_empty() => Ok(key.trim().to_string()),
        _ => Err(ConfigError::MissingCredential {
            var: var.to_string(),
        }),
    }
}
