// marquee-core/src/errors.rs
use crate::config::ConfigError;
use crate::tools::ToolError;
use thiserror::Error;

/// Errors that can end a conversation turn.
#[derive(Error, Debug)]
pub enum AgentError {
    /// Error related to configuration loading or validation.
    #[error("Configuration Error: {0}")]
    Config(#[from] ConfigError),

    /// Error during interaction with the AI model API.
    #[error("API Error: {0:#}")]
    Api(#[source] anyhow::Error),

    /// A requested catalog tool failed.
    #[error("Tool '{tool}' failed: {source}")]
    Tool {
        tool: String,
        #[source]
        source: ToolError,
    },

    /// The model kept requesting tools past the configured round limit.
    #[error("Model requested tools for more than {0} rounds")]
    ToolRoundLimit(usize),

    /// A tool call reused a correlation id already present in the conversation.
    #[error("Model reused tool call id '{0}'")]
    DuplicateToolCallId(String),

    /// The model's final reply carried no text.
    #[error("Model returned an empty final answer")]
    EmptyResponse,
}

impl AgentError {
    pub fn api(error: impl Into<anyhow::Error>) -> Self {
        AgentError::Api(error.into())
    }
}
