// marquee-core/src/lib.rs

#![doc = include_str!("../../README.md")]

pub mod agent;
pub mod api;
pub mod catalog;
pub mod config;
pub mod errors;
pub mod providers;
pub mod session;
pub mod tools;

pub mod models {
    pub mod chat;
    pub mod tools;
}

#[cfg(test)]
mod agent_tests;

#[cfg(test)]
use anyhow::{anyhow, Result};

pub use agent::{
    turn_error_message, Orchestrator, ToolExecutionResult, TurnOutcome, TurnWarning,
};
pub use catalog::{CatalogError, MovieId, PastReview};
pub use config::{ChatConfig, ConfigError, ModelConfig};
pub use errors::AgentError;
pub use models::chat::{ApiResponse, ChatMessage, Choice, Role};
pub use models::tools::{
    ToolCall, ToolDefinition, ToolFunction, ToolParameter, ToolParameterType,
    ToolParametersDefinition,
};
pub use providers::openai::OpenAiProvider;
pub use providers::ChatProvider;
pub use session::Session;
pub use tools::{CatalogTool, ToolError};

pub use async_trait::async_trait;
