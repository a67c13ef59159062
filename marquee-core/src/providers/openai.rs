// marquee-core/src/providers/openai.rs
use super::ChatProvider;
use crate::api;
use crate::config::ModelConfig;
use crate::models::chat::{ApiResponse, ChatMessage};
use crate::models::tools::ToolDefinition;
use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;
use tracing::{error, trace};

#[derive(Clone)]
pub struct OpenAiProvider {
    config: ModelConfig,
    http_client: Client,
    api_key: String,
}

impl OpenAiProvider {
    pub fn new(config: ModelConfig, http_client: Client, api_key: String) -> Self {
        Self {
            config,
            http_client,
            api_key,
        }
    }

    /// Builds a provider with its own HTTP client, using the configured timeout.
    pub fn from_config(config: ModelConfig, api_key: String) -> Result<Self> {
        let http_client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .context("Failed to build HTTP client for OpenAiProvider")?;
        Ok(Self::new(config, http_client, api_key))
    }

    pub fn endpoint(&self) -> &str {
        &self.config.endpoint
    }
}

#[async_trait]
impl ChatProvider for OpenAiProvider {
    fn name(&self) -> &str {
        &self.config.model_name
    }

    async fn get_completion(
        &self,
        messages: &[ChatMessage],
        tools: Option<&[ToolDefinition]>,
    ) -> Result<ApiResponse> {
        trace!("Entering OpenAiProvider::get_completion");
        let result = api::call_chat_completion_api(
            &self.http_client,
            &self.config.endpoint,
            &self.api_key,
            &self.config,
            messages,
            tools,
        )
        .await;

        if let Err(e) = &result {
            error!(error = %e, model = %self.config.model_name, "Chat completion request failed");
        }
        result
    }
}
