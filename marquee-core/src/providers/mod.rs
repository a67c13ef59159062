// marquee-core/src/providers/mod.rs
use crate::models::chat::{ApiResponse, ChatMessage};
use crate::models::tools::ToolDefinition;
use anyhow::Result;
use async_trait::async_trait;

/// A remote chat-completion capability. Given the ordered messages and an
/// optional tool catalog, it returns either text or tool call requests.
#[async_trait]
pub trait ChatProvider: Send + Sync {
    async fn get_completion(
        &self,
        messages: &[ChatMessage],
        tools: Option<&[ToolDefinition]>,
    ) -> Result<ApiResponse>;
    fn name(&self) -> &str;
}

pub mod openai;
