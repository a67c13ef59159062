// marquee-core/src/api.rs

//! Wire format and transport for OpenAI-compatible chat completion endpoints.

use anyhow::{anyhow, Context, Result};
use reqwest::Client;
use serde_json::{json, Value};
use tracing::{debug, trace, warn};

use crate::config::ModelConfig;
use crate::models::chat::{ApiResponse, ChatMessage};
use crate::models::tools::ToolDefinition;

/// Builds the request body. `tool_choice` is only sent alongside a non-empty tool list.
pub fn build_payload(
    model: &ModelConfig,
    messages: &[ChatMessage],
    tools: Option<&[ToolDefinition]>,
) -> Result<Value> {
    let mut payload = json!({
        "model": model.model_name,
        "messages": messages,
        "max_tokens": model.max_tokens,
        "temperature": model.temperature,
    });

    if let Some(tools) = tools.filter(|tools| !tools.is_empty()) {
        let tools_with_type: Vec<Value> = tools
            .iter()
            .map(|t| {
                json!({
                    "type": "function",
                    "function": t
                })
            })
            .collect();
        payload["tools"] = json!(tools_with_type);
        payload["tool_choice"] = json!("auto");
    }

    Ok(payload)
}

pub fn parse_response(response_body: &str) -> Result<ApiResponse> {
    let response: ApiResponse = serde_json::from_str(response_body)
        .with_context(|| format!("Failed to parse chat completion response: {}", response_body))?;
    if response.choices.is_empty() {
        return Err(anyhow!(
            "Chat completion response contained no choices: {}",
            response_body
        ));
    }
    Ok(response)
}

/// Sends one chat completion request and returns the parsed response.
pub async fn call_chat_completion_api(
    http_client: &Client,
    endpoint: &str,
    api_key: &str,
    model: &ModelConfig,
    messages: &[ChatMessage],
    tools: Option<&[ToolDefinition]>,
) -> Result<ApiResponse> {
    let payload = build_payload(model, messages, tools)?;

    debug!(
        endpoint = %endpoint,
        model = %model.model_name,
        num_messages = messages.len(),
        with_tools = payload.get("tools").is_some(),
        "Sending chat completion request."
    );
    trace!(payload = %serde_json::to_string_pretty(&payload).unwrap_or_else(|e| format!("Serialization error: {}", e)), "Request body");

    let mut request = http_client
        .post(endpoint)
        .header("Content-Type", "application/json");
    if api_key.is_empty() {
        warn!("API key is empty. The API call will likely fail.");
    } else {
        request = request.bearer_auth(api_key);
    }

    let response = request
        .json(&payload)
        .send()
        .await
        .with_context(|| format!("Failed to send request to {}", endpoint))?;

    let status = response.status();
    let response_text = response
        .text()
        .await
        .context("Failed to read chat completion response body")?;
    trace!(status = %status, body = %response_text, "Response body");

    if !status.is_success() {
        return Err(anyhow!(
            "API call failed with status {}: {}",
            status,
            response_text
        ));
    }

    parse_response(&response_text)
}
