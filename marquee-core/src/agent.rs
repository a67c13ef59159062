// marquee-core/src/agent.rs
use crate::config::ChatConfig;
use crate::errors::AgentError;
use crate::models::chat::ChatMessage;
use crate::models::tools::{ToolCall, ToolDefinition};
use crate::providers::ChatProvider;
use crate::session::Session;
use crate::tools::CatalogTool;
use serde_json::Value as JsonValue;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, error, info, trace, warn};

/// Details the execution of a single tool call within a [`TurnOutcome`].
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct ToolExecutionResult {
    /// The id the model attached to the call.
    pub tool_call_id: String,
    pub tool_name: String,
    /// The arguments as sent by the model, or the raw string if it was not valid JSON.
    pub input: JsonValue,
    /// The JSON text returned to the model.
    pub output: String,
}

/// Anomalies that did not end the turn but should be shown to the user.
#[derive(Debug, Clone, PartialEq)]
pub enum TurnWarning {
    /// The model asked for a tool that is not in the catalog. Tool calling stopped
    /// for the turn and the final answer was requested anyway.
    UnknownTool { tool_call_id: String, name: String },
}

impl std::fmt::Display for TurnWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TurnWarning::UnknownTool { tool_call_id, name } => write!(
                f,
                "Model requested unknown tool '{}' (call {}); answering without it",
                name, tool_call_id
            ),
        }
    }
}

/// The result of a successful [`Orchestrator::run_turn`].
#[derive(Debug, Clone, Default)]
pub struct TurnOutcome {
    pub answer: String,
    pub tool_results: Vec<ToolExecutionResult>,
    pub warnings: Vec<TurnWarning>,
}

/// Runs conversation turns against a [`ChatProvider`], resolving tool calls
/// through the movie catalog.
pub struct Orchestrator {
    config: ChatConfig,
    provider: Arc<dyn ChatProvider>,
    tool_definitions: Vec<ToolDefinition>,
}

impl Orchestrator {
    pub fn new(config: ChatConfig, provider: Arc<dyn ChatProvider>) -> Self {
        Self {
            config,
            provider,
            tool_definitions: CatalogTool::definitions(),
        }
    }

    pub fn config(&self) -> &ChatConfig {
        &self.config
    }

    /// Runs a turn and always produces text: failures become an error message.
    /// The session keeps whatever tool rounds were recorded before a failure.
    pub async fn handle_turn(
        &self,
        session: &mut Session,
        user_text: &str,
        system_text: Option<&str>,
    ) -> String {
        match self.run_turn(session, user_text, system_text).await {
            Ok(outcome) => outcome.answer,
            Err(e) => {
                error!(error = %e, "Conversation turn failed.");
                turn_error_message(&e)
            }
        }
    }

    /// Sends `user_text` with the session history, executes requested tools until
    /// the model stops asking for them, then requests a plain final answer.
    pub async fn run_turn(
        &self,
        session: &mut Session,
        user_text: &str,
        system_text: Option<&str>,
    ) -> Result<TurnOutcome, AgentError> {
        info!(
            history_len = session.len(),
            provider = %self.provider.name(),
            "Starting conversation turn."
        );

        let mut messages = Vec::with_capacity(session.len() + 2);
        if let Some(system) = system_text {
            messages.push(ChatMessage::system(system));
        }
        messages.extend(session.history().iter().cloned());
        messages.push(ChatMessage::user(user_text));

        let max_rounds = self.config.model.max_tool_rounds;
        let mut outcome = TurnOutcome::default();
        let mut rounds = 0;
        let mut reply = self.complete(&messages, Some(&self.tool_definitions)).await?;

        loop {
            let tool_calls = reply.requested_tool_calls();
            if tool_calls.is_empty() {
                debug!(rounds, "Model requested no further tool calls.");
                break;
            }
            let resolved = match resolve_tools(tool_calls) {
                Ok(resolved) => resolved,
                Err(unknown) => {
                    warn!(tool_call_id = %unknown.id, tool_name = %unknown.function.name, "Model requested an unknown tool; requesting final answer.");
                    outcome.warnings.push(TurnWarning::UnknownTool {
                        tool_call_id: unknown.id.clone(),
                        name: unknown.function.name.clone(),
                    });
                    break;
                }
            };
            if rounds >= max_rounds {
                error!(limit = max_rounds, "Model exceeded the tool round limit.");
                return Err(AgentError::ToolRoundLimit(max_rounds));
            }
            if let Some(id) = repeated_call_id(tool_calls, &messages) {
                error!(tool_call_id = %id, "Model reused a tool call id.");
                return Err(AgentError::DuplicateToolCallId(id.to_string()));
            }
            rounds += 1;
            info!(
                round = rounds,
                count = tool_calls.len(),
                "Model requested {} tool call(s).",
                tool_calls.len()
            );

            let mut round_messages = Vec::with_capacity(resolved.len() + 1);
            round_messages.push(ChatMessage::assistant_tool_calls(tool_calls.to_vec()));
            for (call, tool) in resolved {
                let output = tool.execute(&call.function.arguments).map_err(|source| {
                    error!(tool_call_id = %call.id, tool_name = tool.name(), error = %source, "Tool execution failed.");
                    AgentError::Tool {
                        tool: tool.name().to_string(),
                        source,
                    }
                })?;
                debug!(tool_call_id = %call.id, tool_name = tool.name(), "Tool executed successfully.");

                outcome.tool_results.push(ToolExecutionResult {
                    tool_call_id: call.id.clone(),
                    tool_name: tool.name().to_string(),
                    input: serde_json::from_str(&call.function.arguments)
                        .unwrap_or_else(|_| JsonValue::String(call.function.arguments.clone())),
                    output: output.clone(),
                });
                round_messages.push(ChatMessage::tool_result(&call.id, tool.name(), output));
            }

            messages.extend(round_messages.iter().cloned());
            session.record_all(round_messages);

            reply = self.complete(&messages, Some(&self.tool_definitions)).await?;
        }

        // The final request goes out without tools so the model has to answer in text.
        let final_reply = self.complete(&messages, None).await?;
        let answer = final_reply
            .content
            .as_deref()
            .map(str::trim)
            .filter(|answer| !answer.is_empty())
            .ok_or(AgentError::EmptyResponse)?
            .to_string();

        session.record(ChatMessage::user(user_text));
        session.record(ChatMessage::assistant(answer.clone()));

        info!(
            rounds,
            tools_executed = outcome.tool_results.len(),
            "Conversation turn finished."
        );
        outcome.answer = answer;
        Ok(outcome)
    }

    async fn complete(
        &self,
        messages: &[ChatMessage],
        tools: Option<&[ToolDefinition]>,
    ) -> Result<ChatMessage, AgentError> {
        debug!(
            num_messages = messages.len(),
            with_tools = tools.is_some(),
            "Sending request to AI model."
        );
        let response = self
            .provider
            .get_completion(messages, tools)
            .await
            .map_err(AgentError::Api)?;
        trace!(response = ?response, "Full API response");

        let choice = response
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| AgentError::api(anyhow::anyhow!("API response contained no choices")))?;
        Ok(choice.message)
    }
}

/// The text shown in place of an answer when a turn fails.
pub fn turn_error_message(error: &AgentError) -> String {
    format!("Error making API call: {}", error)
}

/// Maps every call to a catalog tool, or returns the first call whose name is unknown.
fn resolve_tools(tool_calls: &[ToolCall]) -> Result<Vec<(&ToolCall, CatalogTool)>, &ToolCall> {
    tool_calls
        .iter()
        .map(|call| {
            CatalogTool::from_name(&call.function.name)
                .map(|tool| (call, tool))
                .ok_or(call)
        })
        .collect()
}

/// The first id in `tool_calls` that repeats another id in the same reply or one
/// already present in `messages`.
fn repeated_call_id<'a>(tool_calls: &'a [ToolCall], messages: &[ChatMessage]) -> Option<&'a str> {
    let mut seen: HashSet<&str> = messages
        .iter()
        .flat_map(|message| message.requested_tool_calls())
        .map(|call| call.id.as_str())
        .chain(messages.iter().filter_map(|message| message.tool_call_id.as_deref()))
        .collect();
    tool_calls
        .iter()
        .map(|call| call.id.as_str())
        .find(|id| !seen.insert(*id))
}
