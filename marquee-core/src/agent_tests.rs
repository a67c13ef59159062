// marquee-core/src/agent_tests.rs
#![cfg(test)]

use super::*;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use httpmock::prelude::*;
use serde_json::{json, Value};

// --- Scripted Provider ---

#[derive(Debug, Clone)]
struct RecordedRequest {
    messages: Vec<ChatMessage>,
    with_tools: bool,
}

struct ScriptedProvider {
    replies: Mutex<VecDeque<Result<ApiResponse, String>>>,
    requests: Mutex<Vec<RecordedRequest>>,
}

impl ScriptedProvider {
    fn new(replies: Vec<Result<ApiResponse, String>>) -> Arc<Self> {
        Arc::new(Self {
            replies: Mutex::new(replies.into()),
            requests: Mutex::new(Vec::new()),
        })
    }

    fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl ChatProvider for ScriptedProvider {
    async fn get_completion(
        &self,
        messages: &[ChatMessage],
        tools: Option<&[ToolDefinition]>,
    ) -> Result<ApiResponse> {
        self.requests.lock().unwrap().push(RecordedRequest {
            messages: messages.to_vec(),
            with_tools: tools.is_some(),
        });
        match self.replies.lock().unwrap().pop_front() {
            Some(Ok(reply)) => Ok(reply),
            Some(Err(e)) => Err(anyhow!("{}", e)),
            None => Err(anyhow!("ScriptedProvider: no reply scripted")),
        }
    }

    fn name(&self) -> &str {
        "scripted"
    }
}

// --- Test Helpers ---

fn call(id: &str, name: &str, arguments: Value) -> ToolCall {
    ToolCall {
        id: id.to_string(),
        call_type: "function".to_string(),
        function: ToolFunction {
            name: name.to_string(),
            arguments: arguments.to_string(),
        },
    }
}

fn respond_with(message: ChatMessage) -> ApiResponse {
    ApiResponse {
        id: "resp".to_string(),
        choices: vec![Choice {
            index: 0,
            message,
            finish_reason: None,
        }],
    }
}

fn tool_reply(calls: Vec<ToolCall>) -> Result<ApiResponse, String> {
    Ok(respond_with(ChatMessage::assistant_tool_calls(calls)))
}

fn text_reply(text: &str) -> Result<ApiResponse, String> {
    Ok(respond_with(ChatMessage::assistant(text)))
}

fn orchestrator(provider: Arc<ScriptedProvider>) -> Orchestrator {
    Orchestrator::new(ChatConfig::default(), provider)
}

fn roles(messages: &[ChatMessage]) -> Vec<Role> {
    messages.iter().map(|m| m.role).collect()
}

// --- Orchestrator Tests ---

#[tokio::test]
async fn test_recommendation_turn_runs_three_tool_rounds() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
    let provider = ScriptedProvider::new(vec![
        tool_reply(vec![call("call_1", "get_user_past_reviews", json!({"user_id": "user1"}))]),
        tool_reply(vec![call("call_2", "get_genres", json!({"movie_ids": ["101", "103"]}))]),
        tool_reply(vec![call(
            "call_3",
            "get_movies",
            json!({"genres": ["Sci-Fi", "Adventure", "Thriller"], "watched_movie_ids": ["101", "102", "103", "104"]}),
        )]),
        text_reply("Try Interstellar."),
        text_reply("  You should watch Interstellar and The Martian.  "),
    ]);
    let orchestrator = orchestrator(provider.clone());
    let mut session = Session::new();

    let outcome = orchestrator
        .run_turn(&mut session, "My id is user1", Some("Recommend movies."))
        .await
        .unwrap();

    assert_eq!(outcome.answer, "You should watch Interstellar and The Martian.");
    assert!(outcome.warnings.is_empty());
    let executed: Vec<&str> = outcome.tool_results.iter().map(|r| r.tool_name.as_str()).collect();
    assert_eq!(executed, vec!["get_user_past_reviews", "get_genres", "get_movies"]);
    assert_eq!(outcome.tool_results[1].input, json!({"movie_ids": ["101", "103"]}));
    assert_eq!(outcome.tool_results[1].output, r#"["Adventure","Sci-Fi","Thriller"]"#);
    let titles: Vec<String> = serde_json::from_str(&outcome.tool_results[2].output).unwrap();
    assert_eq!(&titles[..4], &["Interstellar", "The Martian", "Avatar", "Guardians of the Galaxy"]);
    assert_eq!(&titles[4..], &["Tenet", "Edge of Tomorrow"]);

    let requests = provider.requests();
    assert_eq!(requests.len(), 5);
    assert!(requests[..4].iter().all(|r| r.with_tools));
    assert!(!requests[4].with_tools, "final request must not carry tools");
    assert_eq!(
        roles(&requests[0].messages),
        vec![Role::System, Role::User]
    );
    assert_eq!(
        roles(&requests[4].messages),
        vec![
            Role::System,
            Role::User,
            Role::Assistant,
            Role::Tool,
            Role::Assistant,
            Role::Tool,
            Role::Assistant,
            Role::Tool
        ]
    );

    let history = session.history();
    assert_eq!(
        roles(history),
        vec![
            Role::Assistant,
            Role::Tool,
            Role::Assistant,
            Role::Tool,
            Role::Assistant,
            Role::Tool,
            Role::User,
            Role::Assistant
        ]
    );
    assert_eq!(history[1].tool_call_id.as_deref(), Some("call_1"));
    assert_eq!(history[1].name.as_deref(), Some("get_user_past_reviews"));
    assert_eq!(history[3].tool_call_id.as_deref(), Some("call_2"));
    assert_eq!(history[5].tool_call_id.as_deref(), Some("call_3"));
    assert_eq!(history[6].content.as_deref(), Some("My id is user1"));
    assert_eq!(
        history[7].content.as_deref(),
        Some("You should watch Interstellar and The Martian.")
    );
}

#[tokio::test]
async fn test_every_tool_message_answers_a_prior_request() {
    let provider = ScriptedProvider::new(vec![
        tool_reply(vec![
            call("call_a", "get_user_past_reviews", json!({"user_id": "user2"})),
            call("call_b", "get_genres", json!({"movie_ids": [201, 202]})),
        ]),
        text_reply("done"),
        text_reply("Here you go."),
    ]);
    let orchestrator = orchestrator(provider.clone());
    let mut session = Session::new();

    let outcome = orchestrator.run_turn(&mut session, "go", None).await.unwrap();
    assert_eq!(outcome.tool_results.len(), 2);

    let history = session.history();
    let mut seen_requests = Vec::new();
    let mut answered = Vec::new();
    for message in history {
        for requested in message.requested_tool_calls() {
            seen_requests.push(requested.id.clone());
        }
        if message.role == Role::Tool {
            let id = message.tool_call_id.clone().unwrap();
            assert!(seen_requests.contains(&id), "tool message {} has no prior request", id);
            assert!(!answered.contains(&id), "tool message {} answered twice", id);
            answered.push(id);
        }
    }
    assert_eq!(answered, vec!["call_a", "call_b"]);
    assert_eq!(
        history[2].content.as_deref(),
        Some(r#"["Adventure","Drama","Romance","Sci-Fi"]"#)
    );

    // Without a system prompt the first request starts with the user message.
    assert_eq!(roles(&provider.requests()[0].messages), vec![Role::User]);
}

#[tokio::test]
async fn test_prior_history_is_resent_unchanged() {
    let provider = ScriptedProvider::new(vec![
        tool_reply(vec![call("call_1", "get_user_past_reviews", json!({"user_id": "user1"}))]),
        text_reply("ok"),
        text_reply("First answer."),
        text_reply("no tools"),
        text_reply("Second answer."),
    ]);
    let orchestrator = orchestrator(provider.clone());
    let mut session = Session::new();

    orchestrator.run_turn(&mut session, "first", Some("sys")).await.unwrap();
    let before = session.history().to_vec();
    orchestrator.run_turn(&mut session, "second", Some("sys")).await.unwrap();

    let requests = provider.requests();
    let second_turn = &requests[3].messages;
    assert_eq!(second_turn[0], ChatMessage::system("sys"));
    assert_eq!(&second_turn[1..=before.len()], before.as_slice());
    assert_eq!(second_turn.last(), Some(&ChatMessage::user("second")));
    assert_eq!(&session.history()[..before.len()], before.as_slice());
    assert_eq!(session.len(), before.len() + 2);
}

#[tokio::test]
async fn test_unknown_tool_falls_through_with_warning() {
    let provider = ScriptedProvider::new(vec![
        tool_reply(vec![
            call("call_1", "get_genres", json!({"movie_ids": ["101"]})),
            call("call_2", "get_weather", json!({"city": "Oslo"})),
        ]),
        text_reply("Sorry, I can only help with movies."),
    ]);
    let orchestrator = orchestrator(provider.clone());
    let mut session = Session::new();

    let outcome = orchestrator.run_turn(&mut session, "weather?", None).await.unwrap();

    assert_eq!(outcome.answer, "Sorry, I can only help with movies.");
    assert_eq!(
        outcome.warnings,
        vec![TurnWarning::UnknownTool {
            tool_call_id: "call_2".to_string(),
            name: "get_weather".to_string()
        }]
    );
    assert!(outcome.tool_results.is_empty());
    assert!(outcome.warnings[0].to_string().contains("get_weather"));

    let requests = provider.requests();
    assert_eq!(requests.len(), 2);
    assert!(!requests[1].with_tools);
    assert_eq!(roles(&requests[1].messages), vec![Role::User]);
    assert_eq!(roles(session.history()), vec![Role::User, Role::Assistant]);
}

#[tokio::test]
async fn test_tool_round_limit_is_enforced() {
    let provider = ScriptedProvider::new(
        (1..=3)
            .map(|round| {
                tool_reply(vec![call(
                    &format!("call_{}", round),
                    "get_genres",
                    json!({"movie_ids": ["101"]}),
                )])
            })
            .collect(),
    );
    let mut config = ChatConfig::default();
    config.model.max_tool_rounds = 2;
    let orchestrator = Orchestrator::new(config, provider.clone());
    let mut session = Session::new();

    let err = orchestrator.run_turn(&mut session, "loop", None).await.unwrap_err();
    assert!(matches!(err, AgentError::ToolRoundLimit(2)), "unexpected error: {:?}", err);
    assert_eq!(provider.requests().len(), 3);
    // Completed rounds stay in the history.
    assert_eq!(
        roles(session.history()),
        vec![Role::Assistant, Role::Tool, Role::Assistant, Role::Tool]
    );
}

#[tokio::test]
async fn test_unknown_tool_after_last_round_still_falls_through() {
    let provider = ScriptedProvider::new(vec![
        tool_reply(vec![call("call_1", "get_genres", json!({"movie_ids": ["101"]}))]),
        tool_reply(vec![call("call_2", "get_weather", json!({"city": "Oslo"}))]),
        text_reply("Sci-Fi and Thriller."),
    ]);
    let mut config = ChatConfig::default();
    config.model.max_tool_rounds = 1;
    let orchestrator = Orchestrator::new(config, provider.clone());
    let mut session = Session::new();

    let outcome = orchestrator.run_turn(&mut session, "genres?", None).await.unwrap();

    assert_eq!(outcome.answer, "Sci-Fi and Thriller.");
    assert_eq!(
        outcome.warnings,
        vec![TurnWarning::UnknownTool {
            tool_call_id: "call_2".to_string(),
            name: "get_weather".to_string()
        }]
    );
    assert_eq!(outcome.tool_results.len(), 1);
    assert!(!provider.requests()[2].with_tools);
    assert_eq!(
        roles(session.history()),
        vec![Role::Assistant, Role::Tool, Role::User, Role::Assistant]
    );
}

#[tokio::test]
async fn test_repeated_call_id_in_one_reply_is_rejected() {
    let provider = ScriptedProvider::new(vec![tool_reply(vec![
        call("dup", "get_genres", json!({"movie_ids": ["101"]})),
        call("dup", "get_genres", json!({"movie_ids": ["102"]})),
    ])]);
    let orchestrator = orchestrator(provider.clone());
    let mut session = Session::new();

    let err = orchestrator.run_turn(&mut session, "hi", None).await.unwrap_err();
    match err {
        AgentError::DuplicateToolCallId(id) => assert_eq!(id, "dup"),
        other => panic!("unexpected error: {:?}", other),
    }
    assert!(session.is_empty());
    assert_eq!(provider.requests().len(), 1);
}

#[tokio::test]
async fn test_call_id_from_an_earlier_turn_is_rejected() {
    let provider = ScriptedProvider::new(vec![
        tool_reply(vec![call("call_1", "get_genres", json!({"movie_ids": ["101"]}))]),
        text_reply("ok"),
        text_reply("Sci-Fi and Thriller."),
        tool_reply(vec![call("call_1", "get_genres", json!({"movie_ids": ["104"]}))]),
    ]);
    let orchestrator = orchestrator(provider);
    let mut session = Session::new();

    orchestrator.run_turn(&mut session, "first", None).await.unwrap();
    let before = session.history().to_vec();

    let answer = orchestrator.handle_turn(&mut session, "second", None).await;
    assert!(answer.starts_with("Error making API call:"), "got: {}", answer);
    assert!(answer.contains("call_1"), "got: {}", answer);
    assert_eq!(session.history(), before.as_slice());

    let ids: Vec<&str> = session
        .history()
        .iter()
        .filter_map(|m| m.tool_call_id.as_deref())
        .collect();
    assert_eq!(ids, vec!["call_1"]);
}

#[tokio::test]
async fn test_failing_call_discards_the_whole_round() {
    let provider = ScriptedProvider::new(vec![
        tool_reply(vec![call("call_1", "get_genres", json!({"movie_ids": ["101"]}))]),
        tool_reply(vec![
            call("call_2", "get_user_past_reviews", json!({"user_id": "user1"})),
            call("call_3", "get_user_past_reviews", json!({"user_id": "user3"})),
        ]),
    ]);
    let orchestrator = orchestrator(provider);
    let mut session = Session::new();

    let err = orchestrator.run_turn(&mut session, "hi", None).await.unwrap_err();
    match err {
        AgentError::Tool { tool, source } => {
            assert_eq!(tool, "get_user_past_reviews");
            assert!(matches!(source, ToolError::Catalog(CatalogError::NotFound { .. })));
        }
        other => panic!("unexpected error: {:?}", other),
    }

    // Only the first, fully answered round was recorded.
    assert_eq!(roles(session.history()), vec![Role::Assistant, Role::Tool]);
    let requested: Vec<&str> = session
        .history()
        .iter()
        .flat_map(|m| m.requested_tool_calls())
        .map(|c| c.id.as_str())
        .collect();
    assert_eq!(requested, vec!["call_1"]);
    assert!(session
        .history()
        .iter()
        .all(|m| m.tool_call_id.as_deref() != Some("call_2")));
}

#[tokio::test]
async fn test_unknown_user_becomes_error_text() {
    let provider = ScriptedProvider::new(vec![tool_reply(vec![call(
        "call_1",
        "get_user_past_reviews",
        json!({"user_id": "user3"}),
    )])]);
    let orchestrator = orchestrator(provider.clone());
    let mut session = Session::new();

    let answer = orchestrator.handle_turn(&mut session, "I am user3", None).await;
    assert!(answer.starts_with("Error making API call:"), "got: {}", answer);
    assert!(answer.contains("user3"), "got: {}", answer);
    assert!(session.is_empty());
    assert_eq!(provider.requests().len(), 1);
}

#[tokio::test]
async fn test_api_failure_leaves_history_unchanged() {
    let provider = ScriptedProvider::new(vec![
        text_reply("no tools"),
        text_reply("Hello!"),
        Err("connection reset".to_string()),
    ]);
    let orchestrator = orchestrator(provider);
    let mut session = Session::new();

    assert_eq!(orchestrator.handle_turn(&mut session, "hi", None).await, "Hello!");
    let before = session.history().to_vec();

    let answer = orchestrator.handle_turn(&mut session, "again", None).await;
    assert!(answer.starts_with("Error making API call:"));
    assert!(answer.contains("connection reset"), "got: {}", answer);
    assert_eq!(session.history(), before.as_slice());
}

#[test]
fn test_turn_error_message_formats_the_error() {
    assert_eq!(
        turn_error_message(&AgentError::ToolRoundLimit(8)),
        "Error making API call: Model requested tools for more than 8 rounds"
    );
    assert_eq!(
        turn_error_message(&AgentError::DuplicateToolCallId("dup".to_string())),
        "Error making API call: Model reused tool call id 'dup'"
    );
}

#[tokio::test]
async fn test_empty_final_answer_is_an_error() {
    let provider = ScriptedProvider::new(vec![text_reply("thinking"), text_reply("   ")]);
    let orchestrator = orchestrator(provider);
    let mut session = Session::new();

    let err = orchestrator.run_turn(&mut session, "hi", None).await.unwrap_err();
    assert!(matches!(err, AgentError::EmptyResponse));
    assert!(session.is_empty());
}

#[tokio::test]
async fn test_invalid_tool_arguments_fail_the_turn() {
    let provider = ScriptedProvider::new(vec![tool_reply(vec![call(
        "call_1",
        "get_movies",
        json!({"genres": ["Crime"]}),
    )])]);
    let orchestrator = orchestrator(provider);
    let mut session = Session::new();

    let err = orchestrator.run_turn(&mut session, "hi", None).await.unwrap_err();
    match err {
        AgentError::Tool { tool, source } => {
            assert_eq!(tool, "get_movies");
            assert!(matches!(source, ToolError::InvalidArguments { .. }));
        }
        other => panic!("unexpected error: {:?}", other),
    }
}

// --- End-to-end over HTTP ---

const TEST_ENDPOINT_PATH: &str = "/test/completions";

#[tokio::test]
async fn test_turn_against_http_endpoint() -> Result<()> {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
    let server = MockServer::start_async().await;

    let mut config = ChatConfig::default();
    config.model.endpoint = server.url(TEST_ENDPOINT_PATH);
    config.model.model_name = "test-model".to_string();
    let provider = Arc::new(OpenAiProvider::from_config(
        config.model.clone(),
        "test-api-key".to_string(),
    )?);
    let orchestrator = Orchestrator::new(config.clone(), provider);
    let tools: Vec<Value> = CatalogTool::definitions()
        .iter()
        .map(|t| json!({ "type": "function", "function": t }))
        .collect();

    let user_text = "Which genres do 101 and 103 have?";
    let tool_call_id = "call_123";
    let tool_args = json!({ "movie_ids": ["101", "103"] });
    let assistant_tool_call = json!({
        "role": "assistant",
        "tool_calls": [{
            "id": tool_call_id,
            "type": "function",
            "function": { "name": "get_genres", "arguments": tool_args.to_string() }
        }]
    });

    // --- Mock 1: initial request ---
    let expected_body_1 = json!({
        "model": "test-model",
        "messages": [{ "role": "user", "content": user_text }],
        "max_tokens": config.model.max_tokens,
        "temperature": config.model.temperature,
        "tools": tools,
        "tool_choice": "auto"
    });
    let api_mock_1 = server
        .mock_async(|when, then| {
            when.method(POST)
                .path(TEST_ENDPOINT_PATH)
                .json_body(expected_body_1);
            then.status(200).json_body(json!({
                "id": "resp1",
                "choices": [{ "index": 0, "message": assistant_tool_call.clone(), "finish_reason": "tool_calls" }]
            }));
        })
        .await;

    // --- Mock 2: request carrying the tool result ---
    let messages_2 = json!([
        { "role": "user", "content": user_text },
        assistant_tool_call,
        {
            "role": "tool",
            "content": "[\"Adventure\",\"Sci-Fi\",\"Thriller\"]",
            "tool_call_id": tool_call_id,
            "name": "get_genres"
        }
    ]);
    let expected_body_2 = json!({
        "model": "test-model",
        "messages": messages_2.clone(),
        "max_tokens": config.model.max_tokens,
        "temperature": config.model.temperature,
        "tools": tools,
        "tool_choice": "auto"
    });
    let api_mock_2 = server
        .mock_async(|when, then| {
            when.method(POST)
                .path(TEST_ENDPOINT_PATH)
                .json_body(expected_body_2);
            then.status(200).json_body(json!({
                "id": "resp2",
                "choices": [{ "index": 0, "message": { "role": "assistant", "content": "draft" }, "finish_reason": "stop" }]
            }));
        })
        .await;

    // --- Mock 3: final request without tools ---
    let expected_body_3 = json!({
        "model": "test-model",
        "messages": messages_2,
        "max_tokens": config.model.max_tokens,
        "temperature": config.model.temperature
    });
    let final_answer = "They are Adventure, Sci-Fi and Thriller.";
    let api_mock_3 = server
        .mock_async(|when, then| {
            when.method(POST)
                .path(TEST_ENDPOINT_PATH)
                .json_body(expected_body_3);
            then.status(200).json_body(json!({
                "id": "resp3",
                "choices": [{ "index": 0, "message": { "role": "assistant", "content": final_answer }, "finish_reason": "stop" }]
            }));
        })
        .await;

    let mut session = Session::new();
    let outcome = orchestrator.run_turn(&mut session, user_text, None).await?;

    api_mock_1.assert_hits_async(1).await;
    api_mock_2.assert_hits_async(1).await;
    api_mock_3.assert_hits_async(1).await;
    assert_eq!(outcome.answer, final_answer);
    assert_eq!(outcome.tool_results.len(), 1);
    assert_eq!(outcome.tool_results[0].tool_call_id, tool_call_id);
    assert_eq!(outcome.tool_results[0].input, tool_args);
    assert_eq!(session.len(), 4);

    Ok(())
}
