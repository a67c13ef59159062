// marquee-cli/src/history.rs

use marquee_core::{ChatMessage, Role};

fn role_icon(role: Role) -> &'static str {
    match role {
        Role::User => "👤",
        Role::Tool => "🔧",
        Role::System | Role::Assistant => "🤖",
    }
}

/// One numbered line of the `history` listing. `index` starts at 1.
pub fn format_history_entry(index: usize, message: &ChatMessage) -> String {
    let content = message.content.as_deref().unwrap_or("");
    let body = match message.role {
        Role::Tool => format!("[Tool Result: {}]", content),
        Role::Assistant if !message.requested_tool_calls().is_empty() => {
            let calls: Vec<String> = message
                .requested_tool_calls()
                .iter()
                .map(|call| {
                    format!(
                        "🔧 Called {} with args: {}",
                        call.function.name, call.function.arguments
                    )
                })
                .collect();
            if content.is_empty() {
                calls.join(" ")
            } else {
                format!("{} {}", content, calls.join(" "))
            }
        }
        _ => content.to_string(),
    };
    format!(
        "{}. {} {}: {}",
        index,
        role_icon(message.role),
        message.role.title(),
        body
    )
}

/// All lines of the `history` listing, or `None` when there is nothing to show.
pub fn format_history(history: &[ChatMessage]) -> Option<Vec<String>> {
    if history.is_empty() {
        return None;
    }
    Some(
        history
            .iter()
            .enumerate()
            .map(|(i, message)| format_history_entry(i + 1, message))
            .collect(),
    )
}
