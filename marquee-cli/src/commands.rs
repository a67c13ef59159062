// marquee-cli/src/commands.rs

/// What a line typed at the prompt asks for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplCommand {
    Quit,
    History,
    Clear,
    Empty,
    Message(String),
}

impl ReplCommand {
    pub fn parse(line: &str) -> Self {
        let trimmed = line.trim();
        match trimmed.to_lowercase().as_str() {
            "quit" | "exit" | "bye" => ReplCommand::Quit,
            "history" => ReplCommand::History,
            "clear" => ReplCommand::Clear,
            "" => ReplCommand::Empty,
            _ => ReplCommand::Message(trimmed.to_string()),
        }
    }
}
