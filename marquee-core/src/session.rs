// marquee-core/src/session.rs
use crate::models::chat::ChatMessage;

/// One conversation: the ordered, append-only log of messages exchanged so far.
///
/// Only the orchestrator appends to it; callers may read it or clear it.
#[derive(Debug, Clone, Default)]
pub struct Session {
    history: Vec<ChatMessage>,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn history(&self) -> &[ChatMessage] {
        &self.history
    }

    pub fn len(&self) -> usize {
        self.history.len()
    }

    pub fn is_empty(&self) -> bool {
        self.history.is_empty()
    }

    pub fn clear(&mut self) {
        self.history.clear();
    }

    pub(crate) fn record(&mut self, message: ChatMessage) {
        self.history.push(message);
    }

    pub(crate) fn record_all(&mut self, messages: impl IntoIterator<Item = ChatMessage>) {
        self.history.extend(messages);
    }
}
