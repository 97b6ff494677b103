use crate::constants::{limits, storage};
use crate::context::persistence::{self, KeyValueStore};
use crate::error::DataSightError;
use crate::llm::{ContentPart, Message};

/// Ordered message log sent to the model.
///
/// Holds at most one system message, always at index 0. Truncation is an
/// explicit step (`trim`) so callers decide when the cap applies.
#[derive(Debug, Clone)]
pub struct ConversationState {
    messages: Vec<Message>,
    max_messages: usize,
    keep_recent: usize,
}

impl ConversationState {
    pub fn new() -> Self {
        Self {
            messages: Vec::new(),
            max_messages: limits::MAX_CONVERSATION_MESSAGES,
            keep_recent: limits::KEEP_RECENT_MESSAGES,
        }
    }

    /// `max_messages` is the length that triggers a trim; `keep_recent` is how
    /// many non-system messages survive it.
    pub fn with_limits(mut self, max_messages: usize, keep_recent: usize) -> Self {
        self.max_messages = max_messages;
        self.keep_recent = keep_recent.min(max_messages);
        self
    }

    /// Restore from durable storage. Missing or corrupt data yields an empty state.
    pub fn load(store: &dyn KeyValueStore) -> Self {
        let mut state = Self::new();
        if let Some(saved) = persistence::load_json::<Vec<Message>>(store, storage::CONVERSATION_KEY) {
            for message in saved {
                state.push(message);
            }
        }
        state
    }

    pub fn persist(&self, store: &dyn KeyValueStore) -> Result<(), DataSightError> {
        persistence::save_json(store, storage::CONVERSATION_KEY, &self.messages)
    }

    /// Seed an empty conversation with its system message. Returns false
    /// (and does nothing) if the conversation already has messages.
    pub fn seed_system(&mut self, prompt: impl Into<String>) -> bool {
        if !self.messages.is_empty() {
            return false;
        }
        self.messages.push(Message::system(prompt));
        true
    }

    /// Append a message. System messages are only accepted as the first entry.
    pub fn push(&mut self, message: Message) -> bool {
        if message.is_system() && !self.messages.is_empty() {
            tracing::warn!("dropping system message that would not be first in conversation");
            return false;
        }
        self.messages.push(message);
        true
    }

    pub fn push_user(&mut self, content: impl Into<String>) {
        self.messages.push(Message::user(content));
    }

    pub fn push_user_parts(&mut self, parts: Vec<ContentPart>) {
        self.messages.push(Message::user_with_parts(parts));
    }

    pub fn push_assistant(&mut self, content: impl Into<String>) {
        self.messages.push(Message::assistant(content));
    }

    /// Apply the length cap: once over `max_messages`, keep the system
    /// message (if any) plus the `keep_recent` most recent messages.
    /// Returns how many messages were dropped.
    pub fn trim(&mut self) -> usize {
        if self.messages.len() <= self.max_messages {
            return 0;
        }

        let before = self.messages.len();
        let system = self.messages.first().filter(|m| m.is_system()).cloned();
        let tail_start = before.saturating_sub(self.keep_recent);
        let tail_start = if system.is_some() { tail_start.max(1) } else { tail_start };

        let mut kept: Vec<Message> = Vec::with_capacity(self.keep_recent + 1);
        kept.extend(system);
        kept.extend(self.messages.drain(tail_start..));
        self.messages = kept;

        let dropped = before - self.messages.len();
        tracing::debug!(dropped, remaining = self.messages.len(), "trimmed conversation");
        dropped
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn system_message(&self) -> Option<&Message> {
        self.messages.first().filter(|m| m.is_system())
    }

    /// Conversation messages without the system message.
    pub fn non_system(&self) -> Vec<Message> {
        self.messages.iter().filter(|m| !m.is_system()).cloned().collect()
    }

    pub fn last_message(&self) -> Option<&Message> {
        self.messages.last()
    }

    pub fn clear(&mut self) {
        self.messages.clear();
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}

impl Default for ConversationState {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::persistence::InMemoryStore;
    use crate::llm::Role;

    fn seeded_with_pairs(pairs: usize) -> ConversationState {
        let mut state = ConversationState::new();
        state.seed_system("persona");
        for i in 0..pairs {
            state.push_user(format!("q{i}"));
            state.push_assistant(format!("a{i}"));
        }
        state
    }

    #[test]
    fn test_trim_keeps_system_and_last_ten() {
        let mut state = seeded_with_pairs(11);
        state.push_user("x");
        assert_eq!(state.len(), 24);

        state.trim();
        assert_eq!(state.len(), 11);
        assert_eq!(state.messages()[0].role, Role::System);
        assert_eq!(state.last_message().unwrap().text(), Some("x"));
        assert_eq!(state.messages()[1].text(), Some("a6"));
    }

    #[test]
    fn test_trim_is_noop_at_cap() {
        let mut state = seeded_with_pairs(5);
        state.push_user("x");
        assert_eq!(state.len(), 12);
        assert_eq!(state.trim(), 0);
        assert_eq!(state.len(), 12);
    }

    #[test]
    fn test_trim_without_system_keeps_recent_only() {
        let mut state = ConversationState::new();
        for i in 0..13 {
            state.push_user(format!("m{i}"));
        }
        state.trim();
        assert_eq!(state.len(), 10);
        assert_eq!(state.messages()[0].text(), Some("m3"));
        assert!(state.system_message().is_none());
    }

    #[test]
    fn test_system_message_only_accepted_first() {
        let mut state = ConversationState::new();
        assert!(state.push(Message::system("one")));
        assert!(!state.push(Message::system("two")));
        assert!(!state.seed_system("three"));
        assert_eq!(state.len(), 1);
        assert_eq!(state.non_system().len(), 0);
    }

    #[test]
    fn test_load_drops_misplaced_system_messages() {
        let store = InMemoryStore::new();
        let saved = vec![
            Message::system("persona"),
            Message::user("q"),
            Message::system("stray"),
            Message::assistant("a"),
        ];
        persistence::save_json(&store, storage::CONVERSATION_KEY, &saved).unwrap();

        let state = ConversationState::load(&store);
        assert_eq!(state.len(), 3);
        assert_eq!(state.system_message().unwrap().text(), Some("persona"));
    }

    #[test]
    fn test_persist_round_trips_multipart_content() {
        let store = InMemoryStore::new();
        let mut state = ConversationState::new();
        state.seed_system("persona");
        state.push_user_parts(vec![
            ContentPart::text("analyze"),
            ContentPart::image("data:text/csv;base64,YQ=="),
        ]);
        state.persist(&store).unwrap();

        let restored = ConversationState::load(&store);
        assert_eq!(restored.messages(), state.messages());
    }
}
