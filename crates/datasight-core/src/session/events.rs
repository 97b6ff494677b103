use crate::llm::{Message, Role};
use crate::session::suggestions::Suggestion;
use crate::session::visualization::ChartSet;

/// One entry in the visible message log. System messages never appear here.
#[derive(Debug, Clone, PartialEq)]
pub struct DisplayMessage {
    pub role: Role,
    pub text: String,
}

impl DisplayMessage {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            text: text.into(),
        }
    }

    pub fn assistant(text: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            text: text.into(),
        }
    }

    /// Display form of a conversation message, if it has one.
    pub fn from_message(message: &Message) -> Option<Self> {
        if message.is_system() {
            return None;
        }
        let text = message.text().filter(|t| !t.is_empty())?;
        Some(Self {
            role: message.role,
            text: text.to_string(),
        })
    }
}

/// Events emitted by a session - the interface to whatever renders it.
#[derive(Debug, Clone)]
pub enum SessionEvent {
    /// A message was added to the visible log.
    Message(DisplayMessage),
    /// The loading indicator should be shown (`true`) or cleared (`false`).
    Loading(bool),
    Visualization(ChartSet),
    VisualizationUnavailable,
    Recommendations(String),
    Suggestions(Vec<Suggestion>),
}

/// What happened to one user request.
#[derive(Debug, Clone, PartialEq)]
pub enum TurnOutcome {
    /// Empty input; nothing was done.
    Ignored,
    /// The model replied; this is the appended assistant message.
    Answered(Message),
    /// The remote call failed; the error notice is already in the log.
    Failed(String),
}

impl TurnOutcome {
    pub fn reply_text(&self) -> Option<&str> {
        match self {
            TurnOutcome::Answered(message) => message.text(),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::ContentPart;

    #[test]
    fn test_display_skips_system_and_empty() {
        assert!(DisplayMessage::from_message(&Message::system("persona")).is_none());
        assert!(DisplayMessage::from_message(&Message::assistant("")).is_none());
        let images_only = Message::user_with_parts(vec![ContentPart::image("data:,")]);
        assert!(DisplayMessage::from_message(&images_only).is_none());
    }

    #[test]
    fn test_display_uses_first_text_part() {
        let msg = Message::user_with_parts(vec![
            ContentPart::text("analyze this"),
            ContentPart::image("data:,"),
        ]);
        assert_eq!(
            DisplayMessage::from_message(&msg),
            Some(DisplayMessage::user("analyze this"))
        );
    }
}
