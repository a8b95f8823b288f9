use chrono::{DateTime, Utc};

use crate::thinking::strip_thinking_spans;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    User,
    Assistant,
}

/// One transcript entry. Created on send/receive, never mutated afterwards.
#[derive(Debug, Clone, PartialEq)]
pub struct Message {
    pub id: u64,
    pub role: Role,
    pub text: String,
    pub timestamp: DateTime<Utc>,
}

impl Message {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            id: crate::next_message_id(),
            role: Role::User,
            text: text.into(),
            timestamp: Utc::now(),
        }
    }

    /// Assistant entries are cleaned of thinking spans at creation, so the
    /// stored text is exactly what gets displayed.
    pub fn assistant(raw: &str) -> Self {
        Self {
            id: crate::next_message_id(),
            role: Role::Assistant,
            text: strip_thinking_spans(raw),
            timestamp: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_text_is_stored_verbatim() {
        let msg = Message::user("<think>looks like markup</think>");
        assert_eq!(msg.role, Role::User);
        assert_eq!(msg.text, "<think>looks like markup</think>");
    }

    #[test]
    fn assistant_text_is_cleaned() {
        let msg = Message::assistant("<think>reasoning</think>Sure thing.");
        assert_eq!(msg.role, Role::Assistant);
        assert_eq!(msg.text, "Sure thing.");
    }

    #[test]
    fn ids_are_unique_and_increasing() {
        let a = Message::user("one");
        let b = Message::user("two");
        assert!(b.id > a.id);
    }
}
