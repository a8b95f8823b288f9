use tokio::sync::mpsc;
use tracing::warn;

use crate::message::{Message, Role};

/// Emitted when an assistant entry lands in the transcript. Voice output
/// subscribes to this so every assistant reply, fallbacks included, is
/// offered for speech.
#[derive(Debug, Clone, PartialEq)]
pub enum TranscriptEvent {
    AssistantAppended { id: u64, text: String },
}

/// Ordered conversation history plus the event feed for downstream
/// consumers. Appends go through here so display and speech never
/// disagree on what was said.
pub struct TranscriptStore {
    messages: Vec<Message>,
    events: mpsc::UnboundedSender<TranscriptEvent>,
}

impl TranscriptStore {
    pub fn new(events: mpsc::UnboundedSender<TranscriptEvent>) -> Self {
        Self {
            messages: Vec::new(),
            events,
        }
    }

    pub fn append_user(&mut self, text: impl Into<String>) -> u64 {
        let msg = Message::user(text);
        let id = msg.id;
        self.messages.push(msg);
        id
    }

    /// Cleans the raw reply and records it. The event carries the cleaned
    /// text so subscribers never see thinking spans.
    pub fn append_assistant(&mut self, raw: &str) -> u64 {
        let msg = Message::assistant(raw);
        let id = msg.id;
        let text = msg.text.clone();
        self.messages.push(msg);
        if self
            .events
            .send(TranscriptEvent::AssistantAppended { id, text })
            .is_err()
        {
            warn!(target: "chat", "transcript event receiver dropped");
        }
        id
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> (TranscriptStore, mpsc::UnboundedReceiver<TranscriptEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (TranscriptStore::new(tx), rx)
    }

    #[test]
    fn user_appends_do_not_emit_events() {
        let (mut store, mut rx) = store();
        store.append_user("hello");
        assert!(rx.try_recv().is_err());
        assert_eq!(store.messages().len(), 1);
    }

    #[test]
    fn assistant_appends_emit_cleaned_text() {
        let (mut store, mut rx) = store();
        let id = store.append_assistant("<think>hm</think>All set.");
        let event = rx.try_recv().unwrap();
        assert_eq!(
            event,
            TranscriptEvent::AssistantAppended {
                id,
                text: "All set.".to_string()
            }
        );
    }

    #[test]
    fn order_is_preserved() {
        let (mut store, _rx) = store();
        store.append_user("question");
        store.append_assistant("answer");
        let roles: Vec<Role> = store.messages().iter().map(|m| m.role).collect();
        assert_eq!(roles, vec![Role::User, Role::Assistant]);
    }

    #[test]
    fn append_survives_dropped_receiver() {
        let (tx, rx) = mpsc::unbounded_channel();
        drop(rx);
        let mut store = TranscriptStore::new(tx);
        store.append_assistant("still recorded");
        assert_eq!(store.messages().len(), 1);
    }
}
