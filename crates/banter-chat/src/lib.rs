//! Chat transcript, transport, and backend status for banter
//!
//! This crate owns the message model (including thinking-span cleaning),
//! the in-memory transcript with its append events, the HTTP chat
//! transport, and the periodic status poller.

use std::sync::atomic::{AtomicU64, Ordering};

pub mod message;
pub mod status;
pub mod thinking;
pub mod transcript;
pub mod transport;

pub use message::{Message, Role};
pub use status::{map_models_response, ModelsResponse, StatusPoller, StatusSnapshot};
pub use thinking::strip_thinking_spans;
pub use transcript::{TranscriptEvent, TranscriptStore};
pub use transport::{
    ChatError, ChatTransport, HttpChatTransport, APPLICATION_FALLBACK, NETWORK_FALLBACK,
};

/// Generates unique message IDs
static MESSAGE_ID_COUNTER: AtomicU64 = AtomicU64::new(1);

/// Generate a unique message ID
pub fn next_message_id() -> u64 {
    MESSAGE_ID_COUNTER.fetch_add(1, Ordering::SeqCst)
}
