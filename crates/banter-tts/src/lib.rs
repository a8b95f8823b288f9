//! Speech synthesis abstraction for banter
//!
//! Provides the synthesizer capability boundary (trait, factory, registry),
//! the voice-selection cascade, and the output controller task that speaks
//! assistant replies.

use std::sync::atomic::{AtomicU64, Ordering};

pub mod controller;
pub mod engine;
pub mod error;
pub mod mock;
pub mod noop;
pub mod selection;
pub mod types;

pub use controller::{OutputCommand, OutputController, OutputUpdate, SPEECH_PROSODY};
pub use engine::{SpeechSynthesizer, SynthesisEvent, SynthesizerFactory, SynthesizerRegistry};
pub use error::{TtsError, TtsResult};
pub use selection::choose_voice;
pub use types::{Prosody, UtteranceRequest, VoiceGender, VoiceInfo};

/// Generates unique synthesis IDs
static SYNTHESIS_ID_COUNTER: AtomicU64 = AtomicU64::new(1);

/// Generate a unique synthesis ID
pub fn next_synthesis_id() -> u64 {
    SYNTHESIS_ID_COUNTER.fetch_add(1, Ordering::SeqCst)
}
