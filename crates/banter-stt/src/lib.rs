//! Speech capture abstraction for banter
//!
//! This crate provides the recognizer capability boundary (trait, factory,
//! registry), the capture session event types, and the controller task that
//! turns raw recognizer events into transcript submissions.

use std::sync::atomic::{AtomicU64, Ordering};

pub mod controller;
pub mod plugins;
pub mod recognizer;
pub mod types;

pub use controller::{CaptureCommand, CaptureController, CaptureFailure, CaptureUpdate};
pub use recognizer::{
    RecognizerFactory, RecognizerInfo, RecognizerRegistry, SpeechRecognizer, SttError,
};
pub use types::{RecognitionConfig, RecognitionError, RecognitionEvent};

/// Generates unique capture session IDs
static SESSION_ID_COUNTER: AtomicU64 = AtomicU64::new(1);

/// Generate a unique capture session ID
pub fn next_session_id() -> u64 {
    SESSION_ID_COUNTER.fetch_add(1, Ordering::SeqCst)
}
