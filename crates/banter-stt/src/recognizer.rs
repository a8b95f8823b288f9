//! Recognizer capability boundary
//!
//! Any speech capture backend implements these traits. Engines push
//! `RecognitionEvent`s into the channel handed to the factory; the
//! capture controller consumes them.

use async_trait::async_trait;
use std::fmt::Debug;
use thiserror::Error;
use tokio::sync::mpsc;

use crate::types::{RecognitionConfig, RecognitionEvent};

/// Errors that can occur at the recognizer boundary
#[derive(Debug, Error)]
pub enum SttError {
    #[error("Recognizer not available: {reason}")]
    NotAvailable { reason: String },

    #[error("Initialization failed: {0}")]
    InitializationFailed(String),

    #[error("Failed to start capture: {0}")]
    StartFailed(String),

    #[error("Capture session failed: {0}")]
    SessionFailed(String),
}

/// Metadata about a recognizer engine
#[derive(Debug, Clone)]
pub struct RecognizerInfo {
    /// Unique identifier (e.g. "mock", "noop")
    pub id: String,

    /// Human-readable name
    pub name: String,

    /// Brief description of the engine
    pub description: String,

    /// Whether this engine is currently usable on the system
    pub is_available: bool,
}

/// The main trait capture backends implement.
///
/// A session runs from a successful `begin_capture` until the engine pushes
/// `Ended` for that session id. `stop_capture` is best-effort; the engine
/// may still deliver a final transcript before closing the session.
#[async_trait]
pub trait SpeechRecognizer: Send + Sync + Debug {
    /// Get engine metadata
    fn info(&self) -> RecognizerInfo;

    /// Open a capture session. Events carry the given session id.
    async fn begin_capture(
        &mut self,
        session_id: u64,
        config: &RecognitionConfig,
    ) -> Result<(), SttError>;

    /// Request the active session to close
    async fn stop_capture(&mut self) -> Result<(), SttError>;
}

/// Factory for creating recognizer engines
pub trait RecognizerFactory: Send + Sync {
    /// Create a new engine pushing events into the given channel
    fn create(
        &self,
        events: mpsc::UnboundedSender<RecognitionEvent>,
    ) -> Result<Box<dyn SpeechRecognizer>, SttError>;

    /// Get engine info without creating an instance
    fn recognizer_info(&self) -> RecognizerInfo;

    /// Check if the engine's requirements are met
    fn check_requirements(&self) -> Result<(), SttError>;
}

/// Registry for picking among the available recognizer engines
#[derive(Default)]
pub struct RecognizerRegistry {
    factories: Vec<Box<dyn RecognizerFactory>>,
    preferred_order: Vec<String>,
}

impl RecognizerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new engine factory
    pub fn register(&mut self, factory: Box<dyn RecognizerFactory>) {
        self.factories.push(factory);
    }

    /// Set the preferred order of engines to try
    pub fn set_preferred_order(&mut self, order: Vec<String>) {
        self.preferred_order = order;
    }

    /// Get all registered engines with availability resolved
    pub fn available_recognizers(&self) -> Vec<RecognizerInfo> {
        self.factories
            .iter()
            .map(|f| {
                let mut info = f.recognizer_info();
                info.is_available = f.check_requirements().is_ok();
                info
            })
            .collect()
    }

    /// Create an engine by ID
    pub fn create_recognizer(
        &self,
        id: &str,
        events: mpsc::UnboundedSender<RecognitionEvent>,
    ) -> Result<Box<dyn SpeechRecognizer>, SttError> {
        self.factories
            .iter()
            .find(|f| f.recognizer_info().id == id)
            .ok_or_else(|| SttError::NotAvailable {
                reason: format!("Recognizer '{id}' not found"),
            })?
            .create(events)
    }

    /// Create the best available engine based on preferences
    pub fn create_best_available(
        &self,
        events: mpsc::UnboundedSender<RecognitionEvent>,
    ) -> Result<Box<dyn SpeechRecognizer>, SttError> {
        // First try preferred order
        for id in &self.preferred_order {
            if let Ok(engine) = self.create_recognizer(id, events.clone()) {
                return Ok(engine);
            }
        }

        // Then try any engine whose requirements are met
        for factory in &self.factories {
            if factory.check_requirements().is_ok() {
                if let Ok(engine) = factory.create(events.clone()) {
                    return Ok(engine);
                }
            }
        }

        Err(SttError::NotAvailable {
            reason: "No speech recognizers available".to_string(),
        })
    }
}
