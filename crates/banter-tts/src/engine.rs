//! Synthesizer capability boundary
//!
//! Engines push `SynthesisEvent`s keyed by synthesis id into the channel
//! handed to their factory; the output controller consumes them. Every
//! accepted `speak` eventually resolves with a terminal event.

use async_trait::async_trait;
use std::fmt::Debug;
use tokio::sync::mpsc;

use crate::error::{TtsError, TtsResult};
use crate::types::{UtteranceRequest, VoiceInfo};

/// Synthesis event types
#[derive(Debug, Clone, PartialEq)]
pub enum SynthesisEvent {
    /// Synthesis started playing
    Started { synthesis_id: u64 },
    /// Synthesis completed naturally
    Completed { synthesis_id: u64 },
    /// Synthesis failed
    Failed { synthesis_id: u64, error: String },
    /// Synthesis was stopped before completing
    Cancelled { synthesis_id: u64 },
}

/// Core synthesizer interface
#[async_trait]
pub trait SpeechSynthesizer: Send + Sync + Debug {
    /// Engine name/identifier
    fn name(&self) -> &str;

    /// Prepare the engine (probe binaries, load voice lists)
    async fn initialize(&mut self) -> TtsResult<()>;

    /// Get available voices
    async fn list_voices(&self) -> TtsResult<Vec<VoiceInfo>>;

    /// Start speaking. Events for this utterance carry `synthesis_id`.
    async fn speak(&mut self, synthesis_id: u64, request: &UtteranceRequest) -> TtsResult<()>;

    /// Stop the active utterance, if any
    async fn stop(&mut self) -> TtsResult<()>;
}

/// Factory for creating synthesizer engines
pub trait SynthesizerFactory: Send + Sync {
    /// Create a new engine pushing events into the given channel
    fn create(
        &self,
        events: mpsc::UnboundedSender<SynthesisEvent>,
    ) -> TtsResult<Box<dyn SpeechSynthesizer>>;

    /// Engine identifier (e.g. "espeak", "noop")
    fn engine_id(&self) -> &str;

    /// Check if the engine's requirements are met
    fn check_requirements(&self) -> TtsResult<()>;
}

/// Registry for picking among the available synthesizer engines
#[derive(Default)]
pub struct SynthesizerRegistry {
    factories: Vec<Box<dyn SynthesizerFactory>>,
    preferred_order: Vec<String>,
}

impl SynthesizerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new engine factory
    pub fn register(&mut self, factory: Box<dyn SynthesizerFactory>) {
        self.factories.push(factory);
    }

    /// Set the preferred order of engines to try
    pub fn set_preferred_order(&mut self, order: Vec<String>) {
        self.preferred_order = order;
    }

    /// Create an engine by ID
    pub fn create_engine(
        &self,
        id: &str,
        events: mpsc::UnboundedSender<SynthesisEvent>,
    ) -> TtsResult<Box<dyn SpeechSynthesizer>> {
        self.factories
            .iter()
            .find(|f| f.engine_id() == id)
            .ok_or_else(|| TtsError::EngineNotAvailable(format!("Engine '{id}' not found")))?
            .create(events)
    }

    /// Create the best available engine based on preferences
    pub fn create_best_available(
        &self,
        events: mpsc::UnboundedSender<SynthesisEvent>,
    ) -> TtsResult<Box<dyn SpeechSynthesizer>> {
        for id in &self.preferred_order {
            if let Some(factory) = self.factories.iter().find(|f| f.engine_id() == id) {
                if factory.check_requirements().is_ok() {
                    if let Ok(engine) = factory.create(events.clone()) {
                        return Ok(engine);
                    }
                }
            }
        }

        for factory in &self.factories {
            if factory.check_requirements().is_ok() {
                if let Ok(engine) = factory.create(events.clone()) {
                    return Ok(engine);
                }
            }
        }

        Err(TtsError::EngineNotAvailable(
            "No speech synthesizers available".to_string(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockSynthesizerFactory;
    use crate::noop::NoopSynthesizerFactory;

    #[test]
    fn preferred_engine_wins_over_registration_order() {
        let mut registry = SynthesizerRegistry::new();
        registry.register(Box::new(MockSynthesizerFactory::default()));
        registry.register(Box::new(NoopSynthesizerFactory));
        registry.set_preferred_order(vec!["noop".to_string()]);

        let (tx, _rx) = mpsc::unbounded_channel();
        let engine = registry.create_best_available(tx).unwrap();
        assert_eq!(engine.name(), "noop");
    }

    #[test]
    fn missing_preference_falls_back() {
        let mut registry = SynthesizerRegistry::new();
        registry.register(Box::new(NoopSynthesizerFactory));
        registry.set_preferred_order(vec!["espeak".to_string()]);

        let (tx, _rx) = mpsc::unbounded_channel();
        let engine = registry.create_best_available(tx).unwrap();
        assert_eq!(engine.name(), "noop");
    }

    #[test]
    fn empty_registry_errors() {
        let registry = SynthesizerRegistry::new();
        let (tx, _rx) = mpsc::unbounded_channel();
        assert!(matches!(
            registry.create_best_available(tx),
            Err(TtsError::EngineNotAvailable(_))
        ));
    }
}
