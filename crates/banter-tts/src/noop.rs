//! Null synthesizer
//!
//! Completes every utterance instantly without producing audio. The
//! fallback when no real engine is usable, so the speaking state machine
//! keeps functioning.

use async_trait::async_trait;
use tokio::sync::mpsc;
use tracing::debug;

use crate::engine::{SpeechSynthesizer, SynthesisEvent, SynthesizerFactory};
use crate::error::TtsResult;
use crate::types::{UtteranceRequest, VoiceInfo};

#[derive(Debug)]
pub struct NoopSynthesizer {
    events: mpsc::UnboundedSender<SynthesisEvent>,
}

impl NoopSynthesizer {
    pub fn new(events: mpsc::UnboundedSender<SynthesisEvent>) -> Self {
        Self { events }
    }
}

#[async_trait]
impl SpeechSynthesizer for NoopSynthesizer {
    fn name(&self) -> &str {
        "noop"
    }

    async fn initialize(&mut self) -> TtsResult<()> {
        Ok(())
    }

    async fn list_voices(&self) -> TtsResult<Vec<VoiceInfo>> {
        Ok(Vec::new())
    }

    async fn speak(&mut self, synthesis_id: u64, request: &UtteranceRequest) -> TtsResult<()> {
        debug!(target: "tts", synthesis_id, chars = request.text.len(), "noop utterance swallowed");
        let _ = self.events.send(SynthesisEvent::Started { synthesis_id });
        let _ = self.events.send(SynthesisEvent::Completed { synthesis_id });
        Ok(())
    }

    async fn stop(&mut self) -> TtsResult<()> {
        Ok(())
    }
}

/// Factory for the null synthesizer, always available
pub struct NoopSynthesizerFactory;

impl SynthesizerFactory for NoopSynthesizerFactory {
    fn create(
        &self,
        events: mpsc::UnboundedSender<SynthesisEvent>,
    ) -> TtsResult<Box<dyn SpeechSynthesizer>> {
        Ok(Box::new(NoopSynthesizer::new(events)))
    }

    fn engine_id(&self) -> &str {
        "noop"
    }

    fn check_requirements(&self) -> TtsResult<()> {
        Ok(())
    }
}
