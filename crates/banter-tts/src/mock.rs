//! Mock synthesizer for tests and demos

use async_trait::async_trait;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::Duration;
use tracing::debug;

use crate::engine::{SpeechSynthesizer, SynthesisEvent, SynthesizerFactory};
use crate::error::TtsResult;
use crate::types::{UtteranceRequest, VoiceGender, VoiceInfo};

/// Configuration for the mock synthesizer
#[derive(Debug, Clone)]
pub struct MockSynthesizerConfig {
    /// Voices reported by list_voices
    pub voices: Vec<VoiceInfo>,

    /// How long an utterance "plays" before completing, in ms
    pub utterance_ms: u64,

    /// Fail every utterance instead of completing it
    pub fail_utterances: bool,
}

impl Default for MockSynthesizerConfig {
    fn default() -> Self {
        Self {
            voices: vec![
                VoiceInfo {
                    id: "mock-f".to_string(),
                    name: "Samantha".to_string(),
                    language: "en-US".to_string(),
                    gender: Some(VoiceGender::Female),
                },
                VoiceInfo {
                    id: "mock-m".to_string(),
                    name: "Alex".to_string(),
                    language: "en-US".to_string(),
                    gender: Some(VoiceGender::Male),
                },
            ],
            utterance_ms: 200,
            fail_utterances: false,
        }
    }
}

/// Mock synthesizer that plays utterances on a timer
#[derive(Debug)]
pub struct MockSynthesizer {
    config: MockSynthesizerConfig,
    events: mpsc::UnboundedSender<SynthesisEvent>,
    active: Option<(u64, JoinHandle<()>)>,
}

impl MockSynthesizer {
    pub fn new(
        config: MockSynthesizerConfig,
        events: mpsc::UnboundedSender<SynthesisEvent>,
    ) -> Self {
        Self {
            config,
            events,
            active: None,
        }
    }
}

#[async_trait]
impl SpeechSynthesizer for MockSynthesizer {
    fn name(&self) -> &str {
        "mock"
    }

    async fn initialize(&mut self) -> TtsResult<()> {
        Ok(())
    }

    async fn list_voices(&self) -> TtsResult<Vec<VoiceInfo>> {
        Ok(self.config.voices.clone())
    }

    async fn speak(&mut self, synthesis_id: u64, request: &UtteranceRequest) -> TtsResult<()> {
        if let Some((_, handle)) = self.active.take() {
            handle.abort();
        }
        debug!(target: "tts", synthesis_id, text = %request.text, "mock utterance started");

        let events = self.events.clone();
        let duration = Duration::from_millis(self.config.utterance_ms);
        let fail = self.config.fail_utterances;
        let _ = events.send(SynthesisEvent::Started { synthesis_id });
        let handle = tokio::spawn(async move {
            tokio::time::sleep(duration).await;
            let event = if fail {
                SynthesisEvent::Failed {
                    synthesis_id,
                    error: "simulated failure".to_string(),
                }
            } else {
                SynthesisEvent::Completed { synthesis_id }
            };
            let _ = events.send(event);
        });
        self.active = Some((synthesis_id, handle));
        Ok(())
    }

    async fn stop(&mut self) -> TtsResult<()> {
        if let Some((synthesis_id, handle)) = self.active.take() {
            handle.abort();
            let _ = self.events.send(SynthesisEvent::Cancelled { synthesis_id });
        }
        Ok(())
    }
}

/// Factory for creating MockSynthesizer instances
#[derive(Default)]
pub struct MockSynthesizerFactory {
    config: MockSynthesizerConfig,
}

impl MockSynthesizerFactory {
    pub fn new(config: MockSynthesizerConfig) -> Self {
        Self { config }
    }
}

impl SynthesizerFactory for MockSynthesizerFactory {
    fn create(
        &self,
        events: mpsc::UnboundedSender<SynthesisEvent>,
    ) -> TtsResult<Box<dyn SpeechSynthesizer>> {
        Ok(Box::new(MockSynthesizer::new(self.config.clone(), events)))
    }

    fn engine_id(&self) -> &str {
        "mock"
    }

    fn check_requirements(&self) -> TtsResult<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Prosody;

    fn request(text: &str) -> UtteranceRequest {
        UtteranceRequest {
            text: text.to_string(),
            voice_id: None,
            prosody: Prosody::default(),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn utterance_starts_then_completes() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut engine = MockSynthesizer::new(MockSynthesizerConfig::default(), tx);
        engine.speak(5, &request("hello")).await.unwrap();

        assert_eq!(rx.recv().await, Some(SynthesisEvent::Started { synthesis_id: 5 }));
        assert_eq!(
            rx.recv().await,
            Some(SynthesisEvent::Completed { synthesis_id: 5 })
        );
    }

    #[tokio::test(start_paused = true)]
    async fn stop_cancels_the_active_utterance() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut engine = MockSynthesizer::new(MockSynthesizerConfig::default(), tx);
        engine.speak(6, &request("hello")).await.unwrap();
        assert_eq!(rx.recv().await, Some(SynthesisEvent::Started { synthesis_id: 6 }));

        engine.stop().await.unwrap();
        assert_eq!(
            rx.recv().await,
            Some(SynthesisEvent::Cancelled { synthesis_id: 6 })
        );
    }

    #[tokio::test(start_paused = true)]
    async fn failures_are_reported() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let config = MockSynthesizerConfig {
            fail_utterances: true,
            ..Default::default()
        };
        let mut engine = MockSynthesizer::new(config, tx);
        engine.speak(7, &request("hello")).await.unwrap();

        assert_eq!(rx.recv().await, Some(SynthesisEvent::Started { synthesis_id: 7 }));
        assert!(matches!(
            rx.recv().await,
            Some(SynthesisEvent::Failed { synthesis_id: 7, .. })
        ));
    }
}
