//! Mock recognizer for tests and demos

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::Duration;
use tracing::debug;

use crate::recognizer::{RecognizerFactory, RecognizerInfo, SpeechRecognizer, SttError};
use crate::types::{RecognitionConfig, RecognitionError, RecognitionEvent};

/// One scripted capture session
#[derive(Debug, Clone)]
pub enum MockUtterance {
    /// Interim transcripts, then a final transcript, then session end
    Recognized { interim: Vec<String>, text: String },
    /// Session that fails with the given code, then ends
    Errors(RecognitionError),
    /// Session that ends without producing anything
    Silence,
}

impl MockUtterance {
    /// A session whose interim transcripts grow word by word toward `text`.
    pub fn recognized(text: &str) -> Self {
        let words: Vec<&str> = text.split_whitespace().collect();
        let interim = (1..words.len()).map(|i| words[..i].join(" ")).collect();
        Self::Recognized {
            interim,
            text: text.to_string(),
        }
    }
}

/// Configuration for scripted capture sessions
#[derive(Debug, Clone)]
pub struct MockRecognizerConfig {
    /// Sessions to play back, consumed front to back
    pub script: Vec<MockUtterance>,

    /// Session played once the script is exhausted
    pub exhausted: MockUtterance,

    /// Refuse every begin_capture call
    pub refuse_start: bool,

    /// Gap between pushed events in ms
    pub event_gap_ms: u64,
}

impl Default for MockRecognizerConfig {
    fn default() -> Self {
        Self {
            script: Vec::new(),
            exhausted: MockUtterance::Errors(RecognitionError::NoSpeech),
            refuse_start: false,
            event_gap_ms: 50,
        }
    }
}

/// Mock recognizer that plays back scripted sessions
#[derive(Debug)]
pub struct MockRecognizer {
    config: MockRecognizerConfig,
    script: Arc<Mutex<VecDeque<MockUtterance>>>,
    events: mpsc::UnboundedSender<RecognitionEvent>,
    active: Option<(u64, JoinHandle<()>)>,
}

impl MockRecognizer {
    pub fn new(
        config: MockRecognizerConfig,
        events: mpsc::UnboundedSender<RecognitionEvent>,
    ) -> Self {
        let script = Arc::new(Mutex::new(config.script.clone().into()));
        Self {
            config,
            script,
            events,
            active: None,
        }
    }
}

fn mock_info() -> RecognizerInfo {
    RecognizerInfo {
        id: "mock".to_string(),
        name: "Mock Recognizer".to_string(),
        description: "Scripted speech recognizer for tests and demos".to_string(),
        is_available: true,
    }
}

#[async_trait]
impl SpeechRecognizer for MockRecognizer {
    fn info(&self) -> RecognizerInfo {
        mock_info()
    }

    async fn begin_capture(
        &mut self,
        session_id: u64,
        _config: &RecognitionConfig,
    ) -> Result<(), SttError> {
        if self.config.refuse_start {
            return Err(SttError::StartFailed("refused by configuration".to_string()));
        }
        if let Some((_, handle)) = self.active.take() {
            handle.abort();
        }

        let utterance = self
            .script
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .pop_front()
            .unwrap_or_else(|| self.config.exhausted.clone());
        debug!(target: "stt", session_id, "mock capture session started");

        let events = self.events.clone();
        let gap = Duration::from_millis(self.config.event_gap_ms);
        let handle = tokio::spawn(async move {
            match utterance {
                MockUtterance::Recognized { interim, text } => {
                    for partial in interim {
                        tokio::time::sleep(gap).await;
                        let _ = events.send(RecognitionEvent::Interim {
                            session_id,
                            text: partial,
                        });
                    }
                    tokio::time::sleep(gap).await;
                    let _ = events.send(RecognitionEvent::Final {
                        session_id,
                        text,
                        confidence: Some(0.95),
                    });
                }
                MockUtterance::Errors(error) => {
                    tokio::time::sleep(gap).await;
                    let _ = events.send(RecognitionEvent::Error { session_id, error });
                }
                MockUtterance::Silence => {
                    tokio::time::sleep(gap).await;
                }
            }
            let _ = events.send(RecognitionEvent::Ended { session_id });
        });
        self.active = Some((session_id, handle));
        Ok(())
    }

    async fn stop_capture(&mut self) -> Result<(), SttError> {
        if let Some((session_id, handle)) = self.active.take() {
            handle.abort();
            let _ = self.events.send(RecognitionEvent::Ended { session_id });
        }
        Ok(())
    }
}

/// Factory for creating MockRecognizer instances
#[derive(Default)]
pub struct MockRecognizerFactory {
    config: MockRecognizerConfig,
}

impl MockRecognizerFactory {
    pub fn new(config: MockRecognizerConfig) -> Self {
        Self { config }
    }
}

impl RecognizerFactory for MockRecognizerFactory {
    fn create(
        &self,
        events: mpsc::UnboundedSender<RecognitionEvent>,
    ) -> Result<Box<dyn SpeechRecognizer>, SttError> {
        Ok(Box::new(MockRecognizer::new(self.config.clone(), events)))
    }

    fn recognizer_info(&self) -> RecognizerInfo {
        mock_info()
    }

    fn check_requirements(&self) -> Result<(), SttError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn engine_with(
        script: Vec<MockUtterance>,
    ) -> (MockRecognizer, mpsc::UnboundedReceiver<RecognitionEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let config = MockRecognizerConfig {
            script,
            ..Default::default()
        };
        (MockRecognizer::new(config, tx), rx)
    }

    #[tokio::test(start_paused = true)]
    async fn scripted_session_plays_interim_then_final_then_end() {
        let (mut engine, mut rx) = engine_with(vec![MockUtterance::recognized("turn on the lights")]);
        engine
            .begin_capture(7, &RecognitionConfig::default())
            .await
            .unwrap();

        assert_eq!(
            rx.recv().await,
            Some(RecognitionEvent::Interim {
                session_id: 7,
                text: "turn".to_string()
            })
        );
        let mut saw_final = false;
        while let Some(event) = rx.recv().await {
            match event {
                RecognitionEvent::Interim { session_id, .. } => assert_eq!(session_id, 7),
                RecognitionEvent::Final {
                    session_id, text, ..
                } => {
                    assert_eq!(session_id, 7);
                    assert_eq!(text, "turn on the lights");
                    saw_final = true;
                }
                RecognitionEvent::Ended { session_id } => {
                    assert_eq!(session_id, 7);
                    break;
                }
                other => panic!("unexpected event: {other:?}"),
            }
        }
        assert!(saw_final);
    }

    #[tokio::test(start_paused = true)]
    async fn exhausted_script_reports_no_speech() {
        let (mut engine, mut rx) = engine_with(vec![]);
        engine
            .begin_capture(1, &RecognitionConfig::default())
            .await
            .unwrap();
        assert_eq!(
            rx.recv().await,
            Some(RecognitionEvent::Error {
                session_id: 1,
                error: RecognitionError::NoSpeech
            })
        );
        assert_eq!(rx.recv().await, Some(RecognitionEvent::Ended { session_id: 1 }));
    }

    #[tokio::test(start_paused = true)]
    async fn stop_closes_the_session() {
        let (mut engine, mut rx) = engine_with(vec![MockUtterance::Silence]);
        engine
            .begin_capture(3, &RecognitionConfig::default())
            .await
            .unwrap();
        engine.stop_capture().await.unwrap();
        assert_eq!(rx.recv().await, Some(RecognitionEvent::Ended { session_id: 3 }));
    }

    #[tokio::test]
    async fn refused_start_errors() {
        let (tx, _rx) = mpsc::unbounded_channel();
        let config = MockRecognizerConfig {
            refuse_start: true,
            ..Default::default()
        };
        let mut engine = MockRecognizer::new(config, tx);
        let err = engine
            .begin_capture(1, &RecognitionConfig::default())
            .await
            .unwrap_err();
        assert!(matches!(err, SttError::StartFailed(_)));
    }
}
