//! Null recognizer
//!
//! Accepts capture sessions and never transcribes anything. Used when no
//! real engine is configured so the capture path stays exercisable.

use async_trait::async_trait;
use tokio::sync::mpsc;
use tracing::debug;

use crate::recognizer::{RecognizerFactory, RecognizerInfo, SpeechRecognizer, SttError};
use crate::types::{RecognitionConfig, RecognitionEvent};

#[derive(Debug)]
pub struct NoopRecognizer {
    events: mpsc::UnboundedSender<RecognitionEvent>,
    active: Option<u64>,
}

impl NoopRecognizer {
    pub fn new(events: mpsc::UnboundedSender<RecognitionEvent>) -> Self {
        Self {
            events,
            active: None,
        }
    }
}

fn noop_info() -> RecognizerInfo {
    RecognizerInfo {
        id: "noop".to_string(),
        name: "Null Recognizer".to_string(),
        description: "Accepts capture sessions, never transcribes".to_string(),
        is_available: true,
    }
}

#[async_trait]
impl SpeechRecognizer for NoopRecognizer {
    fn info(&self) -> RecognizerInfo {
        noop_info()
    }

    async fn begin_capture(
        &mut self,
        session_id: u64,
        _config: &RecognitionConfig,
    ) -> Result<(), SttError> {
        debug!(target: "stt", session_id, "noop capture session opened");
        self.active = Some(session_id);
        Ok(())
    }

    async fn stop_capture(&mut self) -> Result<(), SttError> {
        if let Some(session_id) = self.active.take() {
            let _ = self.events.send(RecognitionEvent::Ended { session_id });
        }
        Ok(())
    }
}

/// Factory for the null recognizer, always available
pub struct NoopRecognizerFactory;

impl RecognizerFactory for NoopRecognizerFactory {
    fn create(
        &self,
        events: mpsc::UnboundedSender<RecognitionEvent>,
    ) -> Result<Box<dyn SpeechRecognizer>, SttError> {
        Ok(Box::new(NoopRecognizer::new(events)))
    }

    fn recognizer_info(&self) -> RecognizerInfo {
        noop_info()
    }

    fn check_requirements(&self) -> Result<(), SttError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn session_stays_silent_until_stopped() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut engine = NoopRecognizer::new(tx);
        engine
            .begin_capture(11, &RecognitionConfig::default())
            .await
            .unwrap();
        assert!(rx.try_recv().is_err());

        engine.stop_capture().await.unwrap();
        assert_eq!(
            rx.recv().await,
            Some(RecognitionEvent::Ended { session_id: 11 })
        );
    }
}
