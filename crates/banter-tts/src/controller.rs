//! Output controller
//!
//! Task-owned state machine that speaks assistant replies. Applies the
//! transcript cleaning function before synthesis, keeps at most one
//! utterance active, and gates speech behind the user's output toggle.

use std::sync::atomic::Ordering;
use std::sync::Arc;

use banter_telemetry::SessionMetrics;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use crate::engine::{SpeechSynthesizer, SynthesisEvent};
use crate::next_synthesis_id;
use crate::selection::choose_voice;
use crate::types::{Prosody, UtteranceRequest, VoiceInfo};

/// Prosody applied to every utterance.
pub const SPEECH_PROSODY: Prosody = Prosody {
    pitch: 1.1,
    rate: 1.0,
    volume: 1.0,
};

/// Text cleaning applied before synthesis, shared with the transcript.
pub type TextCleaner = Arc<dyn Fn(&str) -> String + Send + Sync>;

#[derive(Clone)]
pub enum OutputCommand {
    Speak { text: String },
    Cancel,
    /// Gates future Speak calls only; never cancels in-flight speech
    SetEnabled(bool),
    /// Re-run voice selection against the engine's current voice list
    RefreshVoices,
}

/// Updates pushed to the coordinator.
#[derive(Debug, Clone, PartialEq)]
pub enum OutputUpdate {
    /// Voice selection ran; the UI shows the chosen voice
    VoiceReady { name: String },
    Started { synthesis_id: u64 },
    /// Natural completion; the coordinator may schedule a capture restart
    Finished { synthesis_id: u64 },
    /// Synthesis failed; state is cleaned up, no restart is scheduled
    Failed { synthesis_id: u64 },
    Cancelled { synthesis_id: u64 },
}

pub struct OutputController {
    engine: Box<dyn SpeechSynthesizer>,
    cleaner: TextCleaner,
    commands: mpsc::Receiver<OutputCommand>,
    engine_events: mpsc::UnboundedReceiver<SynthesisEvent>,
    updates: mpsc::UnboundedSender<OutputUpdate>,
    metrics: SessionMetrics,
    enabled: bool,
    selected_voice: Option<VoiceInfo>,
    active: Option<u64>,
    events_open: bool,
}

impl OutputController {
    pub fn new(
        engine: Box<dyn SpeechSynthesizer>,
        cleaner: TextCleaner,
        enabled: bool,
        commands: mpsc::Receiver<OutputCommand>,
        engine_events: mpsc::UnboundedReceiver<SynthesisEvent>,
        updates: mpsc::UnboundedSender<OutputUpdate>,
        metrics: SessionMetrics,
    ) -> Self {
        Self {
            engine,
            cleaner,
            commands,
            engine_events,
            updates,
            metrics,
            enabled,
            selected_voice: None,
            active: None,
            events_open: true,
        }
    }

    pub async fn run(mut self) {
        if let Err(e) = self.engine.initialize().await {
            error!(target: "tts", engine = self.engine.name(), "engine initialization failed: {}", e);
        }
        self.refresh_voices().await;

        loop {
            tokio::select! {
                maybe_cmd = self.commands.recv() => {
                    let Some(cmd) = maybe_cmd else { break };
                    match cmd {
                        OutputCommand::Speak { text } => self.handle_speak(text).await,
                        OutputCommand::Cancel => {
                            if self.active.is_none() {
                                debug!(target: "tts", "cancel ignored, nothing speaking");
                            } else {
                                self.cancel_active().await;
                            }
                        }
                        OutputCommand::SetEnabled(enabled) => {
                            self.enabled = enabled;
                            debug!(target: "tts", enabled, "voice output toggled");
                        }
                        OutputCommand::RefreshVoices => self.refresh_voices().await,
                    }
                }
                maybe_event = self.engine_events.recv(), if self.events_open => {
                    match maybe_event {
                        Some(event) => self.handle_engine_event(event),
                        None => self.events_open = false,
                    }
                }
            }
        }
        debug!(target: "tts", "output controller stopped");
    }

    async fn refresh_voices(&mut self) {
        match self.engine.list_voices().await {
            Ok(voices) => {
                self.selected_voice = choose_voice(&voices).cloned();
                match &self.selected_voice {
                    Some(voice) => {
                        info!(target: "tts", name = %voice.name, language = %voice.language,
                            "voice selected");
                        self.publish(OutputUpdate::VoiceReady {
                            name: voice.name.clone(),
                        });
                    }
                    None => error!(target: "tts", "no voices available"),
                }
            }
            Err(e) => {
                warn!(target: "tts", "failed to list voices: {}", e);
                self.selected_voice = None;
            }
        }
    }

    async fn handle_speak(&mut self, text: String) {
        if !self.enabled {
            debug!(target: "tts", "voice output disabled, skipping utterance");
            return;
        }
        if self.active.is_some() {
            self.cancel_active().await;
        }

        let cleaned = (self.cleaner)(&text);
        let synthesis_id = next_synthesis_id();
        let request = UtteranceRequest {
            text: cleaned,
            voice_id: self.selected_voice.as_ref().map(|v| v.id.clone()),
            prosody: SPEECH_PROSODY,
        };
        match self.engine.speak(synthesis_id, &request).await {
            Ok(()) => {
                self.active = Some(synthesis_id);
                self.metrics.set_speaking(true);
                self.metrics
                    .utterances_spoken
                    .fetch_add(1, Ordering::Relaxed);
                self.publish(OutputUpdate::Started { synthesis_id });
            }
            Err(e) => {
                warn!(target: "tts", synthesis_id, "failed to start utterance: {}", e);
                self.metrics
                    .synthesis_errors
                    .fetch_add(1, Ordering::Relaxed);
                self.publish(OutputUpdate::Failed { synthesis_id });
            }
        }
    }

    async fn cancel_active(&mut self) {
        let Some(synthesis_id) = self.active.take() else {
            return;
        };
        if let Err(e) = self.engine.stop().await {
            warn!(target: "tts", synthesis_id, "engine stop failed: {}", e);
        }
        self.metrics.set_speaking(false);
        self.publish(OutputUpdate::Cancelled { synthesis_id });
    }

    fn handle_engine_event(&mut self, event: SynthesisEvent) {
        match event {
            SynthesisEvent::Started { synthesis_id } => {
                if self.active == Some(synthesis_id) {
                    debug!(target: "tts", synthesis_id, "engine confirmed start");
                } else {
                    debug!(target: "tts", synthesis_id, "dropping stale start");
                }
            }
            SynthesisEvent::Completed { synthesis_id } => {
                if self.active != Some(synthesis_id) {
                    debug!(target: "tts", synthesis_id, "dropping stale completion");
                    return;
                }
                self.active = None;
                self.metrics.set_speaking(false);
                self.publish(OutputUpdate::Finished { synthesis_id });
            }
            SynthesisEvent::Failed {
                synthesis_id,
                error,
            } => {
                if self.active != Some(synthesis_id) {
                    debug!(target: "tts", synthesis_id, "dropping stale failure");
                    return;
                }
                error!(target: "tts", synthesis_id, "synthesis failed: {}", error);
                self.active = None;
                self.metrics.set_speaking(false);
                self.metrics
                    .synthesis_errors
                    .fetch_add(1, Ordering::Relaxed);
                self.publish(OutputUpdate::Failed { synthesis_id });
            }
            SynthesisEvent::Cancelled { synthesis_id } => {
                if self.active != Some(synthesis_id) {
                    // Expected after a local cancel already cleared the slot
                    debug!(target: "tts", synthesis_id, "dropping stale cancellation");
                    return;
                }
                self.active = None;
                self.metrics.set_speaking(false);
                self.publish(OutputUpdate::Cancelled { synthesis_id });
            }
        }
    }

    fn publish(&self, update: OutputUpdate) {
        if self.updates.send(update).is_err() {
            debug!(target: "tts", "output update receiver dropped");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TtsResult;
    use crate::types::VoiceGender;
    use async_trait::async_trait;
    use std::sync::atomic::AtomicUsize;
    use std::sync::Mutex;

    #[derive(Debug, Default)]
    struct Probe {
        voices: Mutex<Vec<VoiceInfo>>,
        requests: Mutex<Vec<(u64, UtteranceRequest)>>,
        stops: AtomicUsize,
    }

    #[derive(Debug)]
    struct ProbeSynthesizer {
        probe: Arc<Probe>,
    }

    #[async_trait]
    impl SpeechSynthesizer for ProbeSynthesizer {
        fn name(&self) -> &str {
            "probe"
        }

        async fn initialize(&mut self) -> TtsResult<()> {
            Ok(())
        }

        async fn list_voices(&self) -> TtsResult<Vec<VoiceInfo>> {
            Ok(self.probe.voices.lock().unwrap().clone())
        }

        async fn speak(&mut self, synthesis_id: u64, request: &UtteranceRequest) -> TtsResult<()> {
            self.probe
                .requests
                .lock()
                .unwrap()
                .push((synthesis_id, request.clone()));
            Ok(())
        }

        async fn stop(&mut self) -> TtsResult<()> {
            self.probe.stops.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    struct Harness {
        commands: mpsc::Sender<OutputCommand>,
        engine_events: mpsc::UnboundedSender<SynthesisEvent>,
        updates: mpsc::UnboundedReceiver<OutputUpdate>,
        probe: Arc<Probe>,
        metrics: SessionMetrics,
    }

    impl Harness {
        fn spawn(voices: Vec<VoiceInfo>) -> Self {
            let (cmd_tx, cmd_rx) = mpsc::channel(8);
            let (ev_tx, ev_rx) = mpsc::unbounded_channel();
            let (up_tx, up_rx) = mpsc::unbounded_channel();
            let probe = Arc::new(Probe {
                voices: Mutex::new(voices),
                ..Default::default()
            });
            let metrics = SessionMetrics::default();
            let cleaner: TextCleaner = Arc::new(|s: &str| s.replace("[pad]", "").trim().to_string());
            let controller = OutputController::new(
                Box::new(ProbeSynthesizer {
                    probe: probe.clone(),
                }),
                cleaner,
                true,
                cmd_rx,
                ev_rx,
                up_tx,
                metrics.clone(),
            );
            tokio::spawn(controller.run());
            Self {
                commands: cmd_tx,
                engine_events: ev_tx,
                updates: up_rx,
                probe,
                metrics,
            }
        }

        async fn speak(&mut self, text: &str) -> u64 {
            self.commands
                .send(OutputCommand::Speak {
                    text: text.to_string(),
                })
                .await
                .unwrap();
            match self.updates.recv().await.unwrap() {
                OutputUpdate::Started { synthesis_id } => synthesis_id,
                other => panic!("expected Started, got {other:?}"),
            }
        }
    }

    fn english_voices() -> Vec<VoiceInfo> {
        vec![
            VoiceInfo {
                id: "alex".to_string(),
                name: "Alex".to_string(),
                language: "en-US".to_string(),
                gender: Some(VoiceGender::Male),
            },
            VoiceInfo {
                id: "samantha".to_string(),
                name: "Samantha".to_string(),
                language: "en-US".to_string(),
                gender: None,
            },
        ]
    }

    async fn settle() {
        for _ in 0..16 {
            tokio::task::yield_now().await;
        }
    }

    #[tokio::test]
    async fn startup_selects_a_voice_and_reports_it() {
        let mut h = Harness::spawn(english_voices());
        assert_eq!(
            h.updates.recv().await.unwrap(),
            OutputUpdate::VoiceReady {
                name: "Samantha".to_string()
            }
        );
    }

    #[tokio::test]
    async fn speak_cleans_text_and_applies_voice_and_prosody() {
        let mut h = Harness::spawn(english_voices());
        h.updates.recv().await.unwrap();

        let id = h.speak("  [pad]Good morning  ").await;
        assert!(h.metrics.is_speaking.load(Ordering::Relaxed));

        let requests = h.probe.requests.lock().unwrap();
        let (recorded_id, request) = &requests[0];
        assert_eq!(*recorded_id, id);
        assert_eq!(request.text, "Good morning");
        assert_eq!(request.voice_id.as_deref(), Some("samantha"));
        assert_eq!(request.prosody, SPEECH_PROSODY);
    }

    #[tokio::test]
    async fn disabled_output_swallows_speak_without_events() {
        let mut h = Harness::spawn(english_voices());
        h.updates.recv().await.unwrap();

        h.commands
            .send(OutputCommand::SetEnabled(false))
            .await
            .unwrap();
        h.commands
            .send(OutputCommand::Speak {
                text: "quiet".to_string(),
            })
            .await
            .unwrap();
        settle().await;
        assert!(h.updates.try_recv().is_err());
        assert!(h.probe.requests.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn a_new_utterance_cancels_the_active_one() {
        let mut h = Harness::spawn(english_voices());
        h.updates.recv().await.unwrap();

        let first = h.speak("first").await;
        h.commands
            .send(OutputCommand::Speak {
                text: "second".to_string(),
            })
            .await
            .unwrap();
        assert_eq!(
            h.updates.recv().await.unwrap(),
            OutputUpdate::Cancelled { synthesis_id: first }
        );
        assert!(matches!(
            h.updates.recv().await.unwrap(),
            OutputUpdate::Started { .. }
        ));
        assert_eq!(h.probe.stops.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn natural_completion_reports_finished() {
        let mut h = Harness::spawn(english_voices());
        h.updates.recv().await.unwrap();

        let id = h.speak("hello").await;
        h.engine_events
            .send(SynthesisEvent::Completed { synthesis_id: id })
            .unwrap();
        assert_eq!(
            h.updates.recv().await.unwrap(),
            OutputUpdate::Finished { synthesis_id: id }
        );
        assert!(!h.metrics.is_speaking.load(Ordering::Relaxed));
    }

    #[tokio::test]
    async fn engine_failure_reports_failed_and_counts() {
        let mut h = Harness::spawn(english_voices());
        h.updates.recv().await.unwrap();

        let id = h.speak("hello").await;
        h.engine_events
            .send(SynthesisEvent::Failed {
                synthesis_id: id,
                error: "device gone".to_string(),
            })
            .unwrap();
        assert_eq!(
            h.updates.recv().await.unwrap(),
            OutputUpdate::Failed { synthesis_id: id }
        );
        assert_eq!(h.metrics.synthesis_errors.load(Ordering::Relaxed), 1);
        assert!(!h.metrics.is_speaking.load(Ordering::Relaxed));
    }

    #[tokio::test]
    async fn late_events_after_cancel_are_dropped() {
        let mut h = Harness::spawn(english_voices());
        h.updates.recv().await.unwrap();

        let id = h.speak("hello").await;
        h.commands.send(OutputCommand::Cancel).await.unwrap();
        assert_eq!(
            h.updates.recv().await.unwrap(),
            OutputUpdate::Cancelled { synthesis_id: id }
        );

        h.engine_events
            .send(SynthesisEvent::Completed { synthesis_id: id })
            .unwrap();
        settle().await;
        assert!(h.updates.try_recv().is_err());
    }

    #[tokio::test]
    async fn cancel_with_nothing_active_is_silent() {
        let mut h = Harness::spawn(english_voices());
        h.updates.recv().await.unwrap();

        h.commands.send(OutputCommand::Cancel).await.unwrap();
        settle().await;
        assert!(h.updates.try_recv().is_err());
    }

    #[tokio::test]
    async fn refreshing_voices_reruns_the_cascade() {
        let mut h = Harness::spawn(english_voices());
        h.updates.recv().await.unwrap();

        *h.probe.voices.lock().unwrap() = vec![VoiceInfo {
            id: "victoria".to_string(),
            name: "Victoria".to_string(),
            language: "en-GB".to_string(),
            gender: None,
        }];
        h.commands.send(OutputCommand::RefreshVoices).await.unwrap();
        assert_eq!(
            h.updates.recv().await.unwrap(),
            OutputUpdate::VoiceReady {
                name: "Victoria".to_string()
            }
        );
    }
}
