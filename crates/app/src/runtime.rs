//! Runtime assembly
//!
//! Builds the transport, the status poller, both voice controllers and the
//! coordinator from settings, and hands the terminal UI the channel ends it
//! drives. Shutdown aborts the tasks in reverse dependency order.

use std::sync::Arc;

use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{info, warn};

use banter_chat::status::StatusSnapshot;
use banter_chat::{strip_thinking_spans, ChatTransport, HttpChatTransport, StatusPoller, TranscriptStore};
use banter_foundation::ShutdownToken;
use banter_stt::plugins::{MockRecognizerConfig, MockRecognizerFactory, NoopRecognizerFactory};
use banter_stt::{
    CaptureController, RecognitionConfig, RecognitionEvent, RecognizerRegistry, SpeechRecognizer,
};
use banter_telemetry::SessionMetrics;
use banter_tts::controller::TextCleaner;
use banter_tts::mock::{MockSynthesizerConfig, MockSynthesizerFactory};
use banter_tts::noop::{NoopSynthesizer, NoopSynthesizerFactory};
use banter_tts::{
    OutputController, SpeechSynthesizer, SynthesisEvent, SynthesizerRegistry,
};
use banter_tts_espeak::EspeakSynthesizerFactory;

use crate::coordinator::{Coordinator, CoordinatorChannels, UiCommand, UiState};
use crate::profile::Profile;
use crate::Settings;

/// Handle to the running session tasks
pub struct AppHandle {
    pub metrics: SessionMetrics,
    pub ui_commands: mpsc::Sender<UiCommand>,
    pub ui_state: watch::Receiver<UiState>,

    status_handle: JoinHandle<()>,
    capture_handle: JoinHandle<()>,
    output_handle: JoinHandle<()>,
    coordinator_handle: JoinHandle<()>,
}

impl AppHandle {
    /// Gracefully stop the session tasks and wait for them
    pub async fn shutdown(self) {
        info!("Shutting down banter runtime...");

        self.coordinator_handle.abort();
        self.capture_handle.abort();
        self.output_handle.abort();
        self.status_handle.abort();

        let _ = self.coordinator_handle.await;
        let _ = self.capture_handle.await;
        let _ = self.output_handle.await;
        let _ = self.status_handle.await;

        info!("banter runtime shutdown complete");
    }
}

/// Start the session tasks with the given settings
pub fn start(settings: &Settings, profile: &Profile, shutdown: ShutdownToken) -> AppHandle {
    let metrics = SessionMetrics::default();

    // 1) Chat transport and status polling
    let transport: Arc<dyn ChatTransport> =
        Arc::new(HttpChatTransport::new(&settings.backend.base_url));
    let (status_tx, status_rx) = watch::channel(StatusSnapshot::offline());
    let status_handle = tokio::spawn(
        StatusPoller::new(Arc::clone(&transport), status_tx, metrics.clone()).run(),
    );

    // 2) Voice capture
    let recognition = RecognitionConfig {
        language: settings.voice.language.clone(),
        interim_results: true,
    };
    let (capture_cmd_tx, capture_cmd_rx) = mpsc::channel(16);
    let (capture_update_tx, capture_update_rx) = mpsc::unbounded_channel();
    let (recognizer_events_tx, recognizer_events_rx) = mpsc::unbounded_channel();
    let recognizer = build_recognizer(&settings.voice.recognizer, recognizer_events_tx);
    let capture_handle = tokio::spawn(
        CaptureController::new(
            recognizer,
            recognition,
            capture_cmd_rx,
            recognizer_events_rx,
            capture_update_tx,
            metrics.clone(),
        )
        .run(),
    );

    // 3) Voice output
    let (output_cmd_tx, output_cmd_rx) = mpsc::channel(16);
    let (output_update_tx, output_update_rx) = mpsc::unbounded_channel();
    let (synthesis_events_tx, synthesis_events_rx) = mpsc::unbounded_channel();
    let engine = build_synthesizer(&settings.voice.synthesizer, synthesis_events_tx);
    let cleaner: TextCleaner = Arc::new(|raw| strip_thinking_spans(raw));
    let output_handle = tokio::spawn(
        OutputController::new(
            engine,
            cleaner,
            settings.voice.output_enabled,
            output_cmd_rx,
            synthesis_events_rx,
            output_update_tx,
            metrics.clone(),
        )
        .run(),
    );

    // 4) Transcript and coordinator
    let (transcript_tx, transcript_rx) = mpsc::unbounded_channel();
    let transcript = TranscriptStore::new(transcript_tx);
    let (ui_cmd_tx, ui_cmd_rx) = mpsc::channel(16);
    let (ui_state_tx, ui_state_rx) = watch::channel(UiState::initial(
        profile.display_name().to_string(),
        profile.has_photo(),
        settings.voice.output_enabled,
    ));
    let coordinator = Coordinator::new(
        transcript,
        transport,
        metrics.clone(),
        shutdown,
        profile,
        settings.voice.output_enabled,
        CoordinatorChannels {
            ui_commands: ui_cmd_rx,
            ui_state: ui_state_tx,
            capture_commands: capture_cmd_tx,
            capture_updates: capture_update_rx,
            output_commands: output_cmd_tx,
            output_updates: output_update_rx,
            transcript_events: transcript_rx,
            status_updates: status_rx,
        },
    );
    let coordinator_handle = tokio::spawn(coordinator.run());

    AppHandle {
        metrics,
        ui_commands: ui_cmd_tx,
        ui_state: ui_state_rx,
        status_handle,
        capture_handle,
        output_handle,
        coordinator_handle,
    }
}

/// Resolves the configured capture engine. "none" and a failed registry
/// lookup both leave the mic inert rather than failing startup.
fn build_recognizer(
    kind: &str,
    events: mpsc::UnboundedSender<RecognitionEvent>,
) -> Option<Box<dyn SpeechRecognizer>> {
    if kind.eq_ignore_ascii_case("none") {
        info!(target: "stt", "voice capture disabled by configuration");
        return None;
    }
    let mut registry = RecognizerRegistry::new();
    registry.register(Box::new(MockRecognizerFactory::new(
        MockRecognizerConfig::default(),
    )));
    registry.register(Box::new(NoopRecognizerFactory));
    registry.set_preferred_order(vec![kind.to_lowercase()]);
    match registry.create_best_available(events) {
        Ok(recognizer) => {
            info!(target: "stt", engine = %recognizer.info().id, "recognizer ready");
            Some(recognizer)
        }
        Err(e) => {
            warn!(target: "stt", "no recognizer available: {}", e);
            None
        }
    }
}

/// Resolves the configured synthesis engine. "auto" prefers espeak and
/// degrades to the silent engine so replies still flow when nothing can
/// actually speak.
fn build_synthesizer(
    kind: &str,
    events: mpsc::UnboundedSender<SynthesisEvent>,
) -> Box<dyn SpeechSynthesizer> {
    let mut registry = SynthesizerRegistry::new();
    registry.register(Box::new(EspeakSynthesizerFactory));
    registry.register(Box::new(MockSynthesizerFactory::new(
        MockSynthesizerConfig::default(),
    )));
    registry.register(Box::new(NoopSynthesizerFactory));

    let kind = kind.to_lowercase();
    let created = if kind == "auto" {
        registry.set_preferred_order(vec!["espeak".to_string(), "noop".to_string()]);
        registry.create_best_available(events.clone())
    } else {
        registry.create_engine(&kind, events.clone())
    };
    match created {
        Ok(engine) => {
            info!(target: "tts", engine = engine.name(), "synthesizer ready");
            engine
        }
        Err(e) => {
            warn!(target: "tts", "no synthesizer available, speech output is silent: {}", e);
            Box::new(NoopSynthesizer::new(events))
        }
    }
}
