//! Session coordinator
//!
//! Single task owning the conversation state: transcript, input box, voice
//! flags, status line, and the delayed-capture timers. Every UI command and
//! controller update funnels through here, so listening and speaking can
//! never be observed together.

use std::sync::atomic::Ordering;
use std::sync::Arc;

use banter_chat::status::StatusSnapshot;
use banter_chat::{ChatError, ChatTransport, Message, TranscriptEvent, TranscriptStore};
use banter_foundation::{SessionPhase, SessionStateManager, ShutdownToken, StatusTone};
use banter_stt::{CaptureCommand, CaptureFailure, CaptureUpdate};
use banter_telemetry::SessionMetrics;
use banter_tts::{OutputCommand, OutputUpdate};
use tokio::sync::{mpsc, watch};
use tokio::time::{Duration, Instant};
use tracing::{debug, error, warn};

use crate::profile::Profile;

/// Prompt shown whenever the voice session returns to rest.
pub const IDLE_PROMPT: &str = "Click microphone to speak";

/// Delay before capture restarts in continuous mode.
pub const RESTART_DELAY: Duration = Duration::from_millis(1000);

/// Delay before capture resumes after the mic toggle cancels speech.
pub const RESUME_DELAY: Duration = Duration::from_millis(300);

/// Commands from the terminal UI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UiCommand {
    InputChar(char),
    InputBackspace,
    SubmitInput,
    ToggleMic,
    ToggleContinuous,
    ToggleVoiceOutput,
}

/// Snapshot of everything the terminal UI renders, published over a watch
/// channel after every handled event.
#[derive(Debug, Clone)]
pub struct UiState {
    pub messages: Vec<Message>,
    pub input: String,
    pub voice_status: String,
    pub voice_tone: StatusTone,
    pub api_label: String,
    pub api_configured: bool,
    pub pending_replies: u32,
    pub continuous_mode: bool,
    pub voice_output_enabled: bool,
    pub listening: bool,
    pub speaking: bool,
    pub mic_supported: bool,
    pub user_label: String,
    pub has_photo: bool,
}

impl UiState {
    pub fn initial(user_label: String, has_photo: bool, voice_output_enabled: bool) -> Self {
        Self {
            messages: Vec::new(),
            input: String::new(),
            voice_status: IDLE_PROMPT.to_string(),
            voice_tone: StatusTone::Idle,
            api_label: StatusSnapshot::offline().provider_label,
            api_configured: false,
            pending_replies: 0,
            continuous_mode: false,
            voice_output_enabled,
            listening: false,
            speaking: false,
            mic_supported: true,
            user_label,
            has_photo,
        }
    }
}

/// Completion of one spawned transport call.
struct ReplyEvent {
    result: Result<String, ChatError>,
    elapsed_ms: u64,
}

/// Channel ends the coordinator consumes and drives. Built by the runtime.
pub struct CoordinatorChannels {
    pub ui_commands: mpsc::Receiver<UiCommand>,
    pub ui_state: watch::Sender<UiState>,
    pub capture_commands: mpsc::Sender<CaptureCommand>,
    pub capture_updates: mpsc::UnboundedReceiver<CaptureUpdate>,
    pub output_commands: mpsc::Sender<OutputCommand>,
    pub output_updates: mpsc::UnboundedReceiver<OutputUpdate>,
    pub transcript_events: mpsc::UnboundedReceiver<TranscriptEvent>,
    pub status_updates: watch::Receiver<StatusSnapshot>,
}

pub struct Coordinator {
    transcript: TranscriptStore,
    transport: Arc<dyn ChatTransport>,
    phases: SessionStateManager,
    metrics: SessionMetrics,
    shutdown: ShutdownToken,
    channels: CoordinatorChannels,
    replies_tx: mpsc::UnboundedSender<ReplyEvent>,
    replies_rx: mpsc::UnboundedReceiver<ReplyEvent>,

    input: String,
    voice_status: String,
    voice_tone: StatusTone,
    api_label: String,
    api_configured: bool,
    continuous: bool,
    /// Set by a final transcript, cleared when its spoken reply resolves
    processing: bool,
    denied: bool,
    output_enabled: bool,
    mic_supported: bool,
    capturing: bool,
    speaking: bool,
    pending_replies: u32,
    /// Single continuous-mode restart slot; arming while armed is a no-op
    restart_at: Option<Instant>,
    /// Single resume slot for the mic-toggle-while-speaking path
    resume_at: Option<Instant>,
    user_label: String,
    has_photo: bool,

    capture_open: bool,
    output_open: bool,
    transcript_open: bool,
    status_open: bool,
}

impl Coordinator {
    pub fn new(
        transcript: TranscriptStore,
        transport: Arc<dyn ChatTransport>,
        metrics: SessionMetrics,
        shutdown: ShutdownToken,
        profile: &Profile,
        output_enabled: bool,
        channels: CoordinatorChannels,
    ) -> Self {
        let status = channels.status_updates.borrow().clone();
        let (replies_tx, replies_rx) = mpsc::unbounded_channel();
        Self {
            transcript,
            transport,
            phases: SessionStateManager::new(),
            metrics,
            shutdown,
            channels,
            replies_tx,
            replies_rx,
            input: String::new(),
            voice_status: IDLE_PROMPT.to_string(),
            voice_tone: StatusTone::Idle,
            api_label: status.provider_label,
            api_configured: status.backend_configured,
            continuous: false,
            processing: false,
            denied: false,
            output_enabled,
            mic_supported: true,
            capturing: false,
            speaking: false,
            pending_replies: 0,
            restart_at: None,
            resume_at: None,
            user_label: profile.display_name().to_string(),
            has_photo: profile.has_photo(),
            capture_open: true,
            output_open: true,
            transcript_open: true,
            status_open: true,
        }
    }

    pub async fn run(mut self) {
        self.publish();
        loop {
            let restart_deadline = self.restart_at;
            let resume_deadline = self.resume_at;
            tokio::select! {
                maybe_cmd = self.channels.ui_commands.recv() => {
                    let Some(cmd) = maybe_cmd else { break };
                    self.handle_ui_command(cmd).await;
                }
                maybe_update = self.channels.capture_updates.recv(), if self.capture_open => {
                    match maybe_update {
                        Some(update) => self.handle_capture_update(update).await,
                        None => self.capture_open = false,
                    }
                }
                maybe_update = self.channels.output_updates.recv(), if self.output_open => {
                    match maybe_update {
                        Some(update) => self.handle_output_update(update),
                        None => self.output_open = false,
                    }
                }
                maybe_event = self.channels.transcript_events.recv(), if self.transcript_open => {
                    match maybe_event {
                        Some(event) => self.handle_transcript_event(event).await,
                        None => self.transcript_open = false,
                    }
                }
                Some(reply) = self.replies_rx.recv() => {
                    self.handle_reply(reply);
                }
                changed = self.channels.status_updates.changed(), if self.status_open => {
                    match changed {
                        Ok(()) => self.apply_status(),
                        Err(_) => self.status_open = false,
                    }
                }
                _ = tokio::time::sleep_until(restart_deadline.unwrap_or_else(Instant::now)),
                    if restart_deadline.is_some() =>
                {
                    self.restart_at = None;
                    self.fire_restart().await;
                }
                _ = tokio::time::sleep_until(resume_deadline.unwrap_or_else(Instant::now)),
                    if resume_deadline.is_some() =>
                {
                    self.resume_at = None;
                    self.fire_resume().await;
                }
                _ = self.shutdown.wait() => break,
            }
            self.sync_phase();
            self.publish();
        }
        debug!(target: "ui", "coordinator stopped");
    }

    async fn handle_ui_command(&mut self, cmd: UiCommand) {
        match cmd {
            UiCommand::InputChar(c) => self.input.push(c),
            UiCommand::InputBackspace => {
                self.input.pop();
            }
            UiCommand::SubmitInput => self.submit_input().await,
            UiCommand::ToggleMic => self.toggle_mic().await,
            UiCommand::ToggleContinuous => self.toggle_continuous().await,
            UiCommand::ToggleVoiceOutput => self.toggle_voice_output().await,
        }
    }

    /// Shared submission path for typed and recognized input. Consumes the
    /// input box, so an edited transcript is sent as edited.
    async fn submit_input(&mut self) {
        let text = self.input.trim().to_string();
        if text.is_empty() {
            return;
        }
        if self.capturing {
            self.capturing = false;
            let _ = self
                .channels
                .capture_commands
                .send(CaptureCommand::Stop)
                .await;
        }
        self.transcript.append_user(text.clone());
        self.input.clear();
        self.pending_replies += 1;
        self.metrics.messages_sent.fetch_add(1, Ordering::Relaxed);

        let transport = Arc::clone(&self.transport);
        let replies = self.replies_tx.clone();
        tokio::spawn(async move {
            let started = Instant::now();
            let result = transport.send(&text).await;
            let _ = replies.send(ReplyEvent {
                result,
                elapsed_ms: started.elapsed().as_millis() as u64,
            });
        });
    }

    fn handle_reply(&mut self, reply: ReplyEvent) {
        self.pending_replies = self.pending_replies.saturating_sub(1);
        match reply.result {
            Ok(text) => {
                self.metrics.record_reply(reply.elapsed_ms);
                self.transcript.append_assistant(&text);
            }
            Err(e) => {
                match &e {
                    ChatError::Network(_) => {
                        self.metrics.network_errors.fetch_add(1, Ordering::Relaxed);
                    }
                    ChatError::Application(_) | ChatError::MissingResponse => {
                        self.metrics
                            .application_errors
                            .fetch_add(1, Ordering::Relaxed);
                    }
                }
                // The raw error goes to the log; the transcript gets the
                // canned fallback line
                error!(target: "chat", "chat request failed: {}", e);
                self.transcript.append_assistant(e.user_facing_fallback());
            }
        }
    }

    async fn handle_capture_update(&mut self, update: CaptureUpdate) {
        match update {
            CaptureUpdate::Started { session_id } => {
                debug!(target: "ui", session_id, "capture started");
                self.capturing = true;
                self.set_status("Listening...", StatusTone::Listening);
            }
            CaptureUpdate::Interim { text, .. } => {
                self.input = text;
            }
            CaptureUpdate::Final { text, .. } => {
                self.input = text.clone();
                self.set_status(format!("Recognized: \"{}\"", text), StatusTone::Processing);
                self.processing = true;
            }
            CaptureUpdate::Submit { session_id, text } => {
                debug!(target: "ui", session_id, "submitting recognized text: {:?}", text);
                self.submit_input().await;
            }
            CaptureUpdate::Denied { resurfaced } => {
                self.denied = true;
                self.capturing = false;
                if resurfaced {
                    self.set_status(
                        "Microphone access denied. Please allow microphone access and reload the page.",
                        StatusTone::Error,
                    );
                } else {
                    self.set_status(
                        "Microphone access denied. Please allow microphone access.",
                        StatusTone::Error,
                    );
                }
            }
            CaptureUpdate::Failed(CaptureFailure::StartRejected) => {
                self.set_status(
                    "Failed to start voice recognition. Please try again.",
                    StatusTone::Error,
                );
            }
            CaptureUpdate::Failed(CaptureFailure::Session { session_id, error }) => {
                warn!(target: "ui", session_id, "capture error: {}", error);
                self.capturing = false;
                self.set_status(
                    format!("Error: {}. Try again.", error.code()),
                    StatusTone::Error,
                );
            }
            CaptureUpdate::Ended { session_id } => {
                debug!(target: "ui", session_id, "capture ended");
                self.capturing = false;
                if self.continuous && !self.processing && !self.speaking && !self.denied {
                    self.arm_restart();
                } else if !self.processing && !self.continuous && !self.speaking {
                    self.set_status(IDLE_PROMPT, StatusTone::Idle);
                }
            }
            CaptureUpdate::Stopped { session_id } => {
                debug!(target: "ui", session_id, "capture stopped");
                self.capturing = false;
            }
            CaptureUpdate::Unavailable => {
                self.mic_supported = false;
                self.set_status(
                    "Voice recognition not supported on this system",
                    StatusTone::Error,
                );
            }
        }
    }

    fn handle_output_update(&mut self, update: OutputUpdate) {
        match update {
            OutputUpdate::VoiceReady { name } => {
                // Text only; the tone keeps whatever state set it last
                self.voice_status = format!("Voice ready: {}", name);
            }
            OutputUpdate::Started { synthesis_id } => {
                debug!(target: "ui", synthesis_id, "speech started");
                self.speaking = true;
                self.set_status("Speaking...", StatusTone::Speaking);
            }
            OutputUpdate::Finished { synthesis_id } => {
                debug!(target: "ui", synthesis_id, "speech finished");
                self.speaking = false;
                self.processing = false;
                if self.continuous && !self.capturing {
                    self.arm_restart();
                } else {
                    self.set_status(IDLE_PROMPT, StatusTone::Idle);
                }
            }
            OutputUpdate::Failed { synthesis_id } => {
                // Cleanup only, no restart and no status line change
                warn!(target: "ui", synthesis_id, "speech failed");
                self.speaking = false;
                self.processing = false;
            }
            OutputUpdate::Cancelled { synthesis_id } => {
                debug!(target: "ui", synthesis_id, "speech cancelled");
                self.speaking = false;
                self.processing = false;
            }
        }
    }

    async fn handle_transcript_event(&mut self, event: TranscriptEvent) {
        match event {
            TranscriptEvent::AssistantAppended { id, text } => {
                debug!(target: "ui", id, "offering assistant reply for speech");
                let _ = self
                    .channels
                    .output_commands
                    .send(OutputCommand::Speak { text })
                    .await;
            }
        }
    }

    async fn toggle_mic(&mut self) {
        if !self.mic_supported {
            debug!(target: "ui", "mic toggle ignored, no recognizer");
            return;
        }
        if self.speaking {
            let _ = self.channels.output_commands.send(OutputCommand::Cancel).await;
            self.set_status("Speech stopped", StatusTone::Idle);
            if self.resume_at.is_none() {
                self.resume_at = Some(Instant::now() + RESUME_DELAY);
            }
            return;
        }
        if self.capturing {
            self.capturing = false;
            let _ = self
                .channels
                .capture_commands
                .send(CaptureCommand::Stop)
                .await;
            // Stopping the mic by hand also leaves hands-free mode
            self.continuous = false;
        } else {
            let _ = self
                .channels
                .capture_commands
                .send(CaptureCommand::Start)
                .await;
        }
    }

    async fn toggle_continuous(&mut self) {
        if !self.mic_supported {
            debug!(target: "ui", "continuous toggle ignored, no recognizer");
            return;
        }
        self.continuous = !self.continuous;
        if self.continuous {
            self.set_status("Continuous voice mode enabled", StatusTone::Listening);
            if !self.capturing && !self.speaking {
                let _ = self
                    .channels
                    .capture_commands
                    .send(CaptureCommand::Start)
                    .await;
            }
        } else {
            self.set_status(IDLE_PROMPT, StatusTone::Idle);
            if self.capturing {
                self.capturing = false;
                let _ = self
                    .channels
                    .capture_commands
                    .send(CaptureCommand::Stop)
                    .await;
            }
        }
    }

    async fn toggle_voice_output(&mut self) {
        self.output_enabled = !self.output_enabled;
        let _ = self
            .channels
            .output_commands
            .send(OutputCommand::SetEnabled(self.output_enabled))
            .await;
    }

    /// Arms the single restart slot. An already armed slot keeps its
    /// earlier deadline, which is what makes the restart exactly-once.
    fn arm_restart(&mut self) {
        if self.restart_at.is_none() {
            self.restart_at = Some(Instant::now() + RESTART_DELAY);
        }
    }

    async fn fire_restart(&mut self) {
        if self.capturing || self.speaking || self.denied {
            debug!(target: "ui", "continuous restart dropped, session busy");
            return;
        }
        let _ = self
            .channels
            .capture_commands
            .send(CaptureCommand::Start)
            .await;
    }

    async fn fire_resume(&mut self) {
        if self.capturing || self.speaking {
            debug!(target: "ui", "capture resume dropped, session busy");
            return;
        }
        let _ = self
            .channels
            .capture_commands
            .send(CaptureCommand::Start)
            .await;
    }

    fn apply_status(&mut self) {
        let snapshot = self.channels.status_updates.borrow_and_update().clone();
        self.api_label = snapshot.provider_label;
        self.api_configured = snapshot.backend_configured;
    }

    fn set_status(&mut self, text: impl Into<String>, tone: StatusTone) {
        self.voice_status = text.into();
        self.voice_tone = tone;
    }

    fn sync_phase(&mut self) {
        let phase = if self.speaking {
            SessionPhase::Speaking
        } else if self.processing {
            SessionPhase::Processing
        } else if self.capturing {
            SessionPhase::Listening
        } else {
            SessionPhase::Idle
        };
        if let Err(e) = self.phases.transition(phase) {
            warn!(target: "ui", "phase bookkeeping rejected: {}", e);
        }
    }

    fn publish(&self) {
        let snapshot = UiState {
            messages: self.transcript.messages().to_vec(),
            input: self.input.clone(),
            voice_status: self.voice_status.clone(),
            voice_tone: self.voice_tone,
            api_label: self.api_label.clone(),
            api_configured: self.api_configured,
            pending_replies: self.pending_replies,
            continuous_mode: self.continuous,
            voice_output_enabled: self.output_enabled,
            listening: self.capturing,
            speaking: self.speaking,
            mic_supported: self.mic_supported,
            user_label: self.user_label.clone(),
            has_photo: self.has_photo,
        };
        if self.channels.ui_state.send(snapshot).is_err() {
            debug!(target: "ui", "ui state receiver dropped");
        }
    }
}
