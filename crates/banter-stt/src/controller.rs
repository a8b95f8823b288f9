//! Capture controller
//!
//! Task-owned state machine between the UI and the recognizer engine.
//! Translates engine events into capture updates, owns the sticky
//! permission denial, and delays submission of final transcripts.

use std::sync::atomic::Ordering;

use banter_telemetry::SessionMetrics;
use tokio::sync::mpsc;
use tokio::time::{Duration, Instant};
use tracing::{debug, warn};

use crate::next_session_id;
use crate::recognizer::SpeechRecognizer;
use crate::types::{RecognitionConfig, RecognitionError, RecognitionEvent};

/// Delay between a final transcript and its submission.
pub const SUBMIT_DELAY: Duration = Duration::from_millis(300);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureCommand {
    Start,
    Stop,
}

#[derive(Debug, Clone, PartialEq)]
pub enum CaptureFailure {
    /// Engine refused to open a session
    StartRejected,
    /// Active session reported an engine error code
    Session {
        session_id: u64,
        error: RecognitionError,
    },
}

/// Updates pushed to the coordinator.
#[derive(Debug, Clone, PartialEq)]
pub enum CaptureUpdate {
    Started { session_id: u64 },
    /// Running transcript, mirrored into the input box
    Interim { session_id: u64, text: String },
    /// Utterance complete; submission follows after `SUBMIT_DELAY`
    Final { session_id: u64, text: String },
    /// Submit whatever the input box holds now
    Submit { session_id: u64, text: String },
    /// Microphone permission refused; `resurfaced` when a start was
    /// attempted after the denial was already recorded
    Denied { resurfaced: bool },
    Failed(CaptureFailure),
    /// Session closed; the coordinator decides whether to restart
    Ended { session_id: u64 },
    /// Explicit stop acknowledged
    Stopped { session_id: u64 },
    /// No recognizer engine is usable; the mic control is inert
    Unavailable,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Idle,
    Listening,
    /// Final transcript received, session may still be open
    Finalizing,
}

struct PendingSubmit {
    session_id: u64,
    text: String,
    deadline: Instant,
}

pub struct CaptureController {
    recognizer: Option<Box<dyn SpeechRecognizer>>,
    config: RecognitionConfig,
    commands: mpsc::Receiver<CaptureCommand>,
    engine_events: mpsc::UnboundedReceiver<RecognitionEvent>,
    updates: mpsc::UnboundedSender<CaptureUpdate>,
    metrics: SessionMetrics,
    phase: Phase,
    /// Session the engine currently owns; kept through stop so late
    /// events (a final flushed after stop) are still honored
    engine_session: Option<u64>,
    denied: bool,
    pending_submit: Option<PendingSubmit>,
    events_open: bool,
}

impl CaptureController {
    pub fn new(
        recognizer: Option<Box<dyn SpeechRecognizer>>,
        config: RecognitionConfig,
        commands: mpsc::Receiver<CaptureCommand>,
        engine_events: mpsc::UnboundedReceiver<RecognitionEvent>,
        updates: mpsc::UnboundedSender<CaptureUpdate>,
        metrics: SessionMetrics,
    ) -> Self {
        Self {
            recognizer,
            config,
            commands,
            engine_events,
            updates,
            metrics,
            phase: Phase::Idle,
            engine_session: None,
            denied: false,
            pending_submit: None,
            events_open: true,
        }
    }

    pub async fn run(mut self) {
        if self.recognizer.is_none() {
            self.publish(CaptureUpdate::Unavailable);
        }
        loop {
            let submit_deadline = self.pending_submit.as_ref().map(|p| p.deadline);
            tokio::select! {
                maybe_cmd = self.commands.recv() => {
                    let Some(cmd) = maybe_cmd else { break };
                    match cmd {
                        CaptureCommand::Start => self.handle_start().await,
                        CaptureCommand::Stop => self.handle_stop().await,
                    }
                }
                maybe_event = self.engine_events.recv(), if self.events_open => {
                    match maybe_event {
                        Some(event) => self.handle_engine_event(event).await,
                        None => self.events_open = false,
                    }
                }
                _ = tokio::time::sleep_until(submit_deadline.unwrap_or_else(Instant::now)),
                    if submit_deadline.is_some() =>
                {
                    self.fire_submit();
                }
            }
        }
        debug!(target: "stt", "capture controller stopped");
    }

    async fn handle_start(&mut self) {
        let Some(recognizer) = self.recognizer.as_mut() else {
            debug!(target: "stt", "start ignored, no recognizer");
            return;
        };
        if self.denied {
            self.publish(CaptureUpdate::Denied { resurfaced: true });
            return;
        }
        if self.phase != Phase::Idle {
            debug!(target: "stt", "start ignored, capture already active");
            return;
        }

        let session_id = next_session_id();
        match recognizer.begin_capture(session_id, &self.config).await {
            Ok(()) => {
                self.phase = Phase::Listening;
                self.engine_session = Some(session_id);
                self.metrics
                    .recognition_sessions
                    .fetch_add(1, Ordering::Relaxed);
                self.metrics.set_listening(true);
                self.publish(CaptureUpdate::Started { session_id });
            }
            Err(e) => {
                warn!(target: "stt", session_id, "failed to start capture: {}", e);
                self.publish(CaptureUpdate::Failed(CaptureFailure::StartRejected));
            }
        }
    }

    async fn handle_stop(&mut self) {
        if self.phase == Phase::Idle {
            debug!(target: "stt", "stop ignored, not capturing");
            return;
        }
        self.request_engine_stop().await;
        self.phase = Phase::Idle;
        self.metrics.set_listening(false);
        if let Some(session_id) = self.engine_session {
            self.publish(CaptureUpdate::Stopped { session_id });
        }
    }

    async fn handle_engine_event(&mut self, event: RecognitionEvent) {
        match event {
            RecognitionEvent::Interim { session_id, text } => {
                if self.engine_session != Some(session_id) {
                    debug!(target: "stt", session_id, "dropping stale interim");
                    return;
                }
                self.publish(CaptureUpdate::Interim { session_id, text });
            }
            RecognitionEvent::Final {
                session_id,
                text,
                confidence,
            } => {
                if self.engine_session != Some(session_id) {
                    debug!(target: "stt", session_id, "dropping stale final");
                    return;
                }
                self.metrics
                    .final_transcripts
                    .fetch_add(1, Ordering::Relaxed);
                debug!(target: "stt", session_id, ?confidence, "final transcript: {:?}", text);
                if self.phase == Phase::Listening {
                    self.phase = Phase::Finalizing;
                }
                self.publish(CaptureUpdate::Final {
                    session_id,
                    text: text.clone(),
                });
                // One slot: a newer final replaces an armed submission
                self.pending_submit = Some(PendingSubmit {
                    session_id,
                    text,
                    deadline: Instant::now() + SUBMIT_DELAY,
                });
            }
            RecognitionEvent::Error { session_id, error } => {
                if self.engine_session != Some(session_id) {
                    debug!(target: "stt", session_id, "dropping stale error");
                    return;
                }
                self.metrics
                    .recognition_errors
                    .fetch_add(1, Ordering::Relaxed);
                if error == RecognitionError::NotAllowed {
                    self.denied = true;
                    self.publish(CaptureUpdate::Denied { resurfaced: false });
                } else {
                    warn!(target: "stt", session_id, code = error.code(), "capture error");
                    self.publish(CaptureUpdate::Failed(CaptureFailure::Session {
                        session_id,
                        error,
                    }));
                }
                // The engine is asked to close its session just like an
                // explicit stop, but no Stopped update is reported here
                if self.phase != Phase::Idle {
                    self.request_engine_stop().await;
                    self.phase = Phase::Idle;
                    self.metrics.set_listening(false);
                }
            }
            RecognitionEvent::Ended { session_id } => {
                if self.engine_session != Some(session_id) {
                    debug!(target: "stt", session_id, "dropping stale end");
                    return;
                }
                self.engine_session = None;
                self.phase = Phase::Idle;
                self.metrics.set_listening(false);
                self.publish(CaptureUpdate::Ended { session_id });
            }
        }
    }

    async fn request_engine_stop(&mut self) {
        if let Some(recognizer) = self.recognizer.as_mut() {
            if let Err(e) = recognizer.stop_capture().await {
                warn!(target: "stt", "engine stop failed: {}", e);
            }
        }
    }

    fn fire_submit(&mut self) {
        if let Some(p) = self.pending_submit.take() {
            self.publish(CaptureUpdate::Submit {
                session_id: p.session_id,
                text: p.text,
            });
        }
    }

    fn publish(&self, update: CaptureUpdate) {
        if self.updates.send(update).is_err() {
            debug!(target: "stt", "capture update receiver dropped");
        }
    }
}
