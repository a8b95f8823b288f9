//! eSpeak speech output engine
//!
//! Spawns the espeak (or espeak-ng) binary once per utterance and lets it
//! play through the system audio path. A waiter task per utterance reports
//! completion, failure, or cancellation into the engine event channel.

use async_trait::async_trait;
use banter_tts::{
    SpeechSynthesizer, SynthesisEvent, SynthesizerFactory, TtsError, TtsResult, UtteranceRequest,
    VoiceGender, VoiceInfo,
};
use regex::Regex;
use tokio::process::Command;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, warn};

mod tests;

/// Baseline espeak speed in words per minute; prosody rate multiplies this.
const BASE_RATE_WPM: f32 = 180.0;

#[derive(Debug)]
pub struct EspeakSynthesizer {
    command: Option<String>,
    voices: Vec<VoiceInfo>,
    events: mpsc::UnboundedSender<SynthesisEvent>,
    active: Option<ActiveUtterance>,
}

#[derive(Debug)]
struct ActiveUtterance {
    synthesis_id: u64,
    kill: oneshot::Sender<()>,
}

impl EspeakSynthesizer {
    pub fn new(events: mpsc::UnboundedSender<SynthesisEvent>) -> Self {
        Self {
            command: None,
            voices: Vec::new(),
            events,
            active: None,
        }
    }

    /// Resolve the binary name, preferring espeak over espeak-ng
    async fn resolve_command() -> Option<String> {
        for cmd in ["espeak", "espeak-ng"] {
            if Command::new(cmd).arg("--version").output().await.is_ok() {
                return Some(cmd.to_string());
            }
        }
        None
    }

    fn build_args(&self, request: &UtteranceRequest) -> Vec<String> {
        let mut args = Vec::new();
        if let Some(voice_id) = &request.voice_id {
            args.push("-v".to_string());
            args.push(voice_id.clone());
        }
        let rate = (request.prosody.rate * BASE_RATE_WPM) as u32;
        args.push("-s".to_string());
        args.push(rate.to_string());
        // espeak pitch runs 0-99 with 50 as neutral
        let pitch = ((request.prosody.pitch * 50.0) as u32).min(100);
        args.push("-p".to_string());
        args.push(pitch.to_string());
        // espeak amplitude runs 0-200 with 100 as neutral
        let volume = ((request.prosody.volume * 100.0) as u32).min(200);
        args.push("-a".to_string());
        args.push(volume.to_string());
        args.push(request.text.clone());
        args
    }

    fn stop_active(&mut self) {
        if let Some(active) = self.active.take() {
            debug!(target: "tts", synthesis_id = active.synthesis_id, "stopping espeak utterance");
            // Send fails only if the waiter already finished on its own
            let _ = active.kill.send(());
        }
    }
}

#[async_trait]
impl SpeechSynthesizer for EspeakSynthesizer {
    fn name(&self) -> &str {
        "espeak"
    }

    async fn initialize(&mut self) -> TtsResult<()> {
        let cmd = Self::resolve_command().await.ok_or_else(|| {
            TtsError::EngineNotAvailable(
                "espeak not found, install espeak or espeak-ng".to_string(),
            )
        })?;
        let output = Command::new(&cmd)
            .arg("--voices")
            .output()
            .await
            .map_err(|e| TtsError::InitializationFailed(format!("failed to list voices: {e}")))?;
        self.voices = parse_voice_list(&String::from_utf8_lossy(&output.stdout));
        debug!(target: "tts", command = %cmd, voices = self.voices.len(), "espeak ready");
        self.command = Some(cmd);
        Ok(())
    }

    async fn list_voices(&self) -> TtsResult<Vec<VoiceInfo>> {
        Ok(self.voices.clone())
    }

    async fn speak(&mut self, synthesis_id: u64, request: &UtteranceRequest) -> TtsResult<()> {
        if request.text.trim().is_empty() {
            return Err(TtsError::SynthesisFailed("empty utterance text".to_string()));
        }
        let cmd = self
            .command
            .clone()
            .ok_or_else(|| TtsError::EngineNotAvailable("espeak not initialized".to_string()))?;
        self.stop_active();

        let args = self.build_args(request);
        debug!(target: "tts", synthesis_id, command = %cmd, "starting espeak");
        let mut child = Command::new(&cmd)
            .args(&args)
            .stdout(std::process::Stdio::null())
            .stderr(std::process::Stdio::null())
            .spawn()
            .map_err(|e| TtsError::SynthesisFailed(format!("failed to spawn {cmd}: {e}")))?;

        let (kill_tx, kill_rx) = oneshot::channel();
        let events = self.events.clone();
        tokio::spawn(async move {
            tokio::select! {
                status = child.wait() => {
                    let event = match status {
                        Ok(s) if s.success() => SynthesisEvent::Completed { synthesis_id },
                        Ok(s) => SynthesisEvent::Failed {
                            synthesis_id,
                            error: format!("espeak exited with {s}"),
                        },
                        Err(e) => SynthesisEvent::Failed {
                            synthesis_id,
                            error: format!("failed to wait on espeak: {e}"),
                        },
                    };
                    let _ = events.send(event);
                }
                _ = kill_rx => {
                    if let Err(e) = child.kill().await {
                        warn!(target: "tts", synthesis_id, "failed to kill espeak: {}", e);
                    }
                    let _ = events.send(SynthesisEvent::Cancelled { synthesis_id });
                }
            }
        });

        self.active = Some(ActiveUtterance {
            synthesis_id,
            kill: kill_tx,
        });
        Ok(())
    }

    async fn stop(&mut self) -> TtsResult<()> {
        self.stop_active();
        Ok(())
    }
}

/// Parse `espeak --voices` output
///
/// Column layout: Pty Language Age/Gender VoiceName File Other
/// Example: ` 5  en             M  default              default`
fn parse_voice_list(output: &str) -> Vec<VoiceInfo> {
    let row = Regex::new(r"^\s*(\d+)\s+([\w-]+)\s+([MF\+]?)\s+([\w\-_]+)\s+").unwrap();
    let mut voices = Vec::new();
    for line in output.lines().skip(1) {
        if let Some(caps) = row.captures(line) {
            let language = caps.get(2).map_or("unknown", |m| m.as_str()).to_string();
            let gender = match caps.get(3).map_or("", |m| m.as_str()) {
                "M" => Some(VoiceGender::Male),
                "F" => Some(VoiceGender::Female),
                _ => Some(VoiceGender::Unknown),
            };
            let voice_id = caps.get(4).map_or("unknown", |m| m.as_str()).to_string();
            voices.push(VoiceInfo {
                id: voice_id.clone(),
                name: format!("{language} ({voice_id})"),
                language,
                gender,
            });
        }
    }
    voices
}

/// Factory for the espeak engine
pub struct EspeakSynthesizerFactory;

impl SynthesizerFactory for EspeakSynthesizerFactory {
    fn create(
        &self,
        events: mpsc::UnboundedSender<SynthesisEvent>,
    ) -> TtsResult<Box<dyn SpeechSynthesizer>> {
        Ok(Box::new(EspeakSynthesizer::new(events)))
    }

    fn engine_id(&self) -> &str {
        "espeak"
    }

    fn check_requirements(&self) -> TtsResult<()> {
        for cmd in ["espeak", "espeak-ng"] {
            if std::process::Command::new(cmd)
                .arg("--version")
                .output()
                .is_ok()
            {
                return Ok(());
            }
        }
        Err(TtsError::EngineNotAvailable(
            "espeak binary not on PATH".to_string(),
        ))
    }
}
