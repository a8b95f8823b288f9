//! Core types for speech capture

use std::fmt;

/// Capture session configuration
#[derive(Debug, Clone)]
pub struct RecognitionConfig {
    /// BCP-47 language tag for the session
    pub language: String,
    /// Emit interim transcripts while speech is ongoing
    pub interim_results: bool,
}

impl Default for RecognitionConfig {
    fn default() -> Self {
        Self {
            language: "en-US".to_string(),
            interim_results: true,
        }
    }
}

/// Error codes a recognizer session can report.
///
/// The set mirrors the codes native engines emit; anything outside it is
/// carried verbatim in `Other`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecognitionError {
    /// Microphone permission refused. Treated as sticky for the process.
    NotAllowed,
    NoSpeech,
    AudioCapture,
    Network,
    Aborted,
    Other(String),
}

impl RecognitionError {
    /// The wire-format code string, shown verbatim in error status lines.
    pub fn code(&self) -> &str {
        match self {
            RecognitionError::NotAllowed => "not-allowed",
            RecognitionError::NoSpeech => "no-speech",
            RecognitionError::AudioCapture => "audio-capture",
            RecognitionError::Network => "network",
            RecognitionError::Aborted => "aborted",
            RecognitionError::Other(code) => code,
        }
    }
}

impl fmt::Display for RecognitionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// Events a recognizer engine pushes during a capture session.
///
/// Engines always close a session with `Ended`, including after `Error`.
#[derive(Debug, Clone, PartialEq)]
pub enum RecognitionEvent {
    /// Ongoing speech, full running transcript so far
    Interim { session_id: u64, text: String },
    /// Utterance complete
    Final {
        session_id: u64,
        text: String,
        /// Confidence score (0.0-1.0) if the engine reports one
        confidence: Option<f32>,
    },
    /// Session failed with an engine error code
    Error {
        session_id: u64,
        error: RecognitionError,
    },
    /// Session closed, naturally or after stop/error
    Ended { session_id: u64 },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_codes_match_wire_strings() {
        assert_eq!(RecognitionError::NotAllowed.code(), "not-allowed");
        assert_eq!(RecognitionError::NoSpeech.code(), "no-speech");
        assert_eq!(
            RecognitionError::Other("service-not-allowed".to_string()).code(),
            "service-not-allowed"
        );
        assert_eq!(RecognitionError::Network.to_string(), "network");
    }

    #[test]
    fn default_config_targets_english_with_interims() {
        let config = RecognitionConfig::default();
        assert_eq!(config.language, "en-US");
        assert!(config.interim_results);
    }
}
