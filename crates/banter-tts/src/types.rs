//! Core types for speech synthesis

/// Voice information
#[derive(Debug, Clone, PartialEq)]
pub struct VoiceInfo {
    /// Unique voice identifier
    pub id: String,
    /// Human-readable voice name
    pub name: String,
    /// Language code (e.g. "en-US", "fr")
    pub language: String,
    /// Gender if the engine reports one
    pub gender: Option<VoiceGender>,
}

/// Voice gender categories
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VoiceGender {
    Male,
    Female,
    Neutral,
    Unknown,
}

/// Utterance prosody, browser-style multipliers with 1.0 as neutral.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Prosody {
    pub pitch: f32,
    pub rate: f32,
    pub volume: f32,
}

impl Default for Prosody {
    fn default() -> Self {
        Self {
            pitch: 1.0,
            rate: 1.0,
            volume: 1.0,
        }
    }
}

/// One synthesis request
#[derive(Debug, Clone, PartialEq)]
pub struct UtteranceRequest {
    pub text: String,
    pub voice_id: Option<String>,
    pub prosody: Prosody,
}
