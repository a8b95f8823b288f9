//! Error types for speech synthesis

use thiserror::Error;

#[derive(Debug, Error)]
pub enum TtsError {
    #[error("Engine not available: {0}")]
    EngineNotAvailable(String),

    #[error("Initialization failed: {0}")]
    InitializationFailed(String),

    #[error("Synthesis failed: {0}")]
    SynthesisFailed(String),

    #[error("Voice not found: {0}")]
    VoiceNotFound(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type TtsResult<T> = Result<T, TtsError>;
