use config::{Config, Environment, File};
use serde::Deserialize;
use std::path::Path;
use tracing;

#[derive(Debug, Clone, Deserialize)]
pub struct BackendSettings {
    pub base_url: String,
}

impl Default for BackendSettings {
    fn default() -> Self {
        BackendSettings {
            base_url: "http://127.0.0.1:8000".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct VoiceSettings {
    /// Capture engine: "mock", "noop" or "none"
    pub recognizer: String,
    /// Synthesis engine: "espeak", "mock", "noop" or "auto"
    pub synthesizer: String,
    pub output_enabled: bool,
    pub language: String,
}

impl Default for VoiceSettings {
    fn default() -> Self {
        VoiceSettings {
            recognizer: "none".to_string(),
            synthesizer: "auto".to_string(),
            output_enabled: true,
            language: "en-US".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct UiSettings {
    pub profile_path: String,
}

impl Default for UiSettings {
    fn default() -> Self {
        UiSettings {
            profile_path: "profile.json".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub backend: BackendSettings,
    #[serde(default)]
    pub voice: VoiceSettings,
    #[serde(default)]
    pub ui: UiSettings,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            backend: BackendSettings::default(),
            voice: VoiceSettings::default(),
            ui: UiSettings::default(),
        }
    }
}

impl Settings {
    /// Load settings from a specific config file path (for tests)
    pub fn from_path(config_path: impl AsRef<Path>) -> Result<Self, String> {
        let mut builder = Config::builder();

        // Set defaults for required fields to prevent deserialization errors.
        builder = builder
            .set_default("backend.base_url", "http://127.0.0.1:8000")
            .unwrap()
            .set_default("voice.recognizer", "none")
            .unwrap()
            .set_default("voice.synthesizer", "auto")
            .unwrap()
            .set_default("voice.output_enabled", true)
            .unwrap()
            .set_default("voice.language", "en-US")
            .unwrap()
            .set_default("ui.profile_path", "profile.json")
            .unwrap();

        // Add the specific file source.
        builder = builder.add_source(File::from(config_path.as_ref()).required(true));

        // Add environment variables, which will override the file's settings.
        builder = builder.add_source(Environment::with_prefix("BANTER").separator("__"));

        // Build and deserialize
        let config = builder
            .build()
            .map_err(|e| format!("Failed to build config: {}", e))?;

        let mut settings: Settings = config
            .try_deserialize()
            .map_err(|e| format!("Failed to deserialize settings: {}", e))?;

        // Validate the final settings
        settings.validate().map_err(|e| e.to_string())?;

        Ok(settings)
    }

    pub fn new() -> Result<Self, String> {
        let mut builder = Config::builder();

        // Set defaults for required fields to prevent deserialization errors
        // if no config file is found.
        builder = builder
            .set_default("backend.base_url", "http://127.0.0.1:8000")
            .unwrap()
            .set_default("voice.recognizer", "none")
            .unwrap()
            .set_default("voice.synthesizer", "auto")
            .unwrap()
            .set_default("voice.output_enabled", true)
            .unwrap()
            .set_default("voice.language", "en-US")
            .unwrap()
            .set_default("ui.profile_path", "profile.json")
            .unwrap();

        // Find and add config file source.
        let config_path = Path::new("config/default.toml");
        if config_path.exists() {
            tracing::info!("Loading configuration from: {}", config_path.display());
            builder = builder.add_source(File::from(config_path).required(true));
        } else {
            tracing::warn!(
                "No configuration file at 'config/default.toml'. Using defaults and environment variables."
            );
        }

        // Add environment variables, which will override the file's settings.
        builder = builder.add_source(Environment::with_prefix("BANTER").separator("__"));

        // Build and deserialize
        let config = builder
            .build()
            .map_err(|e| format!("Failed to build config: {}", e))?;

        let mut settings: Settings = config
            .try_deserialize()
            .map_err(|e| format!("Failed to deserialize settings: {}", e))?;

        // Validate the final settings
        settings.validate().map_err(|e| e.to_string())?;

        Ok(settings)
    }

    pub fn validate(&mut self) -> Result<(), String> {
        let mut errors = Vec::new();

        // Validate backend.base_url
        if self.backend.base_url.trim().is_empty() {
            errors.push("backend.base_url must not be empty".to_string());
        } else if !self.backend.base_url.starts_with("http://")
            && !self.backend.base_url.starts_with("https://")
        {
            tracing::warn!(
                "backend.base_url '{}' has no scheme. Assuming http.",
                self.backend.base_url
            );
            self.backend.base_url = format!("http://{}", self.backend.base_url);
        }

        // Validate voice.recognizer
        if !["mock", "noop", "none"].contains(&self.voice.recognizer.to_lowercase().as_str()) {
            tracing::warn!(
                "Invalid voice.recognizer '{}'. Defaulting to 'none'.",
                self.voice.recognizer
            );
            self.voice.recognizer = "none".to_string();
        }

        // Validate voice.synthesizer
        if !["espeak", "mock", "noop", "auto"]
            .contains(&self.voice.synthesizer.to_lowercase().as_str())
        {
            tracing::warn!(
                "Invalid voice.synthesizer '{}'. Defaulting to 'auto'.",
                self.voice.synthesizer
            );
            self.voice.synthesizer = "auto".to_string();
        }

        // Validate voice.language
        if self.voice.language.trim().is_empty() {
            tracing::warn!("Empty voice.language. Defaulting to 'en-US'.");
            self.voice.language = "en-US".to_string();
        }

        if !errors.is_empty() {
            let error_msg = format!("Critical config validation errors: {:?}", errors);
            return Err(error_msg);
        }

        Ok(())
    }
}

pub mod coordinator;
pub mod profile;
pub mod runtime;
pub mod tui;
