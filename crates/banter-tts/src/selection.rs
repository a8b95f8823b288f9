//! Voice selection cascade
//!
//! Picks the voice used for assistant replies from whatever the engine
//! offers, preferring an English female voice.

use crate::types::{VoiceGender, VoiceInfo};

/// Given names commonly attached to platform female voices.
pub const FEMALE_NAME_HINTS: [&str; 6] =
    ["samantha", "lisa", "victoria", "karen", "moira", "zira"];

/// Choose a voice, in priority order:
/// 1. an English voice signalled female, by name or by gender metadata
/// 2. an English voice carrying a known female given name
/// 3. any English voice
/// 4. the first voice
///
/// Returns `None` only for an empty voice list.
pub fn choose_voice(voices: &[VoiceInfo]) -> Option<&VoiceInfo> {
    voices
        .iter()
        .find(|v| is_english(v) && signals_female(v))
        .or_else(|| {
            FEMALE_NAME_HINTS.iter().find_map(|hint| {
                voices
                    .iter()
                    .find(|v| is_english(v) && v.name.to_lowercase().contains(hint))
            })
        })
        .or_else(|| voices.iter().find(|v| is_english(v)))
        .or_else(|| voices.first())
}

fn is_english(voice: &VoiceInfo) -> bool {
    voice.language.starts_with("en")
}

fn signals_female(voice: &VoiceInfo) -> bool {
    voice.name.to_lowercase().contains("female") || voice.gender == Some(VoiceGender::Female)
}
