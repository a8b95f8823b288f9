//! Tests for the espeak engine

#[cfg(test)]
mod tests {
    use crate::{parse_voice_list, EspeakSynthesizer, EspeakSynthesizerFactory};
    use banter_tts::{
        Prosody, SpeechSynthesizer, SynthesizerFactory, UtteranceRequest, VoiceGender,
    };
    use tokio::sync::mpsc;

    #[tokio::test]
    async fn engine_reports_name_and_starts_with_no_voices() {
        let (tx, _rx) = mpsc::unbounded_channel();
        let engine = EspeakSynthesizer::new(tx);
        assert_eq!(engine.name(), "espeak");
        assert!(engine.list_voices().await.unwrap().is_empty());
    }

    #[test]
    fn requirement_check_does_not_panic() {
        // The test host may or may not have espeak installed
        let _ = EspeakSynthesizerFactory.check_requirements();
        assert_eq!(EspeakSynthesizerFactory.engine_id(), "espeak");
    }

    #[test]
    fn voice_list_parsing_reads_language_gender_and_id() {
        let output = "\
Pty Language       Age/Gender VoiceName          File                 Other Languages
 5  af              M  afrikaans            other/af
 5  en              M  default              default
 2  en-gb           F  english              en                   (en 2)
";
        let voices = parse_voice_list(output);
        assert_eq!(voices.len(), 3);

        assert_eq!(voices[1].id, "default");
        assert_eq!(voices[1].language, "en");
        assert_eq!(voices[1].gender, Some(VoiceGender::Male));
        assert_eq!(voices[1].name, "en (default)");

        assert_eq!(voices[2].id, "english");
        assert_eq!(voices[2].language, "en-gb");
        assert_eq!(voices[2].gender, Some(VoiceGender::Female));
    }

    #[test]
    fn prosody_maps_to_espeak_flags() {
        let (tx, _rx) = mpsc::unbounded_channel();
        let engine = EspeakSynthesizer::new(tx);
        let request = UtteranceRequest {
            text: "hello there".to_string(),
            voice_id: Some("en-gb".to_string()),
            prosody: Prosody {
                pitch: 1.1,
                rate: 1.0,
                volume: 1.0,
            },
        };
        assert_eq!(
            engine.build_args(&request),
            vec!["-v", "en-gb", "-s", "180", "-p", "55", "-a", "100", "hello there"]
        );
    }

    #[test]
    fn extreme_prosody_values_are_clamped() {
        let (tx, _rx) = mpsc::unbounded_channel();
        let engine = EspeakSynthesizer::new(tx);
        let request = UtteranceRequest {
            text: "x".to_string(),
            voice_id: None,
            prosody: Prosody {
                pitch: 9.0,
                rate: 1.0,
                volume: 9.0,
            },
        };
        let args = engine.build_args(&request);
        let pitch = args.iter().position(|a| a == "-p").unwrap() + 1;
        assert_eq!(args[pitch], "100");
        let volume = args.iter().position(|a| a == "-a").unwrap() + 1;
        assert_eq!(args[volume], "200");
        assert!(!args.contains(&"-v".to_string()));
    }

    #[tokio::test]
    async fn speaking_before_initialization_errors() {
        let (tx, _rx) = mpsc::unbounded_channel();
        let mut engine = EspeakSynthesizer::new(tx);
        let request = UtteranceRequest {
            text: "hello".to_string(),
            voice_id: None,
            prosody: Prosody::default(),
        };
        assert!(engine.speak(1, &request).await.is_err());
    }

    #[tokio::test]
    async fn empty_text_is_rejected() {
        let (tx, _rx) = mpsc::unbounded_channel();
        let mut engine = EspeakSynthesizer::new(tx);
        let request = UtteranceRequest {
            text: "   ".to_string(),
            voice_id: None,
            prosody: Prosody::default(),
        };
        assert!(engine.speak(1, &request).await.is_err());
    }
}
