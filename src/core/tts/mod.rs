mod base;
pub mod deepgram;
pub mod elevenlabs;
pub mod provider;

use std::sync::Arc;

use tracing::{info, warn};

pub use base::{
    AudioEncoding, SpeechSynthesizer, SynthesizedAudio, TTSConfig, TTSError, TTSResult,
    TtsProviderKind,
};
pub use deepgram::{DEEPGRAM_TTS_URL, DEFAULT_DEEPGRAM_TTS_MODEL, DeepgramTTS};
pub use elevenlabs::{DEFAULT_ELEVENLABS_MODEL, ELEVENLABS_TTS_URL, ElevenLabsTTS};
pub use provider::{HttpSynthesizer, TTSRequestBuilder};

/// Everything needed to choose and build the deployment's synthesizer.
#[derive(Debug, Clone, Default)]
pub struct SynthesizerSettings {
    pub provider: TtsProviderKind,
    /// Play through the primary provider when the selected one cannot
    /// produce telephony audio
    pub fallback_to_primary: bool,
    pub primary: TTSConfig,
    pub secondary: TTSConfig,
}

/// Build the synthesizer every call of this process uses.
///
/// The media stream only plays 8 kHz μ-law. Selecting a provider whose
/// output needs transcoding is a configuration error unless
/// `fallback_to_primary` is set, in which case the primary provider is used
/// and a warning is logged.
pub fn create_synthesizer(settings: &SynthesizerSettings) -> TTSResult<Arc<dyn SpeechSynthesizer>> {
    let synthesizer: Arc<dyn SpeechSynthesizer> = match settings.provider {
        TtsProviderKind::Primary => Arc::new(DeepgramTTS::from_config(settings.primary.clone())?),
        TtsProviderKind::Secondary => {
            let secondary = ElevenLabsTTS::from_config(settings.secondary.clone())?;
            let encoding = secondary.output_encoding();
            if encoding.is_telephony_ready() {
                Arc::new(secondary)
            } else if settings.fallback_to_primary {
                warn!(
                    provider = secondary.provider_info(),
                    encoding = encoding.as_str(),
                    "Secondary TTS output cannot be played on the call, using primary provider"
                );
                Arc::new(DeepgramTTS::from_config(settings.primary.clone())?)
            } else {
                return Err(TTSError::UnsupportedOutputFormat(format!(
                    "{} produces {} audio but the media stream requires {}",
                    secondary.provider_info(),
                    encoding.as_str(),
                    AudioEncoding::Mulaw8k.as_str()
                )));
            }
        }
    };

    info!(
        provider = synthesizer.provider_info(),
        "Speech synthesizer configured"
    );
    Ok(synthesizer)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings(provider: TtsProviderKind, fallback: bool) -> SynthesizerSettings {
        SynthesizerSettings {
            provider,
            fallback_to_primary: fallback,
            primary: TTSConfig {
                api_key: "dg_key".to_string(),
                ..Default::default()
            },
            secondary: TTSConfig {
                api_key: "el_key".to_string(),
                voice_id: Some("voice".to_string()),
                ..Default::default()
            },
        }
    }

    #[test]
    fn test_primary_is_used_directly() {
        let tts = create_synthesizer(&settings(TtsProviderKind::Primary, false)).unwrap();
        assert_eq!(tts.provider_info(), "Deepgram Aura TTS");
    }

    #[test]
    fn test_secondary_without_fallback_is_rejected() {
        match create_synthesizer(&settings(TtsProviderKind::Secondary, false)) {
            Err(TTSError::UnsupportedOutputFormat(message)) => {
                assert!(message.contains("mp3"));
            }
            Err(other) => panic!("Unexpected error {other:?}"),
            Ok(_) => panic!("Secondary provider should be rejected"),
        }
    }

    #[test]
    fn test_secondary_with_fallback_uses_primary() {
        let tts = create_synthesizer(&settings(TtsProviderKind::Secondary, true)).unwrap();
        assert_eq!(tts.provider_info(), "Deepgram Aura TTS");
        assert_eq!(tts.output_encoding(), AudioEncoding::Mulaw8k);
    }

    #[test]
    fn test_secondary_config_errors_surface_first() {
        let mut settings = settings(TtsProviderKind::Secondary, true);
        settings.secondary.voice_id = None;
        assert!(matches!(
            create_synthesizer(&settings),
            Err(TTSError::InvalidConfiguration(_))
        ));
    }
}
