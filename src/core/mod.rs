pub mod codec;
pub mod llm;
pub mod session;
pub mod stt;
pub mod transport;
pub mod tts;
pub mod turn;

// Re-export commonly used types for convenience
pub use stt::{
    DeepgramRecognizerFactory, DeepgramSTT, DeepgramSTTConfig, RecognizerEvent, STTConfig,
    STTError, STTResult, SpeechRecognizer,
};

pub use tts::{
    AudioEncoding, DeepgramTTS, ElevenLabsTTS, SpeechSynthesizer, SynthesizerSettings, TTSConfig,
    TTSError, TTSResult, TtsProviderKind, create_synthesizer,
};

pub use llm::{AnthropicClient, AnthropicConfig, ChatModel, LLMError, ModelClientCache};

pub use session::{
    CallSession, CallStore, HttpCallStore, InMemoryCallStore, SessionServices, TeardownReason,
};

pub use transport::{MediaStreamEvent, MediaStreamSender, TransportFrame};

pub use turn::{Playback, TurnConfig, TurnController, TurnState};
