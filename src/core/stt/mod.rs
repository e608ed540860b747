mod base;
pub mod deepgram;

// Re-export public types and traits
pub use base::{
    RecognizerEvent, RecognizerFactory, STTConfig, STTError, STTResult, SharedRecognizerFactory,
    SpeechRecognizer,
};

// Re-export Deepgram implementation
pub use deepgram::{DeepgramRecognizerFactory, DeepgramSTT, DeepgramSTTConfig};
