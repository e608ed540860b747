use async_trait::async_trait;
use bytes::Bytes;
use std::sync::Arc;
use tokio::sync::mpsc;

/// Error types for speech recognition
#[derive(Debug, thiserror::Error, Clone, PartialEq)]
pub enum STTError {
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),
    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),
    #[error("Network error: {0}")]
    NetworkError(String),
    #[error("Configuration error: {0}")]
    ConfigurationError(String),
    #[error("Invalid audio format: {0}")]
    InvalidAudioFormat(String),
    #[error("Provider error: {0}")]
    ProviderError(String),
}

/// A transcript produced by the recognizer
#[derive(Debug, Clone, PartialEq)]
pub struct STTResult {
    /// Transcribed text
    pub transcript: String,
    /// Whether this transcript will not be revised
    pub is_final: bool,
    /// Whether the recognizer detected the end of speech with this result
    pub is_speech_final: bool,
    /// Confidence score (0.0 to 1.0)
    pub confidence: f32,
}

impl STTResult {
    pub fn new(
        transcript: impl Into<String>,
        is_final: bool,
        is_speech_final: bool,
        confidence: f32,
    ) -> Self {
        Self {
            transcript: transcript.into(),
            is_final,
            is_speech_final,
            confidence,
        }
    }
}

/// Events delivered by a connected recognizer, in arrival order
#[derive(Debug, Clone, PartialEq)]
pub enum RecognizerEvent {
    /// Partial or final transcript
    Transcript(STTResult),
    /// The service decided the caller stopped talking
    UtteranceEnd,
    /// Voice activity detected
    SpeechStarted,
    /// Streaming failure; the connection is gone after this
    Error(STTError),
    /// The connection closed
    Closed,
}

/// Recognizer settings shared by every call
#[derive(Debug, Clone, PartialEq)]
pub struct STTConfig {
    pub api_key: String,
    pub model: String,
    pub language: String,
    /// Sample rate of the PCM sent to the service
    pub sample_rate: u32,
    pub channels: u16,
    pub punctuation: bool,
    pub interim_results: bool,
    pub vad_events: bool,
    /// Silence in milliseconds before the service finalizes a transcript
    pub endpointing_ms: u32,
    /// Silence in milliseconds before the service reports an utterance end
    pub utterance_end_ms: u32,
}

impl Default for STTConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            model: "nova-2-phonecall".to_string(),
            language: "en-US".to_string(),
            sample_rate: 8000,
            channels: 1,
            punctuation: true,
            interim_results: true,
            vad_events: true,
            endpointing_ms: 300,
            utterance_end_ms: 1000,
        }
    }
}

/// Streaming speech recognizer for one call
#[async_trait]
pub trait SpeechRecognizer: Send {
    /// Open the streaming connection
    ///
    /// Returns the receiver on which recognition events arrive. The receiver
    /// yields `None` once the connection task has exited.
    async fn connect(&mut self) -> Result<mpsc::Receiver<RecognizerEvent>, STTError>;

    /// Forward 16-bit little-endian PCM
    async fn send_audio(&mut self, audio: Bytes) -> Result<(), STTError>;

    /// Close the stream gracefully
    async fn disconnect(&mut self) -> Result<(), STTError>;

    /// Whether audio can be sent
    fn is_ready(&self) -> bool;

    fn provider_info(&self) -> &'static str;
}

/// Creates recognizers for new calls
pub trait RecognizerFactory: Send + Sync {
    fn create(&self) -> Result<Box<dyn SpeechRecognizer>, STTError>;
}

impl<F> RecognizerFactory for F
where
    F: Fn() -> Result<Box<dyn SpeechRecognizer>, STTError> + Send + Sync,
{
    fn create(&self) -> Result<Box<dyn SpeechRecognizer>, STTError> {
        self()
    }
}

pub type SharedRecognizerFactory = Arc<dyn RecognizerFactory>;
