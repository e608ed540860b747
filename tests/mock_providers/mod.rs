//! In-process fakes for the voice providers and the call store.
//!
//! Sessions built from these run entirely in memory, so tests can drive a
//! call with paused time and inspect every frame sent to the caller.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use futures::StreamExt;
use parking_lot::Mutex;
use serde_json::json;
use tokio::sync::mpsc;

use voicecall_gateway::core::llm::{
    ChatMessage, ChatModel, LLMError, LLMResult, ModelClientCache, TextDeltaStream,
};
use voicecall_gateway::core::session::{
    CallRecord, CallStore, CallUpdate, InMemoryCallStore, SessionServices, StoreError,
};
use voicecall_gateway::core::stt::{
    RecognizerEvent, RecognizerFactory, STTError, STTResult, SpeechRecognizer,
};
use voicecall_gateway::core::transport::{
    MediaStreamEvent, OutgoingMediaMessage, TransportFrame,
};
use voicecall_gateway::core::tts::{
    AudioEncoding, SpeechSynthesizer, SynthesizedAudio, TTSError, TTSResult,
};
use voicecall_gateway::core::turn::TurnConfig;

/// Bytes of μ-law each fake sentence synthesizes to (two media frames)
pub const SENTENCE_AUDIO_BYTES: usize = 320;

// =============================================================================
// Recognizer
// =============================================================================

#[derive(Default)]
struct RecognizerShared {
    events: Option<mpsc::Sender<RecognizerEvent>>,
    audio_bytes: usize,
    created: usize,
    disconnected: usize,
}

/// Test-side handle onto every recognizer the factory created
#[derive(Clone, Default)]
pub struct RecognizerHandle {
    shared: Arc<Mutex<RecognizerShared>>,
}

impl RecognizerHandle {
    /// Deliver an event as if the recognition service sent it
    pub async fn emit(&self, event: RecognizerEvent) {
        let sender = self.shared.lock().events.clone();
        if let Some(sender) = sender {
            let _ = sender.send(event).await;
        }
    }

    pub async fn final_transcript(&self, text: &str) {
        self.emit(RecognizerEvent::Transcript(STTResult::new(
            text, true, true, 0.95,
        )))
        .await;
    }

    pub async fn partial_transcript(&self, text: &str) {
        self.emit(RecognizerEvent::Transcript(STTResult::new(
            text, false, false, 0.6,
        )))
        .await;
    }

    pub fn audio_bytes(&self) -> usize {
        self.shared.lock().audio_bytes
    }

    pub fn created(&self) -> usize {
        self.shared.lock().created
    }

    pub fn disconnected(&self) -> usize {
        self.shared.lock().disconnected
    }
}

struct FakeRecognizer {
    shared: Arc<Mutex<RecognizerShared>>,
    fail_connect: bool,
    connected: bool,
}

#[async_trait]
impl SpeechRecognizer for FakeRecognizer {
    async fn connect(&mut self) -> Result<mpsc::Receiver<RecognizerEvent>, STTError> {
        if self.fail_connect {
            return Err(STTError::ConnectionFailed("connection refused".to_string()));
        }
        let (tx, rx) = mpsc::channel(64);
        self.shared.lock().events = Some(tx);
        self.connected = true;
        Ok(rx)
    }

    async fn send_audio(&mut self, audio: Bytes) -> Result<(), STTError> {
        self.shared.lock().audio_bytes += audio.len();
        Ok(())
    }

    async fn disconnect(&mut self) -> Result<(), STTError> {
        self.connected = false;
        let mut shared = self.shared.lock();
        shared.events = None;
        shared.disconnected += 1;
        Ok(())
    }

    fn is_ready(&self) -> bool {
        self.connected
    }

    fn provider_info(&self) -> &'static str {
        "fake-recognizer"
    }
}

pub struct FakeRecognizerFactory {
    handle: RecognizerHandle,
    fail_connect: bool,
}

impl FakeRecognizerFactory {
    pub fn new(handle: RecognizerHandle) -> Self {
        Self {
            handle,
            fail_connect: false,
        }
    }

    pub fn failing(handle: RecognizerHandle) -> Self {
        Self {
            handle,
            fail_connect: true,
        }
    }
}

impl RecognizerFactory for FakeRecognizerFactory {
    fn create(&self) -> Result<Box<dyn SpeechRecognizer>, STTError> {
        self.handle.shared.lock().created += 1;
        Ok(Box::new(FakeRecognizer {
            shared: self.handle.shared.clone(),
            fail_connect: self.fail_connect,
            connected: false,
        }))
    }
}

// =============================================================================
// Language model
// =============================================================================

/// Chat model replaying queued replies and recording every request
#[derive(Default)]
pub struct ScriptedModel {
    replies: Mutex<VecDeque<Vec<(Duration, String)>>>,
    requests: Mutex<Vec<(String, Vec<ChatMessage>)>>,
}

impl ScriptedModel {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Queue a reply, streamed as the given deltas
    pub fn push_reply(&self, deltas: &[&str]) {
        self.replies
            .lock()
            .push_back(deltas.iter().map(|d| (Duration::ZERO, d.to_string())).collect());
    }

    /// Queue a reply whose deltas each arrive after the paired pause
    pub fn push_paced_reply(&self, deltas: &[(Duration, &str)]) {
        self.replies.lock().push_back(
            deltas
                .iter()
                .map(|(pause, d)| (*pause, d.to_string()))
                .collect(),
        );
    }

    pub fn requests(&self) -> Vec<(String, Vec<ChatMessage>)> {
        self.requests.lock().clone()
    }
}

#[async_trait]
impl ChatModel for ScriptedModel {
    async fn stream_completion(
        &self,
        system: &str,
        messages: &[ChatMessage],
    ) -> LLMResult<TextDeltaStream> {
        self.requests
            .lock()
            .push((system.to_string(), messages.to_vec()));
        let deltas = self
            .replies
            .lock()
            .pop_front()
            .ok_or_else(|| LLMError::ProviderError("overloaded".to_string()))?;
        Ok(futures::stream::iter(deltas)
            .then(|(pause, delta)| async move {
                if !pause.is_zero() {
                    tokio::time::sleep(pause).await;
                }
                Ok::<_, LLMError>(delta)
            })
            .boxed())
    }

    fn model_name(&self) -> &str {
        "scripted-model"
    }
}

// =============================================================================
// Call store
// =============================================================================

/// Store whose transcript-only writes take `delay` to land
pub struct SlowTranscriptStore {
    inner: Arc<InMemoryCallStore>,
    delay: Duration,
}

#[async_trait]
impl CallStore for SlowTranscriptStore {
    async fn get_call(&self, call_id: &str) -> Result<CallRecord, StoreError> {
        self.inner.get_call(call_id).await
    }

    async fn update_call(&self, call_id: &str, update: CallUpdate) -> Result<(), StoreError> {
        if update.status.is_none() {
            tokio::time::sleep(self.delay).await;
        }
        self.inner.update_call(call_id, update).await
    }
}

// =============================================================================
// Synthesizer
// =============================================================================

/// Synthesizer returning silence and recording what it was asked to say
#[derive(Default)]
pub struct FakeSynthesizer {
    spoken: Mutex<Vec<String>>,
}

impl FakeSynthesizer {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn spoken(&self) -> Vec<String> {
        self.spoken.lock().clone()
    }
}

#[async_trait]
impl SpeechSynthesizer for FakeSynthesizer {
    async fn synthesize(&self, text: &str) -> TTSResult<SynthesizedAudio> {
        if text.trim().is_empty() {
            return Err(TTSError::AudioGenerationFailed("empty text".to_string()));
        }
        self.spoken.lock().push(text.to_string());
        Ok(SynthesizedAudio {
            data: Bytes::from(vec![0xFF; SENTENCE_AUDIO_BYTES]),
            encoding: AudioEncoding::Mulaw8k,
        })
    }

    fn output_encoding(&self) -> AudioEncoding {
        AudioEncoding::Mulaw8k
    }

    fn provider_info(&self) -> &'static str {
        "fake-synthesizer"
    }
}

// =============================================================================
// Wiring
// =============================================================================

/// Fakes behind one set of session services
pub struct Fakes {
    pub store: Arc<InMemoryCallStore>,
    pub recognizer: RecognizerHandle,
    pub model: Arc<ScriptedModel>,
    pub synthesizer: Arc<FakeSynthesizer>,
    pub services: SessionServices,
}

impl Fakes {
    pub fn new(turn: TurnConfig) -> Self {
        Self::build(turn, false, None)
    }

    /// Services whose recognizer never connects
    pub fn with_failing_recognizer(turn: TurnConfig) -> Self {
        Self::build(turn, true, None)
    }

    /// Services whose mid-call transcript writes are slow to land
    pub fn with_slow_transcript_writes(turn: TurnConfig, delay: Duration) -> Self {
        Self::build(turn, false, Some(delay))
    }

    fn build(turn: TurnConfig, fail_recognizer: bool, write_delay: Option<Duration>) -> Self {
        let store = Arc::new(InMemoryCallStore::new());
        let recognizer = RecognizerHandle::default();
        let model = ScriptedModel::new();
        let synthesizer = FakeSynthesizer::new();

        let factory = if fail_recognizer {
            FakeRecognizerFactory::failing(recognizer.clone())
        } else {
            FakeRecognizerFactory::new(recognizer.clone())
        };

        let session_store: Arc<dyn CallStore> = match write_delay {
            Some(delay) => Arc::new(SlowTranscriptStore {
                inner: store.clone(),
                delay,
            }),
            None => store.clone(),
        };

        let services = SessionServices {
            store: session_store,
            recognizers: Arc::new(factory),
            synthesizer: synthesizer.clone(),
            models: ModelClientCache::single(model.clone()),
            turn,
        };

        Self {
            store,
            recognizer,
            model,
            synthesizer,
            services,
        }
    }

    /// Store a call with a custom greeting and prompt
    pub fn insert_call(&self, call_id: &str) {
        let mut record = CallRecord::new(call_id);
        record.script = Some(json!({
            "systemPrompt": "You book dentist appointments.",
            "greeting": "Hi, this is the clinic calling."
        }));
        self.store.insert(record);
    }
}

// =============================================================================
// Media-stream frames
// =============================================================================

pub fn start_event(stream_sid: &str) -> MediaStreamEvent {
    MediaStreamEvent::parse(
        &json!({
            "event": "start",
            "sequenceNumber": "1",
            "start": {
                "streamSid": stream_sid,
                "callSid": "CA-provider-1",
                "tracks": ["inbound"],
                "mediaFormat": { "encoding": "audio/x-mulaw", "sampleRate": 8000, "channels": 1 }
            },
            "streamSid": stream_sid
        })
        .to_string(),
    )
    .expect("valid start event")
}

pub fn media_event(stream_sid: &str, payload: &str) -> MediaStreamEvent {
    MediaStreamEvent::parse(
        &json!({
            "event": "media",
            "media": { "track": "inbound", "payload": payload },
            "streamSid": stream_sid
        })
        .to_string(),
    )
    .expect("valid media event")
}

pub fn mark_event(stream_sid: &str, name: &str) -> MediaStreamEvent {
    MediaStreamEvent::parse(
        &json!({
            "event": "mark",
            "mark": { "name": name },
            "streamSid": stream_sid
        })
        .to_string(),
    )
    .expect("valid mark event")
}

pub fn stop_event(stream_sid: &str) -> MediaStreamEvent {
    MediaStreamEvent::parse(
        &json!({
            "event": "stop",
            "stop": { "callSid": "CA-provider-1" },
            "streamSid": stream_sid
        })
        .to_string(),
    )
    .expect("valid stop event")
}

/// Short label for an outbound frame: `media`, `mark:<name>`, `clear`, `close`
pub fn frame_label(frame: &TransportFrame) -> String {
    match frame {
        TransportFrame::Message(OutgoingMediaMessage::Media { .. }) => "media".to_string(),
        TransportFrame::Message(OutgoingMediaMessage::Mark { mark, .. }) => {
            format!("mark:{}", mark.name)
        }
        TransportFrame::Message(OutgoingMediaMessage::Clear { .. }) => "clear".to_string(),
        TransportFrame::Close => "close".to_string(),
    }
}

/// Receive frames until one matches `label`, returning every label seen
pub async fn frames_until(
    frames: &mut mpsc::UnboundedReceiver<TransportFrame>,
    label: &str,
) -> Vec<String> {
    let mut seen = Vec::new();
    loop {
        let frame = tokio::time::timeout(Duration::from_secs(30), frames.recv())
            .await
            .unwrap_or_else(|_| panic!("timed out waiting for {label}, saw {seen:?}"))
            .unwrap_or_else(|| panic!("transport ended before {label}, saw {seen:?}"));
        let current = frame_label(&frame);
        seen.push(current.clone());
        if current == label {
            return seen;
        }
    }
}

/// Let every runnable task make progress
pub async fn settle() {
    tokio::time::sleep(Duration::from_millis(1)).await;
}
