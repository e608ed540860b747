//! Deepgram live transcription WebSocket client.
//!
//! A single connection task owns the socket. Audio arrives through a bounded
//! channel and is forwarded as binary frames; server messages are converted
//! into [`RecognizerEvent`]s on the channel returned by `connect`. When the
//! caller pauses media for longer than the keep-alive interval, a `KeepAlive`
//! control message keeps the stream open.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use bytes::Bytes;
use futures::{SinkExt, StreamExt};
use tokio::sync::{mpsc, oneshot};
use tokio::time::{Instant, MissedTickBehavior, timeout};
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::HeaderValue;
use tokio_tungstenite::{connect_async, tungstenite::protocol::Message};
use tracing::{debug, error, info, warn};

use super::config::DeepgramSTTConfig;
use super::messages::{CloseStreamMessage, DeepgramMessage, KeepAliveMessage};
use crate::core::stt::base::{
    RecognizerEvent, RecognizerFactory, STTConfig, STTError, STTResult, SpeechRecognizer,
};

// =============================================================================
// Constants
// =============================================================================

/// Upper bound for a single audio message.
const MAX_AUDIO_CHUNK_SIZE: usize = 256 * 1024;

/// Time allowed for the WebSocket handshake.
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Time allowed for the connection task to finish after `CloseStream`.
const DISCONNECT_TIMEOUT: Duration = Duration::from_secs(5);

const AUDIO_CHANNEL_CAPACITY: usize = 32;
const EVENT_CHANNEL_CAPACITY: usize = 256;

// =============================================================================
// DeepgramSTT Client
// =============================================================================

/// Deepgram streaming recognizer for one call.
pub struct DeepgramSTT {
    config: DeepgramSTTConfig,

    /// Audio sender, bounded for backpressure
    ws_sender: Option<mpsc::Sender<Bytes>>,

    /// Graceful shutdown signal for the connection task
    shutdown_tx: Option<oneshot::Sender<()>>,

    connection_handle: Option<tokio::task::JoinHandle<()>>,

    /// Shared with the connection task
    is_connected: Arc<AtomicBool>,
}

impl DeepgramSTT {
    pub fn new(config: DeepgramSTTConfig) -> Result<Self, STTError> {
        if config.base.api_key.is_empty() {
            return Err(STTError::AuthenticationFailed(
                "API key is required for Deepgram STT".to_string(),
            ));
        }
        Ok(Self {
            config,
            ws_sender: None,
            shutdown_tx: None,
            connection_handle: None,
            is_connected: Arc::new(AtomicBool::new(false)),
        })
    }

    pub fn config(&self) -> &DeepgramSTTConfig {
        &self.config
    }

    /// Convert one server frame into recognizer events.
    ///
    /// # Returns
    /// * `Ok(true)` - Continue processing messages
    /// * `Ok(false)` - Server closed the stream
    /// * `Err(STTError)` - Error reported by the server
    pub(crate) async fn handle_websocket_message(
        message: Message,
        event_tx: &mpsc::Sender<RecognizerEvent>,
    ) -> Result<bool, STTError> {
        match message {
            Message::Text(text) => match DeepgramMessage::parse(&text) {
                Ok(DeepgramMessage::Results(results)) => {
                    let Some(best) = results.best() else {
                        return Ok(true);
                    };
                    if best.transcript.trim().is_empty() {
                        return Ok(true);
                    }
                    debug!(
                        is_final = results.is_final,
                        speech_final = results.speech_final,
                        "Deepgram transcript: {}",
                        best.transcript
                    );
                    let result = STTResult::new(
                        best.transcript.clone(),
                        results.is_final,
                        results.speech_final,
                        (best.confidence as f32).clamp(0.0, 1.0),
                    );
                    if event_tx
                        .send(RecognizerEvent::Transcript(result))
                        .await
                        .is_err()
                    {
                        warn!("Failed to deliver Deepgram transcript - receiver dropped");
                    }
                }
                Ok(DeepgramMessage::UtteranceEnd(end)) => {
                    debug!(last_word_end = ?end.last_word_end, "Deepgram utterance end");
                    let _ = event_tx.send(RecognizerEvent::UtteranceEnd).await;
                }
                Ok(DeepgramMessage::SpeechStarted(started)) => {
                    debug!(timestamp = ?started.timestamp, "Deepgram speech started");
                    let _ = event_tx.try_send(RecognizerEvent::SpeechStarted);
                }
                Ok(DeepgramMessage::Metadata(metadata)) => {
                    info!(
                        request_id = ?metadata.request_id,
                        duration = ?metadata.duration,
                        "Deepgram stream metadata"
                    );
                }
                Ok(DeepgramMessage::Error(err)) => {
                    let text = err.text();
                    error!(variant = ?err.variant, "Deepgram STT error: {}", text);
                    return Err(STTError::ProviderError(text));
                }
                Ok(DeepgramMessage::Unknown(raw)) => {
                    debug!("Received unknown Deepgram message: {}", raw);
                }
                Err(e) => {
                    warn!("Failed to parse Deepgram message: {}", e);
                }
            },

            Message::Close(close_frame) => {
                info!("Deepgram WebSocket closed: {:?}", close_frame);
                return Ok(false);
            }

            Message::Ping(_) | Message::Pong(_) => {
                debug!("Received ping/pong from Deepgram");
            }

            _ => {
                debug!("Received unexpected message type from Deepgram");
            }
        }

        Ok(true)
    }

    async fn start_connection(&mut self) -> Result<mpsc::Receiver<RecognizerEvent>, STTError> {
        let url = self.config.build_websocket_url()?;

        let mut request = url
            .as_str()
            .into_client_request()
            .map_err(|e| STTError::ConnectionFailed(format!("Invalid Deepgram request: {e}")))?;
        let authorization = HeaderValue::from_str(&self.config.authorization()).map_err(|e| {
            STTError::AuthenticationFailed(format!("Invalid Deepgram API key: {e}"))
        })?;
        request.headers_mut().insert("Authorization", authorization);

        let (ws_stream, _response) = match timeout(CONNECT_TIMEOUT, connect_async(request)).await
        {
            Ok(Ok(connected)) => connected,
            Ok(Err(e)) => {
                return Err(STTError::ConnectionFailed(format!(
                    "Failed to connect to Deepgram: {e}"
                )));
            }
            Err(_) => {
                return Err(STTError::ConnectionFailed(
                    "Timed out connecting to Deepgram".to_string(),
                ));
            }
        };

        info!("Connected to Deepgram STT WebSocket");

        let (audio_tx, mut audio_rx) = mpsc::channel::<Bytes>(AUDIO_CHANNEL_CAPACITY);
        let (event_tx, event_rx) = mpsc::channel::<RecognizerEvent>(EVENT_CHANNEL_CAPACITY);
        let (shutdown_tx, mut shutdown_rx) = oneshot::channel::<()>();

        let keepalive_interval = self.config.keepalive_interval;
        let is_connected = self.is_connected.clone();
        is_connected.store(true, Ordering::Release);

        let connection_handle = tokio::spawn(async move {
            let (mut ws_sink, mut ws_stream) = ws_stream.split();

            let mut keepalive = tokio::time::interval_at(
                Instant::now() + keepalive_interval,
                keepalive_interval,
            );
            keepalive.set_missed_tick_behavior(MissedTickBehavior::Delay);
            let mut last_sent = Instant::now();

            loop {
                tokio::select! {
                    Some(audio) = audio_rx.recv() => {
                        let len = audio.len();
                        if let Err(e) = ws_sink.send(Message::Binary(audio)).await {
                            let stt_error = STTError::NetworkError(format!(
                                "Failed to send audio to Deepgram: {e}"
                            ));
                            error!("{}", stt_error);
                            let _ = event_tx.try_send(RecognizerEvent::Error(stt_error));
                            break;
                        }
                        last_sent = Instant::now();
                        debug!("Sent {} bytes of audio to Deepgram", len);
                    }

                    _ = keepalive.tick() => {
                        if last_sent.elapsed() >= keepalive_interval {
                            if let Ok(json) = serde_json::to_string(&KeepAliveMessage::default())
                                && let Err(e) = ws_sink.send(Message::Text(json.into())).await
                            {
                                warn!("Failed to send Deepgram KeepAlive: {}", e);
                            }
                            last_sent = Instant::now();
                        }
                    }

                    message = ws_stream.next() => {
                        match message {
                            Some(Ok(msg)) => match Self::handle_websocket_message(msg, &event_tx).await {
                                Ok(true) => {}
                                Ok(false) => break,
                                Err(e) => {
                                    let _ = event_tx.try_send(RecognizerEvent::Error(e));
                                    break;
                                }
                            },
                            Some(Err(e)) => {
                                let stt_error = STTError::NetworkError(format!(
                                    "WebSocket error: {e}"
                                ));
                                error!("{}", stt_error);
                                let _ = event_tx.try_send(RecognizerEvent::Error(stt_error));
                                break;
                            }
                            None => {
                                info!("Deepgram WebSocket stream ended");
                                break;
                            }
                        }
                    }

                    _ = &mut shutdown_rx => {
                        info!("Received shutdown signal for Deepgram STT");
                        if let Ok(json) = serde_json::to_string(&CloseStreamMessage::default()) {
                            let _ = ws_sink.send(Message::Text(json.into())).await;
                        }
                        let _ = ws_sink.send(Message::Close(None)).await;
                        break;
                    }
                }
            }

            is_connected.store(false, Ordering::Release);
            let _ = event_tx.try_send(RecognizerEvent::Closed);
            info!("Deepgram STT WebSocket connection closed");
        });

        self.ws_sender = Some(audio_tx);
        self.shutdown_tx = Some(shutdown_tx);
        self.connection_handle = Some(connection_handle);

        Ok(event_rx)
    }
}

impl Drop for DeepgramSTT {
    fn drop(&mut self) {
        if let Some(shutdown_tx) = self.shutdown_tx.take() {
            let _ = shutdown_tx.send(());
        }
    }
}

// =============================================================================
// SpeechRecognizer Trait Implementation
// =============================================================================

#[async_trait::async_trait]
impl SpeechRecognizer for DeepgramSTT {
    async fn connect(&mut self) -> Result<mpsc::Receiver<RecognizerEvent>, STTError> {
        if self.connection_handle.is_some() {
            return Err(STTError::ConnectionFailed(
                "Deepgram STT is already connected".to_string(),
            ));
        }
        self.start_connection().await
    }

    async fn send_audio(&mut self, audio: Bytes) -> Result<(), STTError> {
        if !self.is_ready() {
            return Err(STTError::ConnectionFailed(
                "Not connected to Deepgram STT".to_string(),
            ));
        }

        if audio.len() > MAX_AUDIO_CHUNK_SIZE {
            return Err(STTError::InvalidAudioFormat(format!(
                "Audio chunk size {} bytes exceeds maximum {} bytes",
                audio.len(),
                MAX_AUDIO_CHUNK_SIZE
            )));
        }

        if let Some(ws_sender) = &self.ws_sender {
            ws_sender
                .send(audio)
                .await
                .map_err(|e| STTError::NetworkError(format!("Failed to send audio data: {e}")))?;
        }
        Ok(())
    }

    async fn disconnect(&mut self) -> Result<(), STTError> {
        if let Some(shutdown_tx) = self.shutdown_tx.take() {
            let _ = shutdown_tx.send(());
        }

        if let Some(handle) = self.connection_handle.take()
            && timeout(DISCONNECT_TIMEOUT, handle).await.is_err()
        {
            warn!("Deepgram connection task did not finish in time");
        }

        self.ws_sender = None;
        self.is_connected.store(false, Ordering::Release);
        info!("Disconnected from Deepgram STT");
        Ok(())
    }

    fn is_ready(&self) -> bool {
        self.is_connected.load(Ordering::Acquire) && self.ws_sender.is_some()
    }

    fn provider_info(&self) -> &'static str {
        "Deepgram Live Transcription"
    }
}

// =============================================================================
// Factory
// =============================================================================

/// Creates one [`DeepgramSTT`] per call from shared settings.
#[derive(Debug, Clone)]
pub struct DeepgramRecognizerFactory {
    config: DeepgramSTTConfig,
}

impl DeepgramRecognizerFactory {
    pub fn new(config: DeepgramSTTConfig) -> Self {
        Self { config }
    }

    pub fn from_base(config: STTConfig) -> Self {
        Self::new(DeepgramSTTConfig::from_base(config))
    }
}

impl RecognizerFactory for DeepgramRecognizerFactory {
    fn create(&self) -> Result<Box<dyn SpeechRecognizer>, STTError> {
        Ok(Box::new(DeepgramSTT::new(self.config.clone())?))
    }
}
