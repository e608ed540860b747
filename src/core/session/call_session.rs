//! One live call, from media-stream upgrade to teardown.
//!
//! [`CallSession::run`] is an actor loop. It owns the turn controller, the
//! conversation history and the transcript, and multiplexes four sources:
//! inbound transport events, recognizer events, completions reported by the
//! generation task, and the debounce deadline. Response generation runs in a
//! spawned task so caller audio keeps flowing to the recognizer while the
//! model streams.

use std::sync::Arc;
use std::time::Duration;

use futures::StreamExt;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::core::llm::{ChatMessage, LLMError, ModelClientCache, SentenceSegmenter};
use crate::core::stt::{RecognizerEvent, STTError, SharedRecognizerFactory, SpeechRecognizer};
use crate::core::transport::{MediaStreamEvent, MediaStreamSender, decode_inbound_audio};
use crate::core::tts::SpeechSynthesizer;
use crate::core::turn::{GOODBYE_MARK, Playback, TurnConfig, TurnController};

use super::script::CallScript;
use super::store::{CallStatus, CallStore, CallUpdate, StoreError};
use super::transcript::TranscriptEntry;

/// Spoken when the model fails to answer a turn.
pub const TURN_APOLOGY: &str = "I'm sorry, I had trouble with that. Could you say it again?";

/// Spoken once when the recognizer cannot be reached at the start of a call.
pub const RECOGNIZER_APOLOGY: &str =
    "I'm sorry, I'm having trouble hearing you right now. Please bear with me.";

const FINAL_PERSIST_TIMEOUT: Duration = Duration::from_secs(5);

/// Process-wide collaborators shared by every session.
#[derive(Clone)]
pub struct SessionServices {
    pub store: Arc<dyn CallStore>,
    pub recognizers: SharedRecognizerFactory,
    pub synthesizer: Arc<dyn SpeechSynthesizer>,
    pub models: ModelClientCache,
    pub turn: TurnConfig,
}

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("Call store error: {0}")]
    Store(#[from] StoreError),
    #[error("Model error: {0}")]
    Model(#[from] LLMError),
}

/// Why a session ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TeardownReason {
    /// The media-stream socket closed
    TransportClosed,
    /// The provider sent `stop`
    StreamStopped,
    /// The goodbye mark was played to the caller
    GoodbyeAcknowledged,
    /// The recognizer connection was lost mid-call
    RecognizerClosed,
}

enum SessionCommand {
    TurnCompleted { reply: String },
    TurnFailed { error: SessionError },
}

/// Synthesizes text and plays it under a playback epoch.
#[derive(Clone)]
struct Voice {
    call_id: Arc<str>,
    synthesizer: Arc<dyn SpeechSynthesizer>,
    playback: Playback,
}

impl Voice {
    /// Returns false if nothing was played.
    async fn say(&self, epoch: u64, text: &str) -> bool {
        if self.playback.current_epoch() != epoch {
            debug!(call_id = %self.call_id, "Turn interrupted, skipping sentence");
            return false;
        }
        match self.synthesizer.synthesize(text).await {
            Ok(audio) if audio.encoding.is_telephony_ready() => {
                self.playback.play(epoch, &audio.data).is_some()
            }
            Ok(audio) => {
                warn!(
                    call_id = %self.call_id,
                    encoding = audio.encoding.as_str(),
                    "Synthesizer returned audio the call cannot play, skipping sentence"
                );
                false
            }
            Err(e) => {
                warn!(
                    call_id = %self.call_id,
                    provider = self.synthesizer.provider_info(),
                    error = %e,
                    "Sentence synthesis failed, skipping"
                );
                false
            }
        }
    }
}

/// Inputs of one response cycle, detached from the session.
struct TurnJob {
    voice: Voice,
    models: ModelClientCache,
    tenant_id: Option<String>,
    system_prompt: String,
    history: Vec<ChatMessage>,
    epoch: u64,
}

impl TurnJob {
    /// Stream the reply, speaking each sentence as soon as it is complete.
    async fn run(self) -> Result<String, SessionError> {
        let model = self.models.resolve(self.tenant_id.as_deref()).await;
        debug!(
            call_id = %self.voice.call_id,
            model = model.model_name(),
            messages = self.history.len(),
            "Requesting completion"
        );
        let mut deltas = model
            .stream_completion(&self.system_prompt, &self.history)
            .await?;

        let mut segmenter = SentenceSegmenter::new();
        let mut reply = String::new();
        while let Some(delta) = deltas.next().await {
            let delta = delta?;
            reply.push_str(&delta);
            for sentence in segmenter.push(&delta) {
                self.voice.say(self.epoch, &sentence).await;
            }
        }
        if let Some(rest) = segmenter.finish() {
            self.voice.say(self.epoch, &rest).await;
        }

        Ok(reply.trim().to_string())
    }
}

/// State of one call.
pub struct CallSession {
    call_id: String,
    tenant_id: Option<String>,
    script: CallScript,
    services: SessionServices,
    transport: MediaStreamSender,
    voice: Voice,
    controller: TurnController,
    history: Vec<ChatMessage>,
    transcript: Vec<TranscriptEntry>,
    provider_call_sid: Option<String>,
    recognizer: Option<Box<dyn SpeechRecognizer>>,
    recognizer_events: Option<mpsc::Receiver<RecognizerEvent>>,
    started_at: Option<Instant>,
    generation: Option<JoinHandle<()>>,
    speech_tasks: Vec<JoinHandle<()>>,
    persist_tasks: Vec<JoinHandle<()>>,
    commands_tx: mpsc::UnboundedSender<SessionCommand>,
    commands_rx: mpsc::UnboundedReceiver<SessionCommand>,
    terminating: bool,
}

impl CallSession {
    /// Look the call up and prepare a session for it.
    ///
    /// Fails without touching any provider if the call cannot be loaded.
    pub async fn load(
        call_id: impl Into<String>,
        services: SessionServices,
        transport: MediaStreamSender,
    ) -> Result<Self, SessionError> {
        let call_id = call_id.into();
        let record = services.store.get_call(&call_id).await?;
        let script = CallScript::from_stored(record.script.as_ref());

        let playback = Playback::new(transport.clone());
        let voice = Voice {
            call_id: Arc::from(call_id.as_str()),
            synthesizer: services.synthesizer.clone(),
            playback: playback.clone(),
        };
        let controller = TurnController::new(services.turn, playback);
        let (commands_tx, commands_rx) = mpsc::unbounded_channel();

        info!(call_id = %call_id, tenant_id = ?record.tenant_id, "Call session loaded");

        Ok(Self {
            call_id,
            tenant_id: record.tenant_id,
            script,
            services,
            transport,
            voice,
            controller,
            history: Vec::new(),
            transcript: Vec::new(),
            provider_call_sid: None,
            recognizer: None,
            recognizer_events: None,
            started_at: None,
            generation: None,
            speech_tasks: Vec::new(),
            persist_tasks: Vec::new(),
            commands_tx,
            commands_rx,
            terminating: false,
        })
    }

    /// Drive the call until it ends, then tear it down.
    pub async fn run(mut self, mut inbound: mpsc::Receiver<MediaStreamEvent>) -> TeardownReason {
        let reason = loop {
            let deadline = self.controller.debounce_deadline();
            tokio::select! {
                event = inbound.recv() => match event {
                    Some(event) => {
                        if let Some(reason) = self.on_transport_event(event).await {
                            break reason;
                        }
                    }
                    None => break TeardownReason::TransportClosed,
                },
                event = recv_opt(&mut self.recognizer_events) => match event {
                    Some(RecognizerEvent::Closed) | None => {
                        warn!(call_id = %self.call_id, "Recognizer connection lost");
                        break TeardownReason::RecognizerClosed;
                    }
                    Some(event) => self.on_recognizer_event(event),
                },
                Some(command) = self.commands_rx.recv() => self.on_command(command),
                _ = sleep_until_opt(deadline) => self.on_debounce_elapsed(),
            }
        };

        self.teardown(reason).await;
        reason
    }

    // =========================================================================
    // Transport
    // =========================================================================

    async fn on_transport_event(&mut self, event: MediaStreamEvent) -> Option<TeardownReason> {
        match event {
            MediaStreamEvent::Connected { protocol, .. } => {
                debug!(call_id = %self.call_id, ?protocol, "Media stream connected");
            }
            MediaStreamEvent::Start { start, .. } => {
                if !self.transport.set_stream_sid(start.stream_sid.clone()) {
                    warn!(call_id = %self.call_id, "Duplicate start event ignored");
                    return None;
                }
                self.provider_call_sid = start.call_sid.clone();
                info!(
                    call_id = %self.call_id,
                    stream_sid = %start.stream_sid,
                    call_sid = ?self.provider_call_sid,
                    "Media stream started"
                );
                self.controller.on_stream_started();
                self.started_at = Some(Instant::now());
                self.persist_detached(CallUpdate::status(CallStatus::InProgress));
                self.start_conversation().await;
            }
            MediaStreamEvent::Media { media, .. } => {
                let Some(recognizer) = self.recognizer.as_mut() else {
                    return None;
                };
                if !recognizer.is_ready() {
                    return None;
                }
                match decode_inbound_audio(&media.payload) {
                    Ok(pcm) => {
                        if let Err(e) = recognizer.send_audio(pcm).await {
                            debug!(call_id = %self.call_id, error = %e, "Dropping inbound audio");
                        }
                    }
                    Err(e) => {
                        debug!(call_id = %self.call_id, error = %e, "Invalid media payload");
                    }
                }
            }
            MediaStreamEvent::Mark { mark, .. } => {
                if mark.name == GOODBYE_MARK {
                    info!(call_id = %self.call_id, "Goodbye played, ending call");
                    return Some(TeardownReason::GoodbyeAcknowledged);
                }
                self.voice.playback.acknowledge(&mark.name);
            }
            MediaStreamEvent::Stop { .. } => {
                info!(call_id = %self.call_id, "Media stream stopped by provider");
                return Some(TeardownReason::StreamStopped);
            }
            MediaStreamEvent::Other => {}
        }
        None
    }

    async fn start_conversation(&mut self) {
        match self.connect_recognizer().await {
            Ok(()) => {
                let greeting = self.script.greeting.clone();
                self.history.push(ChatMessage::assistant(&greeting));
                self.transcript.push(TranscriptEntry::agent(&greeting));
                self.speak_detached(greeting);
            }
            Err(e) => {
                warn!(
                    call_id = %self.call_id,
                    error = %e,
                    "Recognizer unavailable, continuing without transcription"
                );
                self.transcript.push(TranscriptEntry::agent(RECOGNIZER_APOLOGY));
                self.speak_detached(RECOGNIZER_APOLOGY.to_string());
            }
        }
    }

    async fn connect_recognizer(&mut self) -> Result<(), STTError> {
        let mut recognizer = self.services.recognizers.create()?;
        let events = recognizer.connect().await?;
        info!(
            call_id = %self.call_id,
            provider = recognizer.provider_info(),
            "Recognizer connected"
        );
        self.recognizer = Some(recognizer);
        self.recognizer_events = Some(events);
        Ok(())
    }

    // =========================================================================
    // Recognizer
    // =========================================================================

    fn on_recognizer_event(&mut self, event: RecognizerEvent) {
        let now = Instant::now();
        match event {
            RecognizerEvent::Transcript(result) => {
                if result.is_final {
                    debug!(call_id = %self.call_id, transcript = %result.transcript, "Final transcript");
                }
                if self
                    .controller
                    .on_transcript(&result.transcript, result.is_final, now)
                {
                    info!(call_id = %self.call_id, "Caller interrupted the agent");
                }
            }
            RecognizerEvent::UtteranceEnd => {
                if self.controller.on_utterance_end(now) {
                    info!(call_id = %self.call_id, "Caller interrupted the agent");
                }
            }
            RecognizerEvent::SpeechStarted => {
                debug!(call_id = %self.call_id, "Caller speech started");
            }
            RecognizerEvent::Error(e) => {
                warn!(call_id = %self.call_id, error = %e, "Recognizer error");
            }
            RecognizerEvent::Closed => {}
        }
    }

    // =========================================================================
    // Turns
    // =========================================================================

    fn on_debounce_elapsed(&mut self) {
        let Some(utterance) = self.controller.on_debounce_elapsed(Instant::now()) else {
            return;
        };
        if self.terminating {
            debug!(call_id = %self.call_id, "Call is ending, not answering utterance");
            self.transcript.push(TranscriptEntry::caller(&utterance));
            self.controller.finish_turn(Instant::now());
            return;
        }

        info!(call_id = %self.call_id, utterance = %utterance, "Caller turn");
        self.history.push(ChatMessage::user(&utterance));
        self.transcript.push(TranscriptEntry::caller(&utterance));

        let job = TurnJob {
            voice: self.voice.clone(),
            models: self.services.models.clone(),
            tenant_id: self.tenant_id.clone(),
            system_prompt: self.script.system_prompt.clone(),
            history: self.history.clone(),
            epoch: self.voice.playback.current_epoch(),
        };
        let commands = self.commands_tx.clone();
        self.generation = Some(tokio::spawn(async move {
            let command = match job.run().await {
                Ok(reply) => SessionCommand::TurnCompleted { reply },
                Err(error) => SessionCommand::TurnFailed { error },
            };
            let _ = commands.send(command);
        }));
    }

    fn on_command(&mut self, command: SessionCommand) {
        self.generation = None;
        self.controller.finish_turn(Instant::now());
        if self.controller.has_committed_utterance() {
            debug!(call_id = %self.call_id, "Caller spoke during the reply, answering next");
        }

        match command {
            SessionCommand::TurnCompleted { reply } => {
                if reply.is_empty() {
                    warn!(call_id = %self.call_id, "Model returned an empty reply");
                } else {
                    info!(call_id = %self.call_id, reply = %reply, "Agent turn");
                    self.history.push(ChatMessage::assistant(&reply));
                    self.transcript.push(TranscriptEntry::agent(&reply));
                }
                self.persist_detached(CallUpdate::transcript(self.transcript.clone()));

                if !self.terminating
                    && self
                        .controller
                        .should_terminate(&reply, self.transcript.len())
                {
                    info!(
                        call_id = %self.call_id,
                        transcript_entries = self.transcript.len(),
                        "Wrapping up call"
                    );
                    self.terminating = true;
                    self.voice.playback.send_goodbye_mark();
                }
            }
            SessionCommand::TurnFailed { error } => {
                warn!(call_id = %self.call_id, error = %error, "Response cycle failed");
                self.transcript.push(TranscriptEntry::agent(TURN_APOLOGY));
                self.speak_detached(TURN_APOLOGY.to_string());
            }
        }
    }

    fn speak_detached(&mut self, text: String) {
        let voice = self.voice.clone();
        let epoch = voice.playback.current_epoch();
        self.speech_tasks.retain(|task| !task.is_finished());
        self.speech_tasks.push(tokio::spawn(async move {
            voice.say(epoch, &text).await;
        }));
    }

    fn persist_detached(&mut self, update: CallUpdate) {
        let store = self.services.store.clone();
        let call_id = self.call_id.clone();
        self.persist_tasks.retain(|task| !task.is_finished());
        self.persist_tasks.push(tokio::spawn(async move {
            if let Err(e) = store.update_call(&call_id, update).await {
                warn!(call_id = %call_id, error = %e, "Failed to persist call update");
            }
        }));
    }

    // =========================================================================
    // Teardown
    // =========================================================================

    async fn teardown(&mut self, reason: TeardownReason) {
        info!(call_id = %self.call_id, ?reason, "Ending call session");

        self.controller.cancel_debounce();
        if let Some(generation) = self.generation.take() {
            generation.abort();
        }
        for task in self.speech_tasks.drain(..) {
            task.abort();
        }

        self.recognizer_events = None;
        if let Some(mut recognizer) = self.recognizer.take()
            && let Err(e) = recognizer.disconnect().await
        {
            debug!(call_id = %self.call_id, error = %e, "Recognizer disconnect failed");
        }

        self.transport.close();

        // Earlier writes must land before the final record.
        let mut pending = std::mem::take(&mut self.persist_tasks);
        let flushed = tokio::time::timeout(FINAL_PERSIST_TIMEOUT, async {
            for task in pending.iter_mut() {
                let _ = task.await;
            }
        })
        .await;
        if flushed.is_err() {
            warn!(call_id = %self.call_id, "Timed out waiting for earlier call updates");
            for task in pending {
                task.abort();
            }
        }

        let update = CallUpdate {
            status: Some(CallStatus::Completed),
            transcript: Some(self.transcript.clone()),
            duration_secs: self.started_at.map(|started| started.elapsed().as_secs()),
        };
        match tokio::time::timeout(
            FINAL_PERSIST_TIMEOUT,
            self.services.store.update_call(&self.call_id, update),
        )
        .await
        {
            Ok(Ok(())) => debug!(call_id = %self.call_id, "Final transcript stored"),
            Ok(Err(e)) => warn!(call_id = %self.call_id, error = %e, "Failed to store final transcript"),
            Err(_) => warn!(call_id = %self.call_id, "Timed out storing final transcript"),
        }
    }
}

async fn recv_opt(rx: &mut Option<mpsc::Receiver<RecognizerEvent>>) -> Option<RecognizerEvent> {
    match rx {
        Some(rx) => rx.recv().await,
        None => std::future::pending().await,
    }
}

async fn sleep_until_opt(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}
