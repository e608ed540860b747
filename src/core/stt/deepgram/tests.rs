//! Tests for the Deepgram recognizer.

use super::*;
use crate::core::stt::base::{RecognizerEvent, RecognizerFactory, STTConfig, STTError, SpeechRecognizer};
use bytes::Bytes;
use futures::{SinkExt, StreamExt};
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message;

fn test_config() -> DeepgramSTTConfig {
    DeepgramSTTConfig::from_base(STTConfig {
        api_key: "dg_test_key".to_string(),
        model: "nova-2-phonecall".to_string(),
        language: "en-US".to_string(),
        endpointing_ms: 250,
        utterance_end_ms: 1200,
        ..Default::default()
    })
}

// =============================================================================
// Configuration Tests
// =============================================================================

mod config_tests {
    use super::*;

    #[test]
    fn test_url_includes_all_params() {
        let url = test_config().build_websocket_url().unwrap();
        let url = url.as_str();

        assert!(url.starts_with("wss://api.deepgram.com/v1/listen?"));
        for param in [
            "encoding=linear16",
            "sample_rate=8000",
            "channels=1",
            "model=nova-2-phonecall",
            "language=en-US",
            "punctuate=true",
            "interim_results=true",
            "vad_events=true",
            "endpointing=250",
            "utterance_end_ms=1200",
        ] {
            assert!(url.contains(param), "missing {param} in {url}");
        }
    }

    #[test]
    fn test_invalid_base_url() {
        let config = test_config().with_base_url("not a url");
        assert!(matches!(
            config.build_websocket_url(),
            Err(STTError::ConfigurationError(_))
        ));
    }

    #[test]
    fn test_authorization_uses_token_scheme() {
        assert_eq!(test_config().authorization(), "Token dg_test_key");
    }

    #[test]
    fn test_new_requires_api_key() {
        let config = DeepgramSTTConfig::default();
        assert!(matches!(
            DeepgramSTT::new(config),
            Err(STTError::AuthenticationFailed(_))
        ));
    }

    #[test]
    fn test_factory_creates_disconnected_recognizer() {
        let factory = DeepgramRecognizerFactory::new(test_config());
        let recognizer = factory.create().unwrap();
        assert!(!recognizer.is_ready());
        assert_eq!(recognizer.provider_info(), "Deepgram Live Transcription");
    }
}

// =============================================================================
// Message Tests
// =============================================================================

mod message_tests {
    use super::*;

    fn text(json: &str) -> Message {
        Message::Text(json.to_string().into())
    }

    async fn handle(json: &str) -> (Result<bool, STTError>, Vec<RecognizerEvent>) {
        let (tx, mut rx) = mpsc::channel(8);
        let result = DeepgramSTT::handle_websocket_message(text(json), &tx).await;
        let mut events = Vec::new();
        while let Ok(event) = rx.try_recv() {
            events.push(event);
        }
        (result, events)
    }

    #[tokio::test]
    async fn test_results_become_transcripts() {
        let (result, events) = handle(
            r#"{"type":"Results","is_final":true,"speech_final":false,"start":0.0,"duration":1.2,
                "channel":{"alternatives":[{"transcript":"I need a table","confidence":0.93}]}}"#,
        )
        .await;
        assert_eq!(result, Ok(true));
        match &events[..] {
            [RecognizerEvent::Transcript(result)] => {
                assert_eq!(result.transcript, "I need a table");
                assert!(result.is_final);
                assert!(!result.is_speech_final);
            }
            other => panic!("Unexpected events {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_empty_results_are_skipped() {
        let (result, events) = handle(
            r#"{"type":"Results","is_final":false,"channel":{"alternatives":[{"transcript":"","confidence":0.0}]}}"#,
        )
        .await;
        assert_eq!(result, Ok(true));
        assert!(events.is_empty());
    }

    #[tokio::test]
    async fn test_vad_events() {
        let (_, events) =
            handle(r#"{"type":"UtteranceEnd","channel":[0,1],"last_word_end":2.4}"#).await;
        assert_eq!(events, vec![RecognizerEvent::UtteranceEnd]);

        let (_, events) =
            handle(r#"{"type":"SpeechStarted","channel":[0],"timestamp":1.5}"#).await;
        assert_eq!(events, vec![RecognizerEvent::SpeechStarted]);
    }

    #[tokio::test]
    async fn test_metadata_and_unknown_are_logged_only() {
        let (result, events) =
            handle(r#"{"type":"Metadata","request_id":"abc","duration":3.0}"#).await;
        assert_eq!(result, Ok(true));
        assert!(events.is_empty());

        let (result, events) = handle(r#"{"type":"SomethingNew"}"#).await;
        assert_eq!(result, Ok(true));
        assert!(events.is_empty());
    }

    #[tokio::test]
    async fn test_error_message_fails_stream() {
        let (result, _) =
            handle(r#"{"type":"Error","description":"bad audio","variant":"x"}"#).await;
        assert_eq!(result, Err(STTError::ProviderError("bad audio".to_string())));
    }

    #[tokio::test]
    async fn test_close_frame_stops_stream() {
        let (tx, _rx) = mpsc::channel(1);
        assert_eq!(
            DeepgramSTT::handle_websocket_message(Message::Close(None), &tx).await,
            Ok(false)
        );
    }

    #[tokio::test]
    async fn test_final_transcript_waits_for_full_channel() {
        let (tx, mut rx) = mpsc::channel(1);
        tx.send(RecognizerEvent::SpeechStarted).await.unwrap();

        let sender = tx.clone();
        let delivery = tokio::spawn(async move {
            DeepgramSTT::handle_websocket_message(
                text(
                    r#"{"type":"Results","is_final":true,"speech_final":true,
                        "channel":{"alternatives":[{"transcript":"cancel my order","confidence":0.9}]}}"#,
                ),
                &sender,
            )
            .await
        });

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!delivery.is_finished());

        assert_eq!(rx.recv().await, Some(RecognizerEvent::SpeechStarted));
        assert_eq!(delivery.await.unwrap(), Ok(true));
        match rx.recv().await {
            Some(RecognizerEvent::Transcript(result)) => {
                assert_eq!(result.transcript, "cancel my order");
                assert!(result.is_final);
            }
            other => panic!("Unexpected event {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_speech_started_is_dropped_when_channel_is_full() {
        let (tx, mut rx) = mpsc::channel(1);
        tx.send(RecognizerEvent::UtteranceEnd).await.unwrap();

        let result = DeepgramSTT::handle_websocket_message(
            text(r#"{"type":"SpeechStarted","channel":[0],"timestamp":1.5}"#),
            &tx,
        )
        .await;
        assert_eq!(result, Ok(true));
        assert_eq!(rx.recv().await, Some(RecognizerEvent::UtteranceEnd));
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_control_messages_serialize() {
        assert_eq!(
            serde_json::to_string(&KeepAliveMessage::default()).unwrap(),
            r#"{"type":"KeepAlive"}"#
        );
        assert_eq!(
            serde_json::to_string(&CloseStreamMessage::default()).unwrap(),
            r#"{"type":"CloseStream"}"#
        );
    }
}

// =============================================================================
// Connection Tests
// =============================================================================

mod connection_tests {
    use super::*;
    use tokio_tungstenite::accept_hdr_async;
    use tokio_tungstenite::tungstenite::handshake::server::{Request, Response};

    /// Accepts one connection, answers the first audio frame with a final
    /// transcript and reports what the client sent.
    async fn spawn_mock_server() -> (String, mpsc::UnboundedReceiver<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let (seen_tx, seen_rx) = mpsc::unbounded_channel();

        tokio::spawn(async move {
            let (stream, _) = listener.accept().await.unwrap();
            let auth_tx = seen_tx.clone();
            let ws = accept_hdr_async(stream, move |request: &Request, response: Response| {
                let auth = request
                    .headers()
                    .get("Authorization")
                    .and_then(|v| v.to_str().ok())
                    .unwrap_or_default()
                    .to_string();
                let _ = auth_tx.send(format!("auth:{auth}"));
                let _ = auth_tx.send(format!("query:{}", request.uri().query().unwrap_or_default()));
                Ok(response)
            })
            .await
            .unwrap();
            let (mut write, mut read) = ws.split();

            while let Some(Ok(message)) = read.next().await {
                match message {
                    Message::Binary(audio) => {
                        let _ = seen_tx.send(format!("audio:{}", audio.len()));
                        let result = serde_json::json!({
                            "type": "Results",
                            "is_final": true,
                            "speech_final": true,
                            "channel": {"alternatives": [{"transcript": "hello there", "confidence": 0.9}]}
                        });
                        write
                            .send(Message::Text(result.to_string().into()))
                            .await
                            .unwrap();
                    }
                    Message::Text(text) => {
                        let _ = seen_tx.send(format!("text:{}", text.as_str()));
                    }
                    Message::Close(_) => {
                        let _ = seen_tx.send("close".to_string());
                        break;
                    }
                    _ => {}
                }
            }
        });

        (format!("ws://{addr}/v1/listen"), seen_rx)
    }

    #[tokio::test]
    async fn test_streams_audio_and_closes_gracefully() {
        let (url, mut seen) = spawn_mock_server().await;
        let mut stt = DeepgramSTT::new(test_config().with_base_url(url)).unwrap();

        let mut events = stt.connect().await.unwrap();
        assert!(stt.is_ready());

        stt.send_audio(Bytes::from(vec![0u8; 320])).await.unwrap();

        let event = tokio::time::timeout(Duration::from_secs(5), events.recv())
            .await
            .unwrap()
            .unwrap();
        match event {
            RecognizerEvent::Transcript(result) => {
                assert_eq!(result.transcript, "hello there");
                assert!(result.is_final);
            }
            other => panic!("Unexpected event {other:?}"),
        }

        stt.disconnect().await.unwrap();
        assert!(!stt.is_ready());

        let mut log = Vec::new();
        while let Ok(Some(entry)) =
            tokio::time::timeout(Duration::from_secs(2), seen.recv()).await
        {
            log.push(entry);
        }
        assert_eq!(log[0], "auth:Token dg_test_key");
        assert!(log[1].contains("encoding=linear16"));
        assert!(log.contains(&"audio:320".to_string()));

        let close_stream = log
            .iter()
            .position(|e| e == r#"text:{"type":"CloseStream"}"#)
            .expect("CloseStream sent");
        let close = log.iter().position(|e| e == "close").expect("close sent");
        assert!(close_stream < close);
    }

    #[tokio::test]
    async fn test_connect_failure_is_reported() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let mut stt =
            DeepgramSTT::new(test_config().with_base_url(format!("ws://{addr}/v1/listen"))).unwrap();
        assert!(matches!(
            stt.connect().await,
            Err(STTError::ConnectionFailed(_))
        ));
        assert!(!stt.is_ready());
    }

    #[tokio::test]
    async fn test_send_audio_requires_connection() {
        let mut stt = DeepgramSTT::new(test_config()).unwrap();
        assert!(matches!(
            stt.send_audio(Bytes::from_static(&[0, 0])).await,
            Err(STTError::ConnectionFailed(_))
        ));
    }

    #[tokio::test]
    async fn test_server_close_ends_event_stream() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (stream, _) = listener.accept().await.unwrap();
            let mut ws = tokio_tungstenite::accept_async(stream).await.unwrap();
            ws.close(None).await.unwrap();
        });

        let mut stt =
            DeepgramSTT::new(test_config().with_base_url(format!("ws://{addr}/v1/listen"))).unwrap();
        let mut events = stt.connect().await.unwrap();

        let mut saw_closed = false;
        while let Ok(Some(event)) =
            tokio::time::timeout(Duration::from_secs(5), events.recv()).await
        {
            if event == RecognizerEvent::Closed {
                saw_closed = true;
            }
        }
        assert!(saw_closed);
        assert!(!stt.is_ready());
    }
}
