//! End-to-end: a fake companion on one side of an in-memory duplex, a full
//! session on the other.

use std::sync::Arc;
use std::time::Duration;

use beamlink::frame::MessageCodec;
use beamlink::message::{RESULT_FAILED, RESULT_OK, RESULT_UNSUPPORTED};
use beamlink::{
    Command, CommandHandler, CommandKind, HandlerError, Responder, Response, Session,
    SessionConfig,
};
use futures_util::StreamExt;
use tokio::io::{AsyncWriteExt, DuplexStream, ReadHalf, WriteHalf};
use tokio::sync::Notify;
use tokio_util::codec::FramedRead;

struct Companion {
    responses: FramedRead<ReadHalf<DuplexStream>, MessageCodec>,
    writer: WriteHalf<DuplexStream>,
}

impl Companion {
    fn connect<H: CommandHandler>(config: SessionConfig, handler: H) -> (Self, Arc<Session>) {
        let (near, far) = tokio::io::duplex(1024);
        let session = Session::connect_stream(near, config, handler);
        let (reader, writer) = tokio::io::split(far);
        let companion = Self {
            responses: FramedRead::new(reader, MessageCodec::new()),
            writer,
        };
        (companion, session)
    }

    async fn send(&mut self, text: &str) {
        self.writer.write_all(text.as_bytes()).await.unwrap();
    }

    /// Send one character per write, like an RFCOMM link does.
    async fn dribble(&mut self, text: &str) {
        let mut buf = [0u8; 4];
        for c in text.chars() {
            self.send(c.encode_utf8(&mut buf)).await;
        }
    }

    async fn next_response(&mut self) -> Response {
        let text = tokio::time::timeout(Duration::from_secs(2), self.responses.next())
            .await
            .expect("response should arrive")
            .expect("link should stay open")
            .expect("response should frame");
        serde_json::from_str(&text).expect("response should be valid JSON")
    }

    async fn expect_silence(&mut self) {
        let next = tokio::time::timeout(Duration::from_millis(100), self.responses.next()).await;
        assert!(next.is_err(), "unexpected response: {next:?}");
    }
}

async fn answer(command: Command, responder: Responder) -> Result<(), HandlerError> {
    match &command.kind {
        CommandKind::Ping(_) => responder.success("pong")?,
        CommandKind::Speak(speak) => responder.success(speak.text.clone())?,
        CommandKind::Camera(_) => {
            return Err(HandlerError::UnsupportedCapability("camera".into()));
        }
        CommandKind::Unknown => {
            return Err(HandlerError::failed(format!("no handler for {}", command.service())));
        }
        _ => responder.success("ok")?,
    }
    Ok(())
}

#[tokio::test]
async fn ping_over_dribbled_link() {
    let (mut companion, _session) = Companion::connect(SessionConfig::default(), answer);

    companion
        .dribble(r#"garbage{"Service":"PING","Id":7,"Type":"A"}"#)
        .await;

    let response = companion.next_response().await;
    assert_eq!(response.service, "PING");
    assert_eq!(response.id, 7);
    assert_eq!(response.type_char, 'A');
    assert_eq!(response.result_id, Some(RESULT_OK));
    assert_eq!(response.result.as_deref(), Some("pong"));
}

#[tokio::test]
async fn long_result_is_segmented_and_reassembled() {
    let (mut companion, _session) = Companion::connect(SessionConfig::default(), answer);
    let text = "the quick brown fox {jumps} over the \"lazy\" dog. ".repeat(6);
    let request = serde_json::json!({ "Service": "SPEAK", "Id": 3, "Text": text }).to_string();

    companion.send(&request).await;

    let response = companion.next_response().await;
    assert_eq!(response.id, 3);
    assert_eq!(response.result.as_deref(), Some(text.as_str()));
}

#[tokio::test]
async fn failures_come_back_as_negative_results() {
    let (mut companion, _session) = Companion::connect(SessionConfig::default(), answer);

    companion.send(r#"{"Service":"PHOTO","Id":1}"#).await;
    let unsupported = companion.next_response().await;
    assert_eq!(unsupported.service, "PHOTO");
    assert_eq!(unsupported.id, 1);
    assert_eq!(unsupported.result_id, Some(RESULT_UNSUPPORTED));

    companion.send(r#"{"Service":"TELEPORT","Id":2}"#).await;
    let failed = companion.next_response().await;
    assert_eq!(failed.id, 2);
    assert_eq!(failed.result_id, Some(RESULT_FAILED));
    assert_eq!(failed.result.as_deref(), Some("no handler for TELEPORT"));

    // The unsupported service keeps working for later commands.
    companion.send(r#"{"Service":"PHOTO","Id":4}"#).await;
    assert_eq!(companion.next_response().await.id, 4);
}

#[tokio::test]
async fn invalid_messages_are_dropped_silently() {
    let (mut companion, _session) = Companion::connect(SessionConfig::default(), answer);

    companion
        .send(r#"{"Id":1}{"Service":"SPEAK","Id":2}{"Service":"PING",}"#)
        .await;
    companion.expect_silence().await;

    companion.send(r#"{"Service":"PING","Id":3}"#).await;
    assert_eq!(companion.next_response().await.id, 3);
}

#[tokio::test]
async fn stalled_message_is_abandoned() {
    let config = SessionConfig {
        max_message_assembly_ms: 50,
        ..SessionConfig::default()
    };
    let (mut companion, _session) = Companion::connect(config, answer);

    companion.send(r#"{"Service":"PING","Id":1,"#).await;
    tokio::time::sleep(Duration::from_millis(120)).await;
    companion.send(r#"{"Service":"PING","Id":2}"#).await;

    let response = companion.next_response().await;
    assert_eq!(response.id, 2);
    companion.expect_silence().await;
}

struct GatedCamera {
    gate: Arc<Notify>,
}

impl CommandHandler for GatedCamera {
    async fn handle(&self, command: Command, responder: Responder) -> Result<(), HandlerError> {
        if command.service() == "CAMERA" && command.id() == 1 {
            self.gate.notified().await;
        }
        responder.success(format!("{}:{}", command.service(), command.id()))?;
        if command.service() == "PING" {
            self.gate.notify_one();
        }
        Ok(())
    }
}

#[tokio::test]
async fn busy_service_does_not_block_others() {
    let handler = GatedCamera {
        gate: Arc::new(Notify::new()),
    };
    let (mut companion, _session) = Companion::connect(SessionConfig::default(), handler);

    companion
        .send(r#"{"Service":"CAMERA","Id":1}{"Service":"CAMERA","Id":2}{"Service":"PING","Id":3,"Type":"P"}"#)
        .await;

    let order: Vec<String> = [
        companion.next_response().await,
        companion.next_response().await,
        companion.next_response().await,
    ]
    .into_iter()
    .filter_map(|response| response.result)
    .collect();
    assert_eq!(order, vec!["PING:3", "CAMERA:1", "CAMERA:2"]);
}

#[tokio::test]
async fn unsolicited_push_and_disconnect() {
    let (mut companion, session) = Companion::connect(SessionConfig::default(), answer);

    session
        .responder()
        .send(&Response::status("SENSORS", 'G').with_result("{\"lux\":12}"))
        .unwrap();
    let push = companion.next_response().await;
    assert_eq!(push.service, "SENSORS");
    assert_eq!(push.type_char, 'G');

    drop(companion);
    tokio::time::timeout(Duration::from_secs(2), session.closed())
        .await
        .expect("session should close when the companion hangs up");
    assert!(!session.is_connected());
}
