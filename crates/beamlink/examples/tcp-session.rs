//! Serve one companion over TCP and answer every built-in command.
//!
//! Run with:
//!   cargo run --example tcp-session
//!
//! Then type commands into a raw TCP client:
//!   nc 127.0.0.1 7878
//!   {"Service":"PING","Id":1,"Type":"A"}
//!   {"Service":"SPEAK","Id":2,"Text":"hello"}
//!   {"Service":"TELEPORT","Id":3}

use beamlink::logging::{init_logging, LogFormat, LogLevel};
use beamlink::{Command, CommandKind, HandlerError, Responder, Session, SessionConfig};
use tokio::net::TcpListener;

async fn handle(command: Command, responder: Responder) -> Result<(), HandlerError> {
    let result = match &command.kind {
        CommandKind::Ping(_) => "pong".to_string(),
        CommandKind::Speak(speak) => format!("spoke {} chars", speak.text.chars().count()),
        CommandKind::Notify(notify) => format!("shown: {}", notify.title),
        CommandKind::Sensors(sensors) if sensors.sensors.iter().any(|s| s == "barometer") => {
            return Err(HandlerError::UnsupportedCapability("barometer".into()));
        }
        CommandKind::Sensors(_) => r#"{"accel":[0.0,0.0,9.8]}"#.to_string(),
        CommandKind::Camera(_) | CommandKind::Listen(_) => {
            return Err(HandlerError::UnsupportedCapability(
                command.service().to_string(),
            ));
        }
        CommandKind::Unknown => {
            return Err(HandlerError::failed(format!(
                "no handler for {}",
                command.service()
            )));
        }
    };

    responder.success(result)?;
    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_logging(LogFormat::Text, LogLevel::Debug);

    let listener = TcpListener::bind("127.0.0.1:7878").await?;
    eprintln!("Listening on {}", listener.local_addr()?);

    let (stream, peer) = listener.accept().await?;
    eprintln!("Companion connected: {peer}");

    let session = Session::connect_stream(stream, SessionConfig::default(), handle);
    session.closed().await;

    eprintln!("Companion disconnected");
    Ok(())
}
