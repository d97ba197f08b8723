//! Character-stream control protocol for companion devices.
//!
//! A companion device streams JSON-like command objects one character at a
//! time over Bluetooth RFCOMM, TCP or a serial line. beamlink frames them,
//! classifies them into typed commands, runs them through a fair per-service
//! scheduler and sends correlated results back under a priority and
//! segmentation aware send queue.
//!
//! # Crate Structure
//!
//! - [`transport`]: Link boundary (`LinkSink`, clear-to-send flag, stream sink)
//! - [`frame`]: Brace-depth framing, tokio codec, outbound segmentation
//! - [`message`]: Envelopes, command shapes, classifier, responses
//! - [`session`]: Dispatch and outbound scheduling for one connection
//! - [`logging`]: tracing subscriber setup for hosts

pub mod logging;

/// Re-export transport types.
pub mod transport {
    pub use beamlink_transport::*;
}

/// Re-export frame types.
pub mod frame {
    pub use beamlink_frame::*;
}

/// Re-export message types.
pub mod message {
    pub use beamlink_message::*;
}

/// Re-export session types.
pub mod session {
    pub use beamlink_session::*;
}

pub use beamlink_message::{Command, CommandKind, Response};
pub use beamlink_session::{CommandHandler, HandlerError, Responder, Session, SessionConfig};
