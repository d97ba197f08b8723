//! Duplex character-link boundary.
//!
//! A companion device talks to us over a single physical link: Bluetooth
//! RFCOMM, a TCP socket over WiFi-direct, or a USB serial line. Acquiring that
//! link is the host's job. This crate only describes what the protocol core
//! needs from it once it exists:
//! - a sink that accepts one string payload at a time ([`LinkSink`])
//! - a clear-to-send flag the transport raises when it can take the next write
//!   ([`ClearToSend`])
//!
//! [`StreamSink`] adapts any tokio `AsyncWrite` (TCP stream, serial port,
//! in-memory duplex) to that boundary.

pub mod error;
pub mod ready;
pub mod stream;
pub mod traits;

pub use error::{Result, TransportError};
pub use ready::ClearToSend;
pub use stream::{split_stream, StreamSink};
pub use traits::LinkSink;
