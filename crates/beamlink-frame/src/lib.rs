//! Message framing over a raw character stream.
//!
//! Companion devices stream JSON-like objects one character at a time with no
//! length prefix and no delimiter. The [`Framer`] recovers message boundaries
//! by tracking brace depth outside quoted regions, and resynchronises on a
//! timeout when the link corrupts a message mid-flight.
//!
//! - [`Framer`] is the character-level state machine
//! - [`MessageCodec`] drives it from raw bytes (tokio-util codec)
//! - [`MessageReader`] drives it from a blocking `Read`
//! - [`segment_payload`] slices outbound payloads for constrained links

pub mod codec;
pub mod error;
pub mod framer;
pub mod reader;
pub mod segment;

pub use codec::MessageCodec;
pub use error::{FrameError, Result};
pub use framer::{Framer, FramerConfig, DEFAULT_MAX_MESSAGE_ASSEMBLY, DEFAULT_MAX_MESSAGE_LEN};
pub use reader::MessageReader;
pub use segment::{char_len, segment_payload, DEFAULT_SEGMENT_LEN};
