use std::io::{ErrorKind, Read};

use bytes::BytesMut;
use tokio_util::codec::Decoder;

use crate::codec::MessageCodec;
use crate::error::{FrameError, Result};
use crate::framer::{Framer, FramerConfig};

const INITIAL_BUFFER_CAPACITY: usize = 1024;
const READ_CHUNK_SIZE: usize = 1024;

/// Reads complete messages from any blocking `Read` stream.
///
/// Meant for serial-port style links driven from a dedicated thread. Partial
/// reads, split UTF-8 sequences and inter-message noise are handled
/// internally; callers always get whole messages.
pub struct MessageReader<T> {
    inner: T,
    buf: BytesMut,
    codec: MessageCodec,
}

impl<T: Read> MessageReader<T> {
    /// Create a message reader with default framer configuration.
    pub fn new(inner: T) -> Self {
        Self::with_config(inner, FramerConfig::default())
    }

    /// Create a message reader with explicit framer configuration.
    pub fn with_config(inner: T, config: FramerConfig) -> Self {
        Self {
            inner,
            buf: BytesMut::with_capacity(INITIAL_BUFFER_CAPACITY),
            codec: MessageCodec::with_config(config),
        }
    }

    /// Read the next complete message (blocking).
    ///
    /// Returns `Err(FrameError::ConnectionClosed)` when EOF is reached. A
    /// message still being assembled at EOF is discarded.
    pub fn read_message(&mut self) -> Result<String> {
        loop {
            if let Some(message) = self.codec.decode(&mut self.buf)? {
                return Ok(message);
            }

            let mut chunk = [0u8; READ_CHUNK_SIZE];
            let read = match self.inner.read(&mut chunk) {
                Ok(n) => n,
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) => return Err(FrameError::Io(err)),
            };

            if read == 0 {
                if let Some(message) = self.codec.decode_eof(&mut self.buf)? {
                    return Ok(message);
                }
                return Err(FrameError::ConnectionClosed);
            }

            self.buf.extend_from_slice(&chunk[..read]);
        }
    }

    /// Borrow the framer state.
    pub fn framer(&self) -> &Framer {
        self.codec.framer()
    }

    /// Borrow the underlying stream.
    pub fn get_ref(&self) -> &T {
        &self.inner
    }

    /// Mutably borrow the underlying stream.
    pub fn get_mut(&mut self) -> &mut T {
        &mut self.inner
    }

    /// Consume the reader and return the inner stream.
    pub fn into_inner(self) -> T {
        self.inner
    }
}
