use std::collections::VecDeque;
use std::time::Instant;

use bytes::{Buf, BytesMut};
use tokio_util::codec::{Decoder, Encoder};
use tracing::{debug, trace};

use crate::error::FrameError;
use crate::framer::{Framer, FramerConfig};

/// Codec that frames raw link bytes into complete message strings.
///
/// Bytes are decoded as UTF-8 incrementally: a multi-byte character split
/// across reads is held until the rest arrives, and invalid sequences are
/// skipped. One read can complete several messages; they are handed out one
/// per `decode` call in arrival order.
///
/// Encoding writes the payload's UTF-8 bytes as-is; the link protocol has no
/// outbound framing beyond the message text itself.
#[derive(Debug, Default)]
pub struct MessageCodec {
    framer: Framer,
    ready: VecDeque<String>,
}

impl MessageCodec {
    /// Create a codec with default framer configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a codec with explicit framer configuration.
    pub fn with_config(config: FramerConfig) -> Self {
        Self {
            framer: Framer::with_config(config),
            ready: VecDeque::new(),
        }
    }

    /// Borrow the underlying framer.
    pub fn framer(&self) -> &Framer {
        &self.framer
    }

    fn consume(&mut self, src: &mut BytesMut) {
        let now = Instant::now();

        while !src.is_empty() {
            match std::str::from_utf8(&src[..]) {
                Ok(text) => {
                    self.feed_str(text, now);
                    src.clear();
                }
                Err(err) => {
                    let valid = err.valid_up_to();
                    if let Ok(text) = std::str::from_utf8(&src[..valid]) {
                        self.feed_str(text, now);
                    }
                    match err.error_len() {
                        // Truncated multi-byte sequence: wait for the rest.
                        None => {
                            src.advance(valid);
                            return;
                        }
                        Some(bad) => {
                            trace!(bad, "skipping invalid UTF-8 on link");
                            src.advance(valid + bad);
                        }
                    }
                }
            }
        }
    }

    fn feed_str(&mut self, text: &str, now: Instant) {
        for c in text.chars() {
            if let Some(message) = self.framer.feed_at(c, now) {
                self.ready.push_back(message);
            }
        }
    }
}

impl Decoder for MessageCodec {
    type Item = String;
    type Error = FrameError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<String>, FrameError> {
        if let Some(message) = self.ready.pop_front() {
            return Ok(Some(message));
        }
        self.consume(src);
        Ok(self.ready.pop_front())
    }

    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<String>, FrameError> {
        if let Some(message) = self.decode(src)? {
            return Ok(Some(message));
        }
        if self.framer.is_assembling() || !src.is_empty() {
            debug!(
                partial = self.framer.pending_len(),
                trailing = src.len(),
                "discarding incomplete message at end of stream"
            );
            self.framer.reset();
            src.clear();
        }
        Ok(None)
    }
}

impl<T: AsRef<str>> Encoder<T> for MessageCodec {
    type Error = FrameError;

    fn encode(&mut self, item: T, dst: &mut BytesMut) -> Result<(), FrameError> {
        let text = item.as_ref();
        dst.reserve(text.len());
        dst.extend_from_slice(text.as_bytes());
        Ok(())
    }
}
