use std::sync::Arc;

use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt, ReadHalf, WriteHalf};
use tokio::sync::Mutex;
use tracing::trace;

use crate::error::{Result, TransportError};
use crate::ready::ClearToSend;
use crate::traits::LinkSink;

/// [`LinkSink`] over any tokio `AsyncWrite`.
///
/// Stream transports are ready for the next write as soon as the previous one
/// has been flushed, so the sink raises its clear-to-send flag after every
/// write, successful or not.
pub struct StreamSink<W> {
    writer: Mutex<W>,
    clear_to_send: Arc<ClearToSend>,
}

impl<W> StreamSink<W>
where
    W: AsyncWrite + Unpin + Send + 'static,
{
    /// Wrap a writer; `clear_to_send` is raised after each write.
    pub fn new(writer: W, clear_to_send: Arc<ClearToSend>) -> Self {
        Self {
            writer: Mutex::new(writer),
            clear_to_send,
        }
    }

    /// The flag this sink raises when it can take the next write.
    pub fn clear_to_send(&self) -> &Arc<ClearToSend> {
        &self.clear_to_send
    }

    /// Shut down the write half.
    pub async fn shutdown(&self) -> Result<()> {
        let mut writer = self.writer.lock().await;
        writer.shutdown().await.map_err(TransportError::from_io)
    }

    /// Consume the sink and return the inner writer.
    pub fn into_inner(self) -> W {
        self.writer.into_inner()
    }
}

impl<W> LinkSink for StreamSink<W>
where
    W: AsyncWrite + Unpin + Send + 'static,
{
    async fn write_string(&self, payload: &str) -> Result<()> {
        let result = {
            let mut writer = self.writer.lock().await;
            match writer.write_all(payload.as_bytes()).await {
                Ok(()) => writer.flush().await,
                Err(err) => Err(err),
            }
        };
        self.clear_to_send.set_ready();
        trace!(len = payload.len(), ok = result.is_ok(), "stream write finished");
        result.map_err(TransportError::from_io)
    }
}

/// Split a duplex stream into its read half and a [`StreamSink`] over the
/// write half. The returned flag starts out ready.
pub fn split_stream<S>(stream: S) -> (ReadHalf<S>, StreamSink<WriteHalf<S>>)
where
    S: AsyncRead + AsyncWrite + Send + 'static,
{
    let (reader, writer) = tokio::io::split(stream);
    let sink = StreamSink::new(writer, Arc::new(ClearToSend::default()));
    (reader, sink)
}
