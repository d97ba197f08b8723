use std::future::Future;
use std::sync::Arc;

use crate::error::Result;

/// The write half of a companion link.
///
/// One call writes one payload (a whole message or a single segment of one).
/// Implementations must not interleave concurrent calls; the outbound
/// scheduler only ever has one write in flight, but hosts may share a sink.
///
/// Signalling readiness for the next write is the transport's job: it raises
/// the [`ClearToSend`](crate::ClearToSend) flag it was handed once the link can
/// accept more data.
pub trait LinkSink: Send + Sync + 'static {
    /// Write `payload` to the link.
    fn write_string(&self, payload: &str) -> impl Future<Output = Result<()>> + Send;
}

impl<T: LinkSink> LinkSink for Arc<T> {
    fn write_string(&self, payload: &str) -> impl Future<Output = Result<()>> + Send {
        (**self).write_string(payload)
    }
}
