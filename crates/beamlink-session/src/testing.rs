use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use beamlink_transport::{ClearToSend, LinkSink, TransportError};

/// Sink that records every successful write and raises clear-to-send after
/// each attempt, like a stream transport would.
#[derive(Clone)]
pub(crate) struct RecordingSink {
    writes: Arc<Mutex<Vec<String>>>,
    attempts: Arc<AtomicUsize>,
    fail_on: Option<usize>,
    raise_after_write: bool,
    clear_to_send: Arc<ClearToSend>,
}

impl RecordingSink {
    pub(crate) fn new(clear_to_send: Arc<ClearToSend>) -> Self {
        Self {
            writes: Arc::new(Mutex::new(Vec::new())),
            attempts: Arc::new(AtomicUsize::new(0)),
            fail_on: None,
            raise_after_write: true,
            clear_to_send,
        }
    }

    /// Fail the write attempt with this zero-based index.
    pub(crate) fn failing_on(mut self, attempt: usize) -> Self {
        self.fail_on = Some(attempt);
        self
    }

    /// Leave clear-to-send low after writes; the test raises it by hand.
    pub(crate) fn holding_clear_to_send(mut self) -> Self {
        self.raise_after_write = false;
        self
    }

    pub(crate) fn writes(&self) -> Vec<String> {
        self.writes.lock().unwrap().clone()
    }

    pub(crate) async fn wait_for(&self, count: usize) {
        tokio::time::timeout(Duration::from_secs(2), async {
            while self.writes.lock().unwrap().len() < count {
                tokio::time::sleep(Duration::from_millis(2)).await;
            }
        })
        .await
        .expect("sink should receive writes");
    }
}

impl LinkSink for RecordingSink {
    async fn write_string(&self, payload: &str) -> beamlink_transport::Result<()> {
        let attempt = self.attempts.fetch_add(1, Ordering::SeqCst);
        let result = if self.fail_on == Some(attempt) {
            Err(TransportError::Disconnected)
        } else {
            self.writes.lock().unwrap().push(payload.to_string());
            Ok(())
        };
        if self.raise_after_write {
            self.clear_to_send.set_ready();
        }
        result
    }
}
