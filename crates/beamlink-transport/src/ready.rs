use tokio::sync::watch;

/// Transport-level clear-to-send flag.
///
/// The outbound scheduler takes the flag (true -> false) before every
/// physical write; the transport raises it again once the link can accept the
/// next write. Slow or half-duplex links therefore never see more than one
/// outstanding write.
#[derive(Debug)]
pub struct ClearToSend {
    tx: watch::Sender<bool>,
}

impl ClearToSend {
    /// Create a flag with an explicit initial state.
    pub fn new(ready: bool) -> Self {
        let (tx, _rx) = watch::channel(ready);
        Self { tx }
    }

    /// Returns true if the link can take a write right now.
    pub fn is_ready(&self) -> bool {
        *self.tx.borrow()
    }

    /// Mark the link ready for the next write.
    pub fn set_ready(&self) {
        self.tx.send_replace(true);
    }

    /// Mark the link busy without taking the flag.
    pub fn set_busy(&self) {
        self.tx.send_replace(false);
    }

    /// Atomically flip the flag from ready to busy.
    ///
    /// Returns false if the link was already busy.
    pub fn try_acquire(&self) -> bool {
        self.tx.send_if_modified(|ready| {
            if *ready {
                *ready = false;
                true
            } else {
                false
            }
        })
    }

    /// Wait until the link is ready. Does not take the flag.
    pub async fn ready(&self) {
        let mut rx = self.tx.subscribe();
        // The sender lives in `self`, so the channel cannot close while we wait.
        let _ = rx.wait_for(|ready| *ready).await;
    }
}

impl Default for ClearToSend {
    fn default() -> Self {
        Self::new(true)
    }
}
