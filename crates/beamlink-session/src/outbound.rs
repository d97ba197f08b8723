//! Outbound send scheduling.
//!
//! Producers hand payloads to the [`OutboundQueue`]; a single drain loop
//! ([`OutboundQueue::run`]) writes them to the link one segment at a time,
//! gated by the transport's [`ClearToSend`] flag.
//!
//! While the link is busy, payloads wait in a coalescing table keyed by
//! coalesce key, where a newer payload replaces an older one with the same
//! key. When the link is idle, payloads skip the table and go straight to the
//! chunk queue. The chunk queue is always drained before the next table entry
//! is picked, so the segments of one message are never interleaved with
//! another's.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use beamlink_frame::{char_len, segment_payload, DEFAULT_SEGMENT_LEN};
use beamlink_transport::{ClearToSend, LinkSink};
use serde::{Deserialize, Serialize};
use tokio::sync::Notify;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace, warn};

use crate::error::{Result, SessionError};

/// Priority given to payloads that do not ask for one.
pub const DEFAULT_PRIORITY: u32 = 10;

/// Coalesce key used when the producer gives none.
pub const DEFAULT_COALESCE_KEY: &str = "_";

/// Configuration for the [`OutboundQueue`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutboundConfig {
    /// Maximum segment length in characters. Default: 60.
    pub segment_len: usize,
    /// Priority for payloads enqueued without one. Default: 10.
    pub default_priority: u32,
    /// Entries at or below this priority are always picked first. Default: 10.
    pub preferred_priority_max: u32,
    /// Coalesce key for payloads enqueued without one.
    pub default_coalesce_key: String,
}

impl Default for OutboundConfig {
    fn default() -> Self {
        Self {
            segment_len: DEFAULT_SEGMENT_LEN,
            default_priority: DEFAULT_PRIORITY,
            preferred_priority_max: DEFAULT_PRIORITY,
            default_coalesce_key: DEFAULT_COALESCE_KEY.to_string(),
        }
    }
}

#[derive(Debug)]
struct Pending {
    payload: String,
    priority: u32,
    /// Submission order of the first payload stored under this key.
    seq: u64,
}

#[derive(Debug, Default)]
struct CoalescingTable {
    entries: HashMap<String, Pending>,
    next_seq: u64,
}

impl CoalescingTable {
    fn insert(&mut self, key: String, payload: String, priority: u32) -> bool {
        if let Some(pending) = self.entries.get_mut(&key) {
            pending.payload = payload;
            pending.priority = priority;
            return true;
        }

        let seq = self.next_seq;
        self.next_seq += 1;
        self.entries.insert(
            key,
            Pending {
                payload,
                priority,
                seq,
            },
        );
        false
    }

    /// Remove the next entry to send: preferred band first, oldest within it.
    fn take_next(&mut self, preferred_max: u32) -> Option<(String, Pending)> {
        let key = self
            .entries
            .iter()
            .min_by_key(|(_, pending)| (pending.priority > preferred_max, pending.seq))
            .map(|(key, _)| key.clone())?;
        self.entries.remove_entry(&key)
    }
}

#[derive(Debug)]
struct Segment {
    message: u64,
    index: usize,
    count: usize,
    text: String,
}

/// Per-connection outbound queue.
#[derive(Debug)]
pub struct OutboundQueue {
    config: OutboundConfig,
    clear_to_send: Arc<ClearToSend>,
    table: Mutex<CoalescingTable>,
    chunks: Mutex<VecDeque<Segment>>,
    next_message: AtomicU64,
    wake: Notify,
    closed: AtomicBool,
}

impl OutboundQueue {
    pub fn new(config: OutboundConfig, clear_to_send: Arc<ClearToSend>) -> Self {
        Self {
            config,
            clear_to_send,
            table: Mutex::new(CoalescingTable::default()),
            chunks: Mutex::new(VecDeque::new()),
            next_message: AtomicU64::new(0),
            wake: Notify::new(),
            closed: AtomicBool::new(false),
        }
    }

    pub fn config(&self) -> &OutboundConfig {
        &self.config
    }

    /// The transport flag gating writes.
    pub fn clear_to_send(&self) -> &Arc<ClearToSend> {
        &self.clear_to_send
    }

    /// Queue `payload` for sending.
    ///
    /// `coalesce_key` and `priority` fall back to the configured defaults.
    /// If the link is clear to send the payload goes straight to the chunk
    /// queue; otherwise it replaces any pending payload with the same key.
    /// Either way, a payload still pending under the same key is discarded.
    pub fn enqueue(
        &self,
        payload: impl Into<String>,
        coalesce_key: Option<&str>,
        priority: Option<u32>,
    ) -> Result<()> {
        if self.is_closed() {
            return Err(SessionError::Closed);
        }

        let payload = payload.into();
        let priority = priority.unwrap_or(self.config.default_priority);
        let key = coalesce_key.unwrap_or(self.config.default_coalesce_key.as_str());

        if self.clear_to_send.is_ready() {
            trace!(len = char_len(&payload), "link idle, bypassing coalescing");
            // A payload still waiting under this key is now stale.
            if self.lock_table().entries.remove(key).is_some() {
                debug!(key, "superseded pending payload");
            }
            let segments = self.segments_for(&payload);
            self.lock_chunks().extend(segments);
        } else {
            let replaced = self.lock_table().insert(key.to_string(), payload, priority);
            if replaced {
                debug!(key, "coalesced pending payload");
            }
        }

        self.wake.notify_one();
        Ok(())
    }

    /// Number of payloads waiting in the coalescing table.
    pub fn pending_len(&self) -> usize {
        self.lock_table().entries.len()
    }

    /// Number of segments waiting in the chunk queue.
    pub fn chunk_len(&self) -> usize {
        self.lock_chunks().len()
    }

    pub fn is_idle(&self) -> bool {
        self.pending_len() == 0 && self.chunk_len() == 0
    }

    /// Refuse further payloads and wake the drain loop.
    pub fn close(&self) {
        self.closed.store(true, Ordering::Release);
        self.wake.notify_one();
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Drain the queue into `sink` until `cancel` fires.
    ///
    /// Takes the clear-to-send flag before every write. Raising it again is
    /// the transport's job (see [`LinkSink`]). A failed write drops the rest
    /// of that message's segments.
    pub async fn run<S: LinkSink>(self: Arc<Self>, sink: S, cancel: CancellationToken) {
        debug!("outbound drain started");

        loop {
            if cancel.is_cancelled() {
                break;
            }

            if self.is_idle() {
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    _ = self.wake.notified() => continue,
                }
            }

            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = self.clear_to_send.ready() => {}
            }
            if !self.clear_to_send.try_acquire() {
                continue;
            }

            let Some(segment) = self.next_segment() else {
                // Raced with nothing: give the flag back.
                self.clear_to_send.set_ready();
                continue;
            };

            trace!(
                message = segment.message,
                index = segment.index,
                count = segment.count,
                len = char_len(&segment.text),
                "writing segment"
            );
            if let Err(err) = sink.write_string(&segment.text).await {
                let dropped = self.drop_message(segment.message);
                warn!(
                    error = %err,
                    message = segment.message,
                    dropped,
                    "link write failed, dropping message"
                );
            }
        }

        debug!("outbound drain stopped");
    }

    fn next_segment(&self) -> Option<Segment> {
        if let Some(segment) = self.lock_chunks().pop_front() {
            return Some(segment);
        }

        let (key, pending) = self
            .lock_table()
            .take_next(self.config.preferred_priority_max)?;
        trace!(key = %key, priority = pending.priority, "picked pending payload");

        let mut segments = self.segments_for(&pending.payload);
        let first = segments.pop_front()?;
        if !segments.is_empty() {
            // Ahead of anything queued meanwhile, so this message stays contiguous.
            let mut chunks = self.lock_chunks();
            while let Some(segment) = segments.pop_back() {
                chunks.push_front(segment);
            }
        }
        Some(first)
    }

    fn segments_for(&self, payload: &str) -> VecDeque<Segment> {
        let message = self.next_message.fetch_add(1, Ordering::Relaxed);
        let texts = segment_payload(payload, self.config.segment_len);
        let count = texts.len();
        texts
            .into_iter()
            .enumerate()
            .map(|(index, text)| Segment {
                message,
                index,
                count,
                text,
            })
            .collect()
    }

    fn drop_message(&self, message: u64) -> usize {
        let mut chunks = self.lock_chunks();
        let before = chunks.len();
        chunks.retain(|segment| segment.message != message);
        before - chunks.len()
    }

    fn lock_table(&self) -> MutexGuard<'_, CoalescingTable> {
        self.table.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn lock_chunks(&self) -> MutexGuard<'_, VecDeque<Segment>> {
        self.chunks.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
