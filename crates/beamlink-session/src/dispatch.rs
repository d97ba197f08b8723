//! Inbound dispatch scheduling.
//!
//! Commands are partitioned by service key. Each key has its own FIFO queue
//! and at most one command executing at a time; keys with pending work take
//! turns in a round-robin rotation, so a slow service never holds up the
//! others.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use beamlink_message::{Command, Response, RESULT_FAILED, RESULT_OK};
use tokio::sync::Notify;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace, warn};

use crate::error::SessionError;
use crate::handler::CommandHandler;
use crate::outbound::OutboundQueue;
use crate::responder::Responder;

#[derive(Debug, Default)]
struct DispatchState {
    queues: HashMap<String, VecDeque<Command>>,
    rotation: VecDeque<String>,
    in_use: HashSet<String>,
}

impl DispatchState {
    /// Pop the next runnable command and mark its key in use.
    ///
    /// Keys that are in use rotate to the back; keys with an empty queue
    /// leave the rotation.
    fn next_runnable(&mut self) -> Option<Command> {
        for _ in 0..self.rotation.len() {
            let key = self.rotation.pop_front()?;
            if self.in_use.contains(&key) {
                self.rotation.push_back(key);
                continue;
            }

            let Some(queue) = self.queues.get_mut(&key) else {
                continue;
            };
            let Some(command) = queue.pop_front() else {
                continue;
            };
            let more = !queue.is_empty();

            self.in_use.insert(key.clone());
            if more {
                self.rotation.push_back(key);
            }
            return Some(command);
        }
        None
    }
}

/// Per-connection inbound scheduler.
#[derive(Debug)]
pub struct DispatchScheduler {
    state: Mutex<DispatchState>,
    wake: Notify,
    outbound: Arc<OutboundQueue>,
}

impl DispatchScheduler {
    /// Create a scheduler whose failure results go to `outbound`.
    pub fn new(outbound: Arc<OutboundQueue>) -> Self {
        Self {
            state: Mutex::new(DispatchState::default()),
            wake: Notify::new(),
            outbound,
        }
    }

    /// Queue a command behind any others for the same service.
    pub fn submit(&self, command: Command) {
        let key = command.service().to_string();
        {
            let mut state = self.lock_state();
            let depth = {
                let queue = state.queues.entry(key.clone()).or_default();
                queue.push_back(command);
                queue.len()
            };
            if !state.rotation.contains(&key) {
                state.rotation.push_back(key.clone());
            }
            trace!(service = %key, depth, "command queued");
        }
        self.wake.notify_one();
    }

    /// Commands waiting (not executing) for `service`.
    pub fn pending(&self, service: &str) -> usize {
        self.lock_state()
            .queues
            .get(service)
            .map_or(0, VecDeque::len)
    }

    /// Check if a command for `service` is executing.
    pub fn is_busy(&self, service: &str) -> bool {
        self.lock_state().in_use.contains(service)
    }

    /// Number of services with a command executing.
    pub fn in_flight(&self) -> usize {
        self.lock_state().in_use.len()
    }

    /// Run the dispatch loop until `cancel` fires.
    ///
    /// Each command runs on its own task. Handlers already running when the
    /// loop stops are left to finish.
    pub async fn run<H: CommandHandler>(self: Arc<Self>, handler: H, cancel: CancellationToken) {
        let handler = Arc::new(handler);
        debug!("dispatch loop started");

        loop {
            if cancel.is_cancelled() {
                break;
            }

            let next = self.lock_state().next_runnable();
            match next {
                Some(command) => self.spawn_command(command, Arc::clone(&handler)),
                None => {
                    tokio::select! {
                        _ = cancel.cancelled() => break,
                        _ = self.wake.notified() => {}
                    }
                }
            }
        }

        debug!("dispatch loop stopped");
    }

    fn spawn_command<H: CommandHandler>(self: &Arc<Self>, command: Command, handler: Arc<H>) {
        let scheduler = Arc::clone(self);
        let key = command.service().to_string();
        let reply = Response::to(&command);
        let responder = Responder::bound(Arc::clone(&self.outbound), reply.clone());
        let answered = responder.clone();

        debug!(service = %key, id = reply.id, "dispatching command");
        tokio::spawn(async move {
            let task = tokio::spawn(async move { handler.handle(command, responder).await });

            // Exactly one correlated result per command.
            match task.await {
                Ok(Ok(())) if answered.has_replied() => {
                    trace!(service = %key, id = reply.id, "command completed");
                }
                Ok(Ok(())) => {
                    warn!(service = %key, id = reply.id, "handler returned without replying");
                    scheduler.send_result(&reply, RESULT_OK, None);
                }
                Ok(Err(err)) if answered.has_replied() => {
                    warn!(
                        service = %key,
                        id = reply.id,
                        error = %err,
                        "command failed after replying, result already sent"
                    );
                }
                Ok(Err(err)) => {
                    warn!(service = %key, id = reply.id, error = %err, "command failed");
                    scheduler.send_result(&reply, err.result_code(), Some(&err.to_string()));
                }
                Err(err) if answered.has_replied() => {
                    warn!(
                        service = %key,
                        id = reply.id,
                        error = %err,
                        "command handler aborted after replying"
                    );
                }
                Err(err) => {
                    warn!(service = %key, id = reply.id, error = %err, "command handler aborted");
                    scheduler.send_result(&reply, RESULT_FAILED, Some("internal error"));
                }
            }

            scheduler.release(&key);
        });
    }

    /// Queue the result the handler did not send itself.
    fn send_result(&self, reply: &Response, code: i64, message: Option<&str>) {
        let mut response = reply.clone().with_result_id(code);
        if let Some(message) = message {
            response = response.with_result(message);
        }
        let key = format!("{}#{}", reply.service, reply.id);

        let queued = response
            .to_json()
            .map_err(SessionError::from)
            .and_then(|payload| self.outbound.enqueue(payload, Some(key.as_str()), None));
        if let Err(err) = queued {
            warn!(service = %reply.service, id = reply.id, error = %err, "could not queue result");
        }
    }

    fn release(&self, key: &str) {
        {
            let mut state = self.lock_state();
            state.in_use.remove(key);
            let waiting = state.queues.get(key).is_some_and(|queue| !queue.is_empty());
            if waiting && !state.rotation.iter().any(|k| k == key) {
                state.rotation.push_back(key.to_string());
            }
        }
        self.wake.notify_one();
    }

    fn lock_state(&self) -> MutexGuard<'_, DispatchState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
