use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use beamlink_message::{is_urgent_type, Response};
use tracing::trace;

use crate::error::{Result, SessionError};
use crate::outbound::OutboundQueue;

/// Handle for sending responses back over the link.
///
/// A responder handed to a [`CommandHandler`](crate::CommandHandler) is bound
/// to that command and can build correlated replies ([`Responder::success`]).
/// One from [`Session::responder`](crate::Session::responder) is unbound and
/// only pushes prebuilt responses.
///
/// Clones share one record of whether the bound command has been answered.
#[derive(Debug, Clone)]
pub struct Responder {
    outbound: Arc<OutboundQueue>,
    reply: Option<Response>,
    replied: Arc<AtomicBool>,
}

impl Responder {
    pub(crate) fn bound(outbound: Arc<OutboundQueue>, reply: Response) -> Self {
        Self {
            outbound,
            reply: Some(reply),
            replied: Arc::new(AtomicBool::new(false)),
        }
    }

    pub(crate) fn unbound(outbound: Arc<OutboundQueue>) -> Self {
        Self {
            outbound,
            reply: None,
            replied: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Reply template correlated to the command, if bound.
    pub fn reply(&self) -> Option<&Response> {
        self.reply.as_ref()
    }

    /// Check if a result correlated to the bound command has been queued.
    pub fn has_replied(&self) -> bool {
        self.replied.load(Ordering::Acquire)
    }

    /// Send a successful result for the bound command.
    pub fn success(&self, result: impl Into<String>) -> Result<()> {
        let reply = self.reply.as_ref().ok_or(SessionError::NotCorrelated)?;
        let response = reply
            .clone()
            .with_result_id(beamlink_message::RESULT_OK)
            .with_result(result);
        self.send(&response)
    }

    /// Send `response` under its default coalesce key (its `Type`).
    pub fn send(&self, response: &Response) -> Result<()> {
        self.send_with(response, None, None)
    }

    /// Send `response` with an explicit coalesce key and/or priority.
    ///
    /// Urgent response types are kept in the preferred priority band whatever
    /// priority is asked for.
    pub fn send_with(
        &self,
        response: &Response,
        coalesce_key: Option<&str>,
        priority: Option<u32>,
    ) -> Result<()> {
        let payload = response.to_json()?;
        let default_key = response.coalesce_key();
        let key = coalesce_key.unwrap_or(default_key.as_str());
        let priority = self.effective_priority(response.type_char, priority);

        trace!(
            service = %response.service,
            id = response.id,
            key,
            priority,
            "queueing response"
        );
        self.outbound.enqueue(payload, Some(key), Some(priority))?;
        if self.correlates(response) {
            self.replied.store(true, Ordering::Release);
        }
        Ok(())
    }

    /// Queue an arbitrary payload. Never counts as a reply.
    pub fn send_raw(
        &self,
        payload: impl Into<String>,
        coalesce_key: Option<&str>,
        priority: Option<u32>,
    ) -> Result<()> {
        self.outbound.enqueue(payload, coalesce_key, priority)
    }

    fn correlates(&self, response: &Response) -> bool {
        self.reply
            .as_ref()
            .is_some_and(|reply| reply.service == response.service && reply.id == response.id)
    }

    fn effective_priority(&self, type_char: char, requested: Option<u32>) -> u32 {
        let config = self.outbound.config();
        let priority = requested.unwrap_or(config.default_priority);
        if is_urgent_type(type_char) {
            priority.min(config.preferred_priority_max)
        } else {
            priority
        }
    }
}

#[cfg(test)]
mod tests {
    use beamlink_message::Classifier;
    use beamlink_transport::ClearToSend;

    use super::*;
    use crate::outbound::OutboundConfig;

    fn queue(ready: bool) -> Arc<OutboundQueue> {
        Arc::new(OutboundQueue::new(
            OutboundConfig::default(),
            Arc::new(ClearToSend::new(ready)),
        ))
    }

    #[test]
    fn urgent_types_are_clamped() {
        let responder = Responder::unbound(queue(false));
        assert_eq!(responder.effective_priority('G', Some(50)), 10);
        assert_eq!(responder.effective_priority('G', Some(3)), 3);
        assert_eq!(responder.effective_priority('R', Some(50)), 50);
        assert_eq!(responder.effective_priority('R', None), 10);
    }

    #[test]
    fn unbound_cannot_reply() {
        let responder = Responder::unbound(queue(true));
        assert!(matches!(
            responder.success("ok"),
            Err(SessionError::NotCorrelated)
        ));
    }

    #[test]
    fn default_key_is_type() {
        let outbound = queue(false);
        let responder = Responder::unbound(Arc::clone(&outbound));

        responder.send(&Response::status("SENSORS", 'G')).unwrap();
        responder.send(&Response::status("SENSORS", 'G')).unwrap();
        responder.send(&Response::status("SENSORS", 'M')).unwrap();
        assert_eq!(outbound.pending_len(), 2);
    }

    #[test]
    fn bound_success_is_correlated() {
        let outbound = queue(true);
        let command = Classifier::new()
            .classify(r#"{"Service":"PING","Id":12,"Type":"A"}"#)
            .unwrap();
        let responder = Responder::bound(Arc::clone(&outbound), Response::to(&command));

        let handle = responder.clone();
        assert!(!handle.has_replied());
        responder.success("pong").unwrap();
        assert_eq!(outbound.chunk_len(), 1);
        assert_eq!(responder.reply().map(|r| r.id), Some(12));
        assert!(handle.has_replied());
    }

    #[test]
    fn only_correlated_sends_count_as_replies() {
        let outbound = queue(true);
        let command = Classifier::new()
            .classify(r#"{"Service":"SENSORS","Id":4}"#)
            .unwrap();
        let responder = Responder::bound(Arc::clone(&outbound), Response::to(&command));

        responder.send(&Response::status("SENSORS", 'G')).unwrap();
        responder.send_raw("{}", None, None).unwrap();
        assert!(!responder.has_replied());

        let closed = queue(true);
        closed.close();
        let refused = Responder::bound(closed, Response::to(&command));
        assert!(refused.success("late").is_err());
        assert!(!refused.has_replied());
    }
}
