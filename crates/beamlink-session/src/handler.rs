use std::future::Future;

use beamlink_message::Command;

use crate::error::HandlerError;
use crate::responder::Responder;

/// Host-side command execution.
///
/// The dispatcher calls `handle` for one command at a time per service and
/// runs it on its own task. A successful handler sends its own reply through
/// the [`Responder`]; an error becomes a negative result sent on its behalf.
pub trait CommandHandler: Send + Sync + 'static {
    fn handle(
        &self,
        command: Command,
        responder: Responder,
    ) -> impl Future<Output = Result<(), HandlerError>> + Send;
}

impl<F, Fut> CommandHandler for F
where
    F: Fn(Command, Responder) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<(), HandlerError>> + Send + 'static,
{
    fn handle(
        &self,
        command: Command,
        responder: Responder,
    ) -> impl Future<Output = Result<(), HandlerError>> + Send {
        self(command, responder)
    }
}
