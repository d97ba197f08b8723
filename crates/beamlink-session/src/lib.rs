//! Per-connection protocol core for the companion link.
//!
//! A [`Session`] ties the layers together for one live connection:
//! characters in, framed and classified into commands, run through the
//! [`DispatchScheduler`] (one command at a time per service, services served
//! round-robin), with replies going out through the [`OutboundQueue`]
//! (coalescing, priority, segmentation, clear-to-send gating).
//!
//! Hosts plug in a [`CommandHandler`] and a
//! [`LinkSink`](beamlink_transport::LinkSink); everything else lives here.

pub mod config;
pub mod dispatch;
pub mod error;
pub mod handler;
pub mod outbound;
pub mod responder;
pub mod session;

#[cfg(test)]
mod testing;

pub use config::SessionConfig;
pub use dispatch::DispatchScheduler;
pub use error::{HandlerError, Result, SessionError};
pub use handler::CommandHandler;
pub use outbound::{OutboundConfig, OutboundQueue, DEFAULT_COALESCE_KEY, DEFAULT_PRIORITY};
pub use responder::Responder;
pub use session::Session;
