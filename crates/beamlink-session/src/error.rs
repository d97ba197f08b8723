use beamlink_message::{RESULT_FAILED, RESULT_UNSUPPORTED};

/// Errors that can occur in session operations.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// Transport-level error.
    #[error("transport error: {0}")]
    Transport(#[from] beamlink_transport::TransportError),

    /// Frame-level error.
    #[error("frame error: {0}")]
    Frame(#[from] beamlink_frame::FrameError),

    /// Inbound message could not be classified.
    #[error("classify error: {0}")]
    Classify(#[from] beamlink_message::ClassifyError),

    /// JSON serialization error.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    /// Configuration could not be parsed.
    #[error("invalid session config: {0}")]
    Config(#[source] serde_json::Error),

    /// The session has been disconnected; nothing more can be queued.
    #[error("session closed")]
    Closed,

    /// A correlated reply was requested from a responder with no command.
    #[error("responder is not bound to a command")]
    NotCorrelated,
}

pub type Result<T> = std::result::Result<T, SessionError>;

/// Failure reported by a [`CommandHandler`](crate::CommandHandler).
///
/// The dispatcher turns every handler error into exactly one negative
/// result addressed to the command's id.
#[derive(Debug, thiserror::Error)]
pub enum HandlerError {
    /// The device lacks the hardware or permission the command needs.
    #[error("unsupported capability: {0}")]
    UnsupportedCapability(String),

    /// Any other handler fault.
    #[error("{0}")]
    Failed(String),

    /// The handler could not queue its own reply.
    #[error(transparent)]
    Session(#[from] SessionError),
}

impl HandlerError {
    /// Create a generic failure.
    pub fn failed(message: impl Into<String>) -> Self {
        Self::Failed(message.into())
    }

    /// `ResultId` carried by the negative result for this error.
    pub fn result_code(&self) -> i64 {
        match self {
            Self::UnsupportedCapability(_) => RESULT_UNSUPPORTED,
            Self::Failed(_) | Self::Session(_) => RESULT_FAILED,
        }
    }
}
