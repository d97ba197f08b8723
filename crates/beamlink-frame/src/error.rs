/// Errors that can occur while reading framed messages.
///
/// Malformed input is never an error: the framer drops it and resynchronises.
#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    /// An I/O error occurred while reading from the link.
    #[error("frame I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The link was closed. Any partially assembled message is discarded.
    #[error("connection closed")]
    ConnectionClosed,
}

pub type Result<T> = std::result::Result<T, FrameError>;
