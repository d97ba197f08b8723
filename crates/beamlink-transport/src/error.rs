/// Errors that can occur on the physical link.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// An I/O error occurred on the link.
    #[error("transport I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The remote end went away (broken pipe, reset, zero-length write).
    #[error("link disconnected")]
    Disconnected,

    /// The link has been shut down locally.
    #[error("transport shut down")]
    Shutdown,
}

impl TransportError {
    /// Classify an I/O error, folding the "peer is gone" kinds into
    /// [`TransportError::Disconnected`].
    pub fn from_io(err: std::io::Error) -> Self {
        use std::io::ErrorKind;

        match err.kind() {
            ErrorKind::BrokenPipe
            | ErrorKind::ConnectionReset
            | ErrorKind::ConnectionAborted
            | ErrorKind::NotConnected
            | ErrorKind::UnexpectedEof
            | ErrorKind::WriteZero => TransportError::Disconnected,
            _ => TransportError::Io(err),
        }
    }

    /// Returns true if the error means the link is gone for good.
    pub fn is_disconnect(&self) -> bool {
        matches!(
            self,
            TransportError::Disconnected | TransportError::Shutdown
        )
    }
}

pub type Result<T> = std::result::Result<T, TransportError>;
