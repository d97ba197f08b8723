/// Errors that can occur while classifying a framed message.
///
/// Every variant means the message is not dispatched.
#[derive(Debug, thiserror::Error)]
pub enum ClassifyError {
    /// The text is not valid JSON.
    #[error("malformed message: {0}")]
    Malformed(#[from] serde_json::Error),

    /// The text is valid JSON but not an object.
    #[error("message is not an object")]
    NotAnObject,

    /// The object has no (or an empty) `Service` field.
    #[error("message has no Service field")]
    MissingService,

    /// A header field (`Service`, `Id`, `Type`, `Action`) has the wrong type.
    #[error("invalid message header: {0}")]
    InvalidHeader(String),

    /// The service matched a registered shape but the body does not fit it.
    #[error("message does not match shape {shape}: {source}")]
    Shape {
        shape: &'static str,
        #[source]
        source: serde_json::Error,
    },
}

pub type Result<T> = std::result::Result<T, ClassifyError>;
