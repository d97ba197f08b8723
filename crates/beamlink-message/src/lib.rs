//! Message classification for the companion link.
//!
//! Every framed message is a JSON object carrying at least a `Service`
//! discriminator. The [`Classifier`] decodes it into a generic [`Envelope`],
//! looks the service up in the [`ShapeRegistry`], and produces a [`Command`]
//! whose [`CommandKind`] is either a strongly-shaped request or
//! [`CommandKind::Unknown`] for services nobody registered.
//!
//! Replies travel back as [`Response`] envelopes.

pub mod classify;
pub mod envelope;
pub mod error;
pub mod registry;
pub mod response;
pub mod service;
pub mod shapes;

pub use classify::{Classifier, Command};
pub use envelope::Envelope;
pub use error::{ClassifyError, Result};
pub use registry::{ShapeDescriptor, ShapeRegistry, BUILTIN_SHAPES};
pub use response::{Response, RESULT_FAILED, RESULT_OK, RESULT_UNSUPPORTED};
pub use service::{is_urgent_type, DEFAULT_RESPONSE_TYPE, URGENT_TYPES};
pub use shapes::{
    CameraRequest, CommandKind, ListenRequest, NotifyRequest, PingRequest, SensorRequest,
    SpeakRequest,
};
