use std::sync::Arc;

use serde_json::Value;
use tracing::trace;

use crate::envelope::Envelope;
use crate::error::{ClassifyError, Result};
use crate::registry::ShapeRegistry;
use crate::shapes::CommandKind;

/// A classified inbound command.
#[derive(Debug, Clone, PartialEq)]
pub struct Command {
    /// Routing header, body fields and raw text.
    pub envelope: Envelope,
    /// Typed body, or [`CommandKind::Unknown`].
    pub kind: CommandKind,
}

impl Command {
    /// Wrap an envelope whose service has no registered shape.
    pub fn unknown(envelope: Envelope) -> Self {
        Self {
            envelope,
            kind: CommandKind::Unknown,
        }
    }

    /// Service string as received; the dispatch partition key.
    pub fn service(&self) -> &str {
        &self.envelope.service
    }

    /// Correlation id.
    pub fn id(&self) -> i64 {
        self.envelope.id
    }

    pub fn type_char(&self) -> Option<char> {
        self.envelope.type_char
    }

    pub fn action(&self) -> Option<&str> {
        self.envelope.action.as_deref()
    }

    /// The message text exactly as framed.
    pub fn raw_source(&self) -> &str {
        &self.envelope.raw_source
    }
}

/// Turns framed message text into [`Command`]s.
#[derive(Debug, Clone)]
pub struct Classifier {
    registry: Arc<ShapeRegistry>,
}

impl Classifier {
    /// Classifier over the process-wide built-in registry.
    pub fn new() -> Self {
        Self::with_registry(ShapeRegistry::global())
    }

    /// Classifier over an explicit registry.
    pub fn with_registry(registry: Arc<ShapeRegistry>) -> Self {
        Self { registry }
    }

    /// Classify one framed message.
    ///
    /// Services without a registered shape come back as
    /// [`CommandKind::Unknown`]. A message whose service matches a shape but
    /// whose body does not decode into it is an error, never a silent
    /// fallback to `Unknown`.
    pub fn classify(&self, text: &str) -> Result<Command> {
        let envelope = Envelope::parse(text)?;

        let Some(shape) = self.registry.lookup(&envelope.service) else {
            trace!(service = %envelope.service, "no shape registered, passing through");
            return Ok(Command::unknown(envelope));
        };

        let kind = (shape.decode)(Value::Object(envelope.fields.clone())).map_err(|source| {
            ClassifyError::Shape {
                shape: shape.name,
                source,
            }
        })?;

        Ok(Command { envelope, kind })
    }

    /// Borrow the registry.
    pub fn registry(&self) -> &Arc<ShapeRegistry> {
        &self.registry
    }
}

impl Default for Classifier {
    fn default() -> Self {
        Self::new()
    }
}
