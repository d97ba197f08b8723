use serde::Deserialize;
use serde_json::{Map, Value};

use crate::error::{ClassifyError, Result};

/// Header keys, in every spelling accepted on input.
const HEADER_KEYS: [&str; 8] = [
    "Service", "service", "Id", "id", "Type", "type", "Action", "action",
];

#[derive(Deserialize)]
struct Header {
    #[serde(rename = "Service", alias = "service", default)]
    service: Option<String>,
    #[serde(rename = "Id", alias = "id", default)]
    id: Option<i64>,
    #[serde(rename = "Type", alias = "type", default)]
    type_str: Option<String>,
    #[serde(rename = "Action", alias = "action", default)]
    action: Option<String>,
}

/// Generic decode of one framed message.
///
/// Holds the routing header plus every other field untouched, and the raw
/// text the message arrived as (for logging and replay).
#[derive(Debug, Clone, PartialEq)]
pub struct Envelope {
    /// Service discriminator. Never empty.
    pub service: String,
    /// Correlation id echoed back in the response. Defaults to 0.
    pub id: i64,
    /// Single-character message type.
    pub type_char: Option<char>,
    /// Optional sub-action within the service.
    pub action: Option<String>,
    /// Every non-header field, as received.
    pub fields: Map<String, Value>,
    /// The message text exactly as framed.
    pub raw_source: String,
}

impl Envelope {
    /// Decode an envelope from message text.
    pub fn parse(text: &str) -> Result<Self> {
        match serde_json::from_str::<Value>(text)? {
            Value::Object(object) => Self::from_object(object, text),
            _ => Err(ClassifyError::NotAnObject),
        }
    }

    /// Split a decoded object into header and body fields.
    pub fn from_object(mut object: Map<String, Value>, raw_source: &str) -> Result<Self> {
        let header = Header::deserialize(&Value::Object(header_fields(&object)))
            .map_err(|err| ClassifyError::InvalidHeader(err.to_string()))?;

        let service = match header.service {
            Some(service) if !service.trim().is_empty() => service,
            _ => return Err(ClassifyError::MissingService),
        };

        let type_char = match header.type_str.as_deref() {
            None | Some("") => None,
            Some(text) => {
                let mut chars = text.chars();
                match (chars.next(), chars.next()) {
                    (Some(c), None) => Some(c),
                    _ => {
                        return Err(ClassifyError::InvalidHeader(format!(
                            "Type must be a single character, got {text:?}"
                        )))
                    }
                }
            }
        };

        for key in HEADER_KEYS {
            object.remove(key);
        }

        Ok(Self {
            service,
            id: header.id.unwrap_or(0),
            type_char,
            action: header.action,
            fields: object,
            raw_source: raw_source.to_string(),
        })
    }

    /// Look up a body field.
    pub fn field(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }
}

fn header_fields(object: &Map<String, Value>) -> Map<String, Value> {
    HEADER_KEYS
        .iter()
        .filter_map(|key| {
            object
                .get(*key)
                .filter(|value| !value.is_null())
                .map(|value| (key.to_string(), value.clone()))
        })
        .collect()
}
