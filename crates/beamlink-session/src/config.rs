use std::time::Duration;

use beamlink_frame::{FramerConfig, DEFAULT_MAX_MESSAGE_LEN, DEFAULT_SEGMENT_LEN};
use serde::{Deserialize, Serialize};

use crate::error::{Result, SessionError};
use crate::outbound::{OutboundConfig, DEFAULT_COALESCE_KEY, DEFAULT_PRIORITY};

/// Per-connection configuration.
///
/// Every field has a default, so hosts only spell out what they change:
///
/// ```
/// use beamlink_session::SessionConfig;
///
/// let config = SessionConfig::from_json_str(r#"{"segment_len": 20}"#).unwrap();
/// assert_eq!(config.segment_len, 20);
/// assert_eq!(config.max_message_assembly_ms, 1000);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SessionConfig {
    /// Time allowed to assemble one inbound message, in milliseconds.
    pub max_message_assembly_ms: u64,
    /// Maximum inbound message size in bytes.
    pub max_message_len: usize,
    /// Maximum outbound segment length in characters.
    pub segment_len: usize,
    /// Priority for responses sent without one.
    pub default_priority: u32,
    /// Outbound entries at or below this priority are picked first.
    pub preferred_priority_max: u32,
    /// Coalesce key for payloads sent without one.
    pub default_coalesce_key: String,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            max_message_assembly_ms: 1000,
            max_message_len: DEFAULT_MAX_MESSAGE_LEN,
            segment_len: DEFAULT_SEGMENT_LEN,
            default_priority: DEFAULT_PRIORITY,
            preferred_priority_max: DEFAULT_PRIORITY,
            default_coalesce_key: DEFAULT_COALESCE_KEY.to_string(),
        }
    }
}

impl SessionConfig {
    /// Parse a JSON config document; absent fields keep their defaults.
    pub fn from_json_str(text: &str) -> Result<Self> {
        serde_json::from_str(text).map_err(SessionError::Config)
    }

    pub fn framer_config(&self) -> FramerConfig {
        FramerConfig {
            max_message_assembly: Duration::from_millis(self.max_message_assembly_ms),
            max_message_len: self.max_message_len,
        }
    }

    pub fn outbound_config(&self) -> OutboundConfig {
        OutboundConfig {
            segment_len: self.segment_len,
            default_priority: self.default_priority,
            preferred_priority_max: self.preferred_priority_max,
            default_coalesce_key: self.default_coalesce_key.clone(),
        }
    }
}
