use serde::{Deserialize, Serialize};

use crate::classify::Command;
use crate::service::DEFAULT_RESPONSE_TYPE;

/// `ResultId` for a successful command.
pub const RESULT_OK: i64 = 0;

/// `ResultId` for a command whose handler failed.
pub const RESULT_FAILED: i64 = -1;

/// `ResultId` for a command asking for a capability this device lacks.
pub const RESULT_UNSUPPORTED: i64 = -2;

/// Outbound response envelope.
///
/// Serialises to `{"Service":..,"Id":..,"Type":..}` plus whichever of
/// `ResultId`, `Result` and `Action` are set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Response {
    #[serde(rename = "Service")]
    pub service: String,
    #[serde(rename = "Id")]
    pub id: i64,
    #[serde(rename = "Type")]
    pub type_char: char,
    #[serde(rename = "ResultId", default, skip_serializing_if = "Option::is_none")]
    pub result_id: Option<i64>,
    #[serde(rename = "Result", default, skip_serializing_if = "Option::is_none")]
    pub result: Option<String>,
    #[serde(rename = "Action", default, skip_serializing_if = "Option::is_none")]
    pub action: Option<String>,
}

impl Response {
    /// Start a response correlated to `command`: same service, id, type and
    /// action.
    pub fn to(command: &Command) -> Self {
        Self {
            service: command.service().to_string(),
            id: command.id(),
            type_char: command.type_char().unwrap_or(DEFAULT_RESPONSE_TYPE),
            result_id: None,
            result: None,
            action: command.action().map(str::to_string),
        }
    }

    /// An unsolicited status push (sensor ticks and the like).
    pub fn status(service: impl Into<String>, type_char: char) -> Self {
        Self {
            service: service.into(),
            id: 0,
            type_char,
            result_id: None,
            result: None,
            action: None,
        }
    }

    /// Successful result for `command`.
    pub fn success(command: &Command, result: impl Into<String>) -> Self {
        Self::to(command)
            .with_result_id(RESULT_OK)
            .with_result(result)
    }

    /// Negative result for `command` with an explicit code.
    pub fn negative(command: &Command, code: i64, message: impl Into<String>) -> Self {
        Self::to(command).with_result_id(code).with_result(message)
    }

    pub fn with_result(mut self, result: impl Into<String>) -> Self {
        self.result = Some(result.into());
        self
    }

    pub fn with_result_id(mut self, result_id: i64) -> Self {
        self.result_id = Some(result_id);
        self
    }

    pub fn with_action(mut self, action: impl Into<String>) -> Self {
        self.action = Some(action.into());
        self
    }

    pub fn with_type(mut self, type_char: char) -> Self {
        self.type_char = type_char;
        self
    }

    /// True if this response reports a failure.
    pub fn is_negative(&self) -> bool {
        self.result_id.is_some_and(|code| code < 0)
    }

    /// Default outbound coalescing key: the `Type` character.
    pub fn coalesce_key(&self) -> String {
        self.type_char.to_string()
    }

    /// Serialise to wire text.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}
