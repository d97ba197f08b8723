//! Concrete command shapes.
//!
//! Each shape is the body of one service's request. Header fields (`Service`,
//! `Id`, `Type`, `Action`) stay on the [`Envelope`](crate::Envelope); shapes
//! only see the rest. Unknown body fields are tolerated but remain available
//! through [`Envelope::fields`](crate::Envelope::fields).

use serde::{Deserialize, Serialize};

/// `SENSORS`: sample one or more sensors, optionally as a stream.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct SensorRequest {
    /// Sensors to sample; empty means every sensor the device has.
    #[serde(default)]
    pub sensors: Vec<String>,
    /// Streaming period in milliseconds. `None` samples once.
    #[serde(default)]
    pub interval_ms: Option<u64>,
}

/// `CAMERA`: capture a still photo.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct CameraRequest {
    /// `front` or `back`; the device default when absent.
    #[serde(default)]
    pub facing: Option<String>,
    /// JPEG quality, 1-100.
    #[serde(default)]
    pub quality: Option<u8>,
    #[serde(default)]
    pub flash: bool,
}

/// `SPEAK`: read text aloud.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct SpeakRequest {
    pub text: String,
    /// BCP-47 language tag.
    #[serde(default)]
    pub language: Option<String>,
    /// Speech rate multiplier, 1.0 is normal.
    #[serde(default)]
    pub rate: Option<f32>,
}

/// `LISTEN`: run one speech-recognition pass.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ListenRequest {
    #[serde(default)]
    pub language: Option<String>,
    /// Give up after this many milliseconds of silence.
    #[serde(default)]
    pub timeout_ms: Option<u64>,
}

/// `NOTIFY`: show a notification on the device.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct NotifyRequest {
    pub title: String,
    #[serde(default)]
    pub body: Option<String>,
}

/// `PING`: liveness probe, no body.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PingRequest {}

/// A classified command body.
#[derive(Debug, Clone, PartialEq)]
pub enum CommandKind {
    Sensors(SensorRequest),
    Camera(CameraRequest),
    Speak(SpeakRequest),
    Listen(ListenRequest),
    Notify(NotifyRequest),
    Ping(PingRequest),
    /// Structurally valid, but no shape is registered for its service.
    Unknown,
}

impl CommandKind {
    /// Canonical shape name, or `None` for [`CommandKind::Unknown`].
    pub fn shape_name(&self) -> Option<&'static str> {
        match self {
            CommandKind::Sensors(_) => Some(crate::service::SENSORS),
            CommandKind::Camera(_) => Some(crate::service::CAMERA),
            CommandKind::Speak(_) => Some(crate::service::SPEAK),
            CommandKind::Listen(_) => Some(crate::service::LISTEN),
            CommandKind::Notify(_) => Some(crate::service::NOTIFY),
            CommandKind::Ping(_) => Some(crate::service::PING),
            CommandKind::Unknown => None,
        }
    }

    pub fn is_unknown(&self) -> bool {
        matches!(self, CommandKind::Unknown)
    }
}
