use std::collections::HashMap;
use std::sync::{Arc, OnceLock};

use serde_json::Value;
use tracing::{debug, warn};

use crate::service::{CAMERA, LISTEN, NOTIFY, PING, SENSORS, SPEAK};
use crate::shapes::CommandKind;

/// Declaration of one command shape: its canonical name, the service strings
/// it answers to, and how to decode a message body into it.
#[derive(Debug, Clone, Copy)]
pub struct ShapeDescriptor {
    /// Canonical shape name. Always answers as an alias of itself.
    pub name: &'static str,
    /// Additional service strings routed to this shape.
    pub aliases: &'static [&'static str],
    /// Strict decode of the body fields into the shape.
    pub decode: fn(Value) -> serde_json::Result<CommandKind>,
}

/// Shapes known to every session.
pub static BUILTIN_SHAPES: &[ShapeDescriptor] = &[
    ShapeDescriptor {
        name: SENSORS,
        aliases: &["SENSOR"],
        decode: decode_sensors,
    },
    ShapeDescriptor {
        name: CAMERA,
        aliases: &["PHOTO"],
        decode: decode_camera,
    },
    ShapeDescriptor {
        name: SPEAK,
        aliases: &["TTS"],
        decode: decode_speak,
    },
    ShapeDescriptor {
        name: LISTEN,
        aliases: &["STT"],
        decode: decode_listen,
    },
    ShapeDescriptor {
        name: NOTIFY,
        aliases: &["NOTIFICATION"],
        decode: decode_notify,
    },
    ShapeDescriptor {
        name: PING,
        aliases: &["HEARTBEAT"],
        decode: decode_ping,
    },
];

fn decode_sensors(body: Value) -> serde_json::Result<CommandKind> {
    serde_json::from_value(body).map(CommandKind::Sensors)
}

fn decode_camera(body: Value) -> serde_json::Result<CommandKind> {
    serde_json::from_value(body).map(CommandKind::Camera)
}

fn decode_speak(body: Value) -> serde_json::Result<CommandKind> {
    serde_json::from_value(body).map(CommandKind::Speak)
}

fn decode_listen(body: Value) -> serde_json::Result<CommandKind> {
    serde_json::from_value(body).map(CommandKind::Listen)
}

fn decode_notify(body: Value) -> serde_json::Result<CommandKind> {
    serde_json::from_value(body).map(CommandKind::Notify)
}

fn decode_ping(body: Value) -> serde_json::Result<CommandKind> {
    serde_json::from_value(body).map(CommandKind::Ping)
}

static GLOBAL: OnceLock<Arc<ShapeRegistry>> = OnceLock::new();

/// Service-keyed registry of command shapes.
///
/// Lookup is ASCII case-insensitive. Several service strings may route to the
/// same shape; each service string routes to exactly one.
#[derive(Debug, Default)]
pub struct ShapeRegistry {
    shapes: Vec<ShapeDescriptor>,
    by_service: HashMap<String, usize>,
}

impl ShapeRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Process-wide registry of [`BUILTIN_SHAPES`].
    ///
    /// Built on first use; later and concurrent calls share the same instance.
    pub fn global() -> Arc<ShapeRegistry> {
        GLOBAL
            .get_or_init(|| {
                let registry = Self::from_descriptors(BUILTIN_SHAPES);
                debug!(shapes = registry.len(), "command shape registry initialised");
                Arc::new(registry)
            })
            .clone()
    }

    /// Build a registry from explicit descriptors.
    pub fn from_descriptors(descriptors: &[ShapeDescriptor]) -> Self {
        let mut registry = Self::new();
        for descriptor in descriptors {
            registry.register(*descriptor);
        }
        registry
    }

    /// Register a shape under its name and aliases.
    ///
    /// A service string already claimed by an earlier shape keeps its first
    /// owner.
    pub fn register(&mut self, descriptor: ShapeDescriptor) {
        let index = self.shapes.len();
        self.shapes.push(descriptor);

        let services = std::iter::once(descriptor.name).chain(descriptor.aliases.iter().copied());
        for service in services {
            let key = service.to_ascii_uppercase();
            match self.by_service.get(&key) {
                Some(existing) if *existing != index => {
                    warn!(
                        service,
                        kept = self.shapes[*existing].name,
                        ignored = descriptor.name,
                        "service already registered to another shape"
                    );
                }
                Some(_) => {}
                None => {
                    self.by_service.insert(key, index);
                }
            }
        }
    }

    /// Resolve a service string to its shape.
    pub fn lookup(&self, service: &str) -> Option<&ShapeDescriptor> {
        self.by_service
            .get(&service.to_ascii_uppercase())
            .map(|index| &self.shapes[*index])
    }

    /// Check if a service string routes to a shape.
    pub fn has_shape(&self, service: &str) -> bool {
        self.lookup(service).is_some()
    }

    /// Canonical names of registered shapes, in registration order.
    pub fn names(&self) -> Vec<&'static str> {
        self.shapes.iter().map(|shape| shape.name).collect()
    }

    /// Service strings routed to the shape called `name`, sorted.
    pub fn services_for(&self, name: &str) -> Vec<String> {
        let mut services: Vec<String> = self
            .by_service
            .iter()
            .filter(|(_, index)| self.shapes[**index].name == name)
            .map(|(service, _)| service.clone())
            .collect();
        services.sort_unstable();
        services
    }

    /// Number of registered shapes.
    pub fn len(&self) -> usize {
        self.shapes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.shapes.is_empty()
    }
}
