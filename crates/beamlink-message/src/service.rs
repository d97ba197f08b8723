//! Well-known service names and response type conventions.
//!
//! Services are free-form strings on the wire; the names below are the ones
//! the built-in shapes answer to (see [`crate::registry::BUILTIN_SHAPES`]).

/// Sensor sampling.
pub const SENSORS: &str = "SENSORS";

/// Photo capture.
pub const CAMERA: &str = "CAMERA";

/// Text-to-speech.
pub const SPEAK: &str = "SPEAK";

/// Speech recognition.
pub const LISTEN: &str = "LISTEN";

/// On-screen notification.
pub const NOTIFY: &str = "NOTIFY";

/// Liveness probe.
pub const PING: &str = "PING";

/// Response `Type` used when the originating command carried none.
pub const DEFAULT_RESPONSE_TYPE: char = 'R';

/// Response types the companion treats as urgent.
pub const URGENT_TYPES: [char; 6] = ['A', 'G', 'M', 'L', 'Q', 'P'];

/// Returns true if responses of this type must stay in the preferred
/// priority band.
pub fn is_urgent_type(type_char: char) -> bool {
    URGENT_TYPES.contains(&type_char)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn urgent_types() {
        for c in ['A', 'G', 'M', 'L', 'Q', 'P'] {
            assert!(is_urgent_type(c));
        }
        assert!(!is_urgent_type('R'));
        assert!(!is_urgent_type('a'));
    }
}
