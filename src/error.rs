//! # Error Types
//!
//! Custom error types for Hand Drive using `thiserror`.
//!
//! Each subsystem owns its own error enum ([`LinkError`] for the controller
//! link, [`ActuatorError`] for the drive side) and the crate-wide
//! [`HandError`] wraps them for the application layer.

use thiserror::Error;

/// Errors raised by the controller link.
///
/// `NoController` and `NoConnection` are the two configuration outcomes of the
/// protocol itself; neither is fatal and the caller may retry `configure()`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum LinkError {
    /// Initial poll echoed an unrecognized mode byte
    #[error("no controller detected (mode byte 0x{mode:02X})")]
    NoController { mode: u8 },

    /// Pressure data was requested but the controller did not switch to it
    #[error("controller does not support pressure mode (mode byte 0x{mode:02X})")]
    NoConnection { mode: u8 },

    /// SPI bus failure
    #[error("SPI bus error: {0:?}")]
    Bus(embedded_hal::spi::ErrorKind),

    /// Attention (chip-select) line failure
    #[error("attention line error: {0:?}")]
    Pin(embedded_hal::digital::ErrorKind),
}

/// Errors raised while driving actuators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ActuatorError {
    /// Enable, direction or step line failure
    #[error("drive line error: {0:?}")]
    Pin(embedded_hal::digital::ErrorKind),

    /// Step magnitude was zero, negative or not finite
    #[error("step size must be positive and finite")]
    InvalidStep,

    /// Handle does not belong to this registry
    #[error("unknown actuator id {0}")]
    UnknownActuator(usize),
}

/// Main error type for Hand Drive
#[derive(Debug, Error)]
pub enum HandError {
    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(#[from] toml::de::Error),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Controller link errors
    #[error("Controller link error: {0}")]
    Link(#[from] LinkError),

    /// Actuator errors
    #[error("Actuator error: {0}")]
    Actuator(#[from] ActuatorError),

    /// Telemetry serialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Hardware bring-up errors (opening SPI or GPIO)
    #[error("Hardware error: {0}")]
    Hardware(String),
}

/// Result type alias for Hand Drive
pub type Result<T> = std::result::Result<T, HandError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_link_error_display_includes_mode_byte() {
        let err = LinkError::NoController { mode: 0xFF };
        assert_eq!(err.to_string(), "no controller detected (mode byte 0xFF)");

        let err = LinkError::NoConnection { mode: 0x73 };
        assert!(err.to_string().contains("0x73"));
    }

    #[test]
    fn test_hand_error_from_link_error() {
        let err: HandError = LinkError::NoController { mode: 0x00 }.into();
        assert!(matches!(err, HandError::Link(LinkError::NoController { mode: 0x00 })));
    }

    #[test]
    fn test_hand_error_from_actuator_error() {
        let err: HandError = ActuatorError::UnknownActuator(3).into();
        assert_eq!(err.to_string(), "Actuator error: unknown actuator id 3");
    }
}
