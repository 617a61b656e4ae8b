//! # Telemetry Types
//!
//! Records written one per line to the telemetry log.

use chrono::{DateTime, Utc};
use embedded_hal::digital::OutputPin;
use serde::Serialize;

use crate::actuator::ActuatorRegistry;
use crate::gamepad::{Axis, ControllerState};

/// Controller view at the time of a record
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GamepadSnapshot {
    /// Mode byte echoed by the last poll
    pub mode: u8,
    pub attached: bool,
    /// Names of held buttons
    pub buttons: Vec<&'static str>,
    /// Left stick (x, y), 0x80 centered
    pub left_stick: (u8, u8),
    /// Right stick (x, y), 0x80 centered
    pub right_stick: (u8, u8),
}

impl GamepadSnapshot {
    pub fn from_state(state: &ControllerState) -> Self {
        let mode = state.mode();
        Self {
            mode: mode.as_byte(),
            attached: mode.is_attached(),
            buttons: state.held_buttons().collect(),
            left_stick: (state.analog(Axis::LeftX), state.analog(Axis::LeftY)),
            right_stick: (state.analog(Axis::RightX), state.analog(Axis::RightY)),
        }
    }
}

/// One actuator at the time of a record
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ActuatorSnapshot {
    pub name: String,
    pub position: f32,
    pub target: f32,
    pub enabled: bool,
}

/// A single telemetry line
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TelemetryRecord {
    pub timestamp: DateTime<Utc>,
    /// Step pulses emitted since startup
    pub ticks: u64,
    /// Absent while no controller is configured
    pub gamepad: Option<GamepadSnapshot>,
    pub actuators: Vec<ActuatorSnapshot>,
}

impl TelemetryRecord {
    /// Capture the current state, naming actuators in registration order
    ///
    /// Actuators without a matching name are recorded with an empty one.
    pub fn capture<EN, DIR>(
        ticks: u64,
        gamepad: Option<&ControllerState>,
        registry: &ActuatorRegistry<EN, DIR>,
        names: &[String],
    ) -> Self
    where
        EN: OutputPin,
        DIR: OutputPin,
    {
        let actuators = registry
            .iter()
            .map(|(id, actuator)| ActuatorSnapshot {
                name: names.get(id.index()).cloned().unwrap_or_default(),
                position: actuator.position(),
                target: actuator.target(),
                enabled: actuator.is_enabled(),
            })
            .collect();

        Self {
            timestamp: Utc::now(),
            ticks,
            gamepad: gamepad.map(GamepadSnapshot::from_state),
            actuators,
        }
    }
}
