//! # Actuator Module
//!
//! Stepper-driven joints sharing one step line.
//!
//! This module handles:
//! - Per-actuator position tracking toward a target ([`servo`])
//! - The ordered set of actuators driven together ([`registry`])
//! - The step pulse that advances them all at once ([`tick`])

pub mod servo;
pub mod registry;
pub mod tick;

pub use registry::{ActuatorId, ActuatorRegistry, TickReport};
pub use servo::{Actuator, Direction, DriveSettings, EnablePolarity, PinInit};
pub use tick::TickCoordinator;
