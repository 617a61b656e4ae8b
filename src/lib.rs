//! # Hand Drive Library
//!
//! Drive a stepper-actuated robotic hand from a PS2 game controller.
//!
//! This library provides the controller link (SPI polling, configuration
//! handshake, button edge detection) and the actuator drive (per-joint
//! position tracking advanced in lockstep on one shared step pulse).
//! Hardware is reached only through `embedded-hal` traits.

pub mod actuator;
pub mod clock;
pub mod config;
pub mod error;
pub mod gamepad;
pub mod hand;
pub mod hardware;
pub mod telemetry;
