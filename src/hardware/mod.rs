//! # Hardware Module
//!
//! Concrete SPI and GPIO endpoints for the controller link and the drive.
//!
//! - [`sim`]: software controller and recording pins
//! - [`lsb`]: bit-order adapter for MSB-only SPI controllers
//! - `rpi` (feature `rpi`): Raspberry Pi SPI0 and GPIO through `rppal`

pub mod lsb;
pub mod sim;

#[cfg(feature = "rpi")]
pub mod rpi;

pub use lsb::LsbFirst;
