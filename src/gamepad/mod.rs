//! # Gamepad Module
//!
//! PS2 controller link over SPI.
//!
//! This module handles:
//! - Protocol frames, mode bytes, button flags and analog offsets
//! - The configuration handshake and its replay after link silence
//! - Rate-limited polling with rumble motor bytes
//! - Edge detection (pressed / released / changed) on the button word

pub mod protocol;
pub mod state;
pub mod link;

pub use link::{ControllerLink, LinkSettings};
pub use protocol::{Axis, Button, Mode};
pub use state::ControllerState;
