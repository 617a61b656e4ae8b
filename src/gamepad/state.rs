//! # Controller State
//!
//! Cached result of the last polls: raw response bytes plus the current and
//! previous button words used for edge detection.

use std::time::Duration;

use super::protocol::{Axis, Button, Mode, Response, BUTTONS_OFFSET, MODE_OFFSET, RESPONSE_LEN};

/// Raw button word with nothing pressed (active-low)
pub const BUTTONS_RELEASED: u16 = 0xFFFF;

/// Snapshot of the controller as of the last successful poll
///
/// `previous_buttons` always holds what `buttons` was one poll earlier, so
/// `pressed`/`released` report a transition for exactly one poll.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ControllerState {
    buttons: u16,
    previous_buttons: u16,
    buffer: Response,
    controller_type: u8,
    last_poll: Option<Duration>,
}

impl Default for ControllerState {
    fn default() -> Self {
        Self {
            buttons: BUTTONS_RELEASED,
            previous_buttons: BUTTONS_RELEASED,
            buffer: [0u8; RESPONSE_LEN],
            controller_type: 0,
            last_poll: None,
        }
    }
}

impl ControllerState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a poll response taken at `at`
    ///
    /// Rotates the current button word into the previous one before decoding
    /// the new word from the response.
    pub fn record_poll(&mut self, response: Response, at: Duration) {
        self.previous_buttons = self.buttons;
        self.buttons = u16::from_le_bytes([response[BUTTONS_OFFSET], response[BUTTONS_OFFSET + 1]]);
        self.buffer = response;
        self.last_poll = Some(at);
    }

    /// Stamp the poll clock without storing a response
    pub fn touch(&mut self, at: Duration) {
        self.last_poll = Some(at);
    }

    pub fn set_controller_type(&mut self, controller_type: u8) {
        self.controller_type = controller_type;
    }

    /// Controller type byte captured during configuration
    pub fn controller_type(&self) -> u8 {
        self.controller_type
    }

    /// Time of the last successful poll
    pub fn last_poll(&self) -> Option<Duration> {
        self.last_poll
    }

    /// Mode echoed by the last poll
    pub fn mode(&self) -> Mode {
        Mode::from_byte(self.buffer[MODE_OFFSET])
    }

    /// Raw active-low button word
    pub fn raw_buttons(&self) -> u16 {
        self.buttons
    }

    /// Raw active-low button word of the poll before
    pub fn raw_previous_buttons(&self) -> u16 {
        self.previous_buttons
    }

    /// Raw response bytes of the last poll
    pub fn raw(&self) -> &Response {
        &self.buffer
    }

    /// True while any of the flags in `button` is held down
    pub fn button(&self, button: Button) -> bool {
        !self.buttons & button.bits() != 0
    }

    /// True if any button changed between the last two polls
    pub fn changed(&self) -> bool {
        self.previous_buttons ^ self.buttons != 0
    }

    /// True if `button` changed between the last two polls
    pub fn changed_button(&self, button: Button) -> bool {
        (self.previous_buttons ^ self.buttons) & button.bits() != 0
    }

    /// True on the one poll where `button` went down
    pub fn pressed(&self, button: Button) -> bool {
        self.changed_button(button) && self.button(button)
    }

    /// True on the one poll where `button` came up
    pub fn released(&self, button: Button) -> bool {
        self.changed_button(button) && !self.button(button)
    }

    /// Raw analog byte for `axis`
    pub fn analog(&self, axis: Axis) -> u8 {
        self.buffer[axis.offset()]
    }

    /// Names of every button currently held
    pub fn held_buttons(&self) -> impl Iterator<Item = &'static str> + '_ {
        Button::ALL
            .iter()
            .filter(move |(_, button)| self.button(*button))
            .map(|(name, _)| *name)
    }
}
