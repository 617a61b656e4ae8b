//! # Controller Link
//!
//! Owns the half-duplex SPI session with a PS2 controller.
//!
//! The protocol has no checksums and no framing beyond the attention line, so
//! the link stays healthy through timing discipline alone:
//!
//! - polls are spaced at least `poll_delay` apart (rushed frames come back
//!   garbled),
//! - after `reconfigure_after` of silence the configuration sequence is
//!   replayed before the next poll, which recovers a controller that was
//!   unplugged or power cycled.
//!
//! Every command is one transaction: attention low, transfer, flush,
//! attention high. A pressure-mode poll clocks its 12-byte tail inside the
//! same transaction.
//!
//! ## Usage
//!
//! ```
//! use hand_drive::clock::ManualClock;
//! use hand_drive::gamepad::{Button, ControllerLink, LinkSettings};
//! use hand_drive::hardware::sim::SimulatedGamepad;
//!
//! let pad = SimulatedGamepad::new();
//! let mut link = ControllerLink::new(pad.bus(), pad.attention(), ManualClock::new(), LinkSettings::default());
//!
//! link.configure()?;
//! pad.press(Button::CROSS);
//! link.update(0, 0)?;
//! assert!(link.pressed(Button::CROSS));
//! # Ok::<(), hand_drive::error::LinkError>(())
//! ```

use std::time::Duration;

use embedded_hal::digital::OutputPin;
use embedded_hal::spi::SpiBus;
use tracing::{debug, info, trace, warn};

use super::protocol::*;
use super::state::ControllerState;
use crate::clock::Clock;
use crate::error::LinkError;

/// Default minimum spacing between polls
pub const DEFAULT_POLL_DELAY: Duration = Duration::from_millis(10);

/// Default silence after which configuration is replayed
pub const DEFAULT_RECONFIGURE_AFTER: Duration = Duration::from_millis(1500);

/// Per-controller link settings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LinkSettings {
    /// Map the rumble motors during configuration
    pub rumble: bool,
    /// Request pressure data during configuration
    pub pressures: bool,
    /// Minimum spacing between polls
    pub poll_delay: Duration,
    /// Silence after which configuration is replayed before polling
    pub reconfigure_after: Duration,
}

impl Default for LinkSettings {
    fn default() -> Self {
        Self {
            rumble: false,
            pressures: false,
            poll_delay: DEFAULT_POLL_DELAY,
            reconfigure_after: DEFAULT_RECONFIGURE_AFTER,
        }
    }
}

/// PS2 controller session over an SPI bus and an attention (chip-select) line
pub struct ControllerLink<B, P, C> {
    bus: B,
    attention: P,
    clock: C,
    settings: LinkSettings,
    state: ControllerState,
}

impl<B, P, C> std::fmt::Debug for ControllerLink<B, P, C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ControllerLink")
            .field("settings", &self.settings)
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}

impl<B, P, C> ControllerLink<B, P, C>
where
    B: SpiBus<u8>,
    P: OutputPin,
    C: Clock,
{
    /// Create a link; nothing is sent until [`configure`](Self::configure)
    pub fn new(bus: B, attention: P, clock: C, settings: LinkSettings) -> Self {
        Self {
            bus,
            attention,
            clock,
            settings,
            state: ControllerState::new(),
        }
    }

    /// Detect the controller and put it into analog mode
    ///
    /// Idles the attention line and polls once. If a controller answers, the
    /// full configuration sequence runs (enter config, read type, set mode,
    /// optional rumble and pressure requests, exit config) followed by a
    /// second poll.
    ///
    /// # Errors
    ///
    /// - `NoController`: the first poll echoed an unrecognized mode byte; no
    ///   further frames are sent
    /// - `NoConnection`: pressure data was requested but the controller did
    ///   not switch to pressure mode
    /// - `Bus` / `Pin`: the underlying HAL failed
    pub fn configure(&mut self) -> Result<(), LinkError> {
        let now = self.clock.now();
        self.state.touch(now);
        self.attention.set_high().map_err(pin_error)?;

        self.read_gamepad(0, 0)?;

        let mode = self.state.mode();
        if !mode.is_attached() {
            debug!("No controller answered (mode byte 0x{:02X})", mode.as_byte());
            return Err(LinkError::NoController { mode: mode.as_byte() });
        }

        self.send(&ENTER_CONFIG)?;

        let mut type_frame = READ_TYPE;
        self.exchange(&mut type_frame)?;
        self.state.set_controller_type(type_frame[TYPE_OFFSET]);

        self.send(&SET_MODE)?;
        self.send_feature_requests()?;
        self.send(&EXIT_CONFIG)?;

        self.read_gamepad(0, 0)?;

        let mode = self.state.mode();
        if self.settings.pressures && !mode.has_extended_data() {
            warn!("Pressure mode requested but controller reports {:?}", mode);
            return Err(LinkError::NoConnection { mode: mode.as_byte() });
        }

        info!(
            "Controller configured (type 0x{:02X}, mode {:?}, rumble: {}, pressures: {})",
            self.state.controller_type(),
            mode,
            self.settings.rumble,
            self.settings.pressures
        );
        Ok(())
    }

    /// Poll the controller, sending the two rumble motor strengths
    ///
    /// Blocks until `poll_delay` has passed since the previous poll. Replays
    /// the configuration first if the link has been silent for longer than
    /// `reconfigure_after`.
    pub fn update(&mut self, motor1: u8, motor2: u8) -> Result<(), LinkError> {
        self.read_gamepad(motor1, motor2)
    }

    /// True while `button` is held
    pub fn button(&self, button: Button) -> bool {
        self.state.button(button)
    }

    /// True if any button changed on the last poll
    pub fn changed(&self) -> bool {
        self.state.changed()
    }

    /// True if `button` changed on the last poll
    pub fn changed_button(&self, button: Button) -> bool {
        self.state.changed_button(button)
    }

    /// True on the poll where `button` went down
    pub fn pressed(&self, button: Button) -> bool {
        self.state.pressed(button)
    }

    /// True on the poll where `button` came up
    pub fn released(&self, button: Button) -> bool {
        self.state.released(button)
    }

    /// Raw analog byte for `axis`
    pub fn analog(&self, axis: Axis) -> u8 {
        self.state.analog(axis)
    }

    /// Names of the buttons held on the last poll
    pub fn pressed_buttons(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.state.held_buttons()
    }

    /// Mode echoed by the last poll
    pub fn mode(&self) -> Mode {
        self.state.mode()
    }

    /// True if the last poll echoed one of the attached mode bytes
    ///
    /// Responses are otherwise taken as-is; this is the only plausibility
    /// signal the protocol offers.
    pub fn is_attached(&self) -> bool {
        self.state.mode().is_attached()
    }

    /// Controller type byte read during [`configure`](Self::configure)
    pub fn controller_type(&self) -> u8 {
        self.state.controller_type()
    }

    /// Cached state of the last poll
    pub fn state(&self) -> &ControllerState {
        &self.state
    }

    /// Settings the link was created with
    pub fn settings(&self) -> &LinkSettings {
        &self.settings
    }

    /// Give back the bus, attention line and clock
    pub fn release(self) -> (B, P, C) {
        (self.bus, self.attention, self.clock)
    }

    /// Configuration replay used when the link went silent (no type read)
    fn reconfigure(&mut self) -> Result<(), LinkError> {
        self.send(&ENTER_CONFIG)?;
        self.send(&SET_MODE)?;
        self.send_feature_requests()?;
        self.send(&EXIT_CONFIG)
    }

    fn send_feature_requests(&mut self) -> Result<(), LinkError> {
        if self.settings.rumble {
            self.send(&ENABLE_RUMBLE)?;
        }
        if self.settings.pressures {
            self.send(&EXTENDED_DATA)?;
        }
        Ok(())
    }

    fn read_gamepad(&mut self, motor1: u8, motor2: u8) -> Result<(), LinkError> {
        let now = self.clock.now();
        let silence = self.state.last_poll().map(|last| now.saturating_sub(last));

        if silence.map_or(true, |s| s > self.settings.reconfigure_after) {
            debug!("Controller link silent for {:?}, replaying configuration", silence);
            self.reconfigure()?;
        }

        if let Some(last) = self.state.last_poll() {
            self.clock.wait_until(last + self.settings.poll_delay);
        }

        let mut response = poll_frame(motor1, motor2);
        self.transaction(|bus| {
            bus.transfer_in_place(&mut response[..POLL_FRAME_LEN])?;
            if Mode::from_byte(response[MODE_OFFSET]).has_extended_data() {
                bus.transfer_in_place(&mut response[POLL_FRAME_LEN..])?;
            }
            Ok(())
        })?;

        let at = self.clock.now();
        self.state.record_poll(response, at);
        trace!(
            "Polled controller: mode 0x{:02X}, buttons 0x{:04X}",
            response[MODE_OFFSET],
            self.state.raw_buttons()
        );
        Ok(())
    }

    /// Send a command frame, discarding the response
    fn send(&mut self, frame: &[u8]) -> Result<(), LinkError> {
        trace!("Sending command 0x{:02X} ({} bytes)", frame[1], frame.len());
        self.transaction(|bus| bus.write(frame))
    }

    /// Send a command frame, replacing it with the response
    fn exchange(&mut self, frame: &mut [u8]) -> Result<(), LinkError> {
        self.transaction(|bus| bus.transfer_in_place(frame))
    }

    /// Bracket `f` with the attention line so no frame can interleave
    fn transaction<F>(&mut self, f: F) -> Result<(), LinkError>
    where
        F: FnOnce(&mut B) -> Result<(), B::Error>,
    {
        self.attention.set_low().map_err(pin_error)?;
        let result = f(&mut self.bus).and_then(|()| self.bus.flush());
        self.attention.set_high().map_err(pin_error)?;
        result.map_err(bus_error)
    }
}

fn bus_error<E: embedded_hal::spi::Error>(error: E) -> LinkError {
    LinkError::Bus(error.kind())
}

fn pin_error<E: embedded_hal::digital::Error>(error: E) -> LinkError {
    LinkError::Pin(error.kind())
}
