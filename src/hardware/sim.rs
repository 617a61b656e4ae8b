//! # Simulated Hardware
//!
//! Software stand-ins for the controller and the drive lines, used by the
//! test suite and by the binary when no hardware binding is compiled in.
//!
//! [`SimulatedGamepad`] answers the controller protocol byte by byte the way
//! a DualShock 2 does: it boots in digital mode, only honours mode and
//! feature requests between enter-config and exit-config, and applies them
//! when configuration is exited. Its [`SimBus`] and [`SimAttention`] halves
//! plug into a [`ControllerLink`](crate::gamepad::ControllerLink).

use std::cell::{Cell, RefCell};
use std::convert::Infallible;
use std::rc::Rc;

use embedded_hal::digital::{ErrorType as PinErrorType, OutputPin};
use embedded_hal::spi::{ErrorType as SpiErrorType, SpiBus};

use crate::gamepad::protocol::*;

/// Byte seen on MISO when nothing drives it
const FLOATING: u8 = 0xFF;

/// Acknowledge byte following the mode byte
const ACK: u8 = 0x5A;

/// Type byte reported by a DualShock 2
pub const DUALSHOCK2_TYPE: u8 = 0x03;

/// Resting value of the stick axes
const STICK_CENTER: u8 = 0x80;

#[derive(Debug)]
struct Peripheral {
    attached: bool,
    supports_pressure: bool,
    controller_type: u8,
    mode: Mode,
    in_config: bool,
    analog_requested: bool,
    pressure_requested: bool,
    rumble_enabled: bool,
    /// Raw active-low button word
    buttons: u16,
    analog: Response,
    motors: (u8, u8),
    selected: bool,
    packet: Vec<u8>,
    frames: Vec<Vec<u8>>,
}

impl Peripheral {
    fn new() -> Self {
        let mut analog = [0u8; RESPONSE_LEN];
        for axis in Axis::STICKS {
            analog[axis.offset()] = STICK_CENTER;
        }
        Self {
            attached: true,
            supports_pressure: true,
            controller_type: DUALSHOCK2_TYPE,
            mode: Mode::Digital,
            in_config: false,
            analog_requested: false,
            pressure_requested: false,
            rumble_enabled: false,
            buttons: 0xFFFF,
            analog,
            motors: (0, 0),
            selected: false,
            packet: Vec::with_capacity(RESPONSE_LEN),
            frames: Vec::new(),
        }
    }

    fn power_cycle(&mut self) {
        self.mode = Mode::Digital;
        self.in_config = false;
        self.analog_requested = false;
        self.pressure_requested = false;
        self.rumble_enabled = false;
        self.motors = (0, 0);
    }

    fn select(&mut self) {
        self.selected = true;
        self.packet.clear();
    }

    fn deselect(&mut self) {
        if !self.selected {
            return;
        }
        self.selected = false;
        let packet = std::mem::take(&mut self.packet);
        if self.attached && packet.len() > 1 {
            self.apply(&packet);
        }
        self.frames.push(packet);
    }

    /// Clock one byte in each direction
    fn exchange(&mut self, out: u8) -> u8 {
        if !self.selected {
            return FLOATING;
        }
        let index = self.packet.len();
        self.packet.push(out);
        if !self.attached {
            return FLOATING;
        }
        self.response_byte(index)
    }

    fn response_byte(&self, index: usize) -> u8 {
        match index {
            0 => FLOATING,
            1 if self.in_config => MODE_CONFIG,
            1 => self.mode.as_byte(),
            2 => ACK,
            _ => self.payload_byte(index),
        }
    }

    fn payload_byte(&self, index: usize) -> u8 {
        match self.packet.get(1).copied() {
            Some(CMD_POLL) => match index {
                i if i == BUTTONS_OFFSET => self.buttons.to_le_bytes()[0],
                i if i == BUTTONS_OFFSET + 1 => self.buttons.to_le_bytes()[1],
                i if i < POLL_FRAME_LEN && self.mode != Mode::Digital => self.analog[i],
                i if i < RESPONSE_LEN && self.mode.has_extended_data() => self.analog[i],
                _ => FLOATING,
            },
            Some(CMD_READ_TYPE) if self.in_config && index == TYPE_OFFSET => self.controller_type,
            _ => 0x00,
        }
    }

    fn apply(&mut self, packet: &[u8]) {
        match packet[1] {
            CMD_POLL => {
                if self.rumble_enabled && packet.len() > MOTOR2_OFFSET {
                    self.motors = (packet[MOTOR1_OFFSET], packet[MOTOR2_OFFSET]);
                }
            }
            CMD_CONFIG if packet.len() > 3 => {
                if packet[3] == 0x01 {
                    self.in_config = true;
                } else if self.in_config {
                    self.in_config = false;
                    self.mode = self.requested_mode();
                }
            }
            CMD_SET_MODE if self.in_config && packet.len() > 3 => {
                self.analog_requested = packet[3] == 0x01;
            }
            CMD_ENABLE_RUMBLE if self.in_config => self.rumble_enabled = true,
            CMD_SET_RESPONSE_BYTES if self.in_config => self.pressure_requested = true,
            _ => {}
        }
    }

    fn requested_mode(&self) -> Mode {
        match (self.analog_requested, self.pressure_requested && self.supports_pressure) {
            (false, _) => Mode::Digital,
            (true, false) => Mode::Analog,
            (true, true) => Mode::AnalogPressure,
        }
    }
}

/// A software PS2 controller
///
/// Clones and the bus/attention halves all share one device.
#[derive(Debug, Clone)]
pub struct SimulatedGamepad {
    inner: Rc<RefCell<Peripheral>>,
}

impl Default for SimulatedGamepad {
    fn default() -> Self {
        Self::new()
    }
}

impl SimulatedGamepad {
    /// A DualShock 2: attached, pressure capable, booted in digital mode
    pub fn new() -> Self {
        Self {
            inner: Rc::new(RefCell::new(Peripheral::new())),
        }
    }

    /// Model a controller without pressure-sensitive buttons
    pub fn without_pressure(self) -> Self {
        self.inner.borrow_mut().supports_pressure = false;
        self
    }

    /// SPI half, to hand to the link
    pub fn bus(&self) -> SimBus {
        SimBus { inner: Rc::clone(&self.inner) }
    }

    /// Attention half, to hand to the link
    pub fn attention(&self) -> SimAttention {
        SimAttention { inner: Rc::clone(&self.inner) }
    }

    /// Unplug: MISO floats high from now on
    pub fn detach(&self) {
        self.inner.borrow_mut().attached = false;
    }

    /// Plug back in after a power cycle
    pub fn attach(&self) {
        let mut inner = self.inner.borrow_mut();
        inner.attached = true;
        inner.power_cycle();
    }

    /// Lose all configuration, as after a brown-out
    pub fn power_cycle(&self) {
        self.inner.borrow_mut().power_cycle();
    }

    pub fn press(&self, button: Button) {
        self.inner.borrow_mut().buttons &= !button.bits();
    }

    pub fn release(&self, button: Button) {
        self.inner.borrow_mut().buttons |= button.bits();
    }

    pub fn set_analog(&self, axis: Axis, value: u8) {
        self.inner.borrow_mut().analog[axis.offset()] = value;
    }

    pub fn mode(&self) -> Mode {
        self.inner.borrow().mode
    }

    pub fn controller_type(&self) -> u8 {
        self.inner.borrow().controller_type
    }

    /// Last rumble strengths received while rumble was enabled
    pub fn motors(&self) -> (u8, u8) {
        self.inner.borrow().motors
    }

    pub fn is_selected(&self) -> bool {
        self.inner.borrow().selected
    }

    /// Command bytes of every completed transaction, oldest first
    pub fn frames(&self) -> Vec<Vec<u8>> {
        self.inner.borrow().frames.clone()
    }

    pub fn clear_frames(&self) {
        self.inner.borrow_mut().frames.clear();
    }
}

/// SPI side of a [`SimulatedGamepad`]
#[derive(Debug)]
pub struct SimBus {
    inner: Rc<RefCell<Peripheral>>,
}

impl SpiErrorType for SimBus {
    type Error = Infallible;
}

impl SpiBus<u8> for SimBus {
    fn read(&mut self, words: &mut [u8]) -> Result<(), Infallible> {
        let mut device = self.inner.borrow_mut();
        for word in words.iter_mut() {
            *word = device.exchange(0x00);
        }
        Ok(())
    }

    fn write(&mut self, words: &[u8]) -> Result<(), Infallible> {
        let mut device = self.inner.borrow_mut();
        for &word in words {
            device.exchange(word);
        }
        Ok(())
    }

    fn transfer(&mut self, read: &mut [u8], write: &[u8]) -> Result<(), Infallible> {
        let mut device = self.inner.borrow_mut();
        for i in 0..read.len().max(write.len()) {
            let incoming = device.exchange(write.get(i).copied().unwrap_or(0x00));
            if let Some(slot) = read.get_mut(i) {
                *slot = incoming;
            }
        }
        Ok(())
    }

    fn transfer_in_place(&mut self, words: &mut [u8]) -> Result<(), Infallible> {
        let mut device = self.inner.borrow_mut();
        for word in words.iter_mut() {
            *word = device.exchange(*word);
        }
        Ok(())
    }

    fn flush(&mut self) -> Result<(), Infallible> {
        Ok(())
    }
}

/// Attention (chip-select) side of a [`SimulatedGamepad`]; active low
#[derive(Debug)]
pub struct SimAttention {
    inner: Rc<RefCell<Peripheral>>,
}

impl PinErrorType for SimAttention {
    type Error = Infallible;
}

impl OutputPin for SimAttention {
    fn set_low(&mut self) -> Result<(), Infallible> {
        self.inner.borrow_mut().select();
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Infallible> {
        self.inner.borrow_mut().deselect();
        Ok(())
    }
}

/// Output line that remembers every level written to it
///
/// Clones share the same line.
#[derive(Debug, Clone, Default)]
pub struct SimPin {
    level: Rc<Cell<bool>>,
    history: Rc<RefCell<Vec<bool>>>,
}

impl SimPin {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_high(&self) -> bool {
        self.level.get()
    }

    /// Every level written, oldest first
    pub fn history(&self) -> Vec<bool> {
        self.history.borrow().clone()
    }

    /// Number of low-to-high edges written
    pub fn rising_edges(&self) -> usize {
        self.history
            .borrow()
            .iter()
            .fold((false, 0), |(previous, edges), &level| {
                (level, if level && !previous { edges + 1 } else { edges })
            })
            .1
    }

    fn write(&self, level: bool) {
        self.level.set(level);
        self.history.borrow_mut().push(level);
    }
}

impl PinErrorType for SimPin {
    type Error = Infallible;
}

impl OutputPin for SimPin {
    fn set_low(&mut self) -> Result<(), Infallible> {
        self.write(false);
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Infallible> {
        self.write(true);
        Ok(())
    }
}
