//! # Raspberry Pi Binding
//!
//! Opens SPI0 and the GPIO lines named in the configuration.
//!
//! The controller expects SPI mode 2 (clock idles high, sample on the
//! rising edge) with bytes shifted LSB first. The Pi only shifts MSB first,
//! so the bus is wrapped in [`LsbFirst`]. Chip select is a plain GPIO
//! driven by the link; the hardware CE0 line is left unconnected.

use rppal::gpio::{Gpio, OutputPin};
use rppal::spi::{Bus, Mode, SlaveSelect, Spi};
use tracing::info;

use super::lsb::LsbFirst;
use crate::config::Config;
use crate::error::{HandError, Result};

/// SPI bus type used by the controller link
pub type PiBus = LsbFirst<Spi>;

/// Every line the application drives
pub struct PiHardware {
    pub bus: PiBus,
    pub attention: OutputPin,
    pub step: OutputPin,
    /// (enable, direction) per configured actuator, in configuration order
    pub actuators: Vec<(OutputPin, OutputPin)>,
}

fn hardware_error(context: &str, error: impl std::fmt::Display) -> HandError {
    HandError::Hardware(format!("{}: {}", context, error))
}

impl PiHardware {
    /// Open SPI0 and claim every configured GPIO as an output
    ///
    /// # Errors
    ///
    /// Returns `Hardware` if the SPI device or any GPIO cannot be opened
    /// (missing `/dev/spidev0.0`, pin already claimed, not running on a Pi).
    pub fn open(config: &Config) -> Result<Self> {
        let spi = Spi::new(Bus::Spi0, SlaveSelect::Ss0, config.gamepad.spi_clock_hz, Mode::Mode2)
            .map_err(|e| hardware_error("opening SPI0", e))?;
        let gpio = Gpio::new().map_err(|e| hardware_error("opening GPIO", e))?;

        let output = |pin: u8| -> Result<OutputPin> {
            gpio.get(pin)
                .map(|p| p.into_output())
                .map_err(|e| hardware_error(&format!("claiming GPIO {}", pin), e))
        };

        let attention = output(config.gamepad.attention_pin)?;
        let step = output(config.drive.step_pin)?;
        let actuators = config
            .actuators
            .iter()
            .map(|a| Ok((output(a.enable_pin)?, output(a.direction_pin)?)))
            .collect::<Result<Vec<_>>>()?;

        info!(
            "Opened SPI0 at {} Hz, attention GPIO {}, step GPIO {}, {} actuators",
            config.gamepad.spi_clock_hz,
            config.gamepad.attention_pin,
            config.drive.step_pin,
            actuators.len()
        );

        Ok(Self {
            bus: LsbFirst::new(spi),
            attention,
            step,
            actuators,
        })
    }
}
