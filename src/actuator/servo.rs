//! # Stepper Servo
//!
//! Open-loop actuator that walks toward a target one fixed step per tick.
//!
//! An actuator owns two lines: enable (energizes the driver) and direction.
//! The step line is shared by every actuator and pulsed by the
//! [`TickCoordinator`](super::TickCoordinator); the position kept here is
//! the count of those pulses the actuator was enabled for, times its step.

use embedded_hal::digital::OutputPin;
use tracing::trace;

use crate::error::ActuatorError;

/// Slack added to the step size when testing for arrival, so float drift
/// never flips between "one more step" and "overshot"
pub const TARGET_EPSILON: f32 = 1e-4;

/// Electrical level that energizes the driver
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EnablePolarity {
    #[default]
    ActiveHigh,
    /// Enable input is inverted (A4988/DRV8825 style `EN` pins)
    ActiveLow,
}

/// When the enable and direction lines are first driven
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PinInit {
    /// In [`Actuator::new`]
    #[default]
    Immediate,
    /// When the actuator is registered
    Deferred,
}

/// Line settings shared by all actuators of a hand
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DriveSettings {
    pub polarity: EnablePolarity,
    pub init: PinInit,
}

/// Direction of travel
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Increasing position; direction line high
    Forward,
    /// Decreasing position; direction line low
    Reverse,
}

/// A stepper-driven joint
pub struct Actuator<EN, DIR> {
    enable: EN,
    direction: DIR,
    polarity: EnablePolarity,
    step: f32,
    position: f32,
    target: f32,
    enabled: bool,
    heading: Direction,
    initialized: bool,
}

impl<EN, DIR> std::fmt::Debug for Actuator<EN, DIR> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Actuator")
            .field("step", &self.step)
            .field("position", &self.position)
            .field("target", &self.target)
            .field("enabled", &self.enabled)
            .field("heading", &self.heading)
            .finish_non_exhaustive()
    }
}

impl<EN, DIR> Actuator<EN, DIR>
where
    EN: OutputPin,
    DIR: OutputPin,
{
    /// Create an actuator at position 0 with target 0, disabled
    ///
    /// # Arguments
    ///
    /// * `enable` - Driver enable line
    /// * `direction` - Driver direction line
    /// * `step` - Distance covered per step pulse, in position units
    /// * `settings` - Enable polarity and pin initialization timing
    ///
    /// # Errors
    ///
    /// - `InvalidStep` if `step` is not a positive finite number
    /// - `Pin` if the lines cannot be driven (immediate initialization only)
    pub fn new(enable: EN, direction: DIR, step: f32, settings: DriveSettings) -> Result<Self, ActuatorError> {
        if !(step.is_finite() && step > 0.0) {
            return Err(ActuatorError::InvalidStep);
        }

        let mut actuator = Self {
            enable,
            direction,
            polarity: settings.polarity,
            step,
            position: 0.0,
            target: 0.0,
            enabled: false,
            heading: Direction::Reverse,
            initialized: false,
        };

        if settings.init == PinInit::Immediate {
            actuator.init()?;
        }
        Ok(actuator)
    }

    /// Drive both lines to their idle levels (driver off, direction low)
    ///
    /// Does nothing once the lines have been initialized.
    pub fn init(&mut self) -> Result<(), ActuatorError> {
        if self.initialized {
            return Ok(());
        }
        self.write_enable(false)?;
        self.direction.set_low().map_err(pin_error)?;
        self.initialized = true;
        Ok(())
    }

    /// Set a new target and energize the driver
    ///
    /// Targets are not clamped; an unreachable target drives the joint into
    /// its mechanical stop.
    pub fn set_target(&mut self, target: f32) -> Result<(), ActuatorError> {
        self.target = target;
        self.set_enabled(true)
    }

    /// Advance one tick toward the target
    ///
    /// Returns whether the actuator is still moving. When the remaining
    /// distance is under one step the driver is switched off and the position
    /// is taken to be the target.
    pub fn advance(&mut self) -> Result<bool, ActuatorError> {
        if !self.enabled {
            return Ok(false);
        }

        let heading = if self.target > self.position {
            Direction::Forward
        } else {
            Direction::Reverse
        };
        self.set_direction(heading)?;

        if (self.target - self.position).abs() < self.step + TARGET_EPSILON {
            self.set_enabled(false)?;
            self.position = self.target;
            trace!("Actuator reached {}", self.target);
            return Ok(false);
        }

        self.position += match heading {
            Direction::Forward => self.step,
            Direction::Reverse => -self.step,
        };
        Ok(true)
    }

    /// Switch the driver on or off; off takes effect on the line at once
    pub fn set_enabled(&mut self, enabled: bool) -> Result<(), ActuatorError> {
        self.write_enable(enabled)?;
        self.enabled = enabled;
        Ok(())
    }

    /// Position rounded to the nearest whole unit
    pub fn current_position(&self) -> i32 {
        self.position.round() as i32
    }

    pub fn position(&self) -> f32 {
        self.position
    }

    pub fn target(&self) -> f32 {
        self.target
    }

    pub fn step(&self) -> f32 {
        self.step
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn direction(&self) -> Direction {
        self.heading
    }

    fn set_direction(&mut self, heading: Direction) -> Result<(), ActuatorError> {
        let result = match heading {
            Direction::Forward => self.direction.set_high(),
            Direction::Reverse => self.direction.set_low(),
        };
        result.map_err(pin_error)?;
        self.heading = heading;
        Ok(())
    }

    fn write_enable(&mut self, enabled: bool) -> Result<(), ActuatorError> {
        let high = enabled != (self.polarity == EnablePolarity::ActiveLow);
        let result = if high { self.enable.set_high() } else { self.enable.set_low() };
        result.map_err(pin_error)
    }
}

fn pin_error<E: embedded_hal::digital::Error>(error: E) -> ActuatorError {
    ActuatorError::Pin(error.kind())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hardware::sim::SimPin;

    fn actuator(step: f32) -> (Actuator<SimPin, SimPin>, SimPin, SimPin) {
        let enable = SimPin::new();
        let direction = SimPin::new();
        let actuator = Actuator::new(enable.clone(), direction.clone(), step, DriveSettings::default()).unwrap();
        (actuator, enable, direction)
    }

    #[test]
    fn test_new_actuator_is_idle() {
        let (actuator, enable, direction) = actuator(1.0);
        assert!(!actuator.is_enabled());
        assert_eq!(actuator.current_position(), 0);
        assert_eq!(enable.history(), vec![false], "immediate init drives enable low");
        assert_eq!(direction.history(), vec![false]);
    }

    #[test]
    fn test_invalid_step_rejected() {
        for step in [0.0, -1.0, f32::NAN, f32::INFINITY] {
            let result = Actuator::new(SimPin::new(), SimPin::new(), step, DriveSettings::default());
            assert!(matches!(result, Err(ActuatorError::InvalidStep)), "step {} should be rejected", step);
        }
    }

    #[test]
    fn test_deferred_init_leaves_lines_untouched() {
        let enable = SimPin::new();
        let settings = DriveSettings { init: PinInit::Deferred, ..DriveSettings::default() };
        let mut actuator = Actuator::new(enable.clone(), SimPin::new(), 1.0, settings).unwrap();
        assert!(enable.history().is_empty());

        actuator.init().unwrap();
        actuator.init().unwrap();
        assert_eq!(enable.history(), vec![false], "init runs once");
    }

    #[test]
    fn test_set_target_energizes_driver() {
        let (mut actuator, enable, _) = actuator(1.0);
        actuator.set_target(3.0).unwrap();
        assert!(actuator.is_enabled());
        assert!(enable.is_high());
    }

    #[test]
    fn test_inverted_enable_polarity() {
        let enable = SimPin::new();
        let settings = DriveSettings { polarity: EnablePolarity::ActiveLow, ..DriveSettings::default() };
        let mut actuator = Actuator::new(enable.clone(), SimPin::new(), 1.0, settings).unwrap();
        assert!(enable.is_high(), "idle inverted driver sits high");

        actuator.set_target(1.0).unwrap();
        assert!(!enable.is_high());

        actuator.set_enabled(false).unwrap();
        assert!(enable.is_high());
    }

    #[test]
    fn test_step_5_target_17_scenario() {
        let (mut actuator, enable, _) = actuator(5.0);
        actuator.set_target(17.0).unwrap();

        let mut positions = Vec::new();
        for _ in 0..4 {
            actuator.advance().unwrap();
            positions.push(actuator.position());
        }

        assert_eq!(positions, vec![5.0, 10.0, 15.0, 17.0]);
        assert!(!actuator.is_enabled());
        assert!(!enable.is_high(), "completion must de-energize the driver");
        assert_eq!(actuator.current_position(), 17);
    }

    #[test]
    fn test_converges_monotonically_then_holds() {
        for (step, target) in [(0.5_f32, 7.3_f32), (2.0, -9.0), (0.1, 1.0), (3.0, 3.0)] {
            let (mut actuator, _, _) = actuator(step);
            actuator.set_target(target).unwrap();

            let mut last_distance = (target - actuator.position()).abs();
            for _ in 0..1000 {
                actuator.advance().unwrap();
                let distance = (target - actuator.position()).abs();
                assert!(distance <= last_distance + TARGET_EPSILON, "step {} target {}: moved away", step, target);
                last_distance = distance;
            }

            assert!(!actuator.is_enabled());
            let held = actuator.position();
            assert!((held - target).abs() < step + TARGET_EPSILON);
            assert!(!actuator.advance().unwrap());
            assert_eq!(actuator.position(), held, "disabled actuator must not move");
        }
    }

    #[test]
    fn test_direction_follows_target() {
        let (mut actuator, _, direction) = actuator(1.0);
        actuator.set_target(5.0).unwrap();
        actuator.advance().unwrap();
        assert_eq!(actuator.direction(), Direction::Forward);
        assert!(direction.is_high());

        actuator.set_target(-5.0).unwrap();
        actuator.advance().unwrap();
        assert_eq!(actuator.direction(), Direction::Reverse);
        assert!(!direction.is_high());
        assert_eq!(actuator.position(), 0.0);
    }

    #[test]
    fn test_float_drift_does_not_overshoot() {
        let (mut actuator, _, _) = actuator(0.1);
        actuator.set_target(1.0).unwrap();
        while actuator.advance().unwrap() {}

        assert_eq!(actuator.position(), 1.0);
        assert_eq!(actuator.current_position(), 1);
    }

    #[test]
    fn test_current_position_rounds() {
        let (mut actuator, _, _) = actuator(0.6);
        actuator.set_target(10.0).unwrap();
        actuator.advance().unwrap();
        assert_eq!(actuator.current_position(), 1);
        actuator.advance().unwrap();
        assert_eq!(actuator.current_position(), 1);
        actuator.advance().unwrap();
        assert_eq!(actuator.current_position(), 2);
    }
}
