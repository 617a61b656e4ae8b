//! # Tick Coordinator
//!
//! Emits the shared step pulse.
//!
//! One tick advances every registered actuator (setting each direction line
//! and updating enable), then raises the step line for the pulse width and
//! drops it again. Drivers that are disabled ignore the pulse, so one line
//! serves the whole hand.

use std::time::Duration;

use embedded_hal::digital::OutputPin;
use tracing::trace;

use super::registry::{ActuatorRegistry, TickReport};
use crate::clock::Clock;
use crate::error::ActuatorError;

/// Default step pulse width
pub const DEFAULT_PULSE_WIDTH: Duration = Duration::from_millis(10);

/// Owner of the step line
pub struct TickCoordinator<S, C> {
    step: S,
    clock: C,
    pulse_width: Duration,
    ticks: u64,
}

impl<S, C> std::fmt::Debug for TickCoordinator<S, C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TickCoordinator")
            .field("pulse_width", &self.pulse_width)
            .field("ticks", &self.ticks)
            .finish_non_exhaustive()
    }
}

impl<S, C> TickCoordinator<S, C>
where
    S: OutputPin,
    C: Clock,
{
    /// Take the step line and drive it to its idle (low) level
    pub fn new(mut step: S, clock: C, pulse_width: Duration) -> Result<Self, ActuatorError> {
        step.set_low().map_err(pin_error)?;
        Ok(Self {
            step,
            clock,
            pulse_width,
            ticks: 0,
        })
    }

    /// Advance all actuators once and pulse the step line
    ///
    /// Blocks for the pulse width. With no actuators registered nothing is
    /// pulsed and nothing waits.
    pub fn tick<EN, DIR>(&mut self, registry: &mut ActuatorRegistry<EN, DIR>) -> Result<TickReport, ActuatorError>
    where
        EN: OutputPin,
        DIR: OutputPin,
    {
        if registry.is_empty() {
            return Ok(TickReport::default());
        }

        let mut report = registry.advance_all()?;

        self.step.set_high().map_err(pin_error)?;
        self.clock.delay(self.pulse_width);
        self.step.set_low().map_err(pin_error)?;

        report.pulsed = true;
        self.ticks += 1;
        trace!("Tick {}: {} actuators moving", self.ticks, report.active);
        Ok(report)
    }

    /// Pulses emitted so far
    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    pub fn pulse_width(&self) -> Duration {
        self.pulse_width
    }
}

fn pin_error<E: embedded_hal::digital::Error>(error: E) -> ActuatorError {
    ActuatorError::Pin(error.kind())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actuator::servo::{Actuator, DriveSettings};
    use crate::clock::{ManualClock, MockClock};
    use crate::hardware::sim::SimPin;
    use mockall::predicate::eq;

    fn registry_with(targets: &[(f32, f32)]) -> ActuatorRegistry<SimPin, SimPin> {
        let mut registry = ActuatorRegistry::new();
        for &(step, target) in targets {
            let actuator = Actuator::new(SimPin::new(), SimPin::new(), step, DriveSettings::default()).unwrap();
            let id = registry.register(actuator).unwrap();
            registry.set_target(id, target).unwrap();
        }
        registry
    }

    #[test]
    fn test_new_idles_step_line_low() {
        let step = SimPin::new();
        let coordinator = TickCoordinator::new(step.clone(), ManualClock::new(), DEFAULT_PULSE_WIDTH).unwrap();
        assert_eq!(step.history(), vec![false]);
        assert_eq!(coordinator.ticks(), 0);
    }

    #[test]
    fn test_tick_holds_pulse_for_width() {
        let mut clock = MockClock::new();
        clock.expect_delay().with(eq(Duration::from_millis(10))).times(1).return_const(());

        let step = SimPin::new();
        let mut coordinator = TickCoordinator::new(step.clone(), clock, Duration::from_millis(10)).unwrap();
        let mut registry = registry_with(&[(1.0, 5.0)]);

        let report = coordinator.tick(&mut registry).unwrap();
        assert!(report.pulsed);
        assert_eq!(step.history(), vec![false, true, false], "pulse must be high then low");
    }

    #[test]
    fn test_empty_registry_does_not_pulse() {
        let mut clock = MockClock::new();
        clock.expect_delay().times(0);

        let step = SimPin::new();
        let mut coordinator = TickCoordinator::new(step.clone(), clock, DEFAULT_PULSE_WIDTH).unwrap();
        let mut registry: ActuatorRegistry<SimPin, SimPin> = ActuatorRegistry::new();

        let report = coordinator.tick(&mut registry).unwrap();
        assert!(!report.pulsed);
        assert_eq!(step.rising_edges(), 0);
        assert_eq!(coordinator.ticks(), 0);
    }

    #[test]
    fn test_one_pulse_per_tick_for_all_actuators() {
        let clock = ManualClock::new();
        let step = SimPin::new();
        let mut coordinator = TickCoordinator::new(step.clone(), clock.clone(), DEFAULT_PULSE_WIDTH).unwrap();
        let mut registry = registry_with(&[(1.0, 3.0), (1.0, -2.0), (0.5, 1.0)]);

        for _ in 0..4 {
            coordinator.tick(&mut registry).unwrap();
        }

        assert_eq!(step.rising_edges(), 4);
        assert_eq!(clock.total_slept(), DEFAULT_PULSE_WIDTH * 4);
        assert_eq!(registry.active(), 0);
    }

    #[test]
    fn test_pulses_continue_after_all_arrive() {
        let step = SimPin::new();
        let mut coordinator = TickCoordinator::new(step.clone(), ManualClock::new(), DEFAULT_PULSE_WIDTH).unwrap();
        let mut registry = registry_with(&[(1.0, 1.0)]);

        let first = coordinator.tick(&mut registry).unwrap();
        let second = coordinator.tick(&mut registry).unwrap();

        assert_eq!(first.active, 0);
        assert!(second.pulsed, "pulse is emitted even when nothing is enabled");
        assert_eq!(registry.iter().next().unwrap().1.position(), 1.0);
        assert_eq!(coordinator.ticks(), 2);
    }
}
