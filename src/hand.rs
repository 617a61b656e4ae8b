//! # Hand
//!
//! Bundles the controller link with the actuator drive so the application
//! loop only has to call into it on its own cadence.
//!
//! The two halves never touch each other: polling and ticking are
//! independent, and a lost controller never stops actuator ticks.

use embedded_hal::digital::OutputPin;
use embedded_hal::spi::SpiBus;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::actuator::{Actuator, ActuatorId, ActuatorRegistry, DriveSettings, TickCoordinator, TickReport};
use crate::clock::Clock;
use crate::config::Config;
use crate::error::{ActuatorError, HandError, LinkError, Result};
use crate::gamepad::{ControllerLink, LinkSettings};
use crate::telemetry::TelemetryRecord;

/// A controller link plus every actuator it will drive
pub struct Hand<B, P, EN, DIR, S, C> {
    link: ControllerLink<B, P, C>,
    connected: bool,
    registry: ActuatorRegistry<EN, DIR>,
    coordinator: TickCoordinator<S, C>,
    names: Vec<String>,
}

impl<B, P, EN, DIR, S, C> std::fmt::Debug for Hand<B, P, EN, DIR, S, C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Hand")
            .field("connected", &self.connected)
            .field("names", &self.names)
            .field("coordinator", &self.coordinator)
            .finish_non_exhaustive()
    }
}

impl<B, P, EN, DIR, S, C> Hand<B, P, EN, DIR, S, C>
where
    B: SpiBus<u8>,
    P: OutputPin,
    EN: OutputPin,
    DIR: OutputPin,
    S: OutputPin,
    C: Clock,
{
    /// Assemble a hand from already opened parts
    pub fn new(link: ControllerLink<B, P, C>, coordinator: TickCoordinator<S, C>) -> Self {
        Self {
            link,
            connected: false,
            registry: ActuatorRegistry::new(),
            coordinator,
            names: Vec::new(),
        }
    }

    /// Assemble a hand from configuration and drive every actuator toward
    /// its home target
    ///
    /// `lines` holds the (enable, direction) pair of each configured
    /// actuator, in configuration order. Each clock is owned by the half it
    /// is given to.
    pub fn from_config(
        config: &Config,
        bus: B,
        attention: P,
        step: S,
        lines: Vec<(EN, DIR)>,
        link_clock: C,
        tick_clock: C,
    ) -> Result<Self> {
        let link = ControllerLink::new(bus, attention, link_clock, LinkSettings::from(&config.gamepad));
        let coordinator = TickCoordinator::new(
            step,
            tick_clock,
            Duration::from_millis(config.drive.step_pulse_ms),
        )?;
        let mut hand = Self::new(link, coordinator);

        if lines.len() != config.actuators.len() {
            return Err(HandError::Hardware(format!(
                "{} actuators configured but {} enable/direction line pairs supplied",
                config.actuators.len(),
                lines.len()
            )));
        }

        let settings = DriveSettings::from(&config.drive);
        for (actuator_config, (enable, direction)) in config.actuators.iter().zip(lines) {
            let actuator = Actuator::new(enable, direction, actuator_config.step, settings)?;
            let id = hand.register(&actuator_config.name, actuator)?;
            if let Some(target) = actuator_config.home_target {
                hand.set_target(id, target)?;
            }
        }

        info!("Hand assembled with {} actuators", hand.registry.len());
        Ok(hand)
    }

    /// Register an actuator under `name`
    pub fn register(&mut self, name: &str, actuator: Actuator<EN, DIR>) -> std::result::Result<ActuatorId, ActuatorError> {
        let id = self.registry.register(actuator)?;
        self.names.push(name.to_string());
        Ok(id)
    }

    pub fn set_target(&mut self, id: ActuatorId, target: f32) -> std::result::Result<(), ActuatorError> {
        debug!("Actuator '{}' target {}", self.name(id), target);
        self.registry.set_target(id, target)
    }

    /// Look up an actuator by the name it was registered under
    pub fn find(&self, name: &str) -> Option<ActuatorId> {
        let index = self.names.iter().position(|n| n == name)?;
        self.registry.id_at(index)
    }

    pub fn name(&self, id: ActuatorId) -> &str {
        self.names.get(id.index()).map_or("", String::as_str)
    }

    /// Run the configuration handshake
    ///
    /// `NoConnection` still leaves the hand connected: the controller
    /// answers in analog mode, only without pressure data. Any other
    /// failure leaves it disconnected and the caller retries later.
    pub fn connect(&mut self) -> std::result::Result<(), LinkError> {
        let result = self.link.configure();
        self.connected = match result {
            Ok(()) => true,
            Err(LinkError::NoConnection { mode }) => {
                warn!("Controller lacks pressure data (mode 0x{:02X}), continuing without it", mode);
                true
            }
            Err(_) => false,
        };
        result
    }

    /// Poll the controller once (rumble off)
    ///
    /// A poll that comes back without an attached mode byte drops the
    /// connection so the next [`connect`](Self::connect) can run.
    pub fn poll(&mut self) -> std::result::Result<(), LinkError> {
        if let Err(e) = self.link.update(0, 0) {
            self.connected = false;
            return Err(e);
        }

        if !self.link.is_attached() {
            warn!("Controller stopped answering (mode {:?})", self.link.mode());
            self.connected = false;
        } else if self.link.changed() {
            let held: Vec<_> = self.link.pressed_buttons().collect();
            debug!("Buttons held: {:?}", held);
        }
        Ok(())
    }

    /// Advance every actuator and pulse the step line
    pub fn tick(&mut self) -> std::result::Result<TickReport, ActuatorError> {
        self.coordinator.tick(&mut self.registry)
    }

    /// Snapshot for the telemetry log
    pub fn snapshot(&self) -> TelemetryRecord {
        let gamepad = self.connected.then(|| self.link.state());
        TelemetryRecord::capture(self.coordinator.ticks(), gamepad, &self.registry, &self.names)
    }

    /// De-energize every actuator
    pub fn shutdown(&mut self) -> std::result::Result<(), ActuatorError> {
        self.registry.disable_all()
    }

    pub fn is_connected(&self) -> bool {
        self.connected
    }

    pub fn link(&self) -> &ControllerLink<B, P, C> {
        &self.link
    }

    pub fn registry(&self) -> &ActuatorRegistry<EN, DIR> {
        &self.registry
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::gamepad::Button;
    use crate::hardware::sim::{SimAttention, SimBus, SimPin, SimulatedGamepad};

    type SimHand = Hand<SimBus, SimAttention, SimPin, SimPin, SimPin, ManualClock>;

    fn hand(pad: &SimulatedGamepad, step: &SimPin) -> SimHand {
        let clock = ManualClock::new();
        let link = ControllerLink::new(pad.bus(), pad.attention(), clock.clone(), LinkSettings::default());
        let coordinator = TickCoordinator::new(step.clone(), clock, Duration::from_millis(10)).unwrap();
        Hand::new(link, coordinator)
    }

    fn actuator(step: f32) -> Actuator<SimPin, SimPin> {
        Actuator::new(SimPin::new(), SimPin::new(), step, DriveSettings::default()).unwrap()
    }

    #[test]
    fn test_connect_and_poll() {
        let pad = SimulatedGamepad::new();
        let mut hand = hand(&pad, &SimPin::new());
        assert!(!hand.is_connected());

        hand.connect().unwrap();
        assert!(hand.is_connected());

        pad.press(Button::START);
        hand.poll().unwrap();
        assert!(hand.link().pressed(Button::START));
    }

    #[test]
    fn test_detached_controller_drops_connection() {
        let pad = SimulatedGamepad::new();
        let mut hand = hand(&pad, &SimPin::new());
        hand.connect().unwrap();

        pad.detach();
        hand.poll().unwrap();
        assert!(!hand.is_connected());

        assert_eq!(hand.connect(), Err(LinkError::NoController { mode: 0xFF }));
        pad.attach();
        assert_eq!(hand.connect(), Ok(()));
        assert!(hand.is_connected());
    }

    #[test]
    fn test_pressure_unsupported_still_polls() {
        let pad = SimulatedGamepad::new().without_pressure();
        let clock = ManualClock::new();
        let settings = LinkSettings { pressures: true, ..LinkSettings::default() };
        let link = ControllerLink::new(pad.bus(), pad.attention(), clock.clone(), settings);
        let coordinator = TickCoordinator::new(SimPin::new(), clock, Duration::from_millis(10)).unwrap();
        let mut hand: SimHand = Hand::new(link, coordinator);

        assert_eq!(hand.connect(), Err(LinkError::NoConnection { mode: 0x73 }));
        assert!(hand.is_connected(), "analog controller without pressure data stays usable");

        pad.press(Button::CROSS);
        hand.poll().unwrap();
        assert!(hand.is_connected());
        assert!(hand.link().pressed(Button::CROSS));
    }

    #[test]
    fn test_from_config_rejects_missing_lines() {
        let config: Config = toml::from_str(
            r#"
[gamepad]
[drive]
[[actuators]]
name = "thumb"
enable_pin = 5
direction_pin = 6
[[actuators]]
name = "index"
enable_pin = 13
direction_pin = 19
[telemetry]
"#,
        )
        .unwrap();
        let pad = SimulatedGamepad::new();
        let clock = ManualClock::new();
        let lines = vec![(SimPin::new(), SimPin::new())];

        let result: Result<SimHand> =
            Hand::from_config(&config, pad.bus(), pad.attention(), SimPin::new(), lines, clock.clone(), clock);
        assert!(matches!(result, Err(HandError::Hardware(_))), "every configured actuator needs its lines");
    }

    #[test]
    fn test_ticks_run_without_controller() {
        let pad = SimulatedGamepad::new();
        pad.detach();
        let step = SimPin::new();
        let mut hand = hand(&pad, &step);
        let id = hand.register("thumb", actuator(1.0)).unwrap();
        hand.set_target(id, 2.0).unwrap();

        assert!(hand.connect().is_err());
        hand.tick().unwrap();
        hand.tick().unwrap();

        assert_eq!(step.rising_edges(), 2);
        assert_eq!(hand.registry().get(id).unwrap().current_position(), 2);
    }

    #[test]
    fn test_find_by_name() {
        let pad = SimulatedGamepad::new();
        let mut hand = hand(&pad, &SimPin::new());
        let thumb = hand.register("thumb", actuator(1.0)).unwrap();
        let index = hand.register("index", actuator(1.0)).unwrap();

        assert_eq!(hand.find("index"), Some(index));
        assert_eq!(hand.find("thumb"), Some(thumb));
        assert_eq!(hand.find("pinky"), None);
        assert_eq!(hand.name(index), "index");
    }

    #[test]
    fn test_snapshot_omits_gamepad_until_connected() {
        let pad = SimulatedGamepad::new();
        let mut hand = hand(&pad, &SimPin::new());
        hand.register("thumb", actuator(1.0)).unwrap();
        assert!(hand.snapshot().gamepad.is_none());

        hand.connect().unwrap();
        let record = hand.snapshot();
        assert!(record.gamepad.is_some());
        assert_eq!(record.actuators[0].name, "thumb");
    }

    #[test]
    fn test_shutdown_disables_all() {
        let pad = SimulatedGamepad::new();
        let mut hand = hand(&pad, &SimPin::new());
        let id = hand.register("thumb", actuator(1.0)).unwrap();
        hand.set_target(id, 50.0).unwrap();

        hand.shutdown().unwrap();
        assert_eq!(hand.registry().active(), 0);
    }
}
