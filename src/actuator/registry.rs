//! # Actuator Registry
//!
//! Ordered collection of every actuator sharing a step line.
//!
//! The registry is a plain owned list; the newest registration is visited
//! first on each tick and the oldest last.

use embedded_hal::digital::OutputPin;
use tracing::debug;

use super::servo::Actuator;
use crate::error::ActuatorError;

/// Handle returned by [`ActuatorRegistry::register`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ActuatorId(usize);

impl ActuatorId {
    /// Registration index (0 for the first actuator registered)
    pub fn index(self) -> usize {
        self.0
    }
}

/// Outcome of one pass over the registry
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TickReport {
    /// Actuators in the order they were advanced
    pub visited: Vec<ActuatorId>,
    /// How many are still moving after the pass
    pub active: usize,
    /// Whether a step pulse was emitted
    pub pulsed: bool,
}

/// All actuators driven by one tick coordinator
pub struct ActuatorRegistry<EN, DIR> {
    actuators: Vec<Actuator<EN, DIR>>,
}

impl<EN, DIR> Default for ActuatorRegistry<EN, DIR> {
    fn default() -> Self {
        Self { actuators: Vec::new() }
    }
}

impl<EN, DIR> std::fmt::Debug for ActuatorRegistry<EN, DIR> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.actuators.iter()).finish()
    }
}

impl<EN, DIR> ActuatorRegistry<EN, DIR>
where
    EN: OutputPin,
    DIR: OutputPin,
{
    pub fn new() -> Self {
        Self::default()
    }

    /// Take ownership of `actuator` and return its handle
    ///
    /// Lines of a deferred-init actuator are driven here. Registering is
    /// the only way in; there is no removal.
    pub fn register(&mut self, mut actuator: Actuator<EN, DIR>) -> Result<ActuatorId, ActuatorError> {
        actuator.init()?;
        let id = ActuatorId(self.actuators.len());
        self.actuators.push(actuator);
        debug!("Registered actuator {} (step {})", id.0, self.actuators[id.0].step());
        Ok(id)
    }

    pub fn get(&self, id: ActuatorId) -> Option<&Actuator<EN, DIR>> {
        self.actuators.get(id.0)
    }

    pub fn get_mut(&mut self, id: ActuatorId) -> Option<&mut Actuator<EN, DIR>> {
        self.actuators.get_mut(id.0)
    }

    /// Point actuator `id` at `target` and energize it
    pub fn set_target(&mut self, id: ActuatorId, target: f32) -> Result<(), ActuatorError> {
        self.get_mut(id)
            .ok_or(ActuatorError::UnknownActuator(id.0))?
            .set_target(target)
    }

    /// Handle of the actuator registered `index`-th, if any
    pub fn id_at(&self, index: usize) -> Option<ActuatorId> {
        (index < self.actuators.len()).then_some(ActuatorId(index))
    }

    pub fn len(&self) -> usize {
        self.actuators.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actuators.is_empty()
    }

    /// Handles in the order a tick visits them, newest first
    pub fn traversal_order(&self) -> impl Iterator<Item = ActuatorId> {
        (0..self.actuators.len()).rev().map(ActuatorId)
    }

    /// Actuators paired with their handles, in registration order
    pub fn iter(&self) -> impl Iterator<Item = (ActuatorId, &Actuator<EN, DIR>)> {
        self.actuators.iter().enumerate().map(|(i, a)| (ActuatorId(i), a))
    }

    /// Number of actuators still moving toward their target
    pub fn active(&self) -> usize {
        self.actuators.iter().filter(|a| a.is_enabled()).count()
    }

    /// Advance every actuator once, newest first
    ///
    /// Every actuator is visited exactly once. The returned report has
    /// `pulsed` unset; the coordinator decides about the pulse.
    pub fn advance_all(&mut self) -> Result<TickReport, ActuatorError> {
        let mut report = TickReport {
            visited: Vec::with_capacity(self.actuators.len()),
            ..TickReport::default()
        };

        for (i, actuator) in self.actuators.iter_mut().enumerate().rev() {
            if actuator.advance()? {
                report.active += 1;
            }
            report.visited.push(ActuatorId(i));
        }
        Ok(report)
    }

    /// De-energize every driver
    pub fn disable_all(&mut self) -> Result<(), ActuatorError> {
        for actuator in &mut self.actuators {
            actuator.set_enabled(false)?;
        }
        Ok(())
    }
}
