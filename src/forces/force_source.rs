use crate::bodies::RigidBody;
use crate::core::{BodyHandle, BodyStorage, Storage};
use crate::math::Vector2;

/// Base trait for force sources
///
/// A force source is a pure map from a body's current state to a linear force
/// through the center of mass and a torque. Sources must not mutate bodies;
/// the engine accumulates the returned values on their behalf once per
/// substep, in registration order.
pub trait ForceSource: Send + Sync + 'static {
    /// Returns the type name of the force source
    fn source_type(&self) -> &'static str;

    /// Evaluates the force and torque on the given body
    fn force(&self, body: &RigidBody) -> (Vector2, f32);
}

/// The set of bodies a registered force source acts on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ForceScope {
    /// The source acts on every body in the engine
    Global,

    /// The source acts on a single body
    Body(BodyHandle),
}

/// A registry of force sources and their scopes
#[derive(Default)]
pub struct ForceRegistry {
    sources: Vec<(Box<dyn ForceSource>, ForceScope)>,
}

impl ForceRegistry {
    /// Creates a new empty force registry
    pub fn new() -> Self {
        Self {
            sources: Vec::new(),
        }
    }

    /// Adds a force source to the registry
    pub fn add(&mut self, source: Box<dyn ForceSource>, scope: ForceScope) {
        self.sources.push((source, scope));
    }

    /// Returns the number of sources in the registry
    pub fn len(&self) -> usize {
        self.sources.len()
    }

    /// Returns whether the registry is empty
    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }

    /// Clears all force sources
    pub fn clear(&mut self) {
        self.sources.clear();
    }

    /// Removes all sources scoped to a specific body
    pub fn remove_sources_for_body(&mut self, body: BodyHandle) {
        self.sources
            .retain(|(_, scope)| *scope != ForceScope::Body(body));
    }

    /// Evaluates every source against the bodies' current state and
    /// accumulates the results
    ///
    /// Sources run in registration order; each one reads only the probe state,
    /// so the accumulated total is order-independent.
    pub fn apply_forces(&self, bodies: &mut BodyStorage<RigidBody>) {
        for (source, scope) in &self.sources {
            match scope {
                ForceScope::Global => {
                    for body in bodies.as_mut_slice() {
                        let (force, torque) = source.force(body);
                        body.add_force(force);
                        body.add_torque(torque);
                    }
                }
                ForceScope::Body(handle) => {
                    if let Some(body) = bodies.get_mut(*handle) {
                        let (force, torque) = source.force(body);
                        body.add_force(force);
                        body.add_torque(torque);
                    }
                }
            }
        }
    }
}
