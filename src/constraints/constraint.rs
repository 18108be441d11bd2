use crate::bodies::RigidBody;
use crate::core::{BodyHandle, BodyStorage, POS_PER_BODY};

/// Base trait for bilateral holonomic constraints
///
/// A constraint is a smooth scalar function C over the generalised coordinates
/// `(x, y, angle)` of the bodies it couples, held at C = 0 by the solver.
/// Every query is evaluated against the bodies' current poses and velocities;
/// implementations must not cache state across substeps, and must not mutate
/// bodies.
pub trait Constraint: Send + Sync + 'static {
    /// Returns the type name of the constraint
    fn constraint_type(&self) -> &'static str;

    /// Returns the number of bodies the constraint couples
    fn arity(&self) -> usize;

    /// Returns the bodies involved in the constraint
    fn bodies(&self) -> &[BodyHandle];

    /// Checks if the constraint involves a specific body
    fn involves_body(&self, body: BodyHandle) -> bool {
        self.bodies().contains(&body)
    }

    /// Evaluates the constraint function C at the bodies' current poses
    fn value(&self, bodies: &BodyStorage<RigidBody>) -> f32;

    /// Evaluates dC/dt at the bodies' current poses and velocities
    fn derivative(&self, bodies: &BodyStorage<RigidBody>) -> f32;

    /// Evaluates the gradient of C with respect to the given body's
    /// generalised coordinates `(x, y, angle)`
    ///
    /// Bodies the constraint does not reference have an implicitly zero
    /// gradient and are never queried.
    fn gradient(&self, bodies: &BodyStorage<RigidBody>, body: BodyHandle) -> [f32; POS_PER_BODY];

    /// Evaluates the time derivative of the gradient for the given body
    fn gradient_derivative(
        &self,
        bodies: &BodyStorage<RigidBody>,
        body: BodyHandle,
    ) -> [f32; POS_PER_BODY];
}
