use crate::bodies::RigidBody;
use crate::constraints::Constraint;
use crate::core::{BodyHandle, BodyStorage, Storage, POS_PER_BODY};
use crate::math::Vector2;

/// Pins a body-frame point onto a circle around a fixed world point
///
/// C = (|p - target|^2 - radius^2) / 2, where p is the anchor point in world
/// space. A zero radius pins the point exactly onto the target. The quadratic
/// form keeps the gradient smooth when the anchor sits on the target.
pub struct AnchorConstraint {
    /// The constrained body
    body: BodyHandle,

    /// The anchor point on the body, in the body frame
    local_anchor: Vector2,

    /// The fixed target point in world space
    target: Vector2,

    /// The distance to hold between the anchor and the target
    radius: f32,

    /// The bodies involved in the constraint (cached for quick lookup)
    bodies: [BodyHandle; 1],
}

impl AnchorConstraint {
    /// Pins the body-frame anchor point exactly onto the world target
    pub fn new(body: BodyHandle, local_anchor: Vector2, target: Vector2) -> Self {
        Self::new_with_radius(body, local_anchor, target, 0.0)
    }

    /// Holds the body-frame anchor point at a fixed distance from the target
    pub fn new_with_radius(
        body: BodyHandle,
        local_anchor: Vector2,
        target: Vector2,
        radius: f32,
    ) -> Self {
        Self {
            body,
            local_anchor,
            target,
            radius: radius.max(0.0),
            bodies: [body],
        }
    }

    /// Returns the world-space target point
    pub fn get_target(&self) -> Vector2 {
        self.target
    }

    /// Sets the world-space target point
    pub fn set_target(&mut self, target: Vector2) {
        self.target = target;
    }

    /// Returns the held radius
    pub fn get_radius(&self) -> f32 {
        self.radius
    }

    /// Sets the held radius
    pub fn set_radius(&mut self, radius: f32) {
        self.radius = radius.max(0.0);
    }

    /// Returns (r, delta, delta_dot) for the body's current state
    fn frame(&self, bodies: &BodyStorage<RigidBody>) -> Option<(Vector2, Vector2, Vector2)> {
        let body = bodies.get(self.body)?;
        let r = self.local_anchor.rotated(body.get_angle());
        let delta = body.get_position() + r - self.target;
        let delta_dot =
            body.get_linear_velocity() + r.perpendicular() * body.get_angular_velocity();
        Some((r, delta, delta_dot))
    }
}

impl Constraint for AnchorConstraint {
    fn constraint_type(&self) -> &'static str {
        "Anchor"
    }

    fn arity(&self) -> usize {
        1
    }

    fn bodies(&self) -> &[BodyHandle] {
        &self.bodies
    }

    fn value(&self, bodies: &BodyStorage<RigidBody>) -> f32 {
        match self.frame(bodies) {
            Some((_, delta, _)) => 0.5 * (delta.length_squared() - self.radius * self.radius),
            None => 0.0,
        }
    }

    fn derivative(&self, bodies: &BodyStorage<RigidBody>) -> f32 {
        match self.frame(bodies) {
            Some((_, delta, delta_dot)) => delta.dot(&delta_dot),
            None => 0.0,
        }
    }

    fn gradient(&self, bodies: &BodyStorage<RigidBody>, body: BodyHandle) -> [f32; POS_PER_BODY] {
        if body != self.body {
            return [0.0; POS_PER_BODY];
        }
        match self.frame(bodies) {
            Some((r, delta, _)) => [delta.x, delta.y, r.cross(&delta)],
            None => [0.0; POS_PER_BODY],
        }
    }

    fn gradient_derivative(
        &self,
        bodies: &BodyStorage<RigidBody>,
        body: BodyHandle,
    ) -> [f32; POS_PER_BODY] {
        if body != self.body {
            return [0.0; POS_PER_BODY];
        }
        let (r, delta, delta_dot) = match self.frame(bodies) {
            Some(frame) => frame,
            None => return [0.0; POS_PER_BODY],
        };

        let omega = match bodies.get(self.body) {
            Some(body) => body.get_angular_velocity(),
            None => return [0.0; POS_PER_BODY],
        };
        let angular = -omega * r.dot(&delta) + r.cross(&delta_dot);
        [delta_dot.x, delta_dot.y, angular]
    }
}
