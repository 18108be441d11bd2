use crate::bodies::RigidBody;
use crate::constraints::Constraint;
use crate::core::{BodyHandle, BodyStorage, Storage, POS_PER_BODY};
use crate::math::{Vector2, EPSILON};

/// A rigid link holding two body-frame anchor points at a fixed distance
///
/// C = |p_b - p_a| - length, where p is the anchor point in world space.
pub struct DistanceConstraint {
    /// The first body in the constraint
    body_a: BodyHandle,

    /// The second body in the constraint
    body_b: BodyHandle,

    /// The anchor point on the first body, in the body frame
    anchor_a: Vector2,

    /// The anchor point on the second body, in the body frame
    anchor_b: Vector2,

    /// The target distance between the anchor points
    length: f32,

    /// The bodies involved in the constraint (cached for quick lookup)
    bodies: [BodyHandle; 2],
}

/// Kinematic quantities shared by every constraint query
struct Frame {
    r_a: Vector2,
    r_b: Vector2,
    length: f32,
    normal: Vector2,
    omega_a: f32,
    omega_b: f32,
    relative_velocity: Vector2,
}

impl DistanceConstraint {
    /// Creates a rigid link between the two bodies' centers of mass
    pub fn new(body_a: BodyHandle, body_b: BodyHandle, length: f32) -> Self {
        Self::new_anchored(body_a, body_b, Vector2::zero(), Vector2::zero(), length)
    }

    /// Creates a rigid link between two body-frame anchor points
    pub fn new_anchored(
        body_a: BodyHandle,
        body_b: BodyHandle,
        anchor_a: Vector2,
        anchor_b: Vector2,
        length: f32,
    ) -> Self {
        Self {
            body_a,
            body_b,
            anchor_a,
            anchor_b,
            length: length.max(0.0),
            bodies: [body_a, body_b],
        }
    }

    /// Returns the target distance
    pub fn get_length(&self) -> f32 {
        self.length
    }

    /// Sets the target distance
    pub fn set_length(&mut self, length: f32) {
        self.length = length.max(0.0);
    }

    fn frame(&self, bodies: &BodyStorage<RigidBody>) -> Option<Frame> {
        let a = bodies.get(self.body_a)?;
        let b = bodies.get(self.body_b)?;

        let r_a = self.anchor_a.rotated(a.get_angle());
        let r_b = self.anchor_b.rotated(b.get_angle());
        let delta = (b.get_position() + r_b) - (a.get_position() + r_a);
        let length = delta.length();
        if length < EPSILON {
            return None;
        }

        let omega_a = a.get_angular_velocity();
        let omega_b = b.get_angular_velocity();
        let relative_velocity = (b.get_linear_velocity() + r_b.perpendicular() * omega_b)
            - (a.get_linear_velocity() + r_a.perpendicular() * omega_a);

        Some(Frame {
            r_a,
            r_b,
            length,
            normal: delta / length,
            omega_a,
            omega_b,
            relative_velocity,
        })
    }
}

impl Constraint for DistanceConstraint {
    fn constraint_type(&self) -> &'static str {
        "Distance"
    }

    fn arity(&self) -> usize {
        2
    }

    fn bodies(&self) -> &[BodyHandle] {
        &self.bodies
    }

    fn value(&self, bodies: &BodyStorage<RigidBody>) -> f32 {
        match self.frame(bodies) {
            Some(frame) => frame.length - self.length,
            None => 0.0,
        }
    }

    fn derivative(&self, bodies: &BodyStorage<RigidBody>) -> f32 {
        match self.frame(bodies) {
            Some(frame) => frame.normal.dot(&frame.relative_velocity),
            None => 0.0,
        }
    }

    fn gradient(&self, bodies: &BodyStorage<RigidBody>, body: BodyHandle) -> [f32; POS_PER_BODY] {
        let frame = match self.frame(bodies) {
            Some(frame) => frame,
            None => return [0.0; POS_PER_BODY],
        };
        let n = frame.normal;

        if body == self.body_a {
            [-n.x, -n.y, -frame.r_a.cross(&n)]
        } else if body == self.body_b {
            [n.x, n.y, frame.r_b.cross(&n)]
        } else {
            [0.0; POS_PER_BODY]
        }
    }

    fn gradient_derivative(
        &self,
        bodies: &BodyStorage<RigidBody>,
        body: BodyHandle,
    ) -> [f32; POS_PER_BODY] {
        let frame = match self.frame(bodies) {
            Some(frame) => frame,
            None => return [0.0; POS_PER_BODY],
        };
        let n = frame.normal;

        // d/dt of the unit axis: the tangential part of the relative velocity
        let closing_speed = n.dot(&frame.relative_velocity);
        let n_dot = (frame.relative_velocity - n * closing_speed) / frame.length;

        if body == self.body_a {
            let angular = -(-frame.omega_a * frame.r_a.dot(&n) + frame.r_a.cross(&n_dot));
            [-n_dot.x, -n_dot.y, angular]
        } else if body == self.body_b {
            let angular = -frame.omega_b * frame.r_b.dot(&n) + frame.r_b.cross(&n_dot);
            [n_dot.x, n_dot.y, angular]
        } else {
            [0.0; POS_PER_BODY]
        }
    }
}
