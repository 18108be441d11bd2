use crate::bodies::RigidBody;
use crate::forces::ForceSource;
use crate::math::{Vector2, EPSILON};

/// A force source that simulates a spring between a body point and a fixed
/// world point
pub struct AnchoredSpring {
    /// The attachment point on the body, in the body frame
    local_anchor: Vector2,

    /// The fixed attachment point in world space
    world_anchor: Vector2,

    /// The spring rest length
    rest_length: f32,

    /// The spring stiffness coefficient
    stiffness: f32,

    /// The spring damping coefficient
    damping: f32,

    /// Whether the force source is enabled
    enabled: bool,
}

impl AnchoredSpring {
    /// Creates a new spring from a body-frame anchor to a world point
    pub fn new(
        local_anchor: Vector2,
        world_anchor: Vector2,
        rest_length: f32,
        stiffness: f32,
        damping: f32,
    ) -> Self {
        Self {
            local_anchor,
            world_anchor,
            rest_length: rest_length.max(0.0),
            stiffness: stiffness.max(0.0),
            damping: damping.max(0.0),
            enabled: true,
        }
    }

    /// Returns whether the force source is enabled
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Sets whether the force source is enabled
    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    /// Gets the world-space anchor point
    pub fn get_world_anchor(&self) -> Vector2 {
        self.world_anchor
    }

    /// Sets the world-space anchor point
    pub fn set_world_anchor(&mut self, world_anchor: Vector2) {
        self.world_anchor = world_anchor;
    }

    /// Gets the spring rest length
    pub fn get_rest_length(&self) -> f32 {
        self.rest_length
    }

    /// Sets the spring rest length
    pub fn set_rest_length(&mut self, rest_length: f32) {
        self.rest_length = rest_length.max(0.0);
    }

    /// Gets the spring stiffness coefficient
    pub fn get_stiffness(&self) -> f32 {
        self.stiffness
    }

    /// Sets the spring stiffness coefficient
    pub fn set_stiffness(&mut self, stiffness: f32) {
        self.stiffness = stiffness.max(0.0);
    }

    /// Gets the spring damping coefficient
    pub fn get_damping(&self) -> f32 {
        self.damping
    }

    /// Sets the spring damping coefficient
    pub fn set_damping(&mut self, damping: f32) {
        self.damping = damping.max(0.0);
    }
}

impl ForceSource for AnchoredSpring {
    fn source_type(&self) -> &'static str {
        "AnchoredSpring"
    }

    fn force(&self, body: &RigidBody) -> (Vector2, f32) {
        if !self.enabled {
            return (Vector2::zero(), 0.0);
        }

        let r = self.local_anchor.rotated(body.get_angle());
        let attach = body.get_position() + r;

        let delta = self.world_anchor - attach;
        let length = delta.length();
        if length < EPSILON {
            return (Vector2::zero(), 0.0);
        }
        let axis = delta / length;

        // Velocity of the attachment point: v + omega x r
        let point_velocity =
            body.get_linear_velocity() + r.perpendicular() * body.get_angular_velocity();

        let magnitude =
            self.stiffness * (length - self.rest_length) - self.damping * point_velocity.dot(&axis);
        let force = axis * magnitude;
        (force, r.cross(&force))
    }
}
