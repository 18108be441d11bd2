use crate::bodies::RigidBody;
use crate::forces::ForceSource;
use crate::math::Vector2;

/// A force source that simulates drag (air resistance)
pub struct Drag {
    /// Linear drag coefficient (k1 * v)
    linear_coefficient: f32,

    /// Quadratic drag coefficient (k2 * v^2)
    quadratic_coefficient: f32,

    /// Angular drag coefficient applied against the angular velocity
    angular_coefficient: f32,

    /// Whether the force source is enabled
    enabled: bool,
}

impl Drag {
    /// Creates a new drag source with the given coefficients
    pub fn new(linear_coefficient: f32, quadratic_coefficient: f32, angular_coefficient: f32) -> Self {
        Self {
            linear_coefficient: linear_coefficient.max(0.0),
            quadratic_coefficient: quadratic_coefficient.max(0.0),
            angular_coefficient: angular_coefficient.max(0.0),
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

    /// Gets the linear drag coefficient
    pub fn get_linear_coefficient(&self) -> f32 {
        self.linear_coefficient
    }

    /// Sets the linear drag coefficient
    pub fn set_linear_coefficient(&mut self, coefficient: f32) {
        self.linear_coefficient = coefficient.max(0.0);
    }

    /// Gets the quadratic drag coefficient
    pub fn get_quadratic_coefficient(&self) -> f32 {
        self.quadratic_coefficient
    }

    /// Sets the quadratic drag coefficient
    pub fn set_quadratic_coefficient(&mut self, coefficient: f32) {
        self.quadratic_coefficient = coefficient.max(0.0);
    }

    /// Gets the angular drag coefficient
    pub fn get_angular_coefficient(&self) -> f32 {
        self.angular_coefficient
    }

    /// Sets the angular drag coefficient
    pub fn set_angular_coefficient(&mut self, coefficient: f32) {
        self.angular_coefficient = coefficient.max(0.0);
    }
}

impl ForceSource for Drag {
    fn source_type(&self) -> &'static str {
        "Drag"
    }

    fn force(&self, body: &RigidBody) -> (Vector2, f32) {
        if !self.enabled {
            return (Vector2::zero(), 0.0);
        }

        let velocity = body.get_linear_velocity();
        let speed = velocity.length();
        let force = -velocity * (self.linear_coefficient + self.quadratic_coefficient * speed);
        let torque = -self.angular_coefficient * body.get_angular_velocity();
        (force, torque)
    }
}
