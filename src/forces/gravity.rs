use crate::bodies::RigidBody;
use crate::forces::ForceSource;
use crate::math::Vector2;

/// A force source that applies uniform gravity
pub struct Gravity {
    /// The gravity acceleration vector
    gravity: Vector2,

    /// Whether the force source is enabled
    enabled: bool,
}

impl Gravity {
    /// Creates a new gravity source with the given acceleration
    pub fn new(gravity: Vector2) -> Self {
        Self {
            gravity,
            enabled: true,
        }
    }

    /// Creates a gravity source with Earth-like gravity (-9.81 in y direction)
    pub fn new_earth_gravity() -> Self {
        Self::new(Vector2::new(0.0, -9.81))
    }

    /// Returns whether the force source is enabled
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Sets whether the force source is enabled
    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    /// Gets the current gravity acceleration
    pub fn get_gravity(&self) -> Vector2 {
        self.gravity
    }

    /// Sets the gravity acceleration vector
    pub fn set_gravity(&mut self, gravity: Vector2) {
        self.gravity = gravity;
    }
}

impl ForceSource for Gravity {
    fn source_type(&self) -> &'static str {
        "Gravity"
    }

    fn force(&self, body: &RigidBody) -> (Vector2, f32) {
        if !self.enabled || !body.is_affected_by_gravity() {
            return (Vector2::zero(), 0.0);
        }

        // F = m * g
        (self.gravity * body.get_mass(), 0.0)
    }
}

/// A force source that applies gravity from a point (like a planet)
pub struct PointGravity {
    /// The position of the gravity source
    position: Vector2,

    /// The gravitational strength
    strength: f32,

    /// Minimum distance to avoid numerical instability
    min_distance: f32,

    /// Whether the force source is enabled
    enabled: bool,
}

impl PointGravity {
    /// Creates a new point gravity source
    pub fn new(position: Vector2, strength: f32) -> Self {
        Self {
            position,
            strength: strength.max(0.0),
            min_distance: 0.1,
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

    /// Gets the position of the gravity source
    pub fn get_position(&self) -> Vector2 {
        self.position
    }

    /// Sets the position of the gravity source
    pub fn set_position(&mut self, position: Vector2) {
        self.position = position;
    }

    /// Gets the gravitational strength
    pub fn get_strength(&self) -> f32 {
        self.strength
    }

    /// Sets the gravitational strength
    pub fn set_strength(&mut self, strength: f32) {
        self.strength = strength.max(0.0);
    }

    /// Sets the minimum distance for the gravity calculation
    pub fn set_min_distance(&mut self, min_distance: f32) {
        self.min_distance = min_distance.max(0.001);
    }
}

impl ForceSource for PointGravity {
    fn source_type(&self) -> &'static str {
        "PointGravity"
    }

    fn force(&self, body: &RigidBody) -> (Vector2, f32) {
        if !self.enabled || !body.is_affected_by_gravity() {
            return (Vector2::zero(), 0.0);
        }

        let direction = self.position - body.get_position();
        let distance_squared = direction.length_squared();
        if distance_squared < self.min_distance * self.min_distance {
            // Too close, skip to avoid instability
            return (Vector2::zero(), 0.0);
        }

        // F = G * m / r^2, directed toward the source
        let distance = distance_squared.sqrt();
        let magnitude = self.strength * body.get_mass() / distance_squared;
        (direction / distance * magnitude, 0.0)
    }
}
