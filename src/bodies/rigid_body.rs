use crate::bodies::body_flags::BodyFlags;
use crate::error::PhysicsError;
use crate::math::{Polygon, Vector2};
use crate::Result;

/// Parameters for registering a rigid body with the engine
#[derive(Debug, Clone)]
pub struct BodySpec {
    /// The initial position of the center of mass
    pub position: Vector2,

    /// The initial linear velocity
    pub velocity: Vector2,

    /// The initial angular position in radians
    pub angle: f32,

    /// The initial angular velocity in radians per second
    pub angular_velocity: f32,

    /// The body's mass, which must be positive and finite
    pub mass: f32,

    /// An opaque scalar carried on the body, not consumed by the core
    pub charge: f32,

    /// The ordered polygon vertices, given relative to the position
    pub vertices: Vec<Vector2>,

    /// Whether the body responds to forces and constraints
    pub dynamic: bool,
}

impl BodySpec {
    /// Creates a spec for a dynamic body with the given mass and vertices
    pub fn new(mass: f32, vertices: Vec<Vector2>) -> Self {
        Self {
            position: Vector2::zero(),
            velocity: Vector2::zero(),
            angle: 0.0,
            angular_velocity: 0.0,
            mass,
            charge: 0.0,
            vertices,
            dynamic: true,
        }
    }

    /// Sets the initial position
    pub fn with_position(mut self, position: Vector2) -> Self {
        self.position = position;
        self
    }

    /// Sets the initial linear velocity
    pub fn with_velocity(mut self, velocity: Vector2) -> Self {
        self.velocity = velocity;
        self
    }

    /// Sets the initial angular position in radians
    pub fn with_angle(mut self, angle: f32) -> Self {
        self.angle = angle;
        self
    }

    /// Sets the initial angular velocity
    pub fn with_angular_velocity(mut self, angular_velocity: f32) -> Self {
        self.angular_velocity = angular_velocity;
        self
    }

    /// Sets the body's charge
    pub fn with_charge(mut self, charge: f32) -> Self {
        self.charge = charge;
        self
    }

    /// Marks the body as static
    pub fn as_static(mut self) -> Self {
        self.dynamic = false;
        self
    }
}

/// A planar rigid body
///
/// The pose is the position of the center of mass plus an angle; mutators
/// beyond registration are reserved for the engine, which writes flat state
/// segments back after each step.
pub struct RigidBody {
    /// The position of the center of mass in world space
    position: Vector2,

    /// The angular position in radians
    angle: f32,

    /// The body's linear velocity
    linear_velocity: Vector2,

    /// The body's angular velocity
    angular_velocity: f32,

    /// The body's mass
    mass: f32,

    /// Inverse of the body's mass (zero for static bodies)
    inv_mass: f32,

    /// The body's moment of inertia about the center of mass
    inertia: f32,

    /// Inverse of the body's moment of inertia (zero for static bodies)
    inv_inertia: f32,

    /// An opaque scalar carried for the caller
    charge: f32,

    /// The body's polygon shape
    polygon: Polygon,

    /// The body's flags
    flags: BodyFlags,

    /// Force accumulated during the current substep
    force: Vector2,

    /// Torque accumulated during the current substep
    torque: f32,
}

impl RigidBody {
    /// Builds a rigid body from a spec, validating mass and shape
    pub fn from_spec(spec: &BodySpec) -> Result<Self> {
        if !spec.mass.is_finite() || spec.mass <= 0.0 {
            return Err(PhysicsError::DegenerateBody(format!(
                "mass must be positive and finite, got {}",
                spec.mass
            )));
        }

        let mut polygon = Polygon::new(spec.vertices.clone()).ok_or_else(|| {
            PhysicsError::DegenerateBody(
                "polygon must be simple with at least three non-collinear vertices".into(),
            )
        })?;

        let inertia = spec.mass * polygon.unit_inertia();
        let (inv_mass, inv_inertia, flags) = if spec.dynamic {
            (1.0 / spec.mass, 1.0 / inertia, BodyFlags::default())
        } else {
            (0.0, 0.0, BodyFlags::AFFECTED_BY_GRAVITY)
        };

        // Static bodies never move; their velocities are pinned to zero.
        let (velocity, angular_velocity) = if spec.dynamic {
            (spec.velocity, spec.angular_velocity)
        } else {
            (Vector2::zero(), 0.0)
        };

        polygon.transform(spec.position, spec.angle);
        Ok(Self {
            position: spec.position,
            angle: spec.angle,
            linear_velocity: velocity,
            angular_velocity,
            mass: spec.mass,
            inv_mass,
            inertia,
            inv_inertia,
            charge: spec.charge,
            polygon,
            flags,
            force: Vector2::zero(),
            torque: 0.0,
        })
    }

    /// Returns the body's position
    #[inline]
    pub fn get_position(&self) -> Vector2 {
        self.position
    }

    /// Returns the body's angular position in radians
    #[inline]
    pub fn get_angle(&self) -> f32 {
        self.angle
    }

    /// Returns the body's linear velocity
    #[inline]
    pub fn get_linear_velocity(&self) -> Vector2 {
        self.linear_velocity
    }

    /// Returns the body's angular velocity
    #[inline]
    pub fn get_angular_velocity(&self) -> f32 {
        self.angular_velocity
    }

    /// Returns the body's mass
    #[inline]
    pub fn get_mass(&self) -> f32 {
        self.mass
    }

    /// Returns the body's inverse mass (zero for static bodies)
    #[inline]
    pub fn get_inverse_mass(&self) -> f32 {
        self.inv_mass
    }

    /// Returns the body's moment of inertia
    #[inline]
    pub fn get_inertia(&self) -> f32 {
        self.inertia
    }

    /// Returns the body's inverse moment of inertia (zero for static bodies)
    #[inline]
    pub fn get_inverse_inertia(&self) -> f32 {
        self.inv_inertia
    }

    /// Returns the body's charge
    #[inline]
    pub fn get_charge(&self) -> f32 {
        self.charge
    }

    /// Returns the body's polygon shape
    #[inline]
    pub fn get_polygon(&self) -> &Polygon {
        &self.polygon
    }

    /// Returns the body's flags
    #[inline]
    pub fn get_flags(&self) -> BodyFlags {
        self.flags
    }

    /// Returns true if the body responds to forces and constraints
    #[inline]
    pub fn is_dynamic(&self) -> bool {
        self.flags.contains(BodyFlags::DYNAMIC)
    }

    /// Returns true if the built-in gravity sources act on the body
    #[inline]
    pub fn is_affected_by_gravity(&self) -> bool {
        self.flags.contains(BodyFlags::AFFECTED_BY_GRAVITY)
    }

    /// Sets whether the built-in gravity sources act on the body
    pub fn set_affected_by_gravity(&mut self, affected: bool) {
        self.flags.set(BodyFlags::AFFECTED_BY_GRAVITY, affected);
    }

    /// Writes a six-float state segment `[x, y, angle, vx, vy, omega]` back into
    /// the body and recomputes the world polygon
    pub fn write_state(&mut self, segment: &[f32]) {
        debug_assert_eq!(segment.len(), crate::core::VAR_PER_BODY);

        self.position = Vector2::new(segment[0], segment[1]);
        self.angle = segment[2];
        if self.is_dynamic() {
            self.linear_velocity = Vector2::new(segment[3], segment[4]);
            self.angular_velocity = segment[5];
        }
        self.polygon.transform(self.position, self.angle);
    }

    /// Accumulates a force through the center of mass
    #[inline]
    pub fn add_force(&mut self, force: Vector2) {
        self.force += force;
    }

    /// Accumulates a torque
    #[inline]
    pub fn add_torque(&mut self, torque: f32) {
        self.torque += torque;
    }

    /// Accumulates a force applied at a world-space point
    pub fn add_force_at_point(&mut self, force: Vector2, point: Vector2) {
        let r = point - self.position;
        self.force += force;
        self.torque += r.cross(&force);
    }

    /// Returns the force accumulated during the current substep
    #[inline]
    pub fn accumulated_force(&self) -> Vector2 {
        self.force
    }

    /// Returns the torque accumulated during the current substep
    #[inline]
    pub fn accumulated_torque(&self) -> f32 {
        self.torque
    }

    /// Clears the force and torque accumulators
    #[inline]
    pub fn reset_accumulator(&mut self) {
        self.force = Vector2::zero();
        self.torque = 0.0;
    }

    /// Returns the unconstrained acceleration `(F/m, tau/I)`
    ///
    /// Static bodies report zero through their zeroed inverse mass.
    #[inline]
    pub fn acceleration(&self) -> (Vector2, f32) {
        (self.force * self.inv_mass, self.torque * self.inv_inertia)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn square() -> Vec<Vector2> {
        vec![
            Vector2::new(-0.5, -0.5),
            Vector2::new(0.5, -0.5),
            Vector2::new(0.5, 0.5),
            Vector2::new(-0.5, 0.5),
        ]
    }

    #[test]
    fn test_from_spec_rejects_bad_mass() {
        assert!(RigidBody::from_spec(&BodySpec::new(0.0, square())).is_err());
        assert!(RigidBody::from_spec(&BodySpec::new(-1.0, square())).is_err());
        assert!(RigidBody::from_spec(&BodySpec::new(f32::NAN, square())).is_err());
    }

    #[test]
    fn test_static_body_has_zero_inverse_mass() {
        let body = RigidBody::from_spec(
            &BodySpec::new(3.0, square())
                .with_velocity(Vector2::new(1.0, 2.0))
                .as_static(),
        )
        .unwrap();

        assert_eq!(body.get_inverse_mass(), 0.0);
        assert_eq!(body.get_inverse_inertia(), 0.0);
        assert!(body.get_linear_velocity().is_zero());
        assert!(!body.is_dynamic());
    }

    #[test]
    fn test_force_at_point_produces_torque() {
        let mut body = RigidBody::from_spec(&BodySpec::new(1.0, square())).unwrap();
        body.add_force_at_point(Vector2::new(0.0, 1.0), Vector2::new(1.0, 0.0));

        assert_relative_eq!(body.accumulated_force().y, 1.0);
        assert_relative_eq!(body.accumulated_torque(), 1.0);

        let (linear, angular) = body.acceleration();
        assert_relative_eq!(linear.y, 1.0);
        assert!(angular > 0.0);

        body.reset_accumulator();
        assert!(body.accumulated_force().is_zero());
        assert_eq!(body.accumulated_torque(), 0.0);
    }

    #[test]
    fn test_write_state_updates_world_polygon() {
        let mut body = RigidBody::from_spec(&BodySpec::new(1.0, square())).unwrap();
        body.write_state(&[4.0, -2.0, 0.0, 1.0, 0.0, 0.5]);

        assert_relative_eq!(body.get_position().x, 4.0);
        assert_relative_eq!(body.get_angular_velocity(), 0.5);

        let bb = body.get_polygon().bounding_box();
        assert_relative_eq!(bb.center().x, 4.0, epsilon = 1e-5);
        assert_relative_eq!(bb.center().y, -2.0, epsilon = 1e-5);
    }
}
