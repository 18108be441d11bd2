use phys2d_engine::bodies::BodySpec;
use phys2d_engine::constraints::{Constraint, DistanceConstraint};
use phys2d_engine::core::{BodyHandle, BodyStorage, Engine, SimulationConfig, POS_PER_BODY};
use phys2d_engine::error::PhysicsError;
use phys2d_engine::forces::{AnchoredSpring, Drag, ForceScope, Gravity};
use phys2d_engine::integration::ButcherTableau;
use phys2d_engine::math::Vector2;
use phys2d_engine::RigidBody;

use approx::assert_relative_eq;

fn unit_square() -> Vec<Vector2> {
    vec![
        Vector2::new(-0.5, -0.5),
        Vector2::new(0.5, -0.5),
        Vector2::new(0.5, 0.5),
        Vector2::new(-0.5, 0.5),
    ]
}

fn config(dt: f32, stiffness: f32, dampening: f32) -> SimulationConfig {
    SimulationConfig {
        dt,
        stiffness,
        dampening,
        ..SimulationConfig::default()
    }
}

#[test]
fn test_free_fall_matches_closed_form() {
    let mut engine = Engine::with_config(ButcherTableau::rk4(), config(0.01, 0.0, 0.0));
    let body = engine.add_body(&BodySpec::new(1.0, unit_square())).unwrap();
    engine
        .add_force(Box::new(Gravity::new(Vector2::new(0.0, -100.0))), ForceScope::Global)
        .unwrap();

    for _ in 0..100 {
        engine.step().unwrap();
    }

    // p(t) = p0 + v0 t + g t^2 / 2 = (0, -50) after one second
    let position = engine.get_body(body).unwrap().get_position();
    assert_relative_eq!(position.x, 0.0, epsilon = 1e-6);
    assert_relative_eq!(position.y, -50.0, epsilon = 1e-4, max_relative = 1e-5);

    let velocity = engine.get_body(body).unwrap().get_linear_velocity();
    assert_relative_eq!(velocity.y, -100.0, epsilon = 1e-3, max_relative = 1e-5);
    assert_relative_eq!(engine.get_elapsed(), 1.0, epsilon = 1e-4);
}

#[test]
fn test_no_forces_conserve_momentum() {
    let mut engine = Engine::with_config(ButcherTableau::rk4(), config(0.01, 0.0, 0.0));
    let body = engine
        .add_body(
            &BodySpec::new(2.0, unit_square())
                .with_velocity(Vector2::new(3.0, -1.0))
                .with_angular_velocity(0.5),
        )
        .unwrap();

    for _ in 0..500 {
        engine.step().unwrap();
    }

    let b = engine.get_body(body).unwrap();
    assert_relative_eq!(b.get_linear_velocity().x, 3.0, epsilon = 1e-5);
    assert_relative_eq!(b.get_linear_velocity().y, -1.0, epsilon = 1e-5);
    assert_relative_eq!(b.get_angular_velocity(), 0.5, epsilon = 1e-5);
    assert_relative_eq!(b.get_position().x, 15.0, epsilon = 1e-2, max_relative = 1e-4);
}

#[test]
fn test_linked_pair_conserves_momentum() {
    let mut engine = Engine::with_config(ButcherTableau::rk4(), config(0.01, 5.0, 2.0));
    let a = engine
        .add_body(&BodySpec::new(1.0, unit_square()).with_velocity(Vector2::new(0.0, 1.0)))
        .unwrap();
    let b = engine
        .add_body(
            &BodySpec::new(1.0, unit_square())
                .with_position(Vector2::new(1.0, 0.0))
                .with_velocity(Vector2::new(0.0, -1.0)),
        )
        .unwrap();
    engine
        .add_constraint(Box::new(DistanceConstraint::new(a, b, 1.0)))
        .unwrap();

    for _ in 0..1000 {
        engine.step().unwrap();
    }

    let va = engine.get_body(a).unwrap().get_linear_velocity();
    let vb = engine.get_body(b).unwrap().get_linear_velocity();
    let momentum = va + vb;
    assert!(momentum.length() <= 1e-6, "momentum drifted to {}", momentum);
}

#[test]
fn test_static_bodies_stay_pinned() {
    let mut engine = Engine::new(ButcherTableau::rk4());
    let anchor = engine
        .add_body(
            &BodySpec::new(1.0, unit_square())
                .with_position(Vector2::new(2.0, 3.0))
                .as_static(),
        )
        .unwrap();
    engine
        .add_force(Box::new(Gravity::new_earth_gravity()), ForceScope::Global)
        .unwrap();

    for _ in 0..100 {
        engine.step().unwrap();
    }

    let body = engine.get_body(anchor).unwrap();
    assert_eq!(body.get_position(), Vector2::new(2.0, 3.0));
    assert!(body.get_linear_velocity().is_zero());
    assert_eq!(body.get_angular_velocity(), 0.0);
}

#[test]
fn test_degenerate_registration_is_rejected() {
    let mut engine = Engine::new(ButcherTableau::rk4());

    let zero_mass = engine.add_body(&BodySpec::new(0.0, unit_square()));
    assert!(matches!(zero_mass, Err(PhysicsError::DegenerateBody(_))));

    let two_vertices = engine.add_body(&BodySpec::new(
        1.0,
        vec![Vector2::zero(), Vector2::one()],
    ));
    assert!(matches!(two_vertices, Err(PhysicsError::DegenerateBody(_))));

    let bowtie = engine.add_body(&BodySpec::new(
        1.0,
        vec![
            Vector2::new(0.0, 0.0),
            Vector2::new(1.0, 1.0),
            Vector2::new(1.0, 0.0),
            Vector2::new(0.0, 1.0),
        ],
    ));
    assert!(matches!(bowtie, Err(PhysicsError::DegenerateBody(_))));

    assert_eq!(engine.body_count(), 0);
}

#[test]
fn test_stale_handles_are_rejected() {
    let mut engine = Engine::new(ButcherTableau::rk4());
    let a = engine.add_body(&BodySpec::new(1.0, unit_square())).unwrap();
    let b = engine
        .add_body(&BodySpec::new(1.0, unit_square()).with_position(Vector2::new(1.0, 0.0)))
        .unwrap();

    engine.remove_body(a).unwrap();
    assert!(matches!(
        engine.get_body(a),
        Err(PhysicsError::HandleInvalidated(_))
    ));

    // The surviving handle still resolves
    assert!(engine.get_body(b).is_ok());

    let link = engine.add_constraint(Box::new(DistanceConstraint::new(a, b, 1.0)));
    assert!(matches!(link, Err(PhysicsError::HandleInvalidated(_))));

    let force = engine.add_force(
        Box::new(Gravity::new_earth_gravity()),
        ForceScope::Body(a),
    );
    assert!(matches!(force, Err(PhysicsError::HandleInvalidated(_))));
}

#[test]
fn test_removing_a_body_drops_its_constraints() {
    let mut engine = Engine::new(ButcherTableau::rk4());
    let a = engine.add_body(&BodySpec::new(1.0, unit_square())).unwrap();
    let b = engine
        .add_body(&BodySpec::new(1.0, unit_square()).with_position(Vector2::new(1.0, 0.0)))
        .unwrap();
    engine
        .add_constraint(Box::new(DistanceConstraint::new(a, b, 1.0)))
        .unwrap();
    assert_eq!(engine.constraint_count(), 1);

    engine.remove_body(b).unwrap();
    assert_eq!(engine.constraint_count(), 0);

    // Stepping with the survivor still works
    engine.step().unwrap();
}

/// A deliberately inconsistent constraint used to exercise arity validation
struct BrokenArity {
    bodies: [BodyHandle; 1],
}

impl Constraint for BrokenArity {
    fn constraint_type(&self) -> &'static str {
        "BrokenArity"
    }

    fn arity(&self) -> usize {
        2
    }

    fn bodies(&self) -> &[BodyHandle] {
        &self.bodies
    }

    fn value(&self, _bodies: &BodyStorage<RigidBody>) -> f32 {
        0.0
    }

    fn derivative(&self, _bodies: &BodyStorage<RigidBody>) -> f32 {
        0.0
    }

    fn gradient(&self, _bodies: &BodyStorage<RigidBody>, _body: BodyHandle) -> [f32; POS_PER_BODY] {
        [0.0; POS_PER_BODY]
    }

    fn gradient_derivative(
        &self,
        _bodies: &BodyStorage<RigidBody>,
        _body: BodyHandle,
    ) -> [f32; POS_PER_BODY] {
        [0.0; POS_PER_BODY]
    }
}

#[test]
fn test_arity_mismatch_is_rejected() {
    let mut engine = Engine::new(ButcherTableau::rk4());
    let a = engine.add_body(&BodySpec::new(1.0, unit_square())).unwrap();

    let result = engine.add_constraint(Box::new(BrokenArity { bodies: [a] }));
    assert!(matches!(
        result,
        Err(PhysicsError::ArityMismatch {
            declared: 2,
            referenced: 1,
        })
    ));
    assert_eq!(engine.constraint_count(), 0);
}

#[test]
fn test_adaptive_stepping_tracks_free_fall() {
    let mut engine = Engine::with_config(ButcherTableau::rkf45(), config(0.01, 0.0, 0.0));
    let body = engine.add_body(&BodySpec::new(1.0, unit_square())).unwrap();
    engine
        .add_force(Box::new(Gravity::new(Vector2::new(0.0, -9.81))), ForceScope::Global)
        .unwrap();

    while engine.get_elapsed() < 1.0 {
        engine.step_adaptive().unwrap();
    }

    let t = engine.get_elapsed();
    let expected = -0.5 * 9.81 * t * t;
    let position = engine.get_body(body).unwrap().get_position();
    assert_relative_eq!(position.y, expected, epsilon = 1e-2, max_relative = 1e-3);
}

#[test]
fn test_drag_bleeds_off_velocity() {
    let mut engine = Engine::with_config(ButcherTableau::rk4(), config(0.01, 0.0, 0.0));
    let body = engine
        .add_body(
            &BodySpec::new(1.0, unit_square())
                .with_velocity(Vector2::new(10.0, 0.0))
                .with_angular_velocity(5.0),
        )
        .unwrap();
    engine
        .add_force(Box::new(Drag::new(0.5, 0.0, 0.5)), ForceScope::Body(body))
        .unwrap();

    for _ in 0..200 {
        engine.step().unwrap();
    }

    // Linear drag decays exponentially: v(t) = v0 e^(-k t / m)
    let b = engine.get_body(body).unwrap();
    assert_relative_eq!(
        b.get_linear_velocity().x,
        10.0 * (-0.5f32 * 2.0).exp(),
        max_relative = 1e-3
    );
    assert!(b.get_angular_velocity() < 5.0);
}

#[test]
fn test_anchored_spring_pulls_body_toward_anchor() {
    let mut engine = Engine::with_config(ButcherTableau::rk4(), config(0.005, 0.0, 0.0));
    let body = engine
        .add_body(&BodySpec::new(1.0, unit_square()).with_position(Vector2::new(2.0, 0.0)))
        .unwrap();
    engine
        .add_force(
            Box::new(AnchoredSpring::new(Vector2::zero(), Vector2::zero(), 0.0, 20.0, 4.0)),
            ForceScope::Body(body),
        )
        .unwrap();

    for _ in 0..2000 {
        engine.step().unwrap();
    }

    // Damped spring settles onto the anchor
    let position = engine.get_body(body).unwrap().get_position();
    assert!(position.length() < 0.1, "body settled at {}", position);
}

#[test]
fn test_charge_is_carried_opaquely() {
    let mut engine = Engine::new(ButcherTableau::rk4());
    let body = engine
        .add_body(&BodySpec::new(1.0, unit_square()).with_charge(-2.5))
        .unwrap();

    engine.step().unwrap();
    assert_eq!(engine.get_body(body).unwrap().get_charge(), -2.5);
}
