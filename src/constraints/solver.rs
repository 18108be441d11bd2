use crate::bodies::RigidBody;
use crate::constraints::Constraint;
use crate::core::{BodyStorage, ConstraintStorage, Storage, POS_PER_BODY, VAR_PER_BODY};
use crate::error::PhysicsError;
use crate::math::EPSILON;
use crate::Result;

/// Projects unconstrained accelerations onto the constraint manifold
///
/// Given the probe-state bodies and the unconstrained state derivative, the
/// solver assembles the constraint Jacobian J and its time derivative, forms
/// the system `J W J^T lambda = b` with Baumgarte feedback terms, solves it by
/// dense LU, and adds `J^T lambda` into the dynamic bodies' acceleration
/// slots. The stabilised target is `C'' + dampening C' + stiffness C = 0`.
///
/// All scratch buffers are kept across steps and resized lazily, so
/// steady-state stepping allocates nothing.
pub struct ConstraintSolver {
    /// Baumgarte position feedback gain
    stiffness: f32,

    /// Baumgarte velocity feedback gain
    dampening: f32,

    jacobian: Vec<f32>,
    jacobian_dot: Vec<f32>,
    lhs: Vec<f32>,
    rhs: Vec<f32>,
    lower: Vec<f32>,
    upper: Vec<f32>,
    multipliers: Vec<f32>,
}

impl ConstraintSolver {
    /// Creates a new solver with the given Baumgarte gains
    pub fn new(stiffness: f32, dampening: f32) -> Self {
        Self {
            stiffness,
            dampening,
            jacobian: Vec::new(),
            jacobian_dot: Vec::new(),
            lhs: Vec::new(),
            rhs: Vec::new(),
            lower: Vec::new(),
            upper: Vec::new(),
            multipliers: Vec::new(),
        }
    }

    /// Returns the Baumgarte stiffness
    pub fn get_stiffness(&self) -> f32 {
        self.stiffness
    }

    /// Sets the Baumgarte stiffness
    pub fn set_stiffness(&mut self, stiffness: f32) {
        self.stiffness = stiffness;
    }

    /// Returns the Baumgarte dampening
    pub fn get_dampening(&self) -> f32 {
        self.dampening
    }

    /// Sets the Baumgarte dampening
    pub fn set_dampening(&mut self, dampening: f32) {
        self.dampening = dampening;
    }

    /// Solves for the Lagrange multipliers and adds the constraint
    /// accelerations into `stchanges` in place
    pub fn solve_and_apply(
        &mut self,
        constraints: &ConstraintStorage<Box<dyn Constraint>>,
        bodies: &BodyStorage<RigidBody>,
        stchanges: &mut [f32],
        inv_masses: &[f32],
    ) -> Result<()> {
        let rows = constraints.len();
        if rows == 0 {
            return Ok(());
        }

        if stchanges.iter().any(|v| !v.is_finite()) {
            return Err(PhysicsError::NumericBlowup(
                "non-finite state derivative entering the constraint solver".into(),
            ));
        }

        let cols = POS_PER_BODY * bodies.len();
        self.assemble_jacobians(constraints, bodies, cols)?;
        self.assemble_lhs(rows, cols, inv_masses);
        self.assemble_rhs(constraints, bodies, stchanges, inv_masses, rows, cols);

        lu_decompose(&self.lhs, rows, &mut self.lower, &mut self.upper)?;
        lu_substitute(&self.lower, &self.upper, &self.rhs, rows, &mut self.multipliers);

        if self.multipliers.iter().any(|v| !v.is_finite()) {
            return Err(PhysicsError::NumericBlowup(
                "non-finite Lagrange multipliers".into(),
            ));
        }

        self.apply_multipliers(bodies, stchanges, rows);
        Ok(())
    }

    /// Fills J and its time derivative, row per constraint, a 3-wide column
    /// block per body
    fn assemble_jacobians(
        &mut self,
        constraints: &ConstraintStorage<Box<dyn Constraint>>,
        bodies: &BodyStorage<RigidBody>,
        cols: usize,
    ) -> Result<()> {
        let rows = constraints.len();
        self.jacobian.clear();
        self.jacobian.resize(rows * cols, 0.0);
        self.jacobian_dot.clear();
        self.jacobian_dot.resize(rows * cols, 0.0);

        for (i, constraint) in constraints.as_slice().iter().enumerate() {
            for &handle in constraint.bodies() {
                let k = bodies.index_of(handle).ok_or_else(|| {
                    PhysicsError::HandleInvalidated(format!(
                        "constraint {} references a stale body handle",
                        constraint.constraint_type()
                    ))
                })?;

                let grad = constraint.gradient(bodies, handle);
                let grad_dot = constraint.gradient_derivative(bodies, handle);
                for d in 0..POS_PER_BODY {
                    self.jacobian[i * cols + k * POS_PER_BODY + d] = grad[d];
                    self.jacobian_dot[i * cols + k * POS_PER_BODY + d] = grad_dot[d];
                }
            }
        }
        Ok(())
    }

    /// A = J diag(W) J^T, symmetric positive semi-definite
    fn assemble_lhs(&mut self, rows: usize, cols: usize, inv_masses: &[f32]) {
        self.lhs.clear();
        self.lhs.resize(rows * rows, 0.0);
        for i in 0..rows {
            for j in 0..rows {
                let mut sum = 0.0;
                for k in 0..cols {
                    sum += self.jacobian[i * cols + k] * self.jacobian[j * cols + k] * inv_masses[k];
                }
                self.lhs[i * rows + j] = sum;
            }
        }
    }

    /// b_i = -sum((J_dot q_dot + J a_unc) W) - stiffness C_i - dampening C'_i
    fn assemble_rhs(
        &mut self,
        constraints: &ConstraintStorage<Box<dyn Constraint>>,
        bodies: &BodyStorage<RigidBody>,
        stchanges: &[f32],
        inv_masses: &[f32],
        rows: usize,
        cols: usize,
    ) {
        self.rhs.clear();
        self.rhs.resize(rows, 0.0);

        for (i, constraint) in constraints.as_slice().iter().enumerate() {
            let mut sum = 0.0;
            for body in 0..bodies.len() {
                for d in 0..POS_PER_BODY {
                    let col = body * POS_PER_BODY + d;
                    let var = body * VAR_PER_BODY + d;
                    let id = i * cols + col;
                    sum += (self.jacobian_dot[id] * stchanges[var]
                        + self.jacobian[id] * stchanges[var + POS_PER_BODY])
                        * inv_masses[col];
                }
            }
            self.rhs[i] = -sum
                - self.stiffness * constraint.value(bodies)
                - self.dampening * constraint.derivative(bodies);
        }
    }

    /// Adds J^T lambda into the acceleration half of `stchanges`, skipping
    /// static bodies
    fn apply_multipliers(
        &self,
        bodies: &BodyStorage<RigidBody>,
        stchanges: &mut [f32],
        rows: usize,
    ) {
        let cols = POS_PER_BODY * bodies.len();
        for (k, body) in bodies.as_slice().iter().enumerate() {
            if !body.is_dynamic() {
                continue;
            }
            for d in 0..POS_PER_BODY {
                let mut sum = 0.0;
                for i in 0..rows {
                    sum += self.jacobian[i * cols + k * POS_PER_BODY + d] * self.multipliers[i];
                }
                stchanges[k * VAR_PER_BODY + POS_PER_BODY + d] += sum;
            }
        }
    }
}

/// Doolittle LU decomposition without pivoting: A = L U with unit diagonal L
///
/// Fails when a pivot falls below epsilon, which signals redundant or
/// inconsistent constraints. Ill-conditioned systems fail loudly here rather
/// than mis-solving silently.
fn lu_decompose(a: &[f32], size: usize, lower: &mut Vec<f32>, upper: &mut Vec<f32>) -> Result<()> {
    lower.clear();
    lower.resize(size * size, 0.0);
    upper.clear();
    upper.resize(size * size, 0.0);

    for i in 0..size {
        for j in i..size {
            let mut sum = 0.0;
            for k in 0..i {
                sum += lower[i * size + k] * upper[k * size + j];
            }
            upper[i * size + j] = a[i * size + j] - sum;
        }

        let pivot = upper[i * size + i];
        if !pivot.is_finite() || pivot.abs() < EPSILON {
            return Err(PhysicsError::SingularConstraintSystem(format!(
                "pivot {} at row {} below tolerance",
                pivot, i
            )));
        }

        lower[i * size + i] = 1.0;
        for j in (i + 1)..size {
            let mut sum = 0.0;
            for k in 0..i {
                sum += lower[j * size + k] * upper[k * size + i];
            }
            lower[j * size + i] = (a[j * size + i] - sum) / pivot;
        }
    }
    Ok(())
}

/// Solves L U x = b by forward then backward substitution
fn lu_substitute(lower: &[f32], upper: &[f32], b: &[f32], size: usize, x: &mut Vec<f32>) {
    x.clear();
    x.resize(size, 0.0);

    for i in 0..size {
        let mut value = b[i];
        for j in 0..i {
            value -= lower[i * size + j] * x[j];
        }
        x[i] = value;
    }

    for i in (0..size).rev() {
        let mut value = x[i];
        for j in (i + 1)..size {
            value -= upper[i * size + j] * x[j];
        }
        x[i] = value / upper[i * size + i];
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bodies::BodySpec;
    use crate::constraints::{AnchorConstraint, DistanceConstraint};
    use crate::core::state::load_inverse_masses;
    use crate::math::Vector2;
    use approx::assert_relative_eq;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    fn solve(a: &[f32], b: &[f32], size: usize) -> Result<Vec<f32>> {
        let mut lower = Vec::new();
        let mut upper = Vec::new();
        let mut x = Vec::new();
        lu_decompose(a, size, &mut lower, &mut upper)?;
        lu_substitute(&lower, &upper, b, size, &mut x);
        Ok(x)
    }

    #[test]
    fn test_lu_solves_small_system() {
        // 2x + y = 5, x + 3y = 10
        let a = vec![2.0, 1.0, 1.0, 3.0];
        let b = vec![5.0, 10.0];
        let x = solve(&a, &b, 2).unwrap();
        assert_relative_eq!(x[0], 1.0, epsilon = 1e-5);
        assert_relative_eq!(x[1], 3.0, epsilon = 1e-5);
    }

    #[test]
    fn test_lu_rejects_singular_matrix() {
        // Second row is a copy of the first
        let a = vec![1.0, 2.0, 1.0, 2.0];
        let b = vec![1.0, 1.0];
        assert!(matches!(
            solve(&a, &b, 2),
            Err(PhysicsError::SingularConstraintSystem(_))
        ));
    }

    #[test]
    fn test_assembled_lhs_is_symmetric_and_statics_stay_at_rest() {
        let mut bodies: BodyStorage<RigidBody> = BodyStorage::new();
        let square = vec![
            Vector2::new(-0.5, -0.5),
            Vector2::new(0.5, -0.5),
            Vector2::new(0.5, 0.5),
            Vector2::new(-0.5, 0.5),
        ];
        let a = bodies.add(
            RigidBody::from_spec(
                &BodySpec::new(1.0, square.clone())
                    .with_velocity(Vector2::new(0.3, -0.2))
                    .with_angular_velocity(0.4),
            )
            .unwrap(),
        );
        let b = bodies.add(
            RigidBody::from_spec(
                &BodySpec::new(2.0, square)
                    .with_position(Vector2::new(1.0, 0.5))
                    .as_static(),
            )
            .unwrap(),
        );

        let mut constraints: ConstraintStorage<Box<dyn Constraint>> = ConstraintStorage::new();
        constraints.add(Box::new(DistanceConstraint::new(a, b, 1.0)));
        constraints.add(Box::new(AnchorConstraint::new(
            a,
            Vector2::new(0.5, 0.0),
            Vector2::new(2.0, 1.0),
        )));

        let mut inv_masses = Vec::new();
        load_inverse_masses(bodies.as_slice(), &mut inv_masses);

        let mut stchanges = vec![
            0.3, -0.2, 0.4, 0.0, -9.81, 0.0, // dynamic body
            0.0, 0.0, 0.0, 0.0, 0.0, 0.0, // static body
        ];
        let before_static = stchanges[VAR_PER_BODY..].to_vec();
        let before_dynamic = stchanges[POS_PER_BODY..VAR_PER_BODY].to_vec();

        let mut solver = ConstraintSolver::new(5.0, 2.0);
        solver
            .solve_and_apply(&constraints, &bodies, &mut stchanges, &inv_masses)
            .unwrap();

        let rows = constraints.len();
        for i in 0..rows {
            for j in 0..rows {
                assert_relative_eq!(
                    solver.lhs[i * rows + j],
                    solver.lhs[j * rows + i],
                    epsilon = 1e-6
                );
            }
        }

        // The static body's slots are untouched by the projection
        assert_eq!(&stchanges[VAR_PER_BODY..], before_static.as_slice());
        // The dynamic body picked up constraint accelerations
        assert_ne!(
            &stchanges[POS_PER_BODY..VAR_PER_BODY],
            before_dynamic.as_slice()
        );
    }

    #[test]
    fn test_non_finite_input_reports_blowup() {
        let mut bodies: BodyStorage<RigidBody> = BodyStorage::new();
        let square = vec![
            Vector2::new(-0.5, -0.5),
            Vector2::new(0.5, -0.5),
            Vector2::new(0.5, 0.5),
            Vector2::new(-0.5, 0.5),
        ];
        let a = bodies.add(RigidBody::from_spec(&BodySpec::new(1.0, square.clone())).unwrap());
        let b = bodies.add(
            RigidBody::from_spec(&BodySpec::new(1.0, square).with_position(Vector2::new(1.0, 0.0)))
                .unwrap(),
        );

        let mut constraints: ConstraintStorage<Box<dyn Constraint>> = ConstraintStorage::new();
        constraints.add(Box::new(DistanceConstraint::new(a, b, 1.0)));

        let mut inv_masses = Vec::new();
        load_inverse_masses(bodies.as_slice(), &mut inv_masses);

        let mut stchanges = vec![0.0; 2 * VAR_PER_BODY];
        stchanges[4] = f32::NAN;

        let mut solver = ConstraintSolver::new(0.0, 0.0);
        let result = solver.solve_and_apply(&constraints, &bodies, &mut stchanges, &inv_masses);
        assert!(matches!(result, Err(PhysicsError::NumericBlowup(_))));
    }

    #[test]
    fn test_lu_round_trip_on_random_spd_systems() {
        let mut rng = StdRng::seed_from_u64(0x5eed);
        for size in [1usize, 3, 6, 12] {
            // A = B B^T + 0.1 I is symmetric positive definite
            let basis: Vec<f32> = (0..size * size).map(|_| rng.gen_range(-1.0..1.0)).collect();
            let mut a = vec![0.0; size * size];
            for i in 0..size {
                for j in 0..size {
                    let mut sum = if i == j { 0.1 } else { 0.0 };
                    for k in 0..size {
                        sum += basis[i * size + k] * basis[j * size + k];
                    }
                    a[i * size + j] = sum;
                }
            }
            let b: Vec<f32> = (0..size).map(|_| rng.gen_range(-1.0..1.0)).collect();

            let x = solve(&a, &b, size).unwrap();

            let mut residual: f32 = 0.0;
            let mut scale: f32 = 0.0;
            for i in 0..size {
                let mut ax = 0.0;
                for j in 0..size {
                    ax += a[i * size + j] * x[j];
                }
                residual = residual.max((ax - b[i]).abs());
                scale = scale.max(b[i].abs());
            }
            assert!(
                residual <= 1e-3 * scale.max(1.0),
                "residual {} too large for size {}",
                residual,
                size
            );
        }
    }
}
