use crate::bodies::{BodySpec, RigidBody};
use crate::constraints::{Constraint, ConstraintSolver};
use crate::core::state::{load_inverse_masses, load_state, retrieve as retrieve_state};
use crate::core::storage::{BodyStorage, ConstraintStorage, Storage};
use crate::core::{BodyHandle, ConstraintHandle, SimulationConfig, VAR_PER_BODY};
use crate::error::PhysicsError;
use crate::forces::{ForceRegistry, ForceScope, ForceSource};
use crate::integration::{ButcherTableau, RungeKutta};
use crate::Result;

/// The engine that owns all bodies, force sources and constraints and drives
/// the simulation forward
///
/// A step writes the bodies into a flat state vector, hands it to the
/// Runge-Kutta driver, and writes the result back. At every stage the ODE
/// callback rebuilds the per-body force accumulators and lets the constraint
/// solver project the accelerations onto the constraint manifold. A step is
/// atomic: when any stage fails, bodies are restored to their pre-step state
/// and the error is surfaced to the caller.
pub struct Engine {
    /// All rigid bodies, densely packed in registration order
    bodies: BodyStorage<RigidBody>,

    /// All constraints; registration order defines the Jacobian row order
    constraints: ConstraintStorage<Box<dyn Constraint>>,

    /// All force sources with their scopes
    forces: ForceRegistry,

    /// The constraint solver
    solver: ConstraintSolver,

    /// The Runge-Kutta driver
    integrator: RungeKutta,

    /// Configuration for the simulation
    config: SimulationConfig,

    /// The flat state vector, committed only on successful steps
    state: Vec<f32>,

    /// Pre-step state kept for adaptive retries and rollback
    prev_state: Vec<f32>,

    /// Inverse-mass vector, rebuilt on body registration changes
    inv_masses: Vec<f32>,

    /// The total elapsed simulation time
    elapsed: f32,

    /// The step size currently used by adaptive stepping
    adaptive_dt: f32,
}

impl Engine {
    /// Creates a new engine with default settings and the given integrator
    /// tableau
    pub fn new(tableau: ButcherTableau) -> Self {
        Self::with_config(tableau, SimulationConfig::default())
    }

    /// Creates a new engine with the given configuration
    pub fn with_config(tableau: ButcherTableau, config: SimulationConfig) -> Self {
        Self::with_capacity(tableau, config, 0)
    }

    /// Creates a new engine with room reserved for `capacity` bodies
    pub fn with_capacity(tableau: ButcherTableau, config: SimulationConfig, capacity: usize) -> Self {
        let adaptive_dt = config.dt;
        Self {
            bodies: BodyStorage::with_capacity(capacity),
            constraints: ConstraintStorage::new(),
            forces: ForceRegistry::new(),
            solver: ConstraintSolver::new(config.stiffness, config.dampening),
            integrator: RungeKutta::new(tableau),
            config,
            state: Vec::with_capacity(capacity * VAR_PER_BODY),
            prev_state: Vec::with_capacity(capacity * VAR_PER_BODY),
            inv_masses: Vec::new(),
            elapsed: 0.0,
            adaptive_dt,
        }
    }

    /// Registers a body and returns its handle
    ///
    /// Fails with `DegenerateBody` when the mass is invalid or the polygon is
    /// degenerate; the engine is left unmodified on failure.
    pub fn add_body(&mut self, spec: &BodySpec) -> Result<BodyHandle> {
        let body = RigidBody::from_spec(spec)?;
        let handle = self.bodies.add(body);
        load_inverse_masses(self.bodies.as_slice(), &mut self.inv_masses);
        Ok(handle)
    }

    /// Removes a body, along with every constraint and scoped force source
    /// that references it
    pub fn remove_body(&mut self, handle: BodyHandle) -> Result<RigidBody> {
        if !self.bodies.contains(handle) {
            return Err(PhysicsError::HandleInvalidated(format!(
                "body handle {:?} is stale",
                handle
            )));
        }

        self.constraints.retain(|c| !c.involves_body(handle));
        self.forces.remove_sources_for_body(handle);

        let body = self.bodies.remove(handle).unwrap();
        load_inverse_masses(self.bodies.as_slice(), &mut self.inv_masses);
        Ok(body)
    }

    /// Registers a force source with the given scope
    pub fn add_force(&mut self, source: Box<dyn ForceSource>, scope: ForceScope) -> Result<()> {
        if let ForceScope::Body(handle) = scope {
            if !self.bodies.contains(handle) {
                return Err(PhysicsError::HandleInvalidated(format!(
                    "force source {} targets stale body handle {:?}",
                    source.source_type(),
                    handle
                )));
            }
        }
        self.forces.add(source, scope);
        Ok(())
    }

    /// Registers a constraint and returns its handle
    ///
    /// The declared arity must match the referenced body count, and every
    /// referenced handle must be live.
    pub fn add_constraint(&mut self, constraint: Box<dyn Constraint>) -> Result<ConstraintHandle> {
        let declared = constraint.arity();
        let referenced = constraint.bodies().len();
        if declared == 0 || declared != referenced {
            return Err(PhysicsError::ArityMismatch {
                declared,
                referenced,
            });
        }

        for &handle in constraint.bodies() {
            if !self.bodies.contains(handle) {
                return Err(PhysicsError::HandleInvalidated(format!(
                    "constraint {} references stale body handle {:?}",
                    constraint.constraint_type(),
                    handle
                )));
            }
        }
        Ok(self.constraints.add(constraint))
    }

    /// Removes a constraint
    pub fn remove_constraint(&mut self, handle: ConstraintHandle) -> Result<Box<dyn Constraint>> {
        self.constraints.remove(handle).ok_or_else(|| {
            PhysicsError::HandleInvalidated(format!("constraint handle {:?} is stale", handle))
        })
    }

    /// Advances the simulation by one fixed time step
    pub fn step(&mut self) -> Result<()> {
        let dt = self.config.dt;
        load_state(self.bodies.as_slice(), &mut self.state);
        let t = self.elapsed;

        let Engine {
            integrator,
            bodies,
            forces,
            constraints,
            solver,
            inv_masses,
            state,
            ..
        } = self;

        let result = integrator.forward(t, dt, state, |t, probe, stchanges| {
            ode(t, probe, stchanges, bodies, forces, constraints, solver, inv_masses)
        });

        // Bodies hold the last probe state here; commit the new state on
        // success, or roll back to the pre-step state on failure.
        retrieve_state(self.bodies.as_mut_slice(), &self.state);
        result?;
        self.elapsed += dt;
        Ok(())
    }

    /// Advances the simulation by one adaptive step using the tableau's
    /// embedded error estimate
    ///
    /// The step is retried with a halved step size until the estimate falls
    /// under `config.tolerance` or the step size reaches `config.min_dt`;
    /// comfortable estimates let the step size grow back toward
    /// `config.max_dt`. Falls back to a fixed step when the tableau has no
    /// embedded pair.
    pub fn step_adaptive(&mut self) -> Result<()> {
        if !self.integrator.get_tableau().is_embedded() {
            return self.step();
        }

        load_state(self.bodies.as_slice(), &mut self.state);
        self.prev_state.clone_from(&self.state);
        let t = self.elapsed;

        loop {
            let dt = self.adaptive_dt.clamp(self.config.min_dt, self.config.max_dt);
            self.state.copy_from_slice(&self.prev_state);

            let result = {
                let Engine {
                    integrator,
                    bodies,
                    forces,
                    constraints,
                    solver,
                    inv_masses,
                    state,
                    ..
                } = self;
                integrator.embedded_forward(t, dt, state, |t, probe, stchanges| {
                    ode(t, probe, stchanges, bodies, forces, constraints, solver, inv_masses)
                })
            };

            match result {
                Err(err) => {
                    retrieve_state(self.bodies.as_mut_slice(), &self.prev_state);
                    return Err(err);
                }
                Ok(error) => {
                    if error <= self.config.tolerance || dt <= self.config.min_dt {
                        retrieve_state(self.bodies.as_mut_slice(), &self.state);
                        self.elapsed += dt;
                        if error < 0.25 * self.config.tolerance {
                            self.adaptive_dt = (dt * 2.0).min(self.config.max_dt);
                        } else {
                            self.adaptive_dt = dt;
                        }
                        return Ok(());
                    }
                    self.adaptive_dt = (dt * 0.5).max(self.config.min_dt);
                }
            }
        }
    }

    /// Writes the committed flat state back into the bodies
    ///
    /// A no-op until the first step commits a state, or after registration
    /// changes leave the committed state behind.
    pub fn retrieve(&mut self) {
        if self.state.len() == self.bodies.len() * VAR_PER_BODY {
            retrieve_state(self.bodies.as_mut_slice(), &self.state);
        }
    }

    /// Zeros every body's force and torque accumulator
    pub fn reset_accumulators(&mut self) {
        for body in self.bodies.as_mut_slice() {
            body.reset_accumulator();
        }
    }

    /// Returns the body storage
    pub fn bodies(&self) -> &BodyStorage<RigidBody> {
        &self.bodies
    }

    /// Gets a reference to a body by its handle
    pub fn get_body(&self, handle: BodyHandle) -> Result<&RigidBody> {
        self.bodies.get_body(handle)
    }

    /// Gets a mutable reference to a body by its handle
    ///
    /// Bodies may only be mutated between steps, never from force or
    /// constraint callbacks.
    pub fn get_body_mut(&mut self, handle: BodyHandle) -> Result<&mut RigidBody> {
        self.bodies.get_body_mut(handle)
    }

    /// Returns the number of bodies in the engine
    pub fn body_count(&self) -> usize {
        self.bodies.len()
    }

    /// Returns the number of constraints in the engine
    pub fn constraint_count(&self) -> usize {
        self.constraints.len()
    }

    /// Returns the number of registered force sources
    pub fn force_count(&self) -> usize {
        self.forces.len()
    }

    /// Returns the committed flat state vector
    pub fn get_state(&self) -> &[f32] {
        &self.state
    }

    /// Returns the total elapsed simulation time
    pub fn get_elapsed(&self) -> f32 {
        self.elapsed
    }

    /// Returns the Baumgarte stiffness in use by the solver
    pub fn get_stiffness(&self) -> f32 {
        self.solver.get_stiffness()
    }

    /// Sets the Baumgarte stiffness
    pub fn set_stiffness(&mut self, stiffness: f32) {
        self.solver.set_stiffness(stiffness);
    }

    /// Returns the Baumgarte dampening in use by the solver
    pub fn get_dampening(&self) -> f32 {
        self.solver.get_dampening()
    }

    /// Sets the Baumgarte dampening
    pub fn set_dampening(&mut self, dampening: f32) {
        self.solver.set_dampening(dampening);
    }

    /// Returns a reference to the simulation configuration
    pub fn get_config(&self) -> &SimulationConfig {
        &self.config
    }

    /// Returns a mutable reference to the simulation configuration
    ///
    /// Changing `stiffness`/`dampening` here only affects newly created
    /// engines; use the setters above to retune a live solver.
    pub fn get_config_mut(&mut self) -> &mut SimulationConfig {
        &mut self.config
    }

    /// Clears the engine of all bodies, forces and constraints
    pub fn clear(&mut self) {
        self.bodies.clear();
        self.constraints.clear();
        self.forces.clear();
        self.state.clear();
        self.prev_state.clear();
        self.inv_masses.clear();
        self.elapsed = 0.0;
        self.adaptive_dt = self.config.dt;
    }
}

/// The ODE callback: maps a probe state to its time derivative
///
/// Forces read only the probe state the engine has just written back, so the
/// accumulated totals are independent of registration order.
#[allow(clippy::too_many_arguments)]
fn ode(
    _t: f32,
    probe: &[f32],
    stchanges: &mut Vec<f32>,
    bodies: &mut BodyStorage<RigidBody>,
    forces: &ForceRegistry,
    constraints: &ConstraintStorage<Box<dyn Constraint>>,
    solver: &mut ConstraintSolver,
    inv_masses: &[f32],
) -> Result<()> {
    retrieve_state(bodies.as_mut_slice(), probe);
    for body in bodies.as_mut_slice() {
        body.reset_accumulator();
    }
    forces.apply_forces(bodies);

    stchanges.clear();
    stchanges.reserve(probe.len());
    for (i, body) in bodies.as_slice().iter().enumerate() {
        let j = i * VAR_PER_BODY;
        let (linear, angular) = body.acceleration();
        stchanges.extend_from_slice(&[
            probe[j + 3],
            probe[j + 4],
            probe[j + 5],
            linear.x,
            linear.y,
            angular,
        ]);
    }

    solver.solve_and_apply(constraints, bodies, stchanges, inv_masses)
}
