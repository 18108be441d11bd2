use crate::integration::ButcherTableau;
use crate::Result;

/// Explicit Runge-Kutta driver over a flat float state
///
/// The derivative callback is a black box `f(t, state, out)` that fills `out`
/// with the state derivative. Stage buffers are kept across calls and resized
/// lazily, so steady-state stepping allocates nothing.
pub struct RungeKutta {
    tableau: ButcherTableau,

    /// One derivative buffer per stage, reused across steps
    stages: Vec<Vec<f32>>,

    /// Stage-state buffer, reused across steps
    scratch: Vec<f32>,
}

impl RungeKutta {
    /// Creates a new integrator for the given tableau
    pub fn new(tableau: ButcherTableau) -> Self {
        let stages = vec![Vec::new(); tableau.stages()];
        Self {
            tableau,
            stages,
            scratch: Vec::new(),
        }
    }

    /// Returns the integrator's tableau
    pub fn get_tableau(&self) -> &ButcherTableau {
        &self.tableau
    }

    /// Advances the state in place by one step of size `dt`
    ///
    /// The state is only written once every stage has evaluated successfully,
    /// so a failing callback leaves it untouched.
    pub fn forward<F>(&mut self, t: f32, dt: f32, state: &mut [f32], f: F) -> Result<()>
    where
        F: FnMut(f32, &[f32], &mut Vec<f32>) -> Result<()>,
    {
        self.run_stages(t, dt, state, f)?;

        for (i, &weight) in self.tableau.weights().iter().enumerate() {
            if weight == 0.0 {
                continue;
            }
            for (value, k) in state.iter_mut().zip(&self.stages[i]) {
                *value += dt * weight * k;
            }
        }
        Ok(())
    }

    /// Advances the state in place and returns the embedded error estimate
    ///
    /// The higher-order weights propagate the state; the estimate is the
    /// infinity norm of the difference against the embedded solution. A
    /// tableau without an embedded pair reports zero error.
    pub fn embedded_forward<F>(&mut self, t: f32, dt: f32, state: &mut [f32], f: F) -> Result<f32>
    where
        F: FnMut(f32, &[f32], &mut Vec<f32>) -> Result<()>,
    {
        self.run_stages(t, dt, state, f)?;

        let mut error: f32 = 0.0;
        for j in 0..state.len() {
            let mut increment = 0.0;
            for (i, &weight) in self.tableau.weights().iter().enumerate() {
                increment += weight * self.stages[i][j];
            }
            if let Some(embedded) = self.tableau.embedded_weights() {
                let mut embedded_increment = 0.0;
                for (i, &weight) in embedded.iter().enumerate() {
                    embedded_increment += weight * self.stages[i][j];
                }
                error = error.max((dt * (increment - embedded_increment)).abs());
            }
            state[j] += dt * increment;
        }
        Ok(error)
    }

    /// Evaluates every stage derivative for the current step
    fn run_stages<F>(&mut self, t: f32, dt: f32, state: &[f32], mut f: F) -> Result<()>
    where
        F: FnMut(f32, &[f32], &mut Vec<f32>) -> Result<()>,
    {
        let stage_count = self.tableau.stages();
        debug_assert_eq!(self.stages.len(), stage_count);

        self.scratch.clear();
        self.scratch.resize(state.len(), 0.0);

        for i in 0..stage_count {
            self.scratch.copy_from_slice(state);
            for (j, &coefficient) in self.tableau.coefficients()[i].iter().enumerate() {
                if coefficient == 0.0 {
                    continue;
                }
                for (value, k) in self.scratch.iter_mut().zip(&self.stages[j]) {
                    *value += dt * coefficient * k;
                }
            }

            let node = self.tableau.nodes()[i];
            f(t + node * dt, &self.scratch, &mut self.stages[i])?;
            debug_assert_eq!(self.stages[i].len(), state.len());
        }
        Ok(())
    }
}
