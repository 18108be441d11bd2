#[cfg(feature = "serialize")]
use serde::{Serialize, Deserialize};

/// Configuration parameters for the physics simulation
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serialize", derive(Serialize, Deserialize))]
pub struct SimulationConfig {
    /// The fixed time step for the simulation
    pub dt: f32,

    /// Baumgarte stiffness: how strongly constraint drift C is pushed back to zero
    pub stiffness: f32,

    /// Baumgarte dampening: how strongly constraint velocity drift is bled off
    pub dampening: f32,

    /// Error tolerance for adaptive stepping with an embedded tableau
    pub tolerance: f32,

    /// Smallest step size adaptive stepping may shrink to
    pub min_dt: f32,

    /// Largest step size adaptive stepping may grow to
    pub max_dt: f32,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            dt: 1.0 / 60.0,
            stiffness: 5.0,
            dampening: 2.0,
            tolerance: 1.0e-4,
            min_dt: 1.0e-4,
            max_dt: 1.0 / 30.0,
        }
    }
}
