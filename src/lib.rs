pub mod math;
pub mod bodies;
pub mod core;
pub mod forces;
pub mod constraints;
pub mod integration;

/// Re-export common types for easier usage
pub use crate::core::{Engine, SimulationConfig, BodyHandle, ConstraintHandle};
pub use crate::bodies::{RigidBody, BodySpec};
pub use crate::math::{Vector2, Polygon};
pub use crate::integration::ButcherTableau;

/// Error types for the physics engine
pub mod error {
    use thiserror::Error;

    #[derive(Error, Debug)]
    pub enum PhysicsError {
        #[error("Degenerate body: {0}")]
        DegenerateBody(String),

        #[error("Singular constraint system: {0}")]
        SingularConstraintSystem(String),

        #[error("Handle invalidated: {0}")]
        HandleInvalidated(String),

        #[error("Constraint arity mismatch: declared {declared}, references {referenced} bodies")]
        ArityMismatch {
            declared: usize,
            referenced: usize,
        },

        #[error("Numeric blowup: {0}")]
        NumericBlowup(String),
    }
}

/// Result type for physics engine operations
pub type Result<T> = std::result::Result<T, error::PhysicsError>;

/// Engine version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
