mod constraint;
mod distance;
mod anchor;
mod solver;

pub use self::constraint::Constraint;
pub use self::distance::DistanceConstraint;
pub use self::anchor::AnchorConstraint;
pub use self::solver::ConstraintSolver;
