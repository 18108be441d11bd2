mod force_source;
mod gravity;
mod drag;
mod spring;

pub use self::force_source::{ForceRegistry, ForceScope, ForceSource};
pub use self::gravity::{Gravity, PointGravity};
pub use self::drag::Drag;
pub use self::spring::AnchoredSpring;
