mod rigid_body;

pub use self::rigid_body::{BodySpec, RigidBody};

/// Flags for controlling body behavior
pub mod body_flags {
    use bitflags::bitflags;

    bitflags! {
        /// Flags for controlling the behavior of rigid bodies
        pub struct BodyFlags: u32 {
            /// Body responds to forces and constraint projection
            const DYNAMIC = 0x01;

            /// Body is affected by the built-in gravity sources
            const AFFECTED_BY_GRAVITY = 0x02;
        }
    }

    impl Default for BodyFlags {
        fn default() -> Self {
            BodyFlags::DYNAMIC | BodyFlags::AFFECTED_BY_GRAVITY
        }
    }
}
