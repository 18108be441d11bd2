use crate::bodies::RigidBody;
use crate::core::{POS_PER_BODY, VAR_PER_BODY};

/// Writes the bodies' poses and velocities into the flat state vector
///
/// Layout per body: `[x, y, angle, vx, vy, omega]`.
pub(crate) fn load_state(bodies: &[RigidBody], state: &mut Vec<f32>) {
    state.clear();
    state.reserve(bodies.len() * VAR_PER_BODY);
    for body in bodies {
        let position = body.get_position();
        let velocity = body.get_linear_velocity();
        state.extend_from_slice(&[
            position.x,
            position.y,
            body.get_angle(),
            velocity.x,
            velocity.y,
            body.get_angular_velocity(),
        ]);
    }
}

/// Writes the flat state vector back into the bodies
pub(crate) fn retrieve(bodies: &mut [RigidBody], state: &[f32]) {
    debug_assert_eq!(state.len(), bodies.len() * VAR_PER_BODY);
    for (i, body) in bodies.iter_mut().enumerate() {
        body.write_state(&state[i * VAR_PER_BODY..(i + 1) * VAR_PER_BODY]);
    }
}

/// Rebuilds the inverse-mass vector: `[1/m, 1/m, 1/I]` per body, zeros for
/// static bodies
pub(crate) fn load_inverse_masses(bodies: &[RigidBody], inv_masses: &mut Vec<f32>) {
    inv_masses.clear();
    inv_masses.reserve(bodies.len() * POS_PER_BODY);
    for body in bodies {
        let inv_mass = body.get_inverse_mass();
        inv_masses.extend_from_slice(&[inv_mass, inv_mass, body.get_inverse_inertia()]);
    }
}
