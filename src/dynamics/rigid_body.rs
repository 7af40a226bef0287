use nalgebra::{Quaternion, Vector3};

use crate::config::PhysicsConfig;
use crate::dynamics::state::{BodyState, Deriv, ThrusterCommand};
use crate::vehicle::Capsule;

// ---------------------------------------------------------------------------
// Rigid-body equations of motion over a flat floor at z = 0
// ---------------------------------------------------------------------------

/// Compute full rigid-body state derivatives.
///
/// Forces & moments:
///   1. Uniform gravity (area frame)
///   2. Thrusters that are firing (body frame → area frame, torque about CG)
///   3. Penalty contact at every leg foot and hull point below the floor:
///      spring + normal damping, viscous tangential friction
pub fn derivatives(
    state: &BodyState,
    capsule: &Capsule,
    cmd: &ThrusterCommand,
    physics: &PhysicsConfig,
) -> Deriv {
    let mass = capsule.mass;

    // --- Gravity (area frame) ---
    let f_gravity = Vector3::new(0.0, 0.0, -physics.gravity * mass);

    // --- Thrust (body frame) ---
    let mut f_thrust_body = Vector3::zeros();
    let mut torque_body = Vector3::zeros();
    for (idx, thruster) in capsule.thrusters.iter().enumerate() {
        if cmd.is_firing(idx) {
            f_thrust_body += thruster.force_body();
            torque_body += thruster.torque_body();
        }
    }
    let f_thrust = state.quat * f_thrust_body;

    // --- Ground contact (area frame force, body frame torque) ---
    let mut f_contact = Vector3::zeros();
    let omega_world = state.omega_world();
    for local in capsule.legs.iter().chain(capsule.hull.iter()) {
        let arm = state.quat * local;
        let point = state.pos + arm;
        if point.z >= 0.0 {
            continue;
        }
        let point_vel = state.vel + omega_world.cross(&arm);
        let f = contact_force(-point.z, &point_vel, physics);
        f_contact += f;
        torque_body += state.quat.inverse() * arm.cross(&f);
    }

    let accel = (f_gravity + f_thrust + f_contact) / mass;

    // --- Euler's equation: I * domega = torque - omega × (I * omega) ---
    let i_vec = capsule.inertia;
    let i_omega = Vector3::new(
        i_vec.x * state.omega.x,
        i_vec.y * state.omega.y,
        i_vec.z * state.omega.z,
    );
    let domega = Vector3::new(
        (torque_body.x - (state.omega.y * i_omega.z - state.omega.z * i_omega.y)) / i_vec.x,
        (torque_body.y - (state.omega.z * i_omega.x - state.omega.x * i_omega.z)) / i_vec.y,
        (torque_body.z - (state.omega.x * i_omega.y - state.omega.y * i_omega.x)) / i_vec.z,
    );

    // --- Quaternion kinematics: dq/dt = 0.5 * q * omega_quat ---
    let omega_quat = Quaternion::new(0.0, state.omega.x, state.omega.y, state.omega.z);
    let dquat = state.quat.quaternion() * omega_quat * 0.5;

    Deriv {
        dpos: state.vel,
        dvel: accel,
        dquat,
        domega,
    }
}

/// Floor reaction at one penetrating point. The normal component never pulls.
pub fn contact_force(depth: f64, point_vel: &Vector3<f64>, physics: &PhysicsConfig) -> Vector3<f64> {
    let normal = (physics.contact_stiffness * depth - physics.contact_damping * point_vel.z).max(0.0);
    Vector3::new(
        -physics.contact_friction * point_vel.x,
        -physics.contact_friction * point_vel.y,
        normal,
    )
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vehicle::presets;
    use nalgebra::UnitQuaternion;

    fn hover_state(alt: f64) -> BodyState {
        BodyState::at_rest(Vector3::new(0.0, 0.0, alt))
    }

    #[test]
    fn free_fall_is_gravity() {
        let c = presets::capsule();
        let d = derivatives(&hover_state(30.0), &c, &ThrusterCommand::idle(5), &PhysicsConfig::default());
        assert!((d.dvel.z + 9.81).abs() < 1e-9);
        assert!(d.domega.norm() < 1e-12);
    }

    #[test]
    fn main_engine_accelerates_up() {
        let c = presets::capsule();
        let cmd = ThrusterCommand::from_flags(&[1, 0, 0, 0, 0]);
        let d = derivatives(&hover_state(30.0), &c, &cmd, &PhysicsConfig::default());
        assert!(d.dvel.z > 0.0, "TWR > 1 → net upward, got {}", d.dvel.z);
    }

    #[test]
    fn rcs_creates_torque() {
        let c = presets::capsule();
        let cmd = ThrusterCommand::from_flags(&[0, 1, 0, 0, 0]);
        let d = derivatives(&hover_state(30.0), &c, &cmd, &PhysicsConfig::default());
        assert!(d.domega.y.abs() > 1e-6, "RCS should create pitch torque");
    }

    #[test]
    fn penetrating_legs_push_up() {
        let c = presets::capsule();
        // Feet at z = -1.5 in body frame; put them 5 cm under the floor.
        let s = hover_state(1.45);
        let d = derivatives(&s, &c, &ThrusterCommand::idle(5), &PhysicsConfig::default());
        assert!(d.dvel.z > 0.0, "60 kN/m * 0.05 m * 4 legs beats gravity");
    }

    #[test]
    fn contact_never_pulls() {
        let f = contact_force(0.001, &Vector3::new(0.0, 0.0, 10.0), &PhysicsConfig::default());
        assert_eq!(f.z, 0.0);
    }

    #[test]
    fn quat_deriv_zero_without_rotation() {
        let c = presets::capsule();
        let mut s = hover_state(20.0);
        s.quat = UnitQuaternion::from_euler_angles(0.2, 0.1, 0.0);
        let d = derivatives(&s, &c, &ThrusterCommand::idle(5), &PhysicsConfig::default());
        let dq_norm = (d.dquat.w.powi(2) + d.dquat.i.powi(2)
            + d.dquat.j.powi(2) + d.dquat.k.powi(2))
        .sqrt();
        assert!(dq_norm < 1e-10, "No rotation → zero quat derivative");
    }
}
