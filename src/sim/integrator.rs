use nalgebra::UnitQuaternion;

use crate::config::PhysicsConfig;
use crate::dynamics::rigid_body;
use crate::dynamics::state::{BodyState, ThrusterCommand};
use crate::vehicle::Capsule;

// ---------------------------------------------------------------------------
// Rigid-body RK4 integrator with constant thruster command over the step
// ---------------------------------------------------------------------------

/// Single RK4 step with constant thruster command over the step.
pub fn rk4_step(
    state: &BodyState,
    capsule: &Capsule,
    cmd: &ThrusterCommand,
    physics: &PhysicsConfig,
    dt: f64,
) -> BodyState {
    let k1 = rigid_body::derivatives(state, capsule, cmd, physics);
    let k2 = rigid_body::derivatives(&state.apply(&k1, dt * 0.5), capsule, cmd, physics);
    let k3 = rigid_body::derivatives(&state.apply(&k2, dt * 0.5), capsule, cmd, physics);
    let k4 = rigid_body::derivatives(&state.apply(&k3, dt), capsule, cmd, physics);

    let new_quat_raw = state.quat.quaternion()
        + (k1.dquat + k2.dquat * 2.0 + k3.dquat * 2.0 + k4.dquat) * (dt / 6.0);

    BodyState {
        time: state.time + dt,
        pos: state.pos + (k1.dpos + 2.0 * k2.dpos + 2.0 * k3.dpos + k4.dpos) * (dt / 6.0),
        vel: state.vel + (k1.dvel + 2.0 * k2.dvel + 2.0 * k3.dvel + k4.dvel) * (dt / 6.0),
        quat: UnitQuaternion::new_normalize(new_quat_raw),
        omega: state.omega
            + (k1.domega + 2.0 * k2.domega + 2.0 * k3.domega + k4.domega) * (dt / 6.0),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vehicle::presets;
    use nalgebra::Vector3;

    #[test]
    fn free_fall_matches_kinematics() {
        let c = presets::capsule();
        let physics = PhysicsConfig::default();
        let mut s = BodyState::at_rest(Vector3::new(0.0, 0.0, 100.0));
        for _ in 0..50 {
            s = rk4_step(&s, &c, &ThrusterCommand::idle(5), &physics, 0.02);
        }
        // 1 s of free fall: dz = -g/2
        assert!((s.pos.z - (100.0 - 0.5 * 9.81)).abs() < 1e-6);
        assert!((s.vel.z + 9.81).abs() < 1e-9);
        assert!((s.time - 1.0).abs() < 1e-9);
    }

    #[test]
    fn quaternion_stays_unit_under_torque() {
        let c = presets::capsule();
        let physics = PhysicsConfig::default();
        let cmd = ThrusterCommand::from_flags(&[0, 1, 0, 1, 0]);
        let mut s = BodyState::at_rest(Vector3::new(0.0, 0.0, 500.0));
        for _ in 0..500 {
            s = rk4_step(&s, &c, &cmd, &physics, 0.02);
            let norm = s.quat.quaternion().norm();
            assert!((norm - 1.0).abs() < 1e-6, "Quaternion norm drifted to {}", norm);
        }
        assert!(s.omega.norm() > 0.0);
    }

    #[test]
    fn capsule_settles_on_legs() {
        let c = presets::capsule();
        let physics = PhysicsConfig::default();
        let mut s = BodyState::at_rest(Vector3::new(0.0, 0.0, 2.0));
        for _ in 0..300 {
            s = rk4_step(&s, &c, &ThrusterCommand::idle(5), &physics, 0.02);
        }
        // Static deflection per leg: m g / (4 k)
        let sag = c.mass * physics.gravity / (4.0 * physics.contact_stiffness);
        assert!((s.pos.z - (1.5 - sag)).abs() < 0.01, "rest height {}", s.pos.z);
        assert!(s.vel.norm() < 0.05);
    }
}
