use nalgebra::Vector3;

use crate::dynamics::state::{Observation, ThrusterCommand};
use crate::vehicle::Capsule;
use super::agent::Agent;
use super::pid::Pid;

// ---------------------------------------------------------------------------
// Heuristic pilot: descent-rate profile + attitude PID
// ---------------------------------------------------------------------------

/// Scripted lander used when no trained policy flies the capsule.
///
/// Vertical: fires the lift engines whenever the descent rate exceeds a
/// profile that shrinks linearly with foot height.
/// Lateral: leans toward the pad with a PD law on ground-plane position.
/// Attitude: one PID per body axis, mapped onto whichever attitude
/// thrusters push torque the right way.
#[derive(Debug, Clone)]
pub struct HeuristicPilot {
    target: Vector3<f64>,
    gravity: f64,
    dt: f64,
    /// Distance from the CG down to the feet [m]
    foot_depth: f64,
    lift: Vec<usize>,
    /// (thruster index, unit torque direction, body frame)
    attitude: Vec<(usize, Vector3<f64>)>,
    thrusters: usize,
    roll_pid: Pid,
    pitch_pid: Pid,
}

const MIN_DESCENT: f64 = 0.5;      // m/s at touchdown
const MAX_DESCENT: f64 = 10.0;     // m/s
const DESCENT_GAIN: f64 = 0.4;     // (m/s) per m of height
const MAX_LEAN_ACCEL: f64 = 2.5;   // m/s^2 horizontal
const TORQUE_DEADBAND: f64 = 0.02;

impl HeuristicPilot {
    pub fn new(capsule: &Capsule, target: Vector3<f64>, gravity: f64, dt: f64) -> Self {
        let foot_depth = capsule.legs.iter().map(|l| -l.z).fold(0.0_f64, f64::max);
        let mut lift = Vec::new();
        let mut attitude = Vec::new();
        for (idx, t) in capsule.thrusters.iter().enumerate() {
            let force = t.force_body();
            let torque = t.torque_body();
            if force.z > 0.5 * force.norm() && torque.norm() < 1e-6 * t.thrust.max(1.0) {
                lift.push(idx);
            } else if let Some(dir) = torque.try_normalize(1e-9) {
                attitude.push((idx, dir));
            }
        }
        Self {
            target,
            gravity,
            dt,
            foot_depth,
            lift,
            attitude,
            thrusters: capsule.thruster_count(),
            roll_pid: Pid::new(1.0, 0.0, 1.5),
            pitch_pid: Pid::new(1.0, 0.0, 1.5),
        }
    }

    /// Descent-rate limit at a given foot height (negative = down).
    pub fn descent_limit(&self, foot_height: f64) -> f64 {
        -(MIN_DESCENT + DESCENT_GAIN * foot_height.max(0.0)).min(MAX_DESCENT)
    }

    fn desired_up(&self, pos: &Vector3<f64>, vel: &Vector3<f64>, braking_hard: bool) -> Vector3<f64> {
        if braking_hard {
            return Vector3::z();
        }
        let err = self.target - pos;
        let mut lean = Vector3::new(
            0.08 * err.x - 0.4 * vel.x,
            0.08 * err.y - 0.4 * vel.y,
            0.0,
        );
        let n = lean.norm();
        if n > MAX_LEAN_ACCEL {
            lean *= MAX_LEAN_ACCEL / n;
        }
        (lean + Vector3::new(0.0, 0.0, self.gravity)).normalize()
    }
}

impl Agent for HeuristicPilot {
    fn on_episode_begin(&mut self, _episode: u64) {
        self.roll_pid.reset();
        self.pitch_pid.reset();
    }

    fn act(&mut self, obs: &Observation) -> ThrusterCommand {
        let pos = obs.position();
        let vel = obs.velocity();
        let quat = obs.orientation();
        let up = quat * Vector3::z();

        let foot_height = pos.z - self.foot_depth;
        let limit = self.descent_limit(foot_height);
        let braking_hard = vel.z < limit - 3.0;

        let mut cmd = ThrusterCommand::idle(self.thrusters);

        // --- Vertical ---
        if vel.z < limit && up.z > 0.6 {
            for &idx in &self.lift {
                cmd.fire[idx] = true;
            }
        }

        // --- Attitude ---
        let desired = self.desired_up(&pos, &vel, braking_hard);
        let err_body = quat.inverse() * up.cross(&desired);
        let torque_cmd = Vector3::new(
            self.roll_pid.update(err_body.x, self.dt),
            self.pitch_pid.update(err_body.y, self.dt),
            0.0,
        );
        if torque_cmd.norm() > TORQUE_DEADBAND {
            let want = torque_cmd.normalize();
            for &(idx, dir) in &self.attitude {
                if dir.dot(&want) > 0.5 {
                    cmd.fire[idx] = true;
                }
            }
        }

        cmd
    }

    fn name(&self) -> &str {
        "HeuristicPilot"
    }
}
