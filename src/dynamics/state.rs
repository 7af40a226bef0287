use nalgebra::{Quaternion, UnitQuaternion, Vector3};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Rigid-body state: position, velocity, attitude, angular rate
// ---------------------------------------------------------------------------

/// Kinematic snapshot of the capsule body.
/// Frame: training-area local ENU, z up, origin at the floor centre.
#[derive(Debug, Clone, PartialEq)]
pub struct BodyState {
    pub time: f64,
    pub pos: Vector3<f64>,              // m
    pub vel: Vector3<f64>,              // m/s
    pub quat: UnitQuaternion<f64>,      // body→area rotation
    pub omega: Vector3<f64>,            // rad/s, body frame angular velocity
}

impl BodyState {
    pub fn at_rest(pos: Vector3<f64>) -> Self {
        Self {
            time: 0.0,
            pos,
            vel: Vector3::zeros(),
            quat: UnitQuaternion::identity(),
            omega: Vector3::zeros(),
        }
    }

    pub fn apply(&self, d: &Deriv, dt: f64) -> BodyState {
        // Quaternion integration: q_new = normalize(q + dq * dt)
        let q_raw = self.quat.quaternion() + d.dquat * dt;
        BodyState {
            time: self.time + dt,
            pos: self.pos + d.dpos * dt,
            vel: self.vel + d.dvel * dt,
            quat: UnitQuaternion::new_normalize(q_raw),
            omega: self.omega + d.domega * dt,
        }
    }

    /// Body up axis (+Z) in the area frame.
    pub fn body_up(&self) -> Vector3<f64> {
        self.quat * Vector3::z()
    }

    /// Angle between the body up axis and world up, degrees.
    pub fn tilt_deg(&self) -> f64 {
        self.body_up().z.clamp(-1.0, 1.0).acos().to_degrees()
    }

    /// Angular velocity expressed in the area frame.
    pub fn omega_world(&self) -> Vector3<f64> {
        self.quat * self.omega
    }
}

// ---------------------------------------------------------------------------
// State derivative
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct Deriv {
    pub dpos: Vector3<f64>,
    pub dvel: Vector3<f64>,
    pub dquat: Quaternion<f64>,   // raw quaternion derivative, not unit
    pub domega: Vector3<f64>,     // body frame
}

// ---------------------------------------------------------------------------
// Capsule metrics fed to the reward model
// ---------------------------------------------------------------------------

/// Derived landing metrics for one snapshot.
///
/// Every field is `f64::INFINITY` until the first physics update, which
/// makes the first progress comparison succeed and any terminal score
/// computed before a measurement bottom out at the floor.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CapsuleState {
    /// Distance from the capsule reference point to the landing-zone centre [m]
    pub distance_to_target: f64,
    /// Deviation from upright [deg]
    pub tilt_angle: f64,
    /// Linear speed [m/s]
    pub speed: f64,
}

impl Default for CapsuleState {
    fn default() -> Self {
        Self::UNKNOWN
    }
}

impl CapsuleState {
    pub const UNKNOWN: CapsuleState = CapsuleState {
        distance_to_target: f64::INFINITY,
        tilt_angle: f64::INFINITY,
        speed: f64::INFINITY,
    };

    pub fn measure(body: &BodyState, target: &Vector3<f64>) -> Self {
        Self {
            distance_to_target: (body.pos - target).norm(),
            tilt_angle: body.tilt_deg(),
            speed: body.vel.norm(),
        }
    }

    pub fn is_known(&self) -> bool {
        self.distance_to_target.is_finite() && self.tilt_angle.is_finite() && self.speed.is_finite()
    }
}

// ---------------------------------------------------------------------------
// Agent boundary: observation in, thruster flags out
// ---------------------------------------------------------------------------

pub const OBSERVATION_LEN: usize = 13;

/// Observation vector: position(3), orientation(4, w-i-j-k), linear velocity(3),
/// angular velocity(3, area frame).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Observation(pub [f64; OBSERVATION_LEN]);

impl Observation {
    pub fn from_body(body: &BodyState) -> Self {
        let q = body.quat.quaternion();
        let w = body.omega_world();
        Self([
            body.pos.x, body.pos.y, body.pos.z,
            q.w, q.i, q.j, q.k,
            body.vel.x, body.vel.y, body.vel.z,
            w.x, w.y, w.z,
        ])
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.0
    }

    pub fn position(&self) -> Vector3<f64> {
        Vector3::new(self.0[0], self.0[1], self.0[2])
    }

    pub fn orientation(&self) -> UnitQuaternion<f64> {
        UnitQuaternion::new_normalize(Quaternion::new(self.0[3], self.0[4], self.0[5], self.0[6]))
    }

    pub fn velocity(&self) -> Vector3<f64> {
        Vector3::new(self.0[7], self.0[8], self.0[9])
    }

    pub fn angular_velocity(&self) -> Vector3<f64> {
        Vector3::new(self.0[10], self.0[11], self.0[12])
    }
}

/// Discrete action: one fire flag per thruster.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ThrusterCommand {
    pub fire: Vec<bool>,
}

impl ThrusterCommand {
    pub fn idle(thrusters: usize) -> Self {
        Self { fire: vec![false; thrusters] }
    }

    /// Decode a 0/1 action buffer; any non-zero entry fires.
    pub fn from_flags(flags: &[u8]) -> Self {
        Self { fire: flags.iter().map(|&f| f != 0).collect() }
    }

    pub fn is_firing(&self, idx: usize) -> bool {
        self.fire.get(idx).copied().unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::FRAC_PI_4;

    #[test]
    fn upright_body_has_zero_tilt() {
        let body = BodyState::at_rest(Vector3::new(1.0, 2.0, 3.0));
        assert!(body.tilt_deg().abs() < 1e-9);
    }

    #[test]
    fn tilt_ignores_yaw() {
        let mut body = BodyState::at_rest(Vector3::zeros());
        body.quat = UnitQuaternion::from_axis_angle(&Vector3::z_axis(), 1.0);
        assert!(body.tilt_deg().abs() < 1e-9);
        body.quat = UnitQuaternion::from_axis_angle(&Vector3::x_axis(), FRAC_PI_4);
        assert!((body.tilt_deg() - 45.0).abs() < 1e-9);
    }

    #[test]
    fn measure_reports_distance_and_speed() {
        let mut body = BodyState::at_rest(Vector3::new(3.0, 4.0, 0.0));
        body.vel = Vector3::new(0.0, 0.0, -2.0);
        let c = CapsuleState::measure(&body, &Vector3::zeros());
        assert!((c.distance_to_target - 5.0).abs() < 1e-12);
        assert!((c.speed - 2.0).abs() < 1e-12);
    }

    #[test]
    fn unknown_sentinel_before_first_update() {
        let c = CapsuleState::default();
        assert!(c.distance_to_target.is_infinite());
        assert!(!c.is_known());
    }

    #[test]
    fn observation_layout() {
        let mut body = BodyState::at_rest(Vector3::new(1.0, 2.0, 3.0));
        body.vel = Vector3::new(4.0, 5.0, 6.0);
        let obs = Observation::from_body(&body);
        assert_eq!(obs.as_slice().len(), OBSERVATION_LEN);
        assert_eq!(obs.position(), body.pos);
        assert_eq!(obs.velocity(), body.vel);
        assert_eq!(obs.0[3], 1.0); // identity w
    }

    #[test]
    fn command_from_flags() {
        let cmd = ThrusterCommand::from_flags(&[0, 1, 0, 1]);
        assert!(!cmd.is_firing(0));
        assert!(cmd.is_firing(1));
        assert!(!cmd.is_firing(9));
    }
}
