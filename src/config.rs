use serde::{Deserialize, Serialize};

use crate::error::{Result, SimError};

// ---------------------------------------------------------------------------
// Simulation configuration
// ---------------------------------------------------------------------------

/// Runtime configuration for one training area.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    /// Fixed physics step [s]
    pub dt: f64,
    /// Step cap per episode; reaching it aborts the episode
    pub max_steps: u64,
    /// RNG seed for spawn randomisation
    pub seed: u64,
    /// Trained policy when true, heuristic pilot otherwise
    pub is_training: bool,
    pub spawn: SpawnConfig,
    pub termination: TerminationConfig,
    pub reward: RewardConfig,
    pub physics: PhysicsConfig,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            dt: 0.02, // 50 Hz
            max_steps: 2_000,
            seed: 17,
            is_training: true,
            spawn: SpawnConfig::default(),
            termination: TerminationConfig::default(),
            reward: RewardConfig::default(),
            physics: PhysicsConfig::default(),
        }
    }
}

/// Episode-begin randomisation of the capsule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpawnConfig {
    /// Minimum distance from the floor edges [m]
    pub start_offset: f64,
    /// Spawn altitude [m]
    pub initial_height: f64,
    /// Upper bound of the initial descent speed [m/s]
    pub max_initial_speed: f64,
    /// Max tilt about each horizontal axis [deg]
    pub max_initial_rotation_deg: f64,
}

impl Default for SpawnConfig {
    fn default() -> Self {
        Self {
            start_offset: 10.0,
            initial_height: 40.0,
            max_initial_speed: 25.0,
            max_initial_rotation_deg: 30.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TerminationConfig {
    /// Impact relative speed above which a touchdown counts as a crash [m/s]
    pub max_landing_speed: f64,
}

impl Default for TerminationConfig {
    fn default() -> Self {
        Self { max_landing_speed: 5.0 }
    }
}

/// Reward shaping constants.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RewardConfig {
    pub forward_reward: f64,
    pub step_penalty: f64,
    pub distance_weight: f64,
    pub angle_weight: f64,
    pub speed_weight: f64,
    /// Normalizer for distance to target [m]
    pub max_distance: f64,
    /// Normalizer for tilt [deg]
    pub max_angle: f64,
    /// Normalizer for speed [m/s]
    pub max_speed: f64,
}

impl Default for RewardConfig {
    fn default() -> Self {
        Self {
            forward_reward: 0.1,
            step_penalty: -0.05,
            distance_weight: 0.2,
            angle_weight: 0.5,
            speed_weight: 0.3,
            max_distance: 40.0,
            max_angle: 90.0,
            max_speed: 15.0,
        }
    }
}

/// Parameters of the sandbox physics engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PhysicsConfig {
    /// Gravitational acceleration [m/s^2]
    pub gravity: f64,
    /// Penalty spring per contact point [N/m]
    pub contact_stiffness: f64,
    /// Normal damping per contact point [N·s/m]
    pub contact_damping: f64,
    /// Viscous tangential friction per contact point [N·s/m]
    pub contact_friction: f64,
    /// Linear speed below which the body may sleep [m/s]
    pub sleep_speed: f64,
    /// Angular rate below which the body may sleep [rad/s]
    pub sleep_rate: f64,
    /// Consecutive quiet steps before the body is reported at rest
    pub sleep_steps: u32,
}

impl Default for PhysicsConfig {
    fn default() -> Self {
        Self {
            gravity: 9.81,
            contact_stiffness: 60_000.0,
            contact_damping: 6_000.0,
            contact_friction: 3_000.0,
            sleep_speed: 0.05,
            sleep_rate: 0.05,
            sleep_steps: 10,
        }
    }
}

impl SimulationConfig {
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: SimulationConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_json_file(path: impl AsRef<std::path::Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }

    pub fn validate(&self) -> Result<()> {
        ensure(self.dt > 0.0, "dt must be > 0")?;
        ensure(self.max_steps > 0, "max_steps must be > 0")?;
        ensure(self.spawn.start_offset >= 0.0, "spawn.start_offset must be >= 0")?;
        ensure(self.spawn.initial_height > 0.0, "spawn.initial_height must be > 0")?;
        ensure(self.spawn.max_initial_speed >= 0.0, "spawn.max_initial_speed must be >= 0")?;
        ensure(
            self.spawn.max_initial_rotation_deg.is_finite() && self.spawn.max_initial_rotation_deg >= 0.0,
            "spawn.max_initial_rotation_deg must be finite and >= 0",
        )?;
        ensure(
            self.termination.max_landing_speed >= 0.0,
            "termination.max_landing_speed must be >= 0",
        )?;

        let r = &self.reward;
        ensure(
            r.max_distance > 0.0 && r.max_angle > 0.0 && r.max_speed > 0.0,
            "reward normalizers must be > 0",
        )?;
        let weight_sum = r.distance_weight + r.angle_weight + r.speed_weight;
        ensure(
            (weight_sum - 1.0).abs() < 1e-6,
            "reward weights must sum to 1",
        )?;

        ensure(self.physics.gravity >= 0.0, "physics.gravity must be >= 0")?;
        ensure(
            self.physics.contact_stiffness > 0.0,
            "physics.contact_stiffness must be > 0",
        )?;
        ensure(
            self.physics.contact_damping >= 0.0 && self.physics.contact_friction >= 0.0,
            "physics contact damping and friction must be >= 0",
        )?;
        Ok(())
    }
}

fn ensure(cond: bool, msg: &str) -> Result<()> {
    if cond {
        Ok(())
    } else {
        Err(SimError::InvalidConfig(msg.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        SimulationConfig::default().validate().unwrap();
    }

    #[test]
    fn partial_json_fills_defaults() {
        let config = SimulationConfig::from_json_str(
            r#"{ "seed": 99, "reward": { "max_distance": 60.0 } }"#,
        )
        .unwrap();
        assert_eq!(config.seed, 99);
        assert_eq!(config.reward.max_distance, 60.0);
        assert_eq!(config.reward.max_angle, 90.0);
        assert_eq!(config.spawn.initial_height, 40.0);
    }

    #[test]
    fn unbalanced_weights_rejected() {
        let mut config = SimulationConfig::default();
        config.reward.angle_weight = 0.9;
        assert!(matches!(config.validate(), Err(SimError::InvalidConfig(_))));
    }

    #[test]
    fn zero_normalizer_rejected() {
        let err = SimulationConfig::from_json_str(r#"{ "reward": { "max_speed": 0.0 } }"#);
        assert!(err.is_err());
    }

    #[test]
    fn spawn_rotation_must_be_finite_and_non_negative() {
        for bad in [-5.0, f64::NAN, f64::INFINITY] {
            let mut config = SimulationConfig::default();
            config.spawn.max_initial_rotation_deg = bad;
            assert!(
                matches!(config.validate(), Err(SimError::InvalidConfig(_))),
                "{} accepted",
                bad
            );
        }
        let mut config = SimulationConfig::default();
        config.spawn.max_initial_rotation_deg = 0.0;
        config.validate().unwrap();
    }

    #[test]
    fn malformed_json_is_a_json_error() {
        let err = SimulationConfig::from_json_str("{ dt: ").unwrap_err();
        assert!(matches!(err, SimError::Json(_)));
    }
}
