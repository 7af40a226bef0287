use crate::config::RewardConfig;
use crate::dynamics::state::CapsuleState;

use super::episode::SimulationState;

// ---------------------------------------------------------------------------
// Reward model
// ---------------------------------------------------------------------------

/// Maps (state, current metrics, previous metrics) to a scalar reward.
///
/// - `Flying`: progress bonus when the distance to the pad shrank this step,
///   plus a constant step penalty.
/// - terminal physical outcomes: weighted sum of square-root falloff
///   sub-rewards for distance, tilt and speed, each in [-1, 1].
/// - everything else: 0.
///
/// The model holds only constants; `score` has no side effects and may be
/// called any number of times.
#[derive(Debug, Clone, PartialEq)]
pub struct RewardModel {
    pub config: RewardConfig,
}

impl Default for RewardModel {
    fn default() -> Self {
        Self::new(RewardConfig::default())
    }
}

impl RewardModel {
    pub fn new(config: RewardConfig) -> Self {
        Self { config }
    }

    pub fn score(&self, state: SimulationState, capsule: &CapsuleState, previous: &CapsuleState) -> f64 {
        match state {
            SimulationState::Flying => self.flying_reward(capsule, previous),
            SimulationState::Crashed
            | SimulationState::LandedOnGround
            | SimulationState::LandedOnLandingZone => self.terminal_reward(capsule),
            SimulationState::None
            | SimulationState::Starting
            | SimulationState::Finished
            | SimulationState::Restarting => 0.0,
        }
    }

    pub fn flying_reward(&self, capsule: &CapsuleState, previous: &CapsuleState) -> f64 {
        let progress = if capsule.distance_to_target < previous.distance_to_target {
            self.config.forward_reward
        } else {
            0.0
        };
        progress + self.config.step_penalty
    }

    pub fn terminal_reward(&self, capsule: &CapsuleState) -> f64 {
        let c = &self.config;
        c.distance_weight * falloff(capsule.distance_to_target, c.max_distance)
            + c.angle_weight * falloff(capsule.tilt_angle, c.max_angle)
            + c.speed_weight * falloff(capsule.speed, c.max_speed)
    }
}

/// `max(1 - sqrt(metric / max_metric), -1)`: 1 at zero, 0 at the normalizer,
/// floored at -1 from four times the normalizer on.
///
/// Total over all inputs: negative metrics count as zero, NaN and infinite
/// metrics hit the floor, a non-positive normalizer turns the term into a
/// pass/fail on metric == 0.
pub fn falloff(metric: f64, max_metric: f64) -> f64 {
    if metric.is_nan() {
        return -1.0;
    }
    let metric = metric.max(0.0);
    if !(max_metric > 0.0) {
        return if metric == 0.0 { 1.0 } else { -1.0 };
    }
    (1.0 - (metric / max_metric).sqrt()).max(-1.0)
}
