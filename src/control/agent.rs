use serde::{Deserialize, Serialize};

use crate::dynamics::state::{Observation, ThrusterCommand};
use crate::sim::episode::SimulationState;

/// Learning/control backend boundary.
///
/// Implement this to plug a trained policy, a learner or a scripted pilot
/// into the episode loop. The orchestrator calls `act` once per physics tick,
/// forwards every reward with `add_reward`, and closes each episode with
/// `end_episode`.
pub trait Agent {
    /// Called after the vehicle for `episode` is spawned.
    fn on_episode_begin(&mut self, _episode: u64) {}

    /// Thruster flags for the next tick.
    fn act(&mut self, observation: &Observation) -> ThrusterCommand;

    /// Additive reward signal.
    fn add_reward(&mut self, _reward: f64) {}

    /// Episode end, with the physical outcome state.
    fn end_episode(&mut self, _outcome: SimulationState) {}

    fn name(&self) -> &str {
        "unnamed"
    }
}

impl<A: Agent + ?Sized> Agent for Box<A> {
    fn on_episode_begin(&mut self, episode: u64) {
        (**self).on_episode_begin(episode)
    }

    fn act(&mut self, observation: &Observation) -> ThrusterCommand {
        (**self).act(observation)
    }

    fn add_reward(&mut self, reward: f64) {
        (**self).add_reward(reward)
    }

    fn end_episode(&mut self, outcome: SimulationState) {
        (**self).end_episode(outcome)
    }

    fn name(&self) -> &str {
        (**self).name()
    }
}

/// Who flies the capsule this episode. Picked once, at spawn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PolicyMode {
    Trained,
    Heuristic,
}

impl PolicyMode {
    pub fn for_training(is_training: bool) -> Self {
        if is_training {
            PolicyMode::Trained
        } else {
            PolicyMode::Heuristic
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Idle;

    impl Agent for Idle {
        fn act(&mut self, _observation: &Observation) -> ThrusterCommand {
            ThrusterCommand::idle(2)
        }
    }

    #[test]
    fn boxed_agent_delegates() {
        let mut agent: Box<dyn Agent> = Box::new(Idle);
        let obs = Observation([0.0; crate::dynamics::state::OBSERVATION_LEN]);
        assert_eq!(agent.act(&obs), ThrusterCommand::idle(2));
        assert_eq!(agent.name(), "unnamed");
    }

    #[test]
    fn training_flag_selects_mode() {
        assert_eq!(PolicyMode::for_training(true), PolicyMode::Trained);
        assert_eq!(PolicyMode::for_training(false), PolicyMode::Heuristic);
    }
}
