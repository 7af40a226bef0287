use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use crate::dynamics::state::{Observation, ThrusterCommand};
use crate::sim::episode::SimulationState;
use super::agent::Agent;

/// Seeded exploration policy: each thruster fires independently with a
/// fixed probability. Stands in for an untrained learner; it keeps the
/// rewards it receives so runs can be compared.
#[derive(Debug, Clone)]
pub struct RandomPilot {
    thrusters: usize,
    fire_probability: f64,
    rng: ChaCha8Rng,
    episode_return: f64,
    returns: Vec<f64>,
}

impl RandomPilot {
    pub fn new(thrusters: usize, fire_probability: f64, seed: u64) -> Self {
        Self {
            thrusters,
            fire_probability: fire_probability.clamp(0.0, 1.0),
            rng: ChaCha8Rng::seed_from_u64(seed),
            episode_return: 0.0,
            returns: Vec::new(),
        }
    }

    /// Sum of rewards of every finished episode, in order.
    pub fn returns(&self) -> &[f64] {
        &self.returns
    }
}

impl Agent for RandomPilot {
    fn on_episode_begin(&mut self, _episode: u64) {
        self.episode_return = 0.0;
    }

    fn act(&mut self, _observation: &Observation) -> ThrusterCommand {
        let p = self.fire_probability;
        ThrusterCommand {
            fire: (0..self.thrusters).map(|_| self.rng.gen_bool(p)).collect(),
        }
    }

    fn add_reward(&mut self, reward: f64) {
        self.episode_return += reward;
    }

    fn end_episode(&mut self, _outcome: SimulationState) {
        self.returns.push(self.episode_return);
    }

    fn name(&self) -> &str {
        "RandomPilot"
    }
}
