use serde::Serialize;

use crate::dynamics::state::BodyState;
use crate::error::Result;
use crate::physics::PhysicsEngine;

use super::episode::SimulationState;
use super::orchestrator::SimulationOrchestrator;
use super::termination::Verdict;

// ---------------------------------------------------------------------------
// Episode records
// ---------------------------------------------------------------------------

/// One host tick of a recorded episode.
#[derive(Debug, Clone)]
pub struct TickRecord {
    pub body: BodyState,
    pub reward: f64,
    pub state: SimulationState,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct EpisodeSummary {
    pub area: usize,
    pub episode: u64,
    pub outcome: SimulationState,
    pub verdict: Verdict,
    /// Physics steps taken
    pub steps: u64,
    /// Every reward forwarded to the agent during the episode
    pub total_reward: f64,
    /// Score of the outcome snapshot alone
    pub terminal_score: f64,
}

#[derive(Debug, Clone)]
pub struct EpisodeRecord {
    pub ticks: Vec<TickRecord>,
    pub summary: EpisodeSummary,
}

impl EpisodeRecord {
    pub fn cumulative_reward(&self) -> Vec<f64> {
        self.ticks
            .iter()
            .scan(0.0, |acc, t| {
                *acc += t.reward;
                Some(*acc)
            })
            .collect()
    }
}

// ---------------------------------------------------------------------------
// Episode driver
// ---------------------------------------------------------------------------

/// Tick the orchestrator until the current (or next) episode ends.
///
/// Terminates: the step cap aborts any episode that has not ended by itself.
pub fn run_episode<E: PhysicsEngine>(orch: &mut SimulationOrchestrator<E>) -> Result<EpisodeRecord> {
    let capacity = (orch.config().max_steps as usize + 1).min(200_000);
    let mut ticks = Vec::with_capacity(capacity);
    let mut total_reward = 0.0;

    loop {
        let out = orch.tick()?;
        total_reward += out.reward;
        if let Some(body) = out.body.clone() {
            ticks.push(TickRecord { body, reward: out.reward, state: out.state });
        }
        if let Some(end) = out.end {
            let summary = EpisodeSummary {
                area: orch.area().index,
                episode: out.episode,
                outcome: end.outcome,
                verdict: end.verdict,
                steps: orch.steps(),
                total_reward,
                terminal_score: end.score,
            };
            return Ok(EpisodeRecord { ticks, summary });
        }
    }
}

/// Run `episodes` consecutive episodes.
pub fn run_episodes<E: PhysicsEngine>(
    orch: &mut SimulationOrchestrator<E>,
    episodes: usize,
) -> Result<Vec<EpisodeRecord>> {
    (0..episodes).map(|_| run_episode(orch)).collect()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
