use std::sync::{Arc, Mutex};

use nalgebra::{UnitQuaternion, Vector3};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use tracing::{debug, info};

use crate::config::SimulationConfig;
use crate::control::{Agent, HeuristicPilot, PolicyMode};
use crate::dynamics::state::{BodyState, CapsuleState, Observation};
use crate::error::{Result, SimError};
use crate::feedback::{PadFeedback, Rgb};
use crate::physics::{PhysicsEngine, SandboxEngine};
use crate::vehicle::{presets, Capsule};

use super::area::TrainingArea;
use super::contact::LandingContactTracker;
use super::episode::{EpisodeStateMachine, SimulationObserver, SimulationState};
use super::event::ContactEvent;
use super::reward::RewardModel;
use super::termination::{TerminationDetector, TerminationInput, Verdict};

// ---------------------------------------------------------------------------
// Tick results
// ---------------------------------------------------------------------------

/// How an episode ended.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EpisodeEnd {
    pub outcome: SimulationState,
    pub verdict: Verdict,
    /// Terminal score of the outcome snapshot.
    pub score: f64,
}

/// What the agent boundary sees after one host tick.
#[derive(Debug, Clone)]
pub struct StepOutcome {
    pub episode: u64,
    /// Observation for the next `act`.
    pub observation: Observation,
    /// Sum of all scores emitted during this tick.
    pub reward: f64,
    /// State after the tick, automatic transitions included.
    pub state: SimulationState,
    /// Last known body state. Still set on the tick that despawns the
    /// vehicle; `None` only before the first spawn.
    pub body: Option<BodyState>,
    /// Set on the tick that ended the episode.
    pub end: Option<EpisodeEnd>,
}

impl StepOutcome {
    pub fn done(&self) -> bool {
        self.end.is_some()
    }
}

// ---------------------------------------------------------------------------
// Orchestrator
// ---------------------------------------------------------------------------

/// One training area's simulation: wires the vehicle, the physics engine,
/// the classifiers and the agents to an episode state machine.
///
/// Every instance owns its context outright, so any number of them can run
/// side by side on separate threads.
///
/// Restart is split across host ticks: the tick that ends an episode
/// despawns the vehicle, the next tick re-initialises and spawns it.
pub struct SimulationOrchestrator<E: PhysicsEngine = SandboxEngine> {
    area: TrainingArea,
    config: SimulationConfig,
    capsule: Capsule,
    engine: E,
    policy: Box<dyn Agent + Send>,
    heuristic: Box<dyn Agent + Send>,
    mode: PolicyMode,
    machine: EpisodeStateMachine,
    tracker: LandingContactTracker,
    detector: TerminationDetector,
    rng: ChaCha8Rng,
    awaiting_spawn: bool,
    steps: u64,
    body: Option<BodyState>,
    pad_color: Arc<Mutex<Option<Rgb>>>,
}

impl SimulationOrchestrator<SandboxEngine> {
    /// Preset capsule on the sandbox engine.
    pub fn sandbox(
        area: TrainingArea,
        config: SimulationConfig,
        policy: Box<dyn Agent + Send>,
    ) -> Result<Self> {
        let engine = SandboxEngine::new(config.physics.clone(), area.landing_zone);
        Self::new(area, config, presets::capsule(), engine, policy)
    }
}

impl<E: PhysicsEngine> SimulationOrchestrator<E> {
    /// Fails on a malformed area, an invalid config or an invalid capsule.
    pub fn new(
        area: TrainingArea,
        config: SimulationConfig,
        capsule: Capsule,
        engine: E,
        policy: Box<dyn Agent + Send>,
    ) -> Result<Self> {
        area.validate()?;
        config.validate()?;
        capsule.validate()?;

        let heuristic = HeuristicPilot::new(
            &capsule,
            area.landing_zone.center,
            config.physics.gravity,
            config.dt,
        );
        let mut machine = EpisodeStateMachine::new(RewardModel::new(config.reward.clone()));
        let pad = PadFeedback::new(config.is_training);
        let pad_color = pad.handle();
        machine.subscribe(pad);

        let seed = config.seed.wrapping_add(area.index as u64);
        Ok(Self {
            tracker: LandingContactTracker::new(capsule.leg_count()),
            detector: TerminationDetector::new(config.termination.max_landing_speed),
            mode: PolicyMode::for_training(config.is_training),
            rng: ChaCha8Rng::seed_from_u64(seed),
            area,
            config,
            capsule,
            engine,
            policy,
            heuristic: Box::new(heuristic),
            machine,
            awaiting_spawn: true,
            steps: 0,
            body: None,
            pad_color,
        })
    }

    /// Replace the pilot used in heuristic mode.
    pub fn with_heuristic(mut self, pilot: Box<dyn Agent + Send>) -> Self {
        self.heuristic = pilot;
        self
    }

    pub fn subscribe(&mut self, observer: impl SimulationObserver + Send + 'static) {
        self.machine.subscribe(observer);
    }

    pub fn area(&self) -> &TrainingArea {
        &self.area
    }

    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    pub fn capsule(&self) -> &Capsule {
        &self.capsule
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    pub fn machine(&self) -> &EpisodeStateMachine {
        &self.machine
    }

    pub fn state(&self) -> SimulationState {
        self.machine.state()
    }

    pub fn episode(&self) -> u64 {
        self.machine.data().episode()
    }

    pub fn mode(&self) -> PolicyMode {
        self.mode
    }

    /// Physics steps taken in the current episode.
    pub fn steps(&self) -> u64 {
        self.steps
    }

    /// Last colour the pad feedback produced, if any.
    pub fn pad_color(&self) -> Option<Rgb> {
        self.pad_color.lock().ok().and_then(|c| *c)
    }

    pub fn policy(&self) -> &(dyn Agent + Send) {
        self.policy.as_ref()
    }

    /// Advance one host tick.
    ///
    /// Either completes a pending (re)start, or runs one physics step and
    /// classifies it.
    pub fn tick(&mut self) -> Result<StepOutcome> {
        if self.awaiting_spawn {
            self.begin_episode()?;
            let reward = self.machine.take_reward();
            self.pilot().add_reward(reward);
            return Ok(self.outcome(reward, None));
        }

        let observation = self
            .body
            .as_ref()
            .map(Observation::from_body)
            .ok_or(SimError::NoVehicle)?;
        let command = self.pilot().act(&observation);
        self.engine.apply(&command);
        let report = self.engine.step(self.config.dt)?;
        self.steps += 1;

        for contact in &report.contacts {
            self.tracker.apply(contact);
        }
        self.machine
            .update_capsule(CapsuleState::measure(&report.body, &self.area.landing_zone.center));

        let collisions: Vec<ContactEvent> = report.collisions().copied().collect();
        let input = TerminationInput {
            position: &report.body.pos,
            bounds: &self.area.floor,
            collisions: &collisions,
            at_rest: report.at_rest,
            landing: self.tracker.classify(),
        };
        let mut verdict = self.detector.evaluate(&input);
        if !verdict.is_terminal() && self.steps >= self.config.max_steps {
            debug!(area = self.area.index, steps = self.steps, "step cap reached");
            verdict = self.detector.abort();
        }
        self.body = Some(report.body);

        let end = self.conclude(verdict)?;
        let reward = self.machine.take_reward();
        self.pilot().add_reward(reward);
        if let Some(end) = end {
            self.pilot().end_episode(end.outcome);
        }
        Ok(self.outcome(reward, end))
    }

    /// Cancel the running episode as a crash. Returns the end record when an
    /// episode was actually in flight.
    pub fn abort(&mut self) -> Result<Option<EpisodeEnd>> {
        if self.machine.state() != SimulationState::Flying {
            return Ok(None);
        }
        let verdict = self.detector.abort();
        let end = self.conclude(verdict)?;
        let reward = self.machine.take_reward();
        self.pilot().add_reward(reward);
        if let Some(end) = end {
            self.pilot().end_episode(end.outcome);
        }
        Ok(end)
    }

    /// Feed a verdict to the state machine; on a terminal one, record the
    /// outcome and despawn the vehicle.
    fn conclude(&mut self, verdict: Verdict) -> Result<Option<EpisodeEnd>> {
        let Some(outcome) = verdict.target_state() else {
            return Ok(None);
        };
        if !self.machine.apply_verdict(verdict)? {
            return Ok(None);
        }
        let score = self.machine.model().terminal_reward(self.machine.data().capsule());
        info!(
            area = self.area.index,
            episode = self.episode(),
            outcome = ?outcome,
            steps = self.steps,
            score,
            "episode finished"
        );
        if self.machine.state() == SimulationState::Restarting {
            self.engine.despawn();
            self.awaiting_spawn = true;
        }
        Ok(Some(EpisodeEnd { outcome, verdict, score }))
    }

    /// `None`/`Restarting` → `Starting` → spawn → `Flying`.
    fn begin_episode(&mut self) -> Result<()> {
        match self.machine.state() {
            SimulationState::None => self.machine.start()?,
            SimulationState::Restarting => self.machine.restart()?,
            _ => {}
        }

        self.area.validate()?;
        let initial = self.spawn_pose();
        self.engine.spawn(&self.capsule, initial.clone())?;
        self.tracker = LandingContactTracker::new(self.capsule.leg_count());
        self.detector = TerminationDetector::new(self.config.termination.max_landing_speed);
        self.steps = 0;
        self.mode = PolicyMode::for_training(self.config.is_training);
        self.body = Some(initial);
        self.awaiting_spawn = false;

        self.machine.transition_to(SimulationState::Flying)?;
        let episode = self.episode();
        info!(area = self.area.index, episode, mode = ?self.mode, "episode start");
        self.pilot().on_episode_begin(episode);
        Ok(())
    }

    /// Random spawn pose inside the floor shrunk by the start offset.
    fn spawn_pose(&mut self) -> BodyState {
        let spawn = &self.config.spawn;
        let bounds = self.area.floor.shrink(spawn.start_offset);
        let max_rot = spawn.max_initial_rotation_deg.to_radians();

        let x = uniform(&mut self.rng, bounds.min_x, bounds.max_x);
        let y = uniform(&mut self.rng, bounds.min_y, bounds.max_y);
        let roll = uniform(&mut self.rng, -max_rot, max_rot);
        let pitch = uniform(&mut self.rng, -max_rot, max_rot);
        let speed = spawn.max_initial_speed * self.rng.gen::<f64>();

        let mut body = BodyState::at_rest(Vector3::new(x, y, spawn.initial_height));
        body.quat = UnitQuaternion::from_axis_angle(&Vector3::x_axis(), roll)
            * UnitQuaternion::from_axis_angle(&Vector3::y_axis(), pitch);
        body.vel = -body.body_up() * speed;
        body
    }

    fn pilot(&mut self) -> &mut dyn Agent {
        match self.mode {
            PolicyMode::Trained => self.policy.as_mut(),
            PolicyMode::Heuristic => self.heuristic.as_mut(),
        }
    }

    fn outcome(&self, reward: f64, end: Option<EpisodeEnd>) -> StepOutcome {
        let observation = self
            .body
            .as_ref()
            .map(Observation::from_body)
            .unwrap_or(Observation([0.0; crate::dynamics::state::OBSERVATION_LEN]));
        StepOutcome {
            episode: self.episode(),
            observation,
            reward,
            state: self.machine.state(),
            body: self.body.clone(),
            end,
        }
    }
}

fn uniform(rng: &mut ChaCha8Rng, lo: f64, hi: f64) -> f64 {
    if hi > lo {
        rng.gen_range(lo..=hi)
    } else {
        lo
    }
}
