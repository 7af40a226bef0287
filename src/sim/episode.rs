use std::sync::mpsc::Sender;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::dynamics::state::CapsuleState;
use crate::error::{Result, SimError};

use super::reward::RewardModel;
use super::termination::Verdict;

// ---------------------------------------------------------------------------
// Simulation state
// ---------------------------------------------------------------------------

/// Episode phase. Only `EpisodeStateMachine` mutates it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum SimulationState {
    None = 0,
    Starting = 1,
    Flying = 2,
    Crashed = 3,
    LandedOnGround = 4,
    LandedOnLandingZone = 5,
    Finished = 6,
    Restarting = 7,
}

impl SimulationState {
    /// Physical outcomes of an episode.
    pub fn is_outcome(self) -> bool {
        matches!(self, Self::Crashed | Self::LandedOnGround | Self::LandedOnLandingZone)
    }

    /// Transition table. `Restarting -> None` is only taken by `restart`.
    pub fn successors(self) -> &'static [SimulationState] {
        use SimulationState::*;
        match self {
            None => &[Starting],
            Starting => &[Flying],
            Flying => &[Crashed, LandedOnGround, LandedOnLandingZone],
            Crashed | LandedOnGround | LandedOnLandingZone => &[Finished],
            Finished => &[Restarting],
            Restarting => &[None],
        }
    }

    pub fn can_transition_to(self, to: SimulationState) -> bool {
        self.successors().contains(&to)
    }
}

impl TryFrom<u8> for SimulationState {
    type Error = SimError;

    fn try_from(value: u8) -> Result<Self> {
        use SimulationState::*;
        Ok(match value {
            0 => None,
            1 => Starting,
            2 => Flying,
            3 => Crashed,
            4 => LandedOnGround,
            5 => LandedOnLandingZone,
            6 => Finished,
            7 => Restarting,
            other => return Err(SimError::UnknownState(other)),
        })
    }
}

// ---------------------------------------------------------------------------
// Simulation data and snapshots
// ---------------------------------------------------------------------------

/// Per-episode data. Created fresh for every episode, never reused.
#[derive(Debug, Clone, PartialEq)]
pub struct SimulationData {
    episode: u64,
    state: SimulationState,
    capsule: CapsuleState,
    previous: CapsuleState,
}

impl SimulationData {
    pub fn new(episode: u64) -> Self {
        Self {
            episode,
            state: SimulationState::None,
            capsule: CapsuleState::UNKNOWN,
            previous: CapsuleState::UNKNOWN,
        }
    }

    pub fn episode(&self) -> u64 { self.episode }
    pub fn state(&self) -> SimulationState { self.state }
    pub fn capsule(&self) -> &CapsuleState { &self.capsule }
    pub fn previous(&self) -> &CapsuleState { &self.previous }

    /// Derived, never stored.
    pub fn score(&self, model: &RewardModel) -> f64 {
        model.score(self.state, &self.capsule, &self.previous)
    }

    fn set_capsule(&mut self, capsule: CapsuleState) {
        self.previous = self.capsule;
        self.capsule = capsule;
    }
}

/// Immutable copy of `SimulationData` handed to observers, score included.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SimulationSnapshot {
    pub episode: u64,
    pub state: SimulationState,
    pub capsule: CapsuleState,
    pub previous: CapsuleState,
    pub score: f64,
}

// ---------------------------------------------------------------------------
// Observers
// ---------------------------------------------------------------------------

/// Receives every accepted state change and capsule update, synchronously,
/// on the thread that owns the state machine.
pub trait SimulationObserver {
    fn on_simulation_data_changed(&mut self, snapshot: &SimulationSnapshot);
}

impl<F> SimulationObserver for F
where
    F: FnMut(&SimulationSnapshot),
{
    fn on_simulation_data_changed(&mut self, snapshot: &SimulationSnapshot) {
        self(snapshot)
    }
}

/// Forwards owned snapshots to another thread. A hung-up receiver is ignored.
pub struct ChannelObserver(pub Sender<SimulationSnapshot>);

impl SimulationObserver for ChannelObserver {
    fn on_simulation_data_changed(&mut self, snapshot: &SimulationSnapshot) {
        let _ = self.0.send(*snapshot);
    }
}

/// Debug log line per notification.
#[derive(Debug, Default)]
pub struct TracingObserver;

impl SimulationObserver for TracingObserver {
    fn on_simulation_data_changed(&mut self, s: &SimulationSnapshot) {
        debug!(
            episode = s.episode,
            state = ?s.state,
            distance = s.capsule.distance_to_target,
            angle = s.capsule.tilt_angle,
            speed = s.capsule.speed,
            score = s.score,
            "simulation data changed"
        );
    }
}

// ---------------------------------------------------------------------------
// Episode state machine
// ---------------------------------------------------------------------------

/// Owns the episode phase and capsule metrics.
///
/// Single-threaded and synchronous: every accepted change notifies all
/// observers before any chained automatic transition runs
/// (outcome → Finished → Restarting). Scores of emitted snapshots accumulate
/// until `take_reward` collects them.
pub struct EpisodeStateMachine {
    data: SimulationData,
    model: RewardModel,
    observers: Vec<Box<dyn SimulationObserver + Send>>,
    pending_reward: f64,
}

impl EpisodeStateMachine {
    /// New machine in `None`, with the tracing observer attached.
    pub fn new(model: RewardModel) -> Self {
        Self {
            data: SimulationData::new(0),
            model,
            observers: vec![Box::new(TracingObserver)],
            pending_reward: 0.0,
        }
    }

    pub fn subscribe(&mut self, observer: impl SimulationObserver + Send + 'static) {
        self.observers.push(Box::new(observer));
    }

    pub fn state(&self) -> SimulationState {
        self.data.state
    }

    pub fn data(&self) -> &SimulationData {
        &self.data
    }

    pub fn model(&self) -> &RewardModel {
        &self.model
    }

    pub fn score(&self) -> f64 {
        self.data.score(&self.model)
    }

    pub fn snapshot(&self) -> SimulationSnapshot {
        SimulationSnapshot {
            episode: self.data.episode,
            state: self.data.state,
            capsule: self.data.capsule,
            previous: self.data.previous,
            score: self.score(),
        }
    }

    /// `None -> Starting`.
    pub fn start(&mut self) -> Result<()> {
        self.transition_to(SimulationState::Starting)
    }

    /// Move to `new_state`, then run the automatic chain.
    ///
    /// Re-entering the current state is a silent no-op. A change outside the
    /// transition table is a configuration error.
    pub fn transition_to(&mut self, new_state: SimulationState) -> Result<()> {
        let from = self.data.state;
        if new_state == from {
            return Ok(());
        }
        if !from.can_transition_to(new_state) || new_state == SimulationState::None {
            return Err(SimError::InvalidTransition { from, to: new_state });
        }

        self.data.state = new_state;
        if new_state.is_outcome() {
            info!(
                episode = self.data.episode,
                outcome = ?new_state,
                score = self.score(),
                "episode outcome"
            );
        }
        self.notify();

        match new_state {
            SimulationState::Crashed
            | SimulationState::LandedOnGround
            | SimulationState::LandedOnLandingZone => self.transition_to(SimulationState::Finished),
            SimulationState::Finished => self.transition_to(SimulationState::Restarting),
            _ => Ok(()),
        }
    }

    /// Apply a termination verdict. Only a flying episode can end; anything
    /// else (already terminal, restarting, `Continue`) returns `Ok(false)`.
    pub fn apply_verdict(&mut self, verdict: Verdict) -> Result<bool> {
        if self.data.state != SimulationState::Flying {
            return Ok(false);
        }
        match verdict.target_state() {
            Some(target) => {
                self.transition_to(target)?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Replace the capsule metrics; notifies only when they changed.
    pub fn update_capsule(&mut self, capsule: CapsuleState) -> bool {
        if self.data.capsule == capsule {
            return false;
        }
        self.data.set_capsule(capsule);
        self.notify();
        true
    }

    /// `Restarting -> None -> Starting` with fresh data for the next episode.
    /// The swap to `None` is silent; `Starting` notifies as usual.
    pub fn restart(&mut self) -> Result<()> {
        if self.data.state != SimulationState::Restarting {
            return Err(SimError::InvalidTransition {
                from: self.data.state,
                to: SimulationState::None,
            });
        }
        self.data = SimulationData::new(self.data.episode + 1);
        self.transition_to(SimulationState::Starting)
    }

    /// Reward emitted since the last call.
    pub fn take_reward(&mut self) -> f64 {
        std::mem::take(&mut self.pending_reward)
    }

    fn notify(&mut self) {
        let snapshot = self.snapshot();
        self.pending_reward += snapshot.score;
        for observer in self.observers.iter_mut() {
            observer.on_simulation_data_changed(&snapshot);
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::contact::LandingState;
    use crate::sim::termination::CrashCause;
    use std::sync::{mpsc, Arc, Mutex};

    fn recording_machine() -> (EpisodeStateMachine, Arc<Mutex<Vec<SimulationSnapshot>>>) {
        let log = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&log);
        let mut sm = EpisodeStateMachine::new(RewardModel::default());
        sm.subscribe(move |s: &SimulationSnapshot| sink.lock().unwrap().push(*s));
        (sm, log)
    }

    fn states(log: &Arc<Mutex<Vec<SimulationSnapshot>>>) -> Vec<SimulationState> {
        log.lock().unwrap().iter().map(|s| s.state).collect()
    }

    fn flying(sm: &mut EpisodeStateMachine) {
        sm.start().unwrap();
        sm.transition_to(SimulationState::Flying).unwrap();
    }

    #[test]
    fn crash_chains_to_restarting_with_one_notification_each() {
        let (mut sm, log) = recording_machine();
        flying(&mut sm);
        sm.transition_to(SimulationState::Crashed).unwrap();
        assert_eq!(sm.state(), SimulationState::Restarting);
        assert_eq!(
            states(&log),
            vec![
                SimulationState::Starting,
                SimulationState::Flying,
                SimulationState::Crashed,
                SimulationState::Finished,
                SimulationState::Restarting,
            ]
        );
    }

    #[test]
    fn same_state_is_noop() {
        let (mut sm, log) = recording_machine();
        flying(&mut sm);
        sm.transition_to(SimulationState::Flying).unwrap();
        assert_eq!(log.lock().unwrap().len(), 2);
    }

    #[test]
    fn flying_only_reaches_outcomes() {
        use SimulationState::*;
        assert_eq!(Flying.successors(), &[Crashed, LandedOnGround, LandedOnLandingZone]);
        let (mut sm, _) = recording_machine();
        flying(&mut sm);
        for bad in [None, Starting, Finished, Restarting] {
            assert!(matches!(
                sm.transition_to(bad),
                Err(SimError::InvalidTransition { from: Flying, .. })
            ));
        }
        assert_eq!(sm.state(), Flying);
    }

    #[test]
    fn outcomes_reach_finished_then_restarting() {
        use SimulationState::*;
        for outcome in [Crashed, LandedOnGround, LandedOnLandingZone] {
            let (mut sm, log) = recording_machine();
            flying(&mut sm);
            sm.transition_to(outcome).unwrap();
            let seen = states(&log);
            let at = seen.iter().position(|s| *s == outcome).unwrap();
            assert_eq!(seen[at + 1], Finished);
            assert_eq!(seen[at + 2], Restarting);
        }
    }

    #[test]
    fn terminal_trigger_twice_emits_once() {
        let (mut sm, log) = recording_machine();
        flying(&mut sm);
        sm.take_reward();
        let verdict = Verdict::Crashed(CrashCause::BodyContact);
        assert!(sm.apply_verdict(verdict).unwrap());
        let reward = sm.take_reward();
        assert!(!sm.apply_verdict(verdict).unwrap());
        assert_eq!(sm.take_reward(), 0.0);
        let crashes = states(&log).iter().filter(|s| **s == SimulationState::Crashed).count();
        assert_eq!(crashes, 1);
        // Capsule never measured → every sub-reward floored.
        assert!((reward + 1.0).abs() < 1e-12);
    }

    #[test]
    fn landed_snapshot_carries_terminal_score() {
        let (mut sm, log) = recording_machine();
        flying(&mut sm);
        sm.update_capsule(CapsuleState { distance_to_target: 0.0, tilt_angle: 0.0, speed: 0.0 });
        sm.apply_verdict(Verdict::Landed(LandingState::OnLandingZone)).unwrap();
        let log = log.lock().unwrap();
        let landed = log.iter().find(|s| s.state == SimulationState::LandedOnLandingZone).unwrap();
        assert!((landed.score - 1.0).abs() < 1e-12);
        let finished = log.iter().find(|s| s.state == SimulationState::Finished).unwrap();
        assert_eq!(finished.score, 0.0);
    }

    #[test]
    fn flying_capsule_updates_emit_step_reward() {
        let (mut sm, _) = recording_machine();
        flying(&mut sm);
        sm.take_reward();
        let far = CapsuleState { distance_to_target: 30.0, tilt_angle: 2.0, speed: 10.0 };
        let near = CapsuleState { distance_to_target: 29.0, ..far };
        sm.update_capsule(far); // previous is the unknown sentinel: counts as progress
        assert!((sm.take_reward() - 0.05).abs() < 1e-12);
        assert!(!sm.update_capsule(far), "unchanged metrics don't notify");
        assert_eq!(sm.take_reward(), 0.0);
        sm.update_capsule(near);
        assert!((sm.take_reward() - 0.05).abs() < 1e-12);
        sm.update_capsule(far);
        assert!((sm.take_reward() + 0.05).abs() < 1e-12);
        assert_eq!(sm.data().previous(), &near);
    }

    #[test]
    fn restart_starts_fresh_episode() {
        let (mut sm, log) = recording_machine();
        flying(&mut sm);
        sm.update_capsule(CapsuleState { distance_to_target: 3.0, tilt_angle: 1.0, speed: 1.0 });
        sm.transition_to(SimulationState::LandedOnGround).unwrap();
        sm.restart().unwrap();
        assert_eq!(sm.state(), SimulationState::Starting);
        assert_eq!(sm.data().episode(), 1);
        assert_eq!(sm.data().capsule(), &CapsuleState::UNKNOWN);
        assert!(!states(&log).contains(&SimulationState::None));
    }

    #[test]
    fn restart_outside_restarting_rejected() {
        let (mut sm, _) = recording_machine();
        flying(&mut sm);
        assert!(sm.restart().is_err());
    }

    #[test]
    fn unknown_ordinal_rejected() {
        assert_eq!(SimulationState::try_from(5).unwrap(), SimulationState::LandedOnLandingZone);
        assert!(matches!(SimulationState::try_from(8), Err(SimError::UnknownState(8))));
    }

    #[test]
    fn channel_observer_hands_off_copies() {
        let (tx, rx) = mpsc::channel();
        let mut sm = EpisodeStateMachine::new(RewardModel::default());
        sm.subscribe(ChannelObserver(tx));
        let handle = std::thread::spawn(move || rx.iter().map(|s| s.state).collect::<Vec<_>>());
        flying(&mut sm);
        sm.apply_verdict(Verdict::OutOfBounds).unwrap();
        drop(sm);
        let seen = handle.join().unwrap();
        assert_eq!(seen.last(), Some(&SimulationState::Restarting));
        assert!(seen.contains(&SimulationState::Crashed));
    }

    #[test]
    fn repeated_score_reads_are_pure() {
        let (mut sm, _) = recording_machine();
        flying(&mut sm);
        sm.update_capsule(CapsuleState { distance_to_target: 5.0, tilt_angle: 5.0, speed: 5.0 });
        sm.take_reward();
        let a = sm.score();
        let b = sm.score();
        assert_eq!(a, b);
        assert_eq!(sm.take_reward(), 0.0);
    }
}
