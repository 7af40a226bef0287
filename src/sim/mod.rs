pub mod area;
pub mod contact;
pub mod episode;
pub mod event;
pub mod integrator;
pub mod orchestrator;
pub mod reward;
pub mod runner;
pub mod termination;

pub use area::{FloorBounds, LandingZone, TrainingArea};
pub use contact::{LandingContactTracker, LandingState, LegContactState};
pub use episode::{
    ChannelObserver, EpisodeStateMachine, SimulationData, SimulationObserver, SimulationSnapshot,
    SimulationState, TracingObserver,
};
pub use event::{ColliderKind, ContactEvent, ContactPhase, StepReport, SurfaceKind};
pub use integrator::rk4_step;
pub use orchestrator::{EpisodeEnd, SimulationOrchestrator, StepOutcome};
pub use reward::{falloff, RewardModel};
pub use runner::{run_episode, run_episodes, EpisodeRecord, EpisodeSummary, TickRecord};
pub use termination::{CrashCause, TerminationDetector, TerminationInput, Verdict};

pub use crate::error::Result;
