pub mod config;
pub mod control;
pub mod dynamics;
pub mod error;
pub mod feedback;
pub mod physics;
pub mod sim;
pub mod vehicle;

pub use config::SimulationConfig;
pub use error::{Result, SimError};

// Flat re-exports of the types most callers touch
pub mod types {
    pub use crate::control::{Agent, PolicyMode};
    pub use crate::dynamics::state::{BodyState, CapsuleState, Observation, ThrusterCommand};
    pub use crate::sim::area::TrainingArea;
    pub use crate::sim::episode::{SimulationSnapshot, SimulationState};
    pub use crate::sim::orchestrator::{SimulationOrchestrator, StepOutcome};
    pub use crate::vehicle::Capsule;
}
