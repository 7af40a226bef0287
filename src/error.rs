use thiserror::Error;

use crate::sim::episode::SimulationState;

/// Errors raised by the simulation core.
///
/// Only fatal conditions are represented here. Unreliable physics input
/// (duplicate contacts, repeated terminal triggers) is tolerated silently.
#[derive(Debug, Error)]
pub enum SimError {
    #[error("transition {from:?} -> {to:?} is not in the transition table")]
    InvalidTransition {
        from: SimulationState,
        to: SimulationState,
    },
    #[error("unknown simulation state ordinal {0}")]
    UnknownState(u8),
    #[error("invalid training area: {0}")]
    InvalidArea(String),
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("invalid vehicle: {0}")]
    InvalidVehicle(String),
    #[error("no vehicle is spawned")]
    NoVehicle,
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, SimError>;
