pub mod rigid_body;
pub mod state;

pub use state::{BodyState, CapsuleState, Deriv, Observation, ThrusterCommand, OBSERVATION_LEN};
