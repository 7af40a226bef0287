pub mod sandbox;

pub use sandbox::SandboxEngine;

use crate::dynamics::state::{BodyState, ThrusterCommand};
use crate::error::Result;
use crate::sim::event::StepReport;
use crate::vehicle::Capsule;

/// Physics-engine boundary.
///
/// The simulation core never integrates motion itself: it spawns a body,
/// hands over thruster flags, advances one fixed step and reads back the
/// body state, the contact events of that step and the sleep signal.
pub trait PhysicsEngine {
    /// Create the vehicle body. Replaces any body still present.
    fn spawn(&mut self, capsule: &Capsule, initial: BodyState) -> Result<()>;

    /// Destroy the vehicle body. No-op when nothing is spawned.
    fn despawn(&mut self);

    fn is_spawned(&self) -> bool;

    /// Thruster flags held for the next step.
    fn apply(&mut self, command: &ThrusterCommand);

    /// Advance one fixed step. Fails with `SimError::NoVehicle` when nothing
    /// is spawned.
    fn step(&mut self, dt: f64) -> Result<StepReport>;

    fn name(&self) -> &str {
        "unnamed"
    }
}
