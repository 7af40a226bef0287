use nalgebra::Vector3;
use serde::{Deserialize, Serialize};

use super::area::FloorBounds;
use super::contact::LandingState;
use super::episode::SimulationState;
use super::event::{ColliderKind, ContactEvent};

// ---------------------------------------------------------------------------
// Termination verdicts
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum CrashCause {
    /// A non-leg collider touched something.
    BodyContact,
    /// Impact relative speed above the landing limit.
    HardImpact { speed: f64 },
    /// Episode cancelled by the host (step cap, external request).
    Aborted,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Verdict {
    Continue,
    OutOfBounds,
    Crashed(CrashCause),
    Landed(LandingState),
}

impl Verdict {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Verdict::Continue)
    }

    /// Simulation state a terminal verdict drives the episode into.
    /// Leaving the floor counts as a crash.
    pub fn target_state(&self) -> Option<SimulationState> {
        match self {
            Verdict::Continue => None,
            Verdict::OutOfBounds | Verdict::Crashed(_) => Some(SimulationState::Crashed),
            Verdict::Landed(LandingState::OnLandingZone) => Some(SimulationState::LandedOnLandingZone),
            Verdict::Landed(LandingState::OnGround) => Some(SimulationState::LandedOnGround),
            Verdict::Landed(LandingState::None | LandingState::InAir) => None,
        }
    }
}

/// Inputs for one evaluation, all sampled after the same physics step.
#[derive(Debug, Clone, Copy)]
pub struct TerminationInput<'a> {
    pub position: &'a Vector3<f64>,
    pub bounds: &'a FloorBounds,
    /// Contact-begin events of this step.
    pub collisions: &'a [ContactEvent],
    /// Engine sleep signal.
    pub at_rest: bool,
    pub landing: LandingState,
}

// ---------------------------------------------------------------------------
// Termination detector
// ---------------------------------------------------------------------------

/// Classifies each physics step as continuing or terminal.
///
/// Precedence within one step: out-of-bounds, then crash, then landed.
/// The detector latches: after the first terminal verdict every later call
/// returns `Continue`, so a vehicle can only end its episode once.
#[derive(Debug, Clone)]
pub struct TerminationDetector {
    pub max_landing_speed: f64,
    fired: Option<Verdict>,
}

impl TerminationDetector {
    pub fn new(max_landing_speed: f64) -> Self {
        Self { max_landing_speed, fired: None }
    }

    pub fn has_fired(&self) -> bool {
        self.fired.is_some()
    }

    pub fn verdict(&self) -> Option<Verdict> {
        self.fired
    }

    pub fn evaluate(&mut self, input: &TerminationInput<'_>) -> Verdict {
        if self.fired.is_some() {
            return Verdict::Continue;
        }
        let verdict = self.classify(input);
        self.latch(verdict)
    }

    /// Inject a terminal verdict from outside the physics loop.
    pub fn abort(&mut self) -> Verdict {
        if self.fired.is_some() {
            return Verdict::Continue;
        }
        self.latch(Verdict::Crashed(CrashCause::Aborted))
    }

    fn classify(&self, input: &TerminationInput<'_>) -> Verdict {
        if !input.bounds.contains(input.position.x, input.position.y) {
            return Verdict::OutOfBounds;
        }
        if let Some(cause) = self.crash_cause(input.collisions) {
            return Verdict::Crashed(cause);
        }
        if input.at_rest && input.landing.is_landed() {
            return Verdict::Landed(input.landing);
        }
        Verdict::Continue
    }

    /// First crashing collision of the step; the rest are moot.
    fn crash_cause(&self, collisions: &[ContactEvent]) -> Option<CrashCause> {
        collisions.iter().filter(|c| c.is_begin()).find_map(|c| {
            if c.collider == ColliderKind::Body {
                Some(CrashCause::BodyContact)
            } else if c.relative_speed > self.max_landing_speed {
                Some(CrashCause::HardImpact { speed: c.relative_speed })
            } else {
                None
            }
        })
    }

    fn latch(&mut self, verdict: Verdict) -> Verdict {
        if verdict.is_terminal() {
            self.fired = Some(verdict);
        }
        verdict
    }
}
