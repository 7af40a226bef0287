use serde::{Deserialize, Serialize};

use crate::dynamics::state::BodyState;

// ---------------------------------------------------------------------------
// Physics-boundary events
// ---------------------------------------------------------------------------

/// What a collider touched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SurfaceKind {
    Ground,
    LandingZone,
    Other,
}

/// Which part of the capsule touched it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ColliderKind {
    Leg(usize),
    /// Any non-leg collider: hull, nose, engine bell.
    Body,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ContactPhase {
    Begin,
    End,
}

/// A contact-begin or contact-end reported by the physics engine.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ContactEvent {
    pub time: f64,
    pub collider: ColliderKind,
    pub surface: SurfaceKind,
    pub phase: ContactPhase,
    /// Relative speed of the touching point at impact [m/s]; 0 on end events.
    pub relative_speed: f64,
}

impl ContactEvent {
    pub fn begin(collider: ColliderKind, surface: SurfaceKind, relative_speed: f64) -> Self {
        Self { time: 0.0, collider, surface, phase: ContactPhase::Begin, relative_speed }
    }

    pub fn end(collider: ColliderKind, surface: SurfaceKind) -> Self {
        Self { time: 0.0, collider, surface, phase: ContactPhase::End, relative_speed: 0.0 }
    }

    pub fn at(mut self, time: f64) -> Self {
        self.time = time;
        self
    }

    pub fn is_begin(&self) -> bool {
        self.phase == ContactPhase::Begin
    }
}

/// Everything the physics engine reports after one fixed step.
#[derive(Debug, Clone)]
pub struct StepReport {
    pub body: BodyState,
    pub contacts: Vec<ContactEvent>,
    /// Opaque "sleeping" signal: velocities below the engine's thresholds.
    pub at_rest: bool,
}

impl StepReport {
    /// Contact-begin events of this step (the collisions).
    pub fn collisions(&self) -> impl Iterator<Item = &ContactEvent> {
        self.contacts.iter().filter(|c| c.is_begin())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::Vector3;

    #[test]
    fn collisions_are_begin_events_only() {
        let report = StepReport {
            body: BodyState::at_rest(Vector3::zeros()),
            contacts: vec![
                ContactEvent::begin(ColliderKind::Leg(0), SurfaceKind::Ground, 1.0),
                ContactEvent::end(ColliderKind::Leg(1), SurfaceKind::Ground),
                ContactEvent::begin(ColliderKind::Body, SurfaceKind::Other, 0.5).at(2.0),
            ],
            at_rest: false,
        };
        let hits: Vec<_> = report.collisions().collect();
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[1].time, 2.0);
    }
}
