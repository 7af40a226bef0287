use serde::{Deserialize, Serialize};
use tracing::{trace, warn};

use super::event::{ColliderKind, ContactEvent, ContactPhase, SurfaceKind};

// ---------------------------------------------------------------------------
// Per-leg contact state
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LegContactState {
    InAir,
    OnGround,
    OnLandingZone,
}

impl LegContactState {
    pub const COUNT: usize = 3;
    pub const ALL: [LegContactState; Self::COUNT] =
        [Self::InAir, Self::OnGround, Self::OnLandingZone];

    pub fn ordinal(self) -> usize {
        match self {
            Self::InAir => 0,
            Self::OnGround => 1,
            Self::OnLandingZone => 2,
        }
    }

    /// Bucket a contact with `surface` puts the leg in; `None` for surfaces
    /// the tracker ignores.
    fn for_surface(surface: SurfaceKind) -> Option<Self> {
        match surface {
            SurfaceKind::Ground => Some(Self::OnGround),
            SurfaceKind::LandingZone => Some(Self::OnLandingZone),
            SurfaceKind::Other => None,
        }
    }
}

/// Aggregate landing classification of the whole vehicle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LandingState {
    None,
    InAir,
    OnGround,
    OnLandingZone,
}

impl LandingState {
    pub fn is_landed(self) -> bool {
        matches!(self, Self::OnGround | Self::OnLandingZone)
    }
}

// ---------------------------------------------------------------------------
// Landing contact tracker
// ---------------------------------------------------------------------------

/// Counts legs per contact bucket.
///
/// A leg moves InAir → OnGround/OnLandingZone on contact-begin and back on the
/// matching contact-end. It never jumps directly between the two ground
/// buckets. Events that don't match the leg's current bucket are no-ops, so
/// the counts always sum to the number of legs.
#[derive(Debug, Clone)]
pub struct LandingContactTracker {
    legs: Vec<LegContactState>,
    counts: [usize; LegContactState::COUNT],
}

impl LandingContactTracker {
    pub fn new(leg_count: usize) -> Self {
        let mut counts = [0; LegContactState::COUNT];
        counts[LegContactState::InAir.ordinal()] = leg_count;
        Self { legs: vec![LegContactState::InAir; leg_count], counts }
    }

    pub fn leg_count(&self) -> usize {
        self.legs.len()
    }

    pub fn count(&self, state: LegContactState) -> usize {
        self.counts.get(state.ordinal()).copied().unwrap_or(0)
    }

    pub fn leg_state(&self, leg: usize) -> Option<LegContactState> {
        self.legs.get(leg).copied()
    }

    /// Returns true when the event changed a bucket.
    pub fn on_leg_contact_begin(&mut self, leg: usize, surface: SurfaceKind) -> bool {
        let Some(target) = LegContactState::for_surface(surface) else {
            return false;
        };
        match self.legs.get(leg) {
            Some(LegContactState::InAir) => {
                self.move_leg(leg, LegContactState::InAir, target);
                true
            }
            Some(current) => {
                trace!(leg, ?current, ?surface, "contact-begin on grounded leg ignored");
                false
            }
            None => {
                warn!(leg, legs = self.legs.len(), "contact-begin for unknown leg ignored");
                false
            }
        }
    }

    /// Returns true when the event changed a bucket.
    pub fn on_leg_contact_end(&mut self, leg: usize, surface: SurfaceKind) -> bool {
        let Some(source) = LegContactState::for_surface(surface) else {
            return false;
        };
        match self.legs.get(leg) {
            Some(&current) if current == source => {
                self.move_leg(leg, source, LegContactState::InAir);
                true
            }
            Some(current) => {
                trace!(leg, ?current, ?surface, "unmatched contact-end ignored");
                false
            }
            None => {
                warn!(leg, legs = self.legs.len(), "contact-end for unknown leg ignored");
                false
            }
        }
    }

    /// Feed a physics contact event; non-leg colliders are ignored.
    pub fn apply(&mut self, event: &ContactEvent) -> bool {
        match (event.collider, event.phase) {
            (ColliderKind::Leg(leg), ContactPhase::Begin) => self.on_leg_contact_begin(leg, event.surface),
            (ColliderKind::Leg(leg), ContactPhase::End) => self.on_leg_contact_end(leg, event.surface),
            (ColliderKind::Body, _) => false,
        }
    }

    /// Aggregate classification, recomputed from the counts on every call.
    ///
    /// Any airborne leg makes the vehicle airborne; otherwise the strongest
    /// occupied bucket wins (LandingZone > Ground).
    pub fn classify(&self) -> LandingState {
        if self.legs.is_empty() {
            return LandingState::None;
        }
        if self.count(LegContactState::InAir) > 0 {
            LandingState::InAir
        } else if self.count(LegContactState::OnLandingZone) > 0 {
            LandingState::OnLandingZone
        } else if self.count(LegContactState::OnGround) > 0 {
            LandingState::OnGround
        } else {
            LandingState::None
        }
    }

    fn move_leg(&mut self, leg: usize, from: LegContactState, to: LegContactState) {
        // Guarded: a bucket is never decremented below zero.
        if let Some(c) = self.counts.get_mut(from.ordinal()) {
            if *c == 0 {
                return;
            }
            *c -= 1;
        }
        if let Some(c) = self.counts.get_mut(to.ordinal()) {
            *c += 1;
        }
        if let Some(slot) = self.legs.get_mut(leg) {
            *slot = to;
        }
        trace!(leg, ?from, ?to, "leg contact changed");
    }
}
