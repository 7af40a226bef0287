use std::sync::{Arc, Mutex};

use serde::{Deserialize, Serialize};

use crate::sim::episode::{SimulationObserver, SimulationSnapshot};

// ---------------------------------------------------------------------------
// Landing-pad colour feedback (cosmetic, one-way)
// ---------------------------------------------------------------------------

/// Position of `value` between `a` and `b`, clamped to [0, 1].
/// A degenerate range maps everything to 0.
pub fn inverse_lerp(a: f64, b: f64, value: f64) -> f64 {
    if a == b {
        return 0.0;
    }
    ((value - a) / (b - a)).clamp(0.0, 1.0)
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rgb {
    pub r: f64,
    pub g: f64,
    pub b: f64,
}

impl Rgb {
    pub const RED: Rgb = Rgb { r: 1.0, g: 0.0, b: 0.0 };
    pub const GREEN: Rgb = Rgb { r: 0.0, g: 1.0, b: 0.0 };

    pub fn lerp(self, other: Rgb, t: f64) -> Rgb {
        let t = t.clamp(0.0, 1.0);
        Rgb {
            r: self.r + (other.r - self.r) * t,
            g: self.g + (other.g - self.g) * t,
            b: self.b + (other.b - self.b) * t,
        }
    }

    /// 8-bit channels.
    pub fn to_u8(self) -> [u8; 3] {
        [self.r, self.g, self.b].map(|c| (c.clamp(0.0, 1.0) * 255.0).round() as u8)
    }
}

/// Red at score -1, green at +1.
pub fn landing_pad_color(score: f64) -> Rgb {
    Rgb::RED.lerp(Rgb::GREEN, inverse_lerp(-1.0, 1.0, score))
}

/// Recolours the landing pad from each outcome snapshot's score.
///
/// Disabled outside training. The colour sits behind a shared handle so the
/// renderer can read it while the state machine owns the observer.
#[derive(Debug, Clone)]
pub struct PadFeedback {
    enabled: bool,
    color: Arc<Mutex<Option<Rgb>>>,
}

impl PadFeedback {
    pub fn new(enabled: bool) -> Self {
        Self { enabled, color: Arc::new(Mutex::new(None)) }
    }

    pub fn handle(&self) -> Arc<Mutex<Option<Rgb>>> {
        Arc::clone(&self.color)
    }
}

impl SimulationObserver for PadFeedback {
    fn on_simulation_data_changed(&mut self, snapshot: &SimulationSnapshot) {
        if !self.enabled || !snapshot.state.is_outcome() {
            return;
        }
        if let Ok(mut color) = self.color.lock() {
            *color = Some(landing_pad_color(snapshot.score));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dynamics::state::CapsuleState;
    use crate::sim::episode::SimulationState;

    fn snapshot(state: SimulationState, score: f64) -> SimulationSnapshot {
        SimulationSnapshot {
            episode: 0,
            state,
            capsule: CapsuleState::UNKNOWN,
            previous: CapsuleState::UNKNOWN,
            score,
        }
    }

    #[test]
    fn inverse_lerp_clamps() {
        assert_eq!(inverse_lerp(-1.0, 1.0, 0.0), 0.5);
        assert_eq!(inverse_lerp(-1.0, 1.0, 5.0), 1.0);
        assert_eq!(inverse_lerp(-1.0, 1.0, -5.0), 0.0);
        assert_eq!(inverse_lerp(2.0, 2.0, 3.0), 0.0);
    }

    #[test]
    fn gradient_endpoints() {
        assert_eq!(landing_pad_color(-1.0), Rgb::RED);
        assert_eq!(landing_pad_color(1.0), Rgb::GREEN);
        assert_eq!(landing_pad_color(0.0).to_u8(), [128, 128, 0]);
    }

    #[test]
    fn only_outcomes_recolour() {
        let mut pad = PadFeedback::new(true);
        let handle = pad.handle();
        pad.on_simulation_data_changed(&snapshot(SimulationState::Flying, 0.05));
        assert!(handle.lock().unwrap().is_none());
        pad.on_simulation_data_changed(&snapshot(SimulationState::LandedOnLandingZone, 1.0));
        assert_eq!(*handle.lock().unwrap(), Some(Rgb::GREEN));
    }

    #[test]
    fn disabled_outside_training() {
        let mut pad = PadFeedback::new(false);
        pad.on_simulation_data_changed(&snapshot(SimulationState::Crashed, -1.0));
        assert!(pad.handle().lock().unwrap().is_none());
    }
}
