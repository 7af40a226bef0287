use nalgebra::{Vector2, Vector3};
use serde::{Deserialize, Serialize};

use crate::error::{Result, SimError};

// ---------------------------------------------------------------------------
// Training area: the explicit per-simulation context
// ---------------------------------------------------------------------------

/// Axis-aligned floor rectangle on the ground plane (area frame).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FloorBounds {
    pub min_x: f64,
    pub max_x: f64,
    pub min_y: f64,
    pub max_y: f64,
}

impl FloorBounds {
    /// Square floor of the given half-width centred on the origin.
    pub fn square(half_width: f64) -> Self {
        Self { min_x: -half_width, max_x: half_width, min_y: -half_width, max_y: half_width }
    }

    pub fn contains(&self, x: f64, y: f64) -> bool {
        x >= self.min_x && x <= self.max_x && y >= self.min_y && y <= self.max_y
    }

    /// Bounds pulled in by `margin` on every side, collapsing to the centre
    /// line when the floor is narrower than twice the margin.
    pub fn shrink(&self, margin: f64) -> FloorBounds {
        let cx = 0.5 * (self.min_x + self.max_x);
        let cy = 0.5 * (self.min_y + self.max_y);
        FloorBounds {
            min_x: (self.min_x + margin).min(cx),
            max_x: (self.max_x - margin).max(cx),
            min_y: (self.min_y + margin).min(cy),
            max_y: (self.max_y - margin).max(cy),
        }
    }

    fn is_well_formed(&self) -> bool {
        [self.min_x, self.max_x, self.min_y, self.max_y].iter().all(|v| v.is_finite())
            && self.min_x < self.max_x
            && self.min_y < self.max_y
    }
}

/// Rectangular landing pad lying on the floor.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LandingZone {
    pub center: Vector3<f64>,
    pub half_extents: Vector2<f64>,
}

impl LandingZone {
    pub fn new(center: Vector3<f64>, half_extents: Vector2<f64>) -> Self {
        Self { center, half_extents }
    }

    pub fn contains(&self, x: f64, y: f64) -> bool {
        (x - self.center.x).abs() <= self.half_extents.x
            && (y - self.center.y).abs() <= self.half_extents.y
    }
}

/// One training environment: floor, landing zone and an index that keeps
/// parallel areas' random streams apart.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingArea {
    pub index: usize,
    pub floor: FloorBounds,
    pub landing_zone: LandingZone,
}

impl TrainingArea {
    pub fn new(index: usize, floor: FloorBounds, landing_zone: LandingZone) -> Self {
        Self { index, floor, landing_zone }
    }

    /// 100 m square floor with a 10 m pad at the centre.
    pub fn standard(index: usize) -> Self {
        Self::new(
            index,
            FloorBounds::square(50.0),
            LandingZone::new(Vector3::zeros(), Vector2::new(5.0, 5.0)),
        )
    }

    pub fn validate(&self) -> Result<()> {
        if !self.floor.is_well_formed() {
            return Err(SimError::InvalidArea(format!(
                "area {}: floor bounds {:?} are degenerate",
                self.index, self.floor
            )));
        }
        let zone = &self.landing_zone;
        if !(zone.center.iter().all(|v| v.is_finite())
            && zone.half_extents.x > 0.0
            && zone.half_extents.y > 0.0)
        {
            return Err(SimError::InvalidArea(format!(
                "area {}: landing zone {:?} is malformed",
                self.index, zone
            )));
        }
        if !self.floor.contains(zone.center.x, zone.center.y) {
            return Err(SimError::InvalidArea(format!(
                "area {}: landing zone centre lies outside the floor",
                self.index
            )));
        }
        Ok(())
    }
}
