use nalgebra::Vector3;

use super::thruster::Thruster;
use crate::error::{Result, SimError};

// ---------------------------------------------------------------------------
// Capsule definition
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct Capsule {
    pub name: String,
    pub mass: f64,                  // kg
    pub inertia: Vector3<f64>,      // [Ixx, Iyy, Izz] principal moments, kg·m^2
    pub legs: Vec<Vector3<f64>>,    // foot points, body frame
    pub hull: Vec<Vector3<f64>>,    // non-leg collider points, body frame
    pub thrusters: Vec<Thruster>,
}

impl Capsule {
    pub fn leg_count(&self) -> usize {
        self.legs.len()
    }

    pub fn thruster_count(&self) -> usize {
        self.thrusters.len()
    }

    /// Thrust-to-weight ratio with every upward-pointing thruster firing.
    pub fn twr(&self, gravity: f64) -> f64 {
        let up: f64 = self.thrusters.iter().map(|t| t.force_body().z.max(0.0)).sum();
        up / (self.mass * gravity)
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.mass > 0.0) {
            return Err(SimError::InvalidVehicle(format!("{}: mass must be > 0", self.name)));
        }
        if self.inertia.iter().any(|i| !(*i > 0.0)) {
            return Err(SimError::InvalidVehicle(format!("{}: inertia must be > 0", self.name)));
        }
        if self.legs.is_empty() {
            return Err(SimError::InvalidVehicle(format!("{}: at least one leg required", self.name)));
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Capsule builder
// ---------------------------------------------------------------------------

pub struct CapsuleBuilder {
    name: String,
    mass: f64,
    inertia: Vector3<f64>,
    legs: Vec<Vector3<f64>>,
    hull: Vec<Vector3<f64>>,
    thrusters: Vec<Thruster>,
}

impl CapsuleBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            mass: 600.0,
            inertia: Vector3::new(900.0, 900.0, 600.0),
            legs: vec![],
            hull: vec![],
            thrusters: vec![],
        }
    }

    pub fn mass(mut self, v: f64) -> Self { self.mass = v; self }
    pub fn inertia(mut self, v: Vector3<f64>) -> Self { self.inertia = v; self }
    pub fn leg(mut self, foot: Vector3<f64>) -> Self { self.legs.push(foot); self }
    pub fn hull_point(mut self, p: Vector3<f64>) -> Self { self.hull.push(p); self }
    pub fn thruster(mut self, t: Thruster) -> Self { self.thrusters.push(t); self }

    pub fn build(self) -> Capsule {
        Capsule {
            name: self.name,
            mass: self.mass,
            inertia: self.inertia,
            legs: self.legs,
            hull: self.hull,
            thrusters: self.thrusters,
        }
    }
}

// ---------------------------------------------------------------------------
// Preset vehicles
// ---------------------------------------------------------------------------

pub mod presets {
    use super::*;

    /// Four-legged capsule with a main engine and four attitude thrusters.
    ///
    /// Feet sit 0.5 m below the hull ring, so an upright touchdown is carried
    /// by the legs and anything past ~50 deg of tilt scrapes the hull.
    pub fn capsule() -> Capsule {
        let foot = 1.5;
        let ring = 1.2;
        let rcs_z = 1.0;
        let rcs_thrust = 800.0;
        CapsuleBuilder::new("Capsule-4L")
            .mass(600.0)
            .inertia(Vector3::new(900.0, 900.0, 600.0))
            .leg(Vector3::new(1.6, 0.0, -foot))
            .leg(Vector3::new(-1.6, 0.0, -foot))
            .leg(Vector3::new(0.0, 1.6, -foot))
            .leg(Vector3::new(0.0, -1.6, -foot))
            .hull_point(Vector3::new(ring, 0.0, -1.0))
            .hull_point(Vector3::new(-ring, 0.0, -1.0))
            .hull_point(Vector3::new(0.0, ring, -1.0))
            .hull_point(Vector3::new(0.0, -ring, -1.0))
            .hull_point(Vector3::new(0.0, 0.0, 2.0)) // nose
            .thruster(Thruster::new("main", Vector3::new(0.0, 0.0, -1.0), Vector3::z(), 12_000.0))
            .thruster(Thruster::new("rcs+x", Vector3::new(ring, 0.0, rcs_z), -Vector3::x(), rcs_thrust))
            .thruster(Thruster::new("rcs-x", Vector3::new(-ring, 0.0, rcs_z), Vector3::x(), rcs_thrust))
            .thruster(Thruster::new("rcs+y", Vector3::new(0.0, ring, rcs_z), -Vector3::y(), rcs_thrust))
            .thruster(Thruster::new("rcs-y", Vector3::new(0.0, -ring, rcs_z), Vector3::y(), rcs_thrust))
            .build()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn preset_is_valid_and_can_hover() {
        let c = presets::capsule();
        c.validate().unwrap();
        assert_eq!(c.leg_count(), 4);
        assert_eq!(c.thruster_count(), 5);
        assert!(c.twr(9.81) > 1.0, "TWR must exceed 1 to arrest the descent");
    }

    #[test]
    fn legless_capsule_rejected() {
        let c = CapsuleBuilder::new("stub").build();
        assert!(matches!(c.validate(), Err(SimError::InvalidVehicle(_))));
    }

    #[test]
    fn zero_mass_rejected() {
        let c = CapsuleBuilder::new("ghost").mass(0.0).leg(Vector3::zeros()).build();
        assert!(c.validate().is_err());
    }
}
