use nalgebra::Vector3;

// ---------------------------------------------------------------------------
// Thruster: fixed-mount discrete actuator
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct Thruster {
    pub name: String,
    pub position: Vector3<f64>,   // mount point, body frame, m from CG
    pub direction: Vector3<f64>,  // push direction on the body, body frame
    pub thrust: f64,              // N while firing
}

impl Thruster {
    pub fn new(name: impl Into<String>, position: Vector3<f64>, direction: Vector3<f64>, thrust: f64) -> Self {
        Self { name: name.into(), position, direction, thrust }
    }

    /// Force on the body while firing (body frame).
    pub fn force_body(&self) -> Vector3<f64> {
        match self.direction.try_normalize(1e-12) {
            Some(dir) => dir * self.thrust,
            None => Vector3::zeros(),
        }
    }

    /// Torque about the CG while firing (body frame).
    pub fn torque_body(&self) -> Vector3<f64> {
        self.position.cross(&self.force_body())
    }
}
