pub mod capsule;
pub mod thruster;

pub use capsule::{Capsule, CapsuleBuilder, presets};
pub use thruster::Thruster;
