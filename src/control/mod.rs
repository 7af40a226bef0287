pub mod agent;
pub mod heuristic;
pub mod pid;
pub mod random;

pub use agent::{Agent, PolicyMode};
pub use heuristic::HeuristicPilot;
pub use pid::Pid;
pub use random::RandomPilot;
