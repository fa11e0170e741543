pub mod config;
pub mod core;
pub mod runner;

pub use self::config::{ScriptedBet, SimulationConfig};
pub use self::core::{run_simulation, RejectedBet, SimulatedClaim, SimulationResult};
