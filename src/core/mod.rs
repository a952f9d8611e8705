pub mod config;
pub mod error;
pub mod types;

pub use config::SimulationConfig;
pub use error::{FrontlineError, Result};
pub use types::{MatchId, Team, Tick, UnitId, Vec2};
