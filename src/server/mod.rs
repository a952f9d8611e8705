//! Match hosting around the battle simulation
//!
//! A match runs as a single tokio task that owns its `BattleState`.

pub mod deployment;
pub mod runtime;
pub mod session;

pub use deployment::line_deployment;
pub use runtime::{load_terrain, MatchHandle, MatchMessage, MatchRuntime, ServerMessage};
pub use session::{Session, SessionId, SessionRegistry};
