//! Battle system - authoritative real-time contact combat
//!
//! Territory is contested through an influence field rather than captured
//! cell by cell. Morale falls out of that field, and morale shapes combat.
//!
//! Key properties:
//! - One owner, one loop: nothing here locks or spawns
//! - Terrain only clips routes; blocked orders advance as far as they can
//! - Same inputs, same tick sequence, same result

pub mod cities;
pub mod commands;
pub mod constants;
pub mod engagement;
pub mod execution;
pub mod grid;
pub mod influence;
pub mod morale;
pub mod movement;
pub mod resolution;
pub mod routing;
pub mod snapshot;
pub mod terrain;
pub mod tuning;
pub mod units;

// Re-exports for convenient access
pub use cities::{
    City, CitySystem, FixedCities, InfluencePoint, InfluenceSource, NoSpawns, SpawnRequest,
    SpawnSource,
};
pub use commands::{ClientCommand, CommandIssuer, ModeRequest};
pub use constants::*;
pub use engagement::{detect_engagements, engaged_units, Engagement, EngagementTracker};
pub use execution::{
    check_battle_end, BattleEvent, BattleEventLog, BattleEventType, BattleOutcome, BattleState,
    EndReason, MatchPhase,
};
pub use grid::{GridCoordinate, GridSpec};
pub use influence::{InfluenceField, InfluenceSchedule};
pub use morale::{advantage, advantage_vs_baseline, morale_at, morale_of};
pub use movement::{
    advance_unit_movement, MovementCommandMode, MovementContext, MovementPhase, MovementResult,
    MovementState,
};
pub use resolution::{resolve_combat, CombatContext, CombatReport};
pub use routing::{rasterize, route};
pub use snapshot::{
    InfluenceSnapshot, PathSignature, PathStateBroadcast, PathStateTracker, UnitSnapshot,
};
pub use terrain::{TerrainGrid, TerrainOracle, TerrainType};
pub use tuning::{Tuning, TuningEffects, TuningUpdate};
pub use units::{Unit, UnitTable, UnitType};
