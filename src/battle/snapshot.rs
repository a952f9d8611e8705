//! Outbound state shapes and path-state change detection
//!
//! Field names follow the client's camelCase convention. Transport encoding
//! is left to whoever consumes these values.

use std::collections::BTreeMap;

use ahash::AHashMap;
use serde::{Deserialize, Serialize};

use crate::battle::grid::{GridCoordinate, GridSpec};
use crate::battle::movement::MovementState;
use crate::battle::units::{Unit, UnitType};
use crate::core::types::{Team, UnitId, Vec2};

/// Replicated per-unit state
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UnitSnapshot {
    pub unit_id: UnitId,
    pub team: Team,
    pub x: f32,
    pub y: f32,
    pub rotation: f32,
    pub health: f32,
    pub morale_score: f32,
    pub is_attacking: bool,
    pub unit_type: UnitType,
}

impl From<&Unit> for UnitSnapshot {
    fn from(unit: &Unit) -> Self {
        Self {
            unit_id: unit.id,
            team: unit.team,
            x: unit.position.x,
            y: unit.position.y,
            rotation: unit.rotation,
            health: unit.health,
            morale_score: unit.morale_score,
            is_attacking: unit.is_attacking,
            unit_type: unit.unit_type,
        }
    }
}

/// Replicated influence field
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InfluenceSnapshot {
    pub width: u32,
    pub height: u32,
    pub cell_width: f32,
    pub cell_height: f32,
    pub revision: u64,
    pub cells: Vec<f32>,
}

/// Remaining route of a unit, sent when it changes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PathStateBroadcast {
    pub unit_id: UnitId,
    /// Cell centers still to visit, destination first
    pub path: Vec<Vec2>,
    pub is_paused: bool,
}

/// The parts of a movement state clients can see
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct PathSignature {
    pub cells: Vec<GridCoordinate>,
    pub is_paused: bool,
}

impl PathSignature {
    pub fn of(state: &MovementState) -> Self {
        Self {
            cells: state.remaining_cells().collect(),
            is_paused: state.is_paused,
        }
    }
}

/// Remembers the last path state sent per unit
#[derive(Debug, Clone, Default)]
pub struct PathStateTracker {
    sent: AHashMap<UnitId, PathSignature>,
}

impl PathStateTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Broadcasts for every unit whose signature changed since the last call
    ///
    /// A unit seen for the first time with no route is not announced.
    pub fn collect_changes(
        &mut self,
        states: &BTreeMap<UnitId, MovementState>,
        grid: &GridSpec,
    ) -> Vec<PathStateBroadcast> {
        let mut changes = Vec::new();

        for (id, state) in states {
            let signature = PathSignature::of(state);
            let unchanged = match self.sent.get(id) {
                Some(previous) => *previous == signature,
                None => signature == PathSignature::default(),
            };
            if unchanged {
                continue;
            }

            changes.push(PathStateBroadcast {
                unit_id: *id,
                path: signature.cells.iter().map(|c| grid.cell_center(*c)).collect(),
                is_paused: signature.is_paused,
            });
            self.sent.insert(*id, signature);
        }

        changes
    }

    pub fn clear(&mut self) {
        self.sent.clear();
    }
}
