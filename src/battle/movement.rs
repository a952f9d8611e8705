//! Unit movement along queued cell routes
//!
//! Units with `rotate_to_face` turn in place until they face their next
//! cell, then walk toward it. The heading check runs every tick, so a unit
//! pushed off-heading (combat facing, for instance) turns back before it
//! resumes walking.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

use crate::battle::constants::{
    MAX_SPEED_MULTIPLIER, MIN_SPEED_MULTIPLIER, ROTATION_MOVE_TOLERANCE,
    ROTATION_REENTRY_THRESHOLD, UNIT_TURN_RATE,
};
use crate::battle::grid::{GridCoordinate, GridSpec};
use crate::battle::terrain::TerrainOracle;
use crate::battle::units::Unit;
use crate::core::types::{angle_difference, rotate_toward};

/// Per-command movement modifiers
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MovementCommandMode {
    pub speed_multiplier: f32,
    pub rotate_to_face: bool,
}

impl Default for MovementCommandMode {
    fn default() -> Self {
        Self {
            speed_multiplier: 1.0,
            rotate_to_face: true,
        }
    }
}

impl MovementCommandMode {
    /// Build a mode, clamping the speed multiplier into its allowed range
    pub fn new(speed_multiplier: f32, rotate_to_face: bool) -> Self {
        let speed_multiplier = if speed_multiplier.is_finite() {
            speed_multiplier.clamp(MIN_SPEED_MULTIPLIER, MAX_SPEED_MULTIPLIER)
        } else {
            1.0
        };
        Self {
            speed_multiplier,
            rotate_to_face,
        }
    }
}

/// What a unit's movement is doing right now
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MovementPhase {
    Idle,
    Paused,
    Rotating,
    Moving,
}

/// Movement state of one unit
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct MovementState {
    pub destination_cell: Option<GridCoordinate>,
    pub queued_cells: VecDeque<GridCoordinate>,
    pub target_rotation: Option<f32>,
    pub mode: MovementCommandMode,
    pub is_paused: bool,
}

impl MovementState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn has_route(&self) -> bool {
        self.destination_cell.is_some()
    }

    pub fn phase(&self) -> MovementPhase {
        if !self.has_route() {
            MovementPhase::Idle
        } else if self.is_paused {
            MovementPhase::Paused
        } else if self.target_rotation.is_some() {
            MovementPhase::Rotating
        } else {
            MovementPhase::Moving
        }
    }

    /// Reset to the neutral resting state
    pub fn clear(&mut self) {
        *self = Self::default();
    }

    /// Destination followed by the queued cells
    pub fn remaining_cells(&self) -> impl Iterator<Item = GridCoordinate> + '_ {
        self.destination_cell
            .into_iter()
            .chain(self.queued_cells.iter().copied())
    }

    /// Replace the current route. An empty route clears movement.
    pub fn assign_route(
        &mut self,
        route: Vec<GridCoordinate>,
        mode: MovementCommandMode,
        unit: &Unit,
        grid: &GridSpec,
    ) {
        let mut cells: VecDeque<GridCoordinate> = route.into();
        let Some(destination) = cells.pop_front() else {
            self.clear();
            return;
        };

        self.destination_cell = Some(destination);
        self.queued_cells = cells;
        self.mode = mode;
        self.is_paused = false;
        self.target_rotation = initial_turn(unit, destination, mode, grid);
    }

    /// Flip pause if there is a route. Returns whether the state changed.
    pub fn toggle_pause(&mut self) -> bool {
        if !self.has_route() {
            return false;
        }
        self.is_paused = !self.is_paused;
        if self.is_paused {
            self.target_rotation = None;
        }
        true
    }
}

/// Rotation target needed before walking toward `cell`, if any
fn initial_turn(
    unit: &Unit,
    cell: GridCoordinate,
    mode: MovementCommandMode,
    grid: &GridSpec,
) -> Option<f32> {
    if !mode.rotate_to_face {
        return None;
    }
    let bearing = unit.position.bearing_to(&grid.cell_center(cell));
    if angle_difference(unit.rotation, bearing).abs() > ROTATION_MOVE_TOLERANCE {
        Some(bearing)
    } else {
        None
    }
}

/// Everything the movement step reads besides the unit itself
pub struct MovementContext<'a> {
    pub grid: &'a GridSpec,
    pub terrain: &'a dyn TerrainOracle,
    /// Base speed in world units per second
    pub base_speed: f32,
    /// Seconds of simulated time in this tick
    pub dt: f32,
}

/// Result of a movement tick
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MovementResult {
    pub moved: bool,
    pub rotated: bool,
    pub reached_cell: bool,
    pub finished: bool,
}

/// Advance a unit's movement by one tick
pub fn advance_unit_movement(
    unit: &mut Unit,
    state: &mut MovementState,
    ctx: &MovementContext<'_>,
) -> MovementResult {
    let mut result = MovementResult::default();

    if state.is_paused {
        return result;
    }
    let Some(destination) = state.destination_cell else {
        return result;
    };

    let target = ctx.grid.cell_center(destination);
    let distance = unit.position.distance(&target);

    if distance <= ctx.grid.snap_tolerance() {
        arrive(unit, state, ctx.grid, &mut result);
        return result;
    }

    let bearing = unit.position.bearing_to(&target);
    let max_turn = UNIT_TURN_RATE * ctx.dt;

    if state.mode.rotate_to_face {
        // Re-entry check runs every tick, not just when the order lands
        if state.target_rotation.is_none()
            && angle_difference(unit.rotation, bearing).abs() > ROTATION_REENTRY_THRESHOLD
        {
            state.target_rotation = Some(bearing);
        }

        if state.target_rotation.is_some() {
            unit.rotation = rotate_toward(unit.rotation, bearing, max_turn);
            result.rotated = true;
            state.target_rotation =
                if angle_difference(unit.rotation, bearing).abs() < ROTATION_MOVE_TOLERANCE {
                    None
                } else {
                    Some(bearing)
                };
            return result;
        }

        unit.rotation = rotate_toward(unit.rotation, bearing, max_turn);
    }

    let cell = ctx.grid.world_to_grid(unit.position);
    // Units stranded on impassable ground may still walk off it
    let terrain_multiplier = if ctx.terrain.is_impassable(cell) {
        1.0
    } else {
        ctx.terrain.speed_multiplier(cell)
    };
    let step = ctx.base_speed * terrain_multiplier * state.mode.speed_multiplier * ctx.dt;
    if step.is_nan() || step <= 0.0 {
        return result;
    }

    result.moved = true;
    if step >= distance {
        unit.position = target;
        arrive(unit, state, ctx.grid, &mut result);
    } else {
        unit.position = unit.position + (target - unit.position).normalize() * step;
    }

    result
}

/// Snap onto the destination center and pop the next queued cell
fn arrive(unit: &mut Unit, state: &mut MovementState, grid: &GridSpec, result: &mut MovementResult) {
    if let Some(destination) = state.destination_cell {
        unit.position = grid.cell_center(destination);
    }
    result.reached_cell = true;

    match state.queued_cells.pop_front() {
        Some(next) => {
            state.destination_cell = Some(next);
            state.target_rotation = initial_turn(unit, next, state.mode, grid);
        }
        None => {
            state.clear();
            result.finished = true;
        }
    }
}
