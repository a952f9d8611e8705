//! Movement router: client waypoints to a terrain-clipped cell route
//!
//! A route is the rasterized line through the waypoints, cut short before
//! the first impassable cell. Blocked orders advance as far as they can
//! instead of being rejected.

use crate::battle::constants::MAX_PATH_POINTS;
use crate::battle::grid::{GridCoordinate, GridSpec};
use crate::battle::terrain::TerrainOracle;
use crate::core::types::Vec2;

/// Convert a waypoint path into the ordered cells a unit will walk
///
/// The unit's own cell is the implicit first point and is never part of the
/// returned route. Non-finite waypoints are dropped and at most
/// `MAX_PATH_POINTS` waypoints are considered.
pub fn route(
    grid: &GridSpec,
    terrain: &dyn TerrainOracle,
    unit_cell: GridCoordinate,
    waypoints: &[Vec2],
) -> Vec<GridCoordinate> {
    walk(grid, unit_cell, waypoints, |cell| terrain.is_impassable(cell))
}

/// Raw rasterization of a waypoint path without terrain clipping
///
/// Every route produced by `route` is a prefix of this sequence.
pub fn rasterize(grid: &GridSpec, unit_cell: GridCoordinate, waypoints: &[Vec2]) -> Vec<GridCoordinate> {
    walk(grid, unit_cell, waypoints, |_| false)
}

fn walk(
    grid: &GridSpec,
    unit_cell: GridCoordinate,
    waypoints: &[Vec2],
    is_blocked: impl Fn(GridCoordinate) -> bool,
) -> Vec<GridCoordinate> {
    let mut cells: Vec<GridCoordinate> = Vec::new();
    let mut from = unit_cell;

    for waypoint in waypoints
        .iter()
        .filter(|p| p.is_finite())
        .take(MAX_PATH_POINTS)
    {
        let to = grid.world_to_grid(*waypoint);

        for cell in grid.line_to(from, to).into_iter().skip(1) {
            if is_blocked(cell) {
                return cells;
            }
            // Compact adjacent duplicates; the unit's own cell counts as the previous one
            if cells.last().copied().unwrap_or(unit_cell) != cell {
                cells.push(cell);
            }
        }

        from = to;
    }

    cells
}
