//! Grid overlaying the continuous battle map
//!
//! Terrain, influence and routing all key off `GridCoordinate`. Conversion
//! between world positions and cells is a pure function of the map size and
//! the grid dimensions.

use serde::{Deserialize, Serialize};

use crate::battle::constants::{ARRIVAL_SNAP_FRACTION, CONTACT_DISTANCE_CELLS};
use crate::core::config::SimulationConfig;
use crate::core::types::Vec2;

/// Integer cell index, always inside the grid it was produced by
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub struct GridCoordinate {
    pub col: u32,
    pub row: u32,
}

impl GridCoordinate {
    pub fn new(col: u32, row: u32) -> Self {
        Self { col, row }
    }
}

/// Grid dimensions plus the world size of one cell
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GridSpec {
    pub cols: u32,
    pub rows: u32,
    pub cell_width: f32,
    pub cell_height: f32,
}

impl GridSpec {
    pub fn new(cols: u32, rows: u32, map_width: f32, map_height: f32) -> Self {
        let cols = cols.max(1);
        let rows = rows.max(1);
        Self {
            cols,
            rows,
            cell_width: map_width / cols as f32,
            cell_height: map_height / rows as f32,
        }
    }

    pub fn from_config(config: &SimulationConfig) -> Self {
        Self::new(
            config.grid_cols,
            config.grid_rows,
            config.map_width,
            config.map_height,
        )
    }

    pub fn map_width(&self) -> f32 {
        self.cell_width * self.cols as f32
    }

    pub fn map_height(&self) -> f32 {
        self.cell_height * self.rows as f32
    }

    pub fn cell_count(&self) -> usize {
        self.cols as usize * self.rows as usize
    }

    /// Clamp signed indices into the grid
    pub fn clamp(&self, col: i64, row: i64) -> GridCoordinate {
        GridCoordinate {
            col: col.clamp(0, self.cols as i64 - 1) as u32,
            row: row.clamp(0, self.rows as i64 - 1) as u32,
        }
    }

    /// Row-major index into flat per-cell arrays
    pub fn index(&self, cell: GridCoordinate) -> usize {
        cell.row as usize * self.cols as usize + cell.col as usize
    }

    /// Cell containing a world position (clamped to the grid)
    pub fn world_to_grid(&self, position: Vec2) -> GridCoordinate {
        // NaN casts to 0, infinities saturate; clamp handles both
        let col = (position.x / self.cell_width).floor() as i64;
        let row = (position.y / self.cell_height).floor() as i64;
        self.clamp(col, row)
    }

    /// World position of a cell's center
    pub fn cell_center(&self, cell: GridCoordinate) -> Vec2 {
        Vec2::new(
            (cell.col as f32 + 0.5) * self.cell_width,
            (cell.row as f32 + 0.5) * self.cell_height,
        )
    }

    /// Keep a world position on the map
    pub fn clamp_world(&self, position: Vec2) -> Vec2 {
        let x = if position.x.is_finite() { position.x } else { 0.0 };
        let y = if position.y.is_finite() { position.y } else { 0.0 };
        Vec2::new(
            x.clamp(0.0, self.map_width() - f32::EPSILON * self.map_width()),
            y.clamp(0.0, self.map_height() - f32::EPSILON * self.map_height()),
        )
    }

    /// Distance within which opposing units are in contact
    pub fn contact_distance(&self) -> f32 {
        CONTACT_DISTANCE_CELLS * self.cell_width.max(self.cell_height)
    }

    /// Distance within which a moving unit snaps onto its destination center
    pub fn snap_tolerance(&self) -> f32 {
        ARRIVAL_SNAP_FRACTION * self.cell_width.min(self.cell_height)
    }

    /// Rasterize a line between two cells, both endpoints included
    ///
    /// Integer Bresenham made 4-connected: a diagonal step emits the
    /// horizontal neighbour first, so consecutive cells always share an edge.
    pub fn line_to(&self, from: GridCoordinate, to: GridCoordinate) -> Vec<GridCoordinate> {
        let (x1, y1) = (to.col as i64, to.row as i64);
        let (mut x, mut y) = (from.col as i64, from.row as i64);

        let dx = (x1 - x).abs();
        let dy = -(y1 - y).abs();
        let sx = if x < x1 { 1 } else { -1 };
        let sy = if y < y1 { 1 } else { -1 };
        let mut err = dx + dy;

        let mut cells = Vec::with_capacity((dx - dy) as usize + 1);
        cells.push(from);

        while x != x1 || y != y1 {
            let e2 = 2 * err;
            let step_x = e2 >= dy;
            let step_y = e2 <= dx;

            if step_x {
                err += dy;
                x += sx;
                cells.push(self.clamp(x, y));
            }
            if step_y {
                err += dx;
                y += sy;
                cells.push(self.clamp(x, y));
            }
        }

        cells
    }
}
