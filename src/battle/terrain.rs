//! Battle terrain types and their effects
//!
//! Terrain is supplied by the map collaborator and never changes during a
//! battle. The simulation only reads it through `TerrainOracle`.

use serde::{Deserialize, Serialize};

use crate::battle::grid::{GridCoordinate, GridSpec};
use crate::core::error::{FrontlineError, Result};

/// Terrain type of a grid cell
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum TerrainType {
    #[default]
    Grass,
    Water,
    Forest,
    Hills,
    Mountains,
    Unknown,
}

impl TerrainType {
    /// Movement speed multiplier (1.0 = normal)
    pub fn speed_multiplier(&self) -> f32 {
        match self {
            TerrainType::Grass => 1.0,
            TerrainType::Water => 0.5,
            TerrainType::Forest => 0.7,
            TerrainType::Hills => 0.8,
            TerrainType::Mountains => 0.0, // Impassable
            TerrainType::Unknown => 1.0,
        }
    }

    /// Morale multiplier applied by the morale evaluator
    pub fn morale_multiplier(&self) -> f32 {
        match self {
            TerrainType::Grass => 1.0,
            TerrainType::Water => 0.8,  // Wading troops are exposed
            TerrainType::Forest => 1.1, // Cover
            TerrainType::Hills => 1.2,  // High ground
            TerrainType::Mountains => 1.0,
            TerrainType::Unknown => 1.0,
        }
    }

    pub fn is_impassable(&self) -> bool {
        matches!(self, TerrainType::Mountains)
    }

    /// Single-character code used by the ASCII map format
    pub fn from_code(code: char) -> Option<Self> {
        match code {
            'g' | '.' => Some(TerrainType::Grass),
            'w' | '~' => Some(TerrainType::Water),
            'f' | 'T' => Some(TerrainType::Forest),
            'h' | 'n' => Some(TerrainType::Hills),
            'm' | '^' => Some(TerrainType::Mountains),
            '?' => Some(TerrainType::Unknown),
            _ => None,
        }
    }
}

/// Read-only terrain lookup supplied by the map collaborator
pub trait TerrainOracle {
    fn terrain_at(&self, cell: GridCoordinate) -> TerrainType;

    fn is_impassable(&self, cell: GridCoordinate) -> bool {
        self.terrain_at(cell).is_impassable()
    }

    fn speed_multiplier(&self, cell: GridCoordinate) -> f32 {
        self.terrain_at(cell).speed_multiplier()
    }

    fn morale_multiplier(&self, cell: GridCoordinate) -> f32 {
        self.terrain_at(cell).morale_multiplier()
    }
}

/// Dense in-memory terrain, one entry per grid cell
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TerrainGrid {
    pub cols: u32,
    pub rows: u32,
    cells: Vec<TerrainType>,
}

impl TerrainGrid {
    /// All-grass terrain
    pub fn new(cols: u32, rows: u32) -> Self {
        Self::filled(cols, rows, TerrainType::Grass)
    }

    pub fn filled(cols: u32, rows: u32, terrain: TerrainType) -> Self {
        Self {
            cols,
            rows,
            cells: vec![terrain; cols as usize * rows as usize],
        }
    }

    pub fn for_grid(grid: &GridSpec) -> Self {
        Self::new(grid.cols, grid.rows)
    }

    /// Parse the ASCII map format: one line per row, one code per cell
    ///
    /// Blank lines are skipped. Every row must have the same width.
    pub fn from_ascii(content: &str) -> Result<Self> {
        let mut cells = Vec::new();
        let mut cols: Option<usize> = None;
        let mut rows = 0u32;

        for (line_no, line) in content.lines().enumerate() {
            let line = line.trim_end();
            if line.is_empty() {
                continue;
            }

            let row: Vec<TerrainType> = line
                .chars()
                .map(|c| {
                    TerrainType::from_code(c).ok_or_else(|| {
                        FrontlineError::InvalidConfig(format!(
                            "unknown terrain code {:?} on line {}",
                            c,
                            line_no + 1
                        ))
                    })
                })
                .collect::<Result<_>>()?;

            match cols {
                None => cols = Some(row.len()),
                Some(width) if width != row.len() => {
                    return Err(FrontlineError::InvalidConfig(format!(
                        "line {} has {} cells, expected {}",
                        line_no + 1,
                        row.len(),
                        width
                    )));
                }
                Some(_) => {}
            }

            cells.extend(row);
            rows += 1;
        }

        let Some(cols) = cols else {
            return Err(FrontlineError::InvalidConfig("terrain map is empty".into()));
        };

        Ok(Self {
            cols: cols as u32,
            rows,
            cells,
        })
    }

    fn index(&self, cell: GridCoordinate) -> Option<usize> {
        if cell.col < self.cols && cell.row < self.rows {
            Some(cell.row as usize * self.cols as usize + cell.col as usize)
        } else {
            None
        }
    }

    /// Set terrain at a coordinate (ignored when out of bounds)
    pub fn set(&mut self, cell: GridCoordinate, terrain: TerrainType) {
        if let Some(i) = self.index(cell) {
            self.cells[i] = terrain;
        }
    }
}

impl TerrainOracle for TerrainGrid {
    fn terrain_at(&self, cell: GridCoordinate) -> TerrainType {
        self.index(cell)
            .map(|i| self.cells[i])
            .unwrap_or(TerrainType::Unknown)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_grass_no_penalty() {
        assert_eq!(TerrainType::Grass.speed_multiplier(), 1.0);
        assert_eq!(TerrainType::Grass.morale_multiplier(), 1.0);
    }

    #[test]
    fn test_only_mountains_impassable() {
        assert!(TerrainType::Mountains.is_impassable());
        assert!(!TerrainType::Water.is_impassable());
        assert!(!TerrainType::Forest.is_impassable());
        assert!(!TerrainType::Unknown.is_impassable());
    }

    #[test]
    fn test_hills_boost_morale() {
        assert!(TerrainType::Hills.morale_multiplier() > TerrainType::Grass.morale_multiplier());
        assert!(TerrainType::Water.morale_multiplier() < TerrainType::Grass.morale_multiplier());
    }

    #[test]
    fn test_grid_set_and_lookup() {
        let mut terrain = TerrainGrid::new(10, 10);
        terrain.set(GridCoordinate::new(3, 4), TerrainType::Forest);

        assert_eq!(terrain.terrain_at(GridCoordinate::new(3, 4)), TerrainType::Forest);
        assert_eq!(terrain.terrain_at(GridCoordinate::new(4, 3)), TerrainType::Grass);
        assert_eq!(terrain.speed_multiplier(GridCoordinate::new(3, 4)), 0.7);
    }

    #[test]
    fn test_out_of_bounds_is_unknown() {
        let terrain = TerrainGrid::new(4, 4);
        assert_eq!(terrain.terrain_at(GridCoordinate::new(9, 0)), TerrainType::Unknown);
    }

    #[test]
    fn test_from_ascii() {
        let terrain = TerrainGrid::from_ascii("g.m\nwfh\n\n").unwrap();
        assert_eq!(terrain.cols, 3);
        assert_eq!(terrain.rows, 2);
        assert!(terrain.is_impassable(GridCoordinate::new(2, 0)));
        assert_eq!(terrain.terrain_at(GridCoordinate::new(0, 1)), TerrainType::Water);
        assert_eq!(terrain.terrain_at(GridCoordinate::new(2, 1)), TerrainType::Hills);
    }

    #[test]
    fn test_from_ascii_rejects_ragged_rows() {
        assert!(TerrainGrid::from_ascii("ggg\ngg\n").is_err());
        assert!(TerrainGrid::from_ascii("gxg\n").is_err());
        assert!(TerrainGrid::from_ascii("\n\n").is_err());
    }
}
