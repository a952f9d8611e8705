//! Territorial influence field
//!
//! One signed value per grid cell: positive favours team A, negative team B.
//! Living units add a Gaussian bump around themselves; owned cities add an
//! inverse-square contribution over the whole map.

use crate::battle::cities::InfluenceSource;
use crate::battle::constants::{UNIT_INFLUENCE_CUTOFF_SIGMAS, UNIT_INFLUENCE_SIGMA_CELLS};
use crate::battle::grid::{GridCoordinate, GridSpec};
use crate::battle::snapshot::InfluenceSnapshot;
use crate::battle::tuning::Tuning;
use crate::battle::units::UnitTable;

/// Signed influence per grid cell
#[derive(Debug, Clone, PartialEq)]
pub struct InfluenceField {
    pub width: u32,
    pub height: u32,
    pub cell_width: f32,
    pub cell_height: f32,
    revision: u64,
    cells: Vec<f32>,
}

impl InfluenceField {
    /// All-zero field at revision 0
    pub fn new(grid: &GridSpec) -> Self {
        Self {
            width: grid.cols,
            height: grid.rows,
            cell_width: grid.cell_width,
            cell_height: grid.cell_height,
            revision: 0,
            cells: vec![0.0; grid.cell_count()],
        }
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn cells(&self) -> &[f32] {
        &self.cells
    }

    /// Value at a cell; zero outside the field
    pub fn value_at(&self, cell: GridCoordinate) -> f32 {
        if cell.col < self.width && cell.row < self.height {
            self.cells[cell.row as usize * self.width as usize + cell.col as usize]
        } else {
            0.0
        }
    }

    /// Mean over the square neighbourhood of `radius` cells, clipped to the grid
    pub fn neighbourhood_mean(&self, cell: GridCoordinate, radius: i32) -> f32 {
        let (col, row) = (cell.col as i64, cell.row as i64);
        let r = radius.max(0) as i64;
        let mut sum = 0.0;
        let mut count = 0u32;

        for y in (row - r).max(0)..=(row + r).min(self.height as i64 - 1) {
            for x in (col - r).max(0)..=(col + r).min(self.width as i64 - 1) {
                sum += self.value_at(GridCoordinate::new(x as u32, y as u32));
                count += 1;
            }
        }

        if count == 0 {
            0.0
        } else {
            sum / count as f32
        }
    }

    /// Rebuild every cell from living units and static sources
    ///
    /// Always bumps the revision by one, even if no value changed.
    pub fn recompute<S>(&mut self, units: &UnitTable, sources: &S, tuning: &Tuning)
    where
        S: InfluenceSource + ?Sized,
    {
        self.cells.iter_mut().for_each(|c| *c = 0.0);

        let sigma = UNIT_INFLUENCE_SIGMA_CELLS;
        let two_sigma_sq = 2.0 * sigma * sigma;
        let cutoff = sigma * UNIT_INFLUENCE_CUTOFF_SIGMAS;
        let reach = cutoff.ceil() as i64;

        for unit in units.alive() {
            if !unit.position.is_finite() {
                continue;
            }
            let strength =
                unit.team.sign() * tuning.unit_influence_multiplier * unit.unit_type.influence_weight();
            if strength == 0.0 {
                continue;
            }

            // Unit position in cell units
            let ux = unit.position.x / self.cell_width;
            let uy = unit.position.y / self.cell_height;
            let (uc, ur) = (ux.floor() as i64, uy.floor() as i64);

            for row in (ur - reach).max(0)..=(ur + reach).min(self.height as i64 - 1) {
                for col in (uc - reach).max(0)..=(uc + reach).min(self.width as i64 - 1) {
                    let dx = col as f32 + 0.5 - ux;
                    let dy = row as f32 + 0.5 - uy;
                    let d_sq = dx * dx + dy * dy;
                    if d_sq > cutoff * cutoff {
                        continue;
                    }
                    self.cells[row as usize * self.width as usize + col as usize] +=
                        strength * (-d_sq / two_sigma_sq).exp();
                }
            }
        }

        for point in sources.influence_points() {
            let Some(owner) = point.owner else {
                continue;
            };
            let power = tuning.city_influence_units_equivalent * point.weight * owner.sign();
            if power == 0.0 {
                continue;
            }

            for row in 0..self.height {
                for col in 0..self.width {
                    let dc = col as f32 - point.cell.col as f32;
                    let dr = row as f32 - point.cell.row as f32;
                    self.cells[row as usize * self.width as usize + col as usize] +=
                        power / (dc * dc + dr * dr + 1.0);
                }
            }
        }

        self.revision += 1;
    }

    pub fn snapshot(&self) -> InfluenceSnapshot {
        InfluenceSnapshot {
            width: self.width,
            height: self.height,
            cell_width: self.cell_width,
            cell_height: self.cell_height,
            revision: self.revision,
            cells: self.cells.clone(),
        }
    }
}

/// Decides when the field is recomputed
///
/// Recomputes every `interval` ticks, or on the next tick after `force`.
#[derive(Debug, Clone, Default)]
pub struct InfluenceSchedule {
    ticks_since_refresh: u32,
    forced: bool,
}

impl InfluenceSchedule {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request a refresh on the next check
    pub fn force(&mut self) {
        self.forced = true;
    }

    /// Count one tick and report whether the field is due
    pub fn tick(&mut self, interval: u32) -> bool {
        self.ticks_since_refresh = self.ticks_since_refresh.saturating_add(1);
        if self.forced || self.ticks_since_refresh >= interval.max(1) {
            self.forced = false;
            self.ticks_since_refresh = 0;
            true
        } else {
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::battle::cities::{City, FixedCities};
    use crate::battle::units::UnitType;
    use crate::core::types::Team;

    fn grid() -> GridSpec {
        GridSpec::new(80, 44, 1600.0, 880.0)
    }

    fn spawn_at(units: &mut UnitTable, team: Team, col: u32, row: u32) {
        let g = grid();
        units.spawn(
            team,
            UnitType::Line,
            g.cell_center(GridCoordinate::new(col, row)),
            100.0,
        );
    }

    #[test]
    fn test_new_field_is_zero() {
        let field = InfluenceField::new(&grid());
        assert_eq!(field.revision(), 0);
        assert_eq!(field.cells().len(), 80 * 44);
        assert!(field.cells().iter().all(|&c| c == 0.0));
    }

    #[test]
    fn test_unit_projects_signed_influence() {
        let mut units = UnitTable::new();
        spawn_at(&mut units, Team::A, 10, 10);
        spawn_at(&mut units, Team::B, 60, 30);

        let mut field = InfluenceField::new(&grid());
        field.recompute(&units, &FixedCities::default(), &Tuning::default());

        let a_peak = field.value_at(GridCoordinate::new(10, 10));
        assert!((a_peak - 1.0).abs() < 1e-5);
        assert!(field.value_at(GridCoordinate::new(60, 30)) < 0.0);
        assert!(field.value_at(GridCoordinate::new(12, 10)) < a_peak);
        // Beyond the cutoff
        assert_eq!(field.value_at(GridCoordinate::new(30, 10)), 0.0);
    }

    #[test]
    fn test_dead_units_project_nothing() {
        let mut units = UnitTable::new();
        spawn_at(&mut units, Team::A, 10, 10);
        for unit in units.iter_mut() {
            unit.health = 0.0;
        }

        let mut field = InfluenceField::new(&grid());
        field.recompute(&units, &FixedCities::default(), &Tuning::default());
        assert!(field.cells().iter().all(|&c| c == 0.0));
    }

    #[test]
    fn test_city_influence_falls_off() {
        let cities = FixedCities::new(vec![
            City::new("a", GridCoordinate::new(20, 20), Some(Team::B)),
            City::new("neutral", GridCoordinate::new(60, 20), None),
        ]);
        let mut field = InfluenceField::new(&grid());
        field.recompute(&UnitTable::new(), &cities, &Tuning::default());

        assert_eq!(field.value_at(GridCoordinate::new(20, 20)), -5.0);
        assert_eq!(field.value_at(GridCoordinate::new(21, 20)), -2.5);
        // Neutral city adds nothing around itself beyond the owned city's tail
        let near_neutral = field.value_at(GridCoordinate::new(60, 20));
        assert!(near_neutral < 0.0 && near_neutral > -0.01);
    }

    #[test]
    fn test_revision_bumps_every_recompute() {
        let mut field = InfluenceField::new(&grid());
        let units = UnitTable::new();
        for expected in 1..=3 {
            field.recompute(&units, &FixedCities::default(), &Tuning::default());
            assert_eq!(field.revision(), expected);
        }
    }

    #[test]
    fn test_neighbourhood_mean_clips_at_edges() {
        let mut units = UnitTable::new();
        spawn_at(&mut units, Team::A, 0, 0);
        let mut field = InfluenceField::new(&grid());
        field.recompute(&units, &FixedCities::default(), &Tuning::default());

        let corner = GridCoordinate::new(0, 0);
        let expected = (field.value_at(corner)
            + field.value_at(GridCoordinate::new(1, 0))
            + field.value_at(GridCoordinate::new(0, 1))
            + field.value_at(GridCoordinate::new(1, 1)))
            / 4.0;
        assert!((field.neighbourhood_mean(corner, 1) - expected).abs() < 1e-6);
    }

    #[test]
    fn test_snapshot_matches_field() {
        let field = InfluenceField::new(&grid());
        let snap = field.snapshot();
        assert_eq!(snap.width, 80);
        assert_eq!(snap.height, 44);
        assert_eq!(snap.cell_width, 20.0);
        assert_eq!(snap.cells.len(), 80 * 44);
    }

    #[test]
    fn test_schedule_interval_and_force() {
        let mut schedule = InfluenceSchedule::new();
        assert!(!schedule.tick(3));
        assert!(!schedule.tick(3));
        assert!(schedule.tick(3));
        assert!(!schedule.tick(3));

        schedule.force();
        assert!(schedule.tick(3));
        assert!(!schedule.tick(3));
    }
}
