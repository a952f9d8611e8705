//! Morale evaluation from the influence field
//!
//! Morale is derived, never accumulated: it is a pure function of the field
//! around a unit and the ground it stands on.

use crate::battle::constants::{
    MORALE_INFLUENCE_SCALE, MORALE_MAX, MORALE_NEUTRAL, MORALE_SAMPLE_RADIUS,
};
use crate::battle::grid::{GridCoordinate, GridSpec};
use crate::battle::influence::InfluenceField;
use crate::battle::terrain::TerrainOracle;
use crate::battle::units::Unit;
use crate::core::types::Team;

/// Morale of a unit of `team` standing in `cell`, in `[0, 100]`
pub fn morale_at(
    team: Team,
    cell: GridCoordinate,
    field: &InfluenceField,
    terrain: &dyn TerrainOracle,
) -> f32 {
    let oriented = field.neighbourhood_mean(cell, MORALE_SAMPLE_RADIUS) * team.sign();
    let base = MORALE_NEUTRAL + MORALE_NEUTRAL * (oriented / MORALE_INFLUENCE_SCALE).tanh();
    let morale = base * terrain.morale_multiplier(cell);

    if morale.is_finite() {
        morale.clamp(0.0, MORALE_MAX)
    } else {
        MORALE_NEUTRAL
    }
}

/// Morale of a unit at its current position
pub fn morale_of(
    unit: &Unit,
    field: &InfluenceField,
    grid: &GridSpec,
    terrain: &dyn TerrainOracle,
) -> f32 {
    morale_at(unit.team, grid.world_to_grid(unit.position), field, terrain)
}

/// Relative advantage of morale `a` over morale `b`, in `[-1, 1]`
pub fn advantage(a: f32, b: f32) -> f32 {
    ((a - b) / MORALE_MAX).clamp(-1.0, 1.0)
}

/// Advantage of a morale value over neutral, in `[-1, 1]`
pub fn advantage_vs_baseline(morale: f32) -> f32 {
    ((morale - MORALE_NEUTRAL) / MORALE_NEUTRAL).clamp(-1.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::battle::cities::{City, FixedCities};
    use crate::battle::terrain::{TerrainGrid, TerrainType};
    use crate::battle::tuning::Tuning;
    use crate::battle::units::UnitTable;

    fn grid() -> GridSpec {
        GridSpec::new(80, 44, 1600.0, 880.0)
    }

    fn field_with_city(owner: Team, weight: f32) -> InfluenceField {
        let g = grid();
        let mut city = City::new("c", GridCoordinate::new(20, 20), Some(owner));
        city.weight = weight;
        let mut field = InfluenceField::new(&g);
        field.recompute(&UnitTable::new(), &FixedCities::new(vec![city]), &Tuning::default());
        field
    }

    #[test]
    fn test_neutral_field_gives_neutral_morale() {
        let g = grid();
        let field = InfluenceField::new(&g);
        let terrain = TerrainGrid::for_grid(&g);
        assert_eq!(morale_at(Team::A, GridCoordinate::new(5, 5), &field, &terrain), 50.0);
        assert_eq!(morale_at(Team::B, GridCoordinate::new(5, 5), &field, &terrain), 50.0);
    }

    #[test]
    fn test_friendly_influence_raises_morale() {
        let g = grid();
        let field = field_with_city(Team::A, 1.0);
        let terrain = TerrainGrid::for_grid(&g);
        let cell = GridCoordinate::new(20, 20);

        let a = morale_at(Team::A, cell, &field, &terrain);
        let b = morale_at(Team::B, cell, &field, &terrain);
        assert!(a > 50.0);
        assert!(b < 50.0);
        // Mirror image around neutral
        assert!((a + b - 100.0).abs() < 1e-3);
    }

    #[test]
    fn test_morale_stays_in_bounds() {
        let g = grid();
        let field = field_with_city(Team::A, 1_000.0);
        let mut terrain = TerrainGrid::for_grid(&g);
        terrain.set(GridCoordinate::new(20, 20), TerrainType::Hills);

        let cell = GridCoordinate::new(20, 20);
        assert_eq!(morale_at(Team::A, cell, &field, &terrain), 100.0);
        assert!(morale_at(Team::B, cell, &field, &terrain) >= 0.0);
    }

    #[test]
    fn test_terrain_scales_morale() {
        let g = grid();
        let field = InfluenceField::new(&g);
        let mut terrain = TerrainGrid::for_grid(&g);
        terrain.set(GridCoordinate::new(3, 3), TerrainType::Hills);
        terrain.set(GridCoordinate::new(4, 4), TerrainType::Water);

        assert!((morale_at(Team::A, GridCoordinate::new(3, 3), &field, &terrain) - 60.0).abs() < 1e-4);
        assert!((morale_at(Team::A, GridCoordinate::new(4, 4), &field, &terrain) - 40.0).abs() < 1e-4);
    }

    #[test]
    fn test_advantage() {
        assert_eq!(advantage(50.0, 50.0), 0.0);
        assert_eq!(advantage(100.0, 0.0), 1.0);
        assert_eq!(advantage(0.0, 100.0), -1.0);
        assert_eq!(advantage(75.0, 25.0), 0.5);
    }

    #[test]
    fn test_advantage_vs_baseline() {
        assert_eq!(advantage_vs_baseline(50.0), 0.0);
        assert_eq!(advantage_vs_baseline(100.0), 1.0);
        assert_eq!(advantage_vs_baseline(25.0), -0.5);
    }
}
