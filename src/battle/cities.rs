//! City and reinforcement collaborators
//!
//! Capture rules and spawn timers belong to the surrounding game. The
//! simulation only needs to know where influence comes from, who owns what,
//! and which units to add this tick.

use serde::{Deserialize, Serialize};

use crate::battle::grid::{GridCoordinate, GridSpec};
use crate::battle::tuning::Tuning;
use crate::battle::units::{UnitTable, UnitType};
use crate::core::types::{Team, Vec2};

/// A static point projecting influence for its owner
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InfluencePoint {
    pub cell: GridCoordinate,
    pub owner: Option<Team>,
    pub weight: f32,
}

/// Anything that contributes static influence to the field
pub trait InfluenceSource {
    fn influence_points(&self) -> Vec<InfluencePoint>;
}

/// Ownership of cities on the battle map
pub trait CitySystem: InfluenceSource {
    /// Update ownership from unit occupancy. Returns true if any owner changed.
    fn resolve_ownership(&mut self, units: &UnitTable, grid: &GridSpec) -> bool;

    fn city_count(&self, team: Team) -> u32;
}

/// A unit the spawn collaborator wants added
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SpawnRequest {
    pub team: Team,
    pub unit_type: UnitType,
    pub position: Vec2,
}

/// Source of reinforcements generated during the battle
pub trait SpawnSource {
    fn generate(&mut self, dt: f32, tuning: &Tuning, cities: &dyn CitySystem) -> Vec<SpawnRequest>;
}

/// A city on the map
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct City {
    pub name: String,
    pub cell: GridCoordinate,
    pub owner: Option<Team>,
    #[serde(default = "default_city_weight")]
    pub weight: f32,
}

fn default_city_weight() -> f32 {
    1.0
}

impl City {
    pub fn new(name: impl Into<String>, cell: GridCoordinate, owner: Option<Team>) -> Self {
        Self {
            name: name.into(),
            cell,
            owner,
            weight: default_city_weight(),
        }
    }
}

/// Cities with the owners they were configured with
///
/// Ownership never changes; capture rules belong to other `CitySystem`s.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FixedCities {
    cities: Vec<City>,
}

impl FixedCities {
    pub fn new(cities: Vec<City>) -> Self {
        Self { cities }
    }
}

impl InfluenceSource for FixedCities {
    fn influence_points(&self) -> Vec<InfluencePoint> {
        self.cities
            .iter()
            .map(|c| InfluencePoint {
                cell: c.cell,
                owner: c.owner,
                weight: c.weight,
            })
            .collect()
    }
}

impl CitySystem for FixedCities {
    fn resolve_ownership(&mut self, _units: &UnitTable, _grid: &GridSpec) -> bool {
        false
    }

    fn city_count(&self, team: Team) -> u32 {
        self.cities
            .iter()
            .filter(|c| c.owner == Some(team))
            .count() as u32
    }
}

/// Spawn source that never produces reinforcements
#[derive(Debug, Clone, Copy, Default)]
pub struct NoSpawns;

impl SpawnSource for NoSpawns {
    fn generate(&mut self, _dt: f32, _tuning: &Tuning, _cities: &dyn CitySystem) -> Vec<SpawnRequest> {
        Vec::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cities() -> FixedCities {
        FixedCities::new(vec![
            City::new("north", GridCoordinate::new(10, 5), Some(Team::A)),
            City::new("south", GridCoordinate::new(10, 30), Some(Team::B)),
            City::new("ford", GridCoordinate::new(40, 20), None),
        ])
    }

    #[test]
    fn test_city_counts() {
        let c = cities();
        assert_eq!(c.city_count(Team::A), 1);
        assert_eq!(c.city_count(Team::B), 1);
    }

    #[test]
    fn test_ownership_never_changes() {
        let mut c = cities();
        let grid = GridSpec::new(80, 44, 1600.0, 880.0);
        let mut units = UnitTable::new();
        // Even a team-B unit standing on team A's city does not capture it
        units.spawn(
            Team::B,
            UnitType::Line,
            grid.cell_center(GridCoordinate::new(10, 5)),
            100.0,
        );

        assert!(!c.resolve_ownership(&units, &grid));
        assert_eq!(c.city_count(Team::A), 1);
        assert_eq!(c.city_count(Team::B), 1);
    }

    #[test]
    fn test_influence_points_include_neutral() {
        let points = cities().influence_points();
        assert_eq!(points.len(), 3);
        assert_eq!(points[2].owner, None);
    }

    #[test]
    fn test_no_spawns() {
        let mut spawns = NoSpawns;
        assert!(spawns.generate(1.0, &Tuning::default(), &cities()).is_empty());
    }
}
