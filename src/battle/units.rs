//! Units and the unit table
//!
//! Units are never removed during a battle. Dead units stay in the table so
//! casualty counts remain queryable until the next reset.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::battle::constants::MORALE_NEUTRAL;
use crate::core::types::{Team, UnitId, Vec2};

/// Role of a unit on the field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum UnitType {
    #[default]
    Line,
    Commander,
}

impl UnitType {
    /// Health relative to the tuned base health
    pub fn health_factor(&self) -> f32 {
        match self {
            UnitType::Line => 1.0,
            UnitType::Commander => 1.5,
        }
    }

    /// Weight of this unit's contribution to the influence field
    pub fn influence_weight(&self) -> f32 {
        match self {
            UnitType::Line => 1.0,
            UnitType::Commander => 2.0,
        }
    }
}

/// A unit on the battle map
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Unit {
    pub id: UnitId,
    pub team: Team,
    pub unit_type: UnitType,
    pub position: Vec2,
    pub rotation: f32,
    pub health: f32,
    pub health_max: f32,
    pub morale_score: f32,
    pub is_attacking: bool,
}

impl Unit {
    pub fn new(id: UnitId, team: Team, unit_type: UnitType, position: Vec2, base_health: f32) -> Self {
        let health_max = base_health * unit_type.health_factor();
        Self {
            id,
            team,
            unit_type,
            position,
            // Face the enemy side of the map
            rotation: match team {
                Team::A => 0.0,
                Team::B => std::f32::consts::PI,
            },
            health: health_max,
            health_max,
            morale_score: MORALE_NEUTRAL,
            is_attacking: false,
        }
    }

    pub fn is_alive(&self) -> bool {
        self.health > 0.0
    }

    pub fn health_ratio(&self) -> f32 {
        if self.health_max > 0.0 {
            (self.health / self.health_max).clamp(0.0, 1.0)
        } else {
            0.0
        }
    }

    /// Apply damage, never dropping below zero. Returns true if this killed the unit.
    pub fn take_damage(&mut self, amount: f32) -> bool {
        if !self.is_alive() || amount.is_nan() || amount <= 0.0 {
            return false;
        }
        self.health = (self.health - amount).max(0.0);
        !self.is_alive()
    }

    /// Change maximum health while keeping the current health ratio
    pub fn rescale_health(&mut self, new_base_health: f32) {
        let ratio = self.health_ratio();
        self.health_max = new_base_health * self.unit_type.health_factor();
        if self.is_alive() {
            self.health = self.health_max * ratio;
        }
    }
}

/// All units of a battle keyed by id
///
/// Iteration is always in ascending id order.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UnitTable {
    units: BTreeMap<UnitId, Unit>,
    next_id: u32,
}

impl UnitTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a new unit with the next free id
    pub fn spawn(
        &mut self,
        team: Team,
        unit_type: UnitType,
        position: Vec2,
        base_health: f32,
    ) -> UnitId {
        let id = UnitId(self.next_id);
        self.next_id += 1;
        self.units
            .insert(id, Unit::new(id, team, unit_type, position, base_health));
        id
    }

    pub fn get(&self, id: UnitId) -> Option<&Unit> {
        self.units.get(&id)
    }

    pub fn get_mut(&mut self, id: UnitId) -> Option<&mut Unit> {
        self.units.get_mut(&id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Unit> {
        self.units.values()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Unit> {
        self.units.values_mut()
    }

    pub fn alive(&self) -> impl Iterator<Item = &Unit> {
        self.units.values().filter(|u| u.is_alive())
    }

    pub fn ids(&self) -> Vec<UnitId> {
        self.units.keys().copied().collect()
    }

    pub fn len(&self) -> usize {
        self.units.len()
    }

    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }

    pub fn alive_count(&self, team: Team) -> u32 {
        self.alive().filter(|u| u.team == team).count() as u32
    }

    pub fn dead_count(&self, team: Team) -> u32 {
        self.iter()
            .filter(|u| u.team == team && !u.is_alive())
            .count() as u32
    }

    /// Drop every unit and restart id assignment
    pub fn clear(&mut self) {
        self.units.clear();
        self.next_id = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_spawn_assigns_sequential_ids() {
        let mut table = UnitTable::new();
        let a = table.spawn(Team::A, UnitType::Line, Vec2::new(0.0, 0.0), 100.0);
        let b = table.spawn(Team::B, UnitType::Line, Vec2::new(1.0, 0.0), 100.0);
        assert_eq!(a, UnitId(0));
        assert_eq!(b, UnitId(1));
        assert_eq!(table.len(), 2);
    }

    #[test]
    fn test_commander_has_more_health() {
        let line = Unit::new(UnitId(0), Team::A, UnitType::Line, Vec2::default(), 100.0);
        let cmd = Unit::new(UnitId(1), Team::A, UnitType::Commander, Vec2::default(), 100.0);
        assert_eq!(line.health_max, 100.0);
        assert_eq!(cmd.health_max, 150.0);
        assert_eq!(cmd.health, cmd.health_max);
    }

    #[test]
    fn test_damage_clamps_at_zero() {
        let mut unit = Unit::new(UnitId(0), Team::A, UnitType::Line, Vec2::default(), 100.0);
        assert!(!unit.take_damage(40.0));
        assert_eq!(unit.health, 60.0);
        assert!(unit.take_damage(500.0));
        assert_eq!(unit.health, 0.0);
        assert!(!unit.is_alive());
        // Further damage is ignored and does not report a second death
        assert!(!unit.take_damage(10.0));
    }

    #[test]
    fn test_negative_damage_ignored() {
        let mut unit = Unit::new(UnitId(0), Team::A, UnitType::Line, Vec2::default(), 100.0);
        unit.take_damage(-20.0);
        assert_eq!(unit.health, 100.0);
    }

    #[test]
    fn test_rescale_preserves_ratio() {
        let mut unit = Unit::new(UnitId(0), Team::A, UnitType::Line, Vec2::default(), 100.0);
        unit.health = 50.0;
        unit.rescale_health(200.0);
        assert_eq!(unit.health, 100.0);
        assert_eq!(unit.health_max, 200.0);
    }

    #[test]
    fn test_dead_units_stay_dead_on_rescale() {
        let mut unit = Unit::new(UnitId(0), Team::A, UnitType::Line, Vec2::default(), 100.0);
        unit.health = 0.0;
        unit.rescale_health(300.0);
        assert_eq!(unit.health, 0.0);
        assert_eq!(unit.health_max, 300.0);
    }

    #[test]
    fn test_dead_units_retained_and_counted() {
        let mut table = UnitTable::new();
        let a = table.spawn(Team::A, UnitType::Line, Vec2::default(), 100.0);
        table.spawn(Team::A, UnitType::Line, Vec2::default(), 100.0);
        table.get_mut(a).unwrap().take_damage(1000.0);

        assert_eq!(table.len(), 2);
        assert_eq!(table.alive_count(Team::A), 1);
        assert_eq!(table.dead_count(Team::A), 1);
        assert_eq!(table.alive_count(Team::B), 0);
    }

    #[test]
    fn test_clear_resets_ids() {
        let mut table = UnitTable::new();
        table.spawn(Team::A, UnitType::Line, Vec2::default(), 100.0);
        table.clear();
        assert!(table.is_empty());
        assert_eq!(
            table.spawn(Team::B, UnitType::Line, Vec2::default(), 100.0),
            UnitId(0)
        );
    }
}
