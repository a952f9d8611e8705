//! Contact combat resolution
//!
//! Damage for every engaged pair is computed from the state at the start of
//! the combat phase, then applied in one pass. Pair order therefore never
//! changes the outcome.

use std::collections::BTreeMap;

use ordered_float::OrderedFloat;

use crate::battle::constants::{MAX_MITIGATION, MIN_MITIGATION};
use crate::battle::engagement::{detect_engagements, engaged_units, Engagement};
use crate::battle::grid::GridSpec;
use crate::battle::influence::InfluenceField;
use crate::battle::morale::{advantage, morale_of};
use crate::battle::terrain::TerrainOracle;
use crate::battle::tuning::Tuning;
use crate::battle::units::UnitTable;
use crate::core::types::UnitId;

/// Damage dealt multiplier for an attacker with advantage `adv`
pub fn damage_multiplier(adv: f32, k: f32) -> f32 {
    (1.0 + adv * k).max(0.0)
}

/// Damage received multiplier for a defender with advantage `adv`
pub fn mitigation_multiplier(adv: f32, k: f32) -> f32 {
    (1.0 - adv * k).clamp(MIN_MITIGATION, MAX_MITIGATION)
}

/// Read-only inputs to a combat pass
pub struct CombatContext<'a> {
    pub grid: &'a GridSpec,
    pub terrain: &'a dyn TerrainOracle,
    pub tuning: &'a Tuning,
}

/// What one combat pass did
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CombatReport {
    pub pairs: Vec<Engagement>,
    /// Damage taken per unit this tick
    pub damage: BTreeMap<UnitId, f32>,
    /// Opponent each engaged unit should turn toward
    pub facing_targets: BTreeMap<UnitId, UnitId>,
    /// Units whose health reached zero this tick, in id order
    pub deaths: Vec<UnitId>,
}

/// Damage one side of a pair deals to the other this tick
fn pair_damage(attacker_morale: f32, defender_morale: f32, tuning: &Tuning, dt: f32) -> f32 {
    let adv = advantage(attacker_morale, defender_morale);
    tuning.base_contact_dps
        * damage_multiplier(adv, tuning.dps_influence_multiplier)
        * mitigation_multiplier(-adv, tuning.health_influence_multiplier)
        * dt
}

/// Resolve one tick of contact combat
pub fn resolve_combat(
    units: &mut UnitTable,
    field: &InfluenceField,
    ctx: &CombatContext<'_>,
    dt: f32,
) -> CombatReport {
    let pairs = detect_engagements(units, ctx.grid.contact_distance());
    let mut report = CombatReport::default();

    // Pre-combat morale, evaluated once per engaged unit
    let engaged = engaged_units(&pairs);
    let morale: BTreeMap<UnitId, f32> = engaged
        .iter()
        .filter_map(|&id| units.get(id).map(|u| (id, morale_of(u, field, ctx.grid, ctx.terrain))))
        .collect();

    if ctx.tuning.base_contact_dps > 0.0 && dt > 0.0 {
        for pair in &pairs {
            let (Some(&m1), Some(&m2)) = (morale.get(&pair.first), morale.get(&pair.second)) else {
                continue;
            };
            let to_second = pair_damage(m1, m2, ctx.tuning, dt);
            let to_first = pair_damage(m2, m1, ctx.tuning, dt);
            *report.damage.entry(pair.second).or_insert(0.0) += to_second;
            *report.damage.entry(pair.first).or_insert(0.0) += to_first;
        }
    }

    for id in &engaged {
        let Some(unit) = units.get(*id) else {
            continue;
        };
        let nearest = pairs
            .iter()
            .filter_map(|p| p.partner(*id))
            .filter_map(|other| units.get(other))
            .min_by_key(|other| (OrderedFloat(unit.position.distance(&other.position)), other.id));
        if let Some(target) = nearest {
            report.facing_targets.insert(*id, target.id);
        }
    }

    for (id, amount) in &report.damage {
        if let Some(unit) = units.get_mut(*id) {
            if unit.take_damage(*amount) {
                report.deaths.push(*id);
            }
        }
    }

    for unit in units.iter_mut() {
        unit.is_attacking = engaged.contains(&unit.id);
    }

    report.pairs = pairs;
    report
}
