//! Runtime-adjustable balance values
//!
//! A match starts from the `Tuning` in its config. Host clients may send
//! partial updates while the match runs; each recognized value is clamped
//! into a sane range before it lands.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Balance values read by movement, combat, influence and spawning
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Tuning {
    /// Max health of a line unit; commanders scale from this
    pub base_unit_health: f32,
    /// World units per second on open ground
    pub unit_move_speed: f32,
    /// Damage per second dealt by an engaged unit at zero advantage
    pub base_contact_dps: f32,
    /// How strongly morale advantage raises damage dealt
    pub dps_influence_multiplier: f32,
    /// How strongly morale advantage reduces damage received
    pub health_influence_multiplier: f32,
    /// Seconds between city reinforcements
    ///
    /// Read by the `SpawnSource` the match was built with; `NoSpawns` ignores it.
    pub city_unit_generation_interval_seconds: f32,
    /// Ticks between scheduled influence recomputes
    pub influence_update_interval_frames: u32,
    pub unit_influence_multiplier: f32,
    /// Influence of an owned city, measured in unit equivalents
    pub city_influence_units_equivalent: f32,
}

impl Default for Tuning {
    fn default() -> Self {
        Self {
            base_unit_health: 100.0,
            unit_move_speed: 40.0,
            base_contact_dps: 10.0,
            dps_influence_multiplier: 0.5,
            health_influence_multiplier: 0.5,
            city_unit_generation_interval_seconds: 30.0,
            influence_update_interval_frames: 10,
            unit_influence_multiplier: 1.0,
            city_influence_units_equivalent: 5.0,
        }
    }
}

impl Tuning {
    /// Check ranges for values loaded from config files
    pub fn validate(&self) -> Result<(), String> {
        let positive = [
            ("base_unit_health", self.base_unit_health),
            ("unit_move_speed", self.unit_move_speed),
            (
                "city_unit_generation_interval_seconds",
                self.city_unit_generation_interval_seconds,
            ),
        ];
        for (name, value) in positive {
            if !value.is_finite() || value <= 0.0 {
                return Err(format!("{} must be positive, got {}", name, value));
            }
        }

        let non_negative = [
            ("base_contact_dps", self.base_contact_dps),
            ("dps_influence_multiplier", self.dps_influence_multiplier),
            ("health_influence_multiplier", self.health_influence_multiplier),
            ("unit_influence_multiplier", self.unit_influence_multiplier),
            (
                "city_influence_units_equivalent",
                self.city_influence_units_equivalent,
            ),
        ];
        for (name, value) in non_negative {
            if !value.is_finite() || value < 0.0 {
                return Err(format!("{} must be non-negative, got {}", name, value));
            }
        }

        if self.influence_update_interval_frames == 0 {
            return Err("influence_update_interval_frames must be at least 1".into());
        }
        Ok(())
    }

    /// Merge an update. Returns which parts of the simulation must react.
    pub fn apply(&mut self, update: &TuningUpdate) -> TuningEffects {
        let previous_health = self.base_unit_health;

        macro_rules! merge {
            ($($field:ident),*) => {
                $(if let Some(v) = update.$field { self.$field = v; })*
            };
        }
        merge!(
            base_unit_health,
            unit_move_speed,
            base_contact_dps,
            dps_influence_multiplier,
            health_influence_multiplier,
            city_unit_generation_interval_seconds,
            influence_update_interval_frames,
            unit_influence_multiplier,
            city_influence_units_equivalent
        );

        TuningEffects {
            health_rescale: (self.base_unit_health != previous_health)
                .then_some(self.base_unit_health),
            influence_changed: update.unit_influence_multiplier.is_some()
                || update.city_influence_units_equivalent.is_some(),
        }
    }
}

/// Follow-up work after a tuning change
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct TuningEffects {
    /// New base health if it changed
    pub health_rescale: Option<f32>,
    pub influence_changed: bool,
}

/// A partial, already-clamped tuning change
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TuningUpdate {
    pub base_unit_health: Option<f32>,
    pub unit_move_speed: Option<f32>,
    pub base_contact_dps: Option<f32>,
    pub dps_influence_multiplier: Option<f32>,
    pub health_influence_multiplier: Option<f32>,
    pub city_unit_generation_interval_seconds: Option<f32>,
    pub influence_update_interval_frames: Option<u32>,
    pub unit_influence_multiplier: Option<f32>,
    pub city_influence_units_equivalent: Option<f32>,
}

fn number(object: &serde_json::Map<String, Value>, key: &str, min: f64, max: f64) -> Option<f32> {
    let value = object.get(key)?.as_f64()?;
    value.is_finite().then(|| value.clamp(min, max) as f32)
}

impl TuningUpdate {
    /// Read an update from the client's `tuning` object
    ///
    /// Unknown keys and non-numeric or non-finite values are ignored.
    pub fn from_json(value: &Value) -> Self {
        let Some(object) = value.as_object() else {
            return Self::default();
        };

        Self {
            base_unit_health: number(object, "baseUnitHealth", 1.0, 10_000.0),
            unit_move_speed: number(object, "unitMoveSpeed", 1.0, 1_000.0),
            base_contact_dps: number(object, "baseContactDps", 0.0, 1_000.0),
            dps_influence_multiplier: number(object, "dpsInfluenceMultiplier", 0.0, 5.0),
            health_influence_multiplier: number(object, "healthInfluenceMultiplier", 0.0, 5.0),
            city_unit_generation_interval_seconds: number(
                object,
                "cityUnitGenerationIntervalSeconds",
                1.0,
                3_600.0,
            ),
            influence_update_interval_frames: number(
                object,
                "influenceUpdateIntervalFrames",
                1.0,
                600.0,
            )
            .map(|v| v.round() as u32),
            unit_influence_multiplier: number(object, "unitInfluenceMultiplier", 0.0, 10.0),
            city_influence_units_equivalent: number(
                object,
                "cityInfluenceUnitsEquivalent",
                0.0,
                100.0,
            ),
        }
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}
