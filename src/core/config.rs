//! Simulation configuration with documented constants
//!
//! Every match is built from one `SimulationConfig`. It is passed by value
//! into `BattleState::new`; there is no process-wide config.

use std::fs;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::battle::cities::City;
use crate::battle::tuning::Tuning;
use crate::core::error::{FrontlineError, Result};

/// Configuration for one match
///
/// Every field has a default, so a TOML file only needs to name the values
/// it overrides.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    // === MAP ===
    /// Number of grid columns overlaying the map
    ///
    /// Terrain, influence and routing all key off this grid.
    pub grid_cols: u32,

    /// Number of grid rows overlaying the map
    pub grid_rows: u32,

    /// Width of the continuous map in world units
    ///
    /// Cell width is `map_width / grid_cols`. Contact distance and the
    /// arrival snap tolerance scale with the cell size.
    pub map_width: f32,

    /// Height of the continuous map in world units
    pub map_height: f32,

    // === LOOP ===
    /// Wall-clock interval between ticks in milliseconds
    ///
    /// At 50ms the simulation runs at 20Hz. Every tick advances the world
    /// by exactly this many seconds of simulated time.
    pub tick_interval_ms: u64,

    /// How often the runtime publishes a full state snapshot (ticks)
    ///
    /// Path-state broadcasts are independent of this and are sent as soon as
    /// a route changes.
    pub snapshot_interval_ticks: u64,

    /// Optional time limit for a battle in simulated seconds
    ///
    /// When it expires the battle is decided by living units, then cities.
    pub max_battle_seconds: Option<f32>,

    // === BALANCE ===
    /// Starting balance values; adjustable at runtime via tuning-update
    pub tuning: Tuning,

    // === CITIES ===
    /// Cities and their owners for the built-in city system
    ///
    /// Ownership stays as configured for the whole battle. Cities feed the
    /// influence field and break ties at battle end.
    pub cities: Vec<City>,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            grid_cols: 80,
            grid_rows: 44,
            map_width: 1600.0,
            map_height: 880.0,
            tick_interval_ms: 50,
            snapshot_interval_ticks: 5,
            max_battle_seconds: None,
            tuning: Tuning::default(),
            cities: Vec::new(),
        }
    }
}

impl SimulationConfig {
    /// Create a new config with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a config from TOML text and validate it
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: SimulationConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load a config file from disk
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Duration of one tick
    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }

    /// Simulated seconds advanced per tick
    pub fn tick_seconds(&self) -> f32 {
        self.tick_interval_ms as f32 / 1000.0
    }

    /// Validate configuration for internal consistency
    pub fn validate(&self) -> Result<()> {
        if self.grid_cols == 0 || self.grid_rows == 0 {
            return Err(FrontlineError::InvalidConfig(format!(
                "grid must be non-empty, got {}x{}",
                self.grid_cols, self.grid_rows
            )));
        }

        let positive = |v: f32| v.is_finite() && v > 0.0;
        if !positive(self.map_width) || !positive(self.map_height) {
            return Err(FrontlineError::InvalidConfig(format!(
                "map size must be positive, got {}x{}",
                self.map_width, self.map_height
            )));
        }

        if self.tick_interval_ms == 0 {
            return Err(FrontlineError::InvalidConfig(
                "tick_interval_ms must be positive".into(),
            ));
        }

        if self.snapshot_interval_ticks == 0 {
            return Err(FrontlineError::InvalidConfig(
                "snapshot_interval_ticks must be positive".into(),
            ));
        }

        if let Some(limit) = self.max_battle_seconds {
            if limit.is_nan() || limit <= 0.0 {
                return Err(FrontlineError::InvalidConfig(format!(
                    "max_battle_seconds must be positive, got {}",
                    limit
                )));
            }
        }

        if let Some(city) = self
            .cities
            .iter()
            .find(|c| c.cell.col >= self.grid_cols || c.cell.row >= self.grid_rows)
        {
            return Err(FrontlineError::InvalidConfig(format!(
                "city {} at ({}, {}) is off the grid",
                city.name, city.cell.col, city.cell.row
            )));
        }

        self.tuning.validate().map_err(FrontlineError::InvalidConfig)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(SimulationConfig::default().validate().is_ok());
    }

    #[test]
    fn test_tick_seconds() {
        let config = SimulationConfig::default();
        assert!((config.tick_seconds() - 0.05).abs() < 1e-6);
        assert_eq!(config.tick_interval(), Duration::from_millis(50));
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = SimulationConfig::from_toml_str(
            r#"
            grid_cols = 40
            tick_interval_ms = 100

            [tuning]
            base_contact_dps = 25.0
            "#,
        )
        .unwrap();

        assert_eq!(config.grid_cols, 40);
        assert_eq!(config.grid_rows, 44);
        assert_eq!(config.tick_interval_ms, 100);
        assert_eq!(config.tuning.base_contact_dps, 25.0);
        assert_eq!(config.tuning.base_unit_health, Tuning::default().base_unit_health);
    }

    #[test]
    fn test_cities_from_toml() {
        let config = SimulationConfig::from_toml_str(
            r#"
            [[cities]]
            name = "north"
            cell = { col = 10, row = 5 }
            owner = "A"

            [[cities]]
            name = "ford"
            cell = { col = 40, row = 20 }
            weight = 2.0
            "#,
        )
        .unwrap();

        assert_eq!(config.cities.len(), 2);
        assert_eq!(config.cities[0].owner, Some(crate::core::types::Team::A));
        assert_eq!(config.cities[0].weight, 1.0);
        assert_eq!(config.cities[1].owner, None);
        assert_eq!(config.cities[1].weight, 2.0);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_off_grid_city_rejected() {
        let config = SimulationConfig {
            cities: vec![City::new(
                "nowhere",
                crate::battle::grid::GridCoordinate::new(80, 0),
                None,
            )],
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(FrontlineError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_empty_grid_rejected() {
        let config = SimulationConfig {
            grid_cols: 0,
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(FrontlineError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_bad_toml_is_an_error() {
        let result = SimulationConfig::from_toml_str("grid_cols = \"wide\"");
        assert!(matches!(result, Err(FrontlineError::TomlError(_))));
    }

    #[test]
    fn test_time_limit_must_be_positive() {
        let config = SimulationConfig {
            max_battle_seconds: Some(0.0),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }
}
