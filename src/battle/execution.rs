//! Battle execution loop
//!
//! Each tick: movement -> cities -> win check -> spawns -> combat ->
//! path state -> facing -> win check -> influence and morale

use std::cmp::Ordering;
use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::battle::cities::{CitySystem, FixedCities, NoSpawns, SpawnRequest, SpawnSource};
use crate::battle::commands::{ClientCommand, CommandIssuer};
use crate::battle::constants::UNIT_TURN_RATE;
use crate::battle::engagement::{detect_engagements, engaged_units, EngagementTracker};
use crate::battle::grid::GridSpec;
use crate::battle::influence::{InfluenceField, InfluenceSchedule};
use crate::battle::morale::morale_of;
use crate::battle::movement::{advance_unit_movement, MovementCommandMode, MovementContext, MovementState};
use crate::battle::resolution::{resolve_combat, CombatContext, CombatReport};
use crate::battle::routing;
use crate::battle::snapshot::{InfluenceSnapshot, PathStateBroadcast, PathStateTracker, UnitSnapshot};
use crate::battle::terrain::{TerrainGrid, TerrainOracle};
use crate::battle::tuning::{Tuning, TuningEffects, TuningUpdate};
use crate::battle::units::{Unit, UnitTable, UnitType};
use crate::core::config::SimulationConfig;
use crate::core::error::{FrontlineError, Result};
use crate::core::types::{rotate_toward, Team, Tick, UnitId, Vec2};

/// Match phases
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum MatchPhase {
    #[default]
    Lobby, // Deployment, waiting for start
    Battle, // Ticks advance the simulation
    Ended,  // Outcome decided; waiting for reset
}

/// Why a battle ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum EndReason {
    Annihilation,
    TimeLimit,
    Concluded,
}

/// Final result of a battle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BattleOutcome {
    /// `None` on a draw
    pub winner: Option<Team>,
    pub loser: Option<Team>,
    pub reason: EndReason,
    pub a_units: u32,
    pub b_units: u32,
    pub a_cities: u32,
    pub b_cities: u32,
}

impl BattleOutcome {
    /// Decide by living units, then by cities, else draw
    fn by_counts(reason: EndReason, a_units: u32, b_units: u32, a_cities: u32, b_cities: u32) -> Self {
        let winner = match a_units.cmp(&b_units).then(a_cities.cmp(&b_cities)) {
            Ordering::Greater => Some(Team::A),
            Ordering::Less => Some(Team::B),
            Ordering::Equal => None,
        };
        Self {
            winner,
            loser: winner.map(|t| t.opponent()),
            reason,
            a_units,
            b_units,
            a_cities,
            b_cities,
        }
    }

    pub fn is_draw(&self) -> bool {
        self.winner.is_none()
    }
}

/// Log entry for battle events
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BattleEvent {
    pub tick: Tick,
    pub event_type: BattleEventType,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum BattleEventType {
    BattleStarted,
    UnitSpawned { unit_id: UnitId, team: Team },
    EngagementStarted { first: UnitId, second: UnitId },
    EngagementEnded { first: UnitId, second: UnitId },
    UnitKilled { unit_id: UnitId, team: Team },
    MovementFinished { unit_id: UnitId },
    CityOwnershipChanged,
    InfluenceUpdated { revision: u64 },
    PathState(PathStateBroadcast),
    BattleEnded { outcome: BattleOutcome },
}

/// Log of events from a single tick
#[derive(Debug, Clone, Default)]
pub struct BattleEventLog {
    pub events: Vec<BattleEvent>,
}

impl BattleEventLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, event_type: BattleEventType, description: String, tick: Tick) {
        self.events.push(BattleEvent {
            tick,
            event_type,
            description,
        });
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn path_states(&self) -> impl Iterator<Item = &PathStateBroadcast> {
        self.events.iter().filter_map(|e| match &e.event_type {
            BattleEventType::PathState(p) => Some(p),
            _ => None,
        })
    }

    pub fn outcome(&self) -> Option<BattleOutcome> {
        self.events.iter().find_map(|e| match e.event_type {
            BattleEventType::BattleEnded { outcome } => Some(outcome),
            _ => None,
        })
    }
}

/// Complete state of one match
pub struct BattleState {
    pub config: SimulationConfig,
    pub grid: GridSpec,
    pub tuning: Tuning,
    pub units: UnitTable,

    // Time
    pub tick: Tick,
    pub phase: MatchPhase,
    pub outcome: Option<BattleOutcome>,
    elapsed: f32,

    // Per-unit movement, keyed like `units`
    movement: BTreeMap<UnitId, MovementState>,

    // Influence
    field: InfluenceField,
    schedule: InfluenceSchedule,

    // Presentation tracking
    engagement: EngagementTracker,
    path_tracker: PathStateTracker,

    // Collaborators
    terrain: Box<dyn TerrainOracle + Send>,
    cities: Box<dyn CitySystem + Send>,
    spawns: Box<dyn SpawnSource + Send>,
}

impl BattleState {
    /// New match in the lobby, on open grass, with the configured cities
    pub fn new(config: SimulationConfig) -> Self {
        let grid = GridSpec::from_config(&config);
        let cities = FixedCities::new(config.cities.clone());
        Self {
            tuning: config.tuning.clone(),
            terrain: Box::new(TerrainGrid::for_grid(&grid)),
            field: InfluenceField::new(&grid),
            grid,
            config,
            units: UnitTable::new(),
            tick: 0,
            phase: MatchPhase::Lobby,
            outcome: None,
            elapsed: 0.0,
            movement: BTreeMap::new(),
            schedule: InfluenceSchedule::new(),
            engagement: EngagementTracker::new(),
            path_tracker: PathStateTracker::new(),
            cities: Box::new(cities),
            spawns: Box::new(NoSpawns),
        }
    }

    pub fn with_terrain(mut self, terrain: impl TerrainOracle + Send + 'static) -> Self {
        self.terrain = Box::new(terrain);
        self
    }

    pub fn with_cities(mut self, cities: impl CitySystem + Send + 'static) -> Self {
        self.cities = Box::new(cities);
        self
    }

    pub fn with_spawns(mut self, spawns: impl SpawnSource + Send + 'static) -> Self {
        self.spawns = Box::new(spawns);
        self
    }

    /// Swap in a new map. Not allowed while a battle is running.
    pub fn replace_terrain(&mut self, terrain: Box<dyn TerrainOracle + Send>) -> Result<()> {
        if self.phase == MatchPhase::Battle {
            return Err(FrontlineError::InvalidCommand(
                "cannot change the map during a battle".into(),
            ));
        }
        self.terrain = terrain;
        self.refresh_morale();
        Ok(())
    }

    pub fn field(&self) -> &InfluenceField {
        &self.field
    }

    pub fn elapsed_seconds(&self) -> f32 {
        self.elapsed
    }

    pub fn is_finished(&self) -> bool {
        self.phase == MatchPhase::Ended
    }

    pub fn get_unit(&self, unit_id: UnitId) -> Option<&Unit> {
        self.units.get(unit_id)
    }

    pub fn movement_state(&self, unit_id: UnitId) -> Option<&MovementState> {
        self.movement.get(&unit_id)
    }

    // ===== LIFECYCLE =====

    /// Replace all units with a fresh deployment and return to the lobby
    pub fn reset_battle(&mut self, deployment: &[SpawnRequest]) -> Vec<UnitId> {
        self.units.clear();
        self.movement.clear();
        self.engagement.clear();
        self.path_tracker.clear();
        self.phase = MatchPhase::Lobby;
        self.outcome = None;
        self.elapsed = 0.0;

        let ids: Vec<UnitId> = deployment
            .iter()
            .filter_map(|req| self.spawn_unit(req.team, req.unit_type, req.position).ok())
            .collect();

        self.refresh_influence();
        self.refresh_morale();
        info!(units = ids.len(), "battle reset");
        ids
    }

    /// Leave the lobby and begin ticking
    pub fn start_battle(&mut self) -> Result<BattleEventLog> {
        if self.phase != MatchPhase::Lobby {
            return Err(FrontlineError::InvalidCommand(format!(
                "cannot start a battle from {:?}",
                self.phase
            )));
        }

        self.phase = MatchPhase::Battle;
        self.elapsed = 0.0;
        self.schedule = InfluenceSchedule::new();
        self.refresh_influence();
        self.refresh_morale();

        info!(
            a_units = self.units.alive_count(Team::A),
            b_units = self.units.alive_count(Team::B),
            "battle started"
        );
        let mut events = BattleEventLog::new();
        events.push(BattleEventType::BattleStarted, "Battle has begun!".into(), self.tick);
        Ok(events)
    }

    /// End the running battle now, deciding by unit and city counts
    pub fn conclude(&mut self, reason: EndReason) -> Result<BattleEventLog> {
        if self.phase != MatchPhase::Battle {
            return Err(FrontlineError::NotInBattle);
        }
        let outcome = self.count_outcome(reason);
        let mut events = BattleEventLog::new();
        self.end_battle(outcome, &mut events);
        Ok(events)
    }

    fn count_outcome(&self, reason: EndReason) -> BattleOutcome {
        BattleOutcome::by_counts(
            reason,
            self.units.alive_count(Team::A),
            self.units.alive_count(Team::B),
            self.cities.city_count(Team::A),
            self.cities.city_count(Team::B),
        )
    }

    fn end_battle(&mut self, outcome: BattleOutcome, events: &mut BattleEventLog) {
        self.phase = MatchPhase::Ended;
        self.outcome = Some(outcome);
        info!(
            winner = ?outcome.winner,
            reason = ?outcome.reason,
            a_units = outcome.a_units,
            b_units = outcome.b_units,
            "battle ended"
        );
        events.push(
            BattleEventType::BattleEnded { outcome },
            format!("Battle ended: {:?} ({:?})", outcome.winner, outcome.reason),
            self.tick,
        );
    }

    /// Add a unit. Off-map positions are clamped onto the map.
    pub fn spawn_unit(&mut self, team: Team, unit_type: UnitType, position: Vec2) -> Result<UnitId> {
        if !position.is_finite() {
            warn!(?team, "rejected spawn at non-finite position");
            return Err(FrontlineError::InvalidCommand(
                "spawn position must be finite".into(),
            ));
        }

        let position = self.grid.clamp_world(position);
        let id = self
            .units
            .spawn(team, unit_type, position, self.tuning.base_unit_health);
        self.movement.insert(id, MovementState::new());

        if let Some(unit) = self.units.get_mut(id) {
            unit.morale_score = morale_of(unit, &self.field, &self.grid, &*self.terrain);
        }
        debug!(%id, ?team, ?unit_type, "unit spawned");
        Ok(id)
    }

    // ===== COMMANDS =====

    /// Apply a parsed client command
    pub fn handle_command(&mut self, issuer: &CommandIssuer, command: ClientCommand) -> Result<()> {
        match command {
            ClientCommand::IssuePath {
                unit_id,
                path,
                movement_command_mode,
            } => {
                let mode = movement_command_mode.unwrap_or_default().resolve();
                self.issue_path(issuer, unit_id, &path, mode).map(|_| ())
            }
            ClientCommand::CancelMovement { unit_id } => self.cancel_movement(issuer, unit_id),
            ClientCommand::TogglePause { unit_id } => self.toggle_pause(issuer, unit_id).map(|_| ()),
            ClientCommand::TuningUpdate { tuning } => self.apply_tuning(issuer, &tuning).map(|_| ()),
        }
    }

    fn authorize(&self, issuer: &CommandIssuer, unit_id: UnitId) -> Result<&Unit> {
        if self.phase != MatchPhase::Battle {
            return Err(FrontlineError::NotInBattle);
        }
        let unit = self
            .units
            .get(unit_id)
            .ok_or(FrontlineError::UnitNotFound(unit_id))?;
        if !issuer.controls(unit.team) {
            return Err(FrontlineError::Unauthorized {
                unit: unit_id,
                team: issuer.team,
            });
        }
        if !unit.is_alive() {
            return Err(FrontlineError::UnitDead(unit_id));
        }
        Ok(unit)
    }

    /// Route a unit along client waypoints. Returns the number of cells queued.
    pub fn issue_path(
        &mut self,
        issuer: &CommandIssuer,
        unit_id: UnitId,
        path: &[Vec2],
        mode: MovementCommandMode,
    ) -> Result<usize> {
        let unit = self.authorize(issuer, unit_id)?;
        let cells = routing::route(
            &self.grid,
            &*self.terrain,
            self.grid.world_to_grid(unit.position),
            path,
        );
        let queued = cells.len();

        let unit = self
            .units
            .get(unit_id)
            .ok_or(FrontlineError::UnitNotFound(unit_id))?;
        self.movement
            .entry(unit_id)
            .or_default()
            .assign_route(cells, mode, unit, &self.grid);
        Ok(queued)
    }

    pub fn cancel_movement(&mut self, issuer: &CommandIssuer, unit_id: UnitId) -> Result<()> {
        self.authorize(issuer, unit_id)?;
        self.movement.entry(unit_id).or_default().clear();
        Ok(())
    }

    /// Returns whether the pause flag flipped
    pub fn toggle_pause(&mut self, issuer: &CommandIssuer, unit_id: UnitId) -> Result<bool> {
        self.authorize(issuer, unit_id)?;
        Ok(self.movement.entry(unit_id).or_default().toggle_pause())
    }

    /// Merge a host's tuning update
    pub fn apply_tuning(&mut self, issuer: &CommandIssuer, raw: &Value) -> Result<TuningEffects> {
        if !issuer.is_host {
            return Err(FrontlineError::NotHost("change tuning"));
        }

        let update = TuningUpdate::from_json(raw);
        if update.is_empty() {
            return Ok(TuningEffects::default());
        }

        let effects = self.tuning.apply(&update);
        if let Some(base) = effects.health_rescale {
            for unit in self.units.iter_mut() {
                unit.rescale_health(base);
            }
        }
        // Influence weights apply right away, not on the next scheduled refresh
        if effects.influence_changed {
            self.refresh_influence();
            self.refresh_morale();
        }
        info!(?update, "tuning updated");
        Ok(effects)
    }

    // ===== QUERIES =====

    pub fn unit_snapshots(&self) -> Vec<UnitSnapshot> {
        self.units.iter().map(UnitSnapshot::from).collect()
    }

    pub fn influence_snapshot(&self) -> InfluenceSnapshot {
        self.field.snapshot()
    }

    /// Current path state of a unit, whether or not it changed
    pub fn path_state(&self, unit_id: UnitId) -> Option<PathStateBroadcast> {
        let state = self.movement.get(&unit_id)?;
        Some(PathStateBroadcast {
            unit_id,
            path: state
                .remaining_cells()
                .map(|c| self.grid.cell_center(c))
                .collect(),
            is_paused: state.is_paused,
        })
    }

    // ===== TICK =====

    /// Run a complete battle tick of `dt` seconds
    pub fn run_tick(&mut self, dt: f32) -> BattleEventLog {
        let mut events = BattleEventLog::new();

        if self.phase != MatchPhase::Battle {
            return events;
        }
        self.tick += 1;
        self.elapsed += dt;

        self.phase_movement(dt, &mut events);
        self.phase_cities(&mut events);
        if self.phase_win_check(&mut events) {
            return events;
        }
        self.phase_spawns(dt, &mut events);
        let report = self.phase_combat(dt, &mut events);
        self.phase_path_state(&mut events);
        self.phase_facing(&report, dt);
        if self.phase_win_check(&mut events) {
            return events;
        }
        self.phase_influence(&mut events);

        events
    }

    fn phase_movement(&mut self, dt: f32, events: &mut BattleEventLog) {
        let tick = self.tick;
        let engaged = engaged_units(&detect_engagements(&self.units, self.grid.contact_distance()));
        let ctx = MovementContext {
            grid: &self.grid,
            terrain: &*self.terrain,
            base_speed: self.tuning.unit_move_speed,
            dt,
        };

        for (id, state) in self.movement.iter_mut() {
            let Some(unit) = self.units.get_mut(*id) else {
                continue;
            };
            if !unit.is_alive() {
                if state.has_route() {
                    state.clear();
                }
                continue;
            }
            // Fighting units hold their route but drop any turn in progress
            if engaged.contains(id) {
                state.target_rotation = None;
                continue;
            }

            let result = advance_unit_movement(unit, state, &ctx);
            if result.finished {
                events.push(
                    BattleEventType::MovementFinished { unit_id: *id },
                    format!("{} reached its destination", id),
                    tick,
                );
            }
        }
    }

    fn phase_cities(&mut self, events: &mut BattleEventLog) {
        if self.cities.resolve_ownership(&self.units, &self.grid) {
            self.schedule.force();
            info!(
                a_cities = self.cities.city_count(Team::A),
                b_cities = self.cities.city_count(Team::B),
                "city ownership changed"
            );
            events.push(
                BattleEventType::CityOwnershipChanged,
                "City ownership changed".into(),
                self.tick,
            );
        }
    }

    fn phase_win_check(&mut self, events: &mut BattleEventLog) -> bool {
        match check_battle_end(self) {
            Some(outcome) => {
                self.end_battle(outcome, events);
                true
            }
            None => false,
        }
    }

    fn phase_spawns(&mut self, dt: f32, events: &mut BattleEventLog) {
        let requests = self.spawns.generate(dt, &self.tuning, &*self.cities);
        for req in requests {
            if let Ok(unit_id) = self.spawn_unit(req.team, req.unit_type, req.position) {
                events.push(
                    BattleEventType::UnitSpawned {
                        unit_id,
                        team: req.team,
                    },
                    format!("{} joined team {:?}", unit_id, req.team),
                    self.tick,
                );
            }
        }
    }

    fn phase_combat(&mut self, dt: f32, events: &mut BattleEventLog) -> CombatReport {
        let tick = self.tick;
        let ctx = CombatContext {
            grid: &self.grid,
            terrain: &*self.terrain,
            tuning: &self.tuning,
        };
        let report = resolve_combat(&mut self.units, &self.field, &ctx, dt);

        let changes = self.engagement.update(&report.pairs);
        for pair in changes.started {
            debug!(first = %pair.first, second = %pair.second, "engagement started");
            events.push(
                BattleEventType::EngagementStarted {
                    first: pair.first,
                    second: pair.second,
                },
                format!("{} engaged {}", pair.first, pair.second),
                tick,
            );
        }
        for pair in changes.ended {
            debug!(first = %pair.first, second = %pair.second, "engagement ended");
            events.push(
                BattleEventType::EngagementEnded {
                    first: pair.first,
                    second: pair.second,
                },
                format!("{} disengaged from {}", pair.first, pair.second),
                tick,
            );
        }

        for id in &report.deaths {
            if let Some(state) = self.movement.get_mut(id) {
                state.clear();
            }
            let team = self.units.get(*id).map(|u| u.team);
            if let Some(team) = team {
                debug!(unit = %id, ?team, "unit killed");
                events.push(
                    BattleEventType::UnitKilled { unit_id: *id, team },
                    format!("{} was destroyed", id),
                    tick,
                );
            }
        }

        report
    }

    fn phase_path_state(&mut self, events: &mut BattleEventLog) {
        for broadcast in self.path_tracker.collect_changes(&self.movement, &self.grid) {
            events.push(
                BattleEventType::PathState(broadcast),
                String::new(),
                self.tick,
            );
        }
    }

    fn phase_facing(&mut self, report: &CombatReport, dt: f32) {
        let max_turn = UNIT_TURN_RATE * dt;
        for (id, target) in &report.facing_targets {
            let Some(target_position) = self.units.get(*target).map(|u| u.position) else {
                continue;
            };
            if let Some(unit) = self.units.get_mut(*id) {
                if unit.is_alive() {
                    let bearing = unit.position.bearing_to(&target_position);
                    unit.rotation = rotate_toward(unit.rotation, bearing, max_turn);
                }
            }
        }
    }

    fn phase_influence(&mut self, events: &mut BattleEventLog) {
        if self.schedule.tick(self.tuning.influence_update_interval_frames) {
            self.refresh_influence();
            events.push(
                BattleEventType::InfluenceUpdated {
                    revision: self.field.revision(),
                },
                String::new(),
                self.tick,
            );
        }
        self.refresh_morale();
    }

    fn refresh_influence(&mut self) {
        self.field.recompute(&self.units, &*self.cities, &self.tuning);
    }

    fn refresh_morale(&mut self) {
        for unit in self.units.iter_mut().filter(|u| u.is_alive()) {
            unit.morale_score = morale_of(unit, &self.field, &self.grid, &*self.terrain);
        }
    }
}

/// Check if battle should end
pub fn check_battle_end(state: &BattleState) -> Option<BattleOutcome> {
    let a_units = state.units.alive_count(Team::A);
    let b_units = state.units.alive_count(Team::B);

    // Annihilation: counts decide, except mutual wipe is always a draw
    if a_units == 0 || b_units == 0 {
        let mut outcome = state.count_outcome(EndReason::Annihilation);
        if a_units == b_units {
            outcome.winner = None;
            outcome.loser = None;
        }
        return Some(outcome);
    }

    if let Some(limit) = state.config.max_battle_seconds {
        if state.elapsed >= limit {
            return Some(state.count_outcome(EndReason::TimeLimit));
        }
    }

    None
}
