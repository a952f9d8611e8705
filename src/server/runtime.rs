//! Match runtime: one task, one `BattleState`, fixed tick interval
//!
//! Inbound messages are handled between ticks, never during one. Outbound
//! messages go to a broadcast channel; slow subscribers lag instead of
//! stalling the loop.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, error, info, info_span, warn, Instrument};

use crate::battle::cities::SpawnRequest;
use crate::battle::commands::ClientCommand;
use crate::battle::execution::{
    BattleEventLog, BattleEventType, BattleOutcome, BattleState, EndReason, MatchPhase,
};
use crate::battle::snapshot::{InfluenceSnapshot, PathStateBroadcast, UnitSnapshot};
use crate::battle::terrain::TerrainGrid;
use crate::core::error::{FrontlineError, Result};
use crate::core::types::{MatchId, Team, Tick, UnitId};
use crate::server::session::{SessionId, SessionRegistry};

/// Messages into a running match
#[derive(Debug)]
pub enum MatchMessage {
    Join {
        session: SessionId,
        name: String,
        team: Option<Team>,
    },
    Leave {
        session: SessionId,
    },
    Command {
        session: SessionId,
        command: ClientCommand,
    },
    /// Unparsed command text straight from a client
    RawCommand {
        session: SessionId,
        text: String,
    },
    Deploy {
        session: SessionId,
        units: Vec<SpawnRequest>,
    },
    Start {
        session: SessionId,
    },
    Conclude {
        session: SessionId,
    },
    LoadMap {
        session: SessionId,
        path: PathBuf,
    },
    MapLoaded(Result<TerrainGrid>),
    Shutdown,
}

/// Messages out of a running match
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum ServerMessage {
    #[serde(rename_all = "camelCase")]
    Snapshot {
        tick: Tick,
        phase: MatchPhase,
        units: Vec<UnitSnapshot>,
    },
    Influence(InfluenceSnapshot),
    PathState(PathStateBroadcast),
    #[serde(rename_all = "camelCase")]
    UnitKilled { unit_id: UnitId, team: Team },
    BattleStarted { tick: Tick },
    BattleEnded { outcome: BattleOutcome },
}

/// Cloneable handle for talking to a match
#[derive(Debug, Clone)]
pub struct MatchHandle {
    pub id: MatchId,
    inbox: mpsc::Sender<MatchMessage>,
    outbound: broadcast::Sender<ServerMessage>,
}

impl MatchHandle {
    pub async fn send(&self, message: MatchMessage) -> Result<()> {
        self.inbox
            .send(message)
            .await
            .map_err(|_| FrontlineError::InvalidCommand("match has shut down".into()))
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ServerMessage> {
        self.outbound.subscribe()
    }
}

/// Owner of a match's state while it runs
pub struct MatchRuntime {
    id: MatchId,
    state: BattleState,
    sessions: SessionRegistry,
    inbox: mpsc::Receiver<MatchMessage>,
    loopback: mpsc::WeakSender<MatchMessage>,
    outbound: broadcast::Sender<ServerMessage>,
    published_revision: Option<u64>,
}

impl MatchRuntime {
    pub fn new(state: BattleState, capacity: usize) -> (Self, MatchHandle) {
        let id = MatchId::new();
        let (inbox_tx, inbox_rx) = mpsc::channel(capacity.max(1));
        let (outbound, _) = broadcast::channel(capacity.max(1));

        let runtime = Self {
            id,
            state,
            sessions: SessionRegistry::new(),
            inbox: inbox_rx,
            loopback: inbox_tx.downgrade(),
            outbound: outbound.clone(),
            published_revision: None,
        };
        let handle = MatchHandle {
            id,
            inbox: inbox_tx,
            outbound,
        };
        (runtime, handle)
    }

    /// Spawn the match loop onto the current tokio runtime
    pub fn spawn(state: BattleState, capacity: usize) -> (MatchHandle, JoinHandle<BattleState>) {
        let (runtime, handle) = Self::new(state, capacity);
        (handle, tokio::spawn(runtime.run()))
    }

    pub fn state(&self) -> &BattleState {
        &self.state
    }

    /// Run until shutdown or until every handle is dropped. Returns the final state.
    pub async fn run(mut self) -> BattleState {
        let span = info_span!("match", id = %self.id);
        async move {
            let mut ticker = interval(self.state.config.tick_interval());
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            info!(
                interval_ms = self.state.config.tick_interval_ms,
                "match loop started"
            );

            loop {
                tokio::select! {
                    _ = ticker.tick() => self.tick(),
                    message = self.inbox.recv() => match message {
                        Some(MatchMessage::Shutdown) | None => break,
                        Some(message) => self.handle_message(message),
                    },
                }
            }

            info!(tick = self.state.tick, "match loop stopped");
            self.state
        }
        .instrument(span)
        .await
    }

    /// Advance one tick, surviving panics
    pub fn tick(&mut self) {
        let dt = self.state.config.tick_seconds();
        let state = &mut self.state;
        match catch_unwind(AssertUnwindSafe(|| state.run_tick(dt))) {
            Ok(events) => self.publish_events(&events),
            Err(_) => error!(tick = self.state.tick, "tick panicked, continuing"),
        }

        let interval = self.state.config.snapshot_interval_ticks.max(1);
        if self.state.phase == MatchPhase::Battle && self.state.tick % interval == 0 {
            self.publish_snapshot();
        }
    }

    pub fn handle_message(&mut self, message: MatchMessage) {
        match message {
            MatchMessage::Join { session, name, team } => {
                let is_host = self.sessions.join(session, name, team);
                info!(session = session.0, ?team, is_host, "session joined");
            }
            MatchMessage::Leave { session } => {
                if self.sessions.leave(session).is_some() {
                    info!(session = session.0, host = ?self.sessions.host(), "session left");
                }
            }
            MatchMessage::Command { session, command } => self.apply_command(session, command),
            MatchMessage::RawCommand { session, text } => match ClientCommand::parse(&text) {
                Ok(command) => self.apply_command(session, command),
                Err(e) => debug!(session = session.0, error = %e, "dropped malformed command"),
            },
            MatchMessage::Deploy { session, units } => {
                if self.require_host(session, "deploy") {
                    if self.state.phase == MatchPhase::Battle {
                        debug!("dropped deployment during battle");
                        return;
                    }
                    self.state.reset_battle(&units);
                    self.publish_snapshot();
                }
            }
            MatchMessage::Start { session } => {
                if self.require_host(session, "start") {
                    match self.state.start_battle() {
                        Ok(events) => {
                            self.publish_events(&events);
                            self.publish_snapshot();
                        }
                        Err(e) => debug!(error = %e, "start rejected"),
                    }
                }
            }
            MatchMessage::Conclude { session } => {
                if self.require_host(session, "conclude") {
                    match self.state.conclude(EndReason::Concluded) {
                        Ok(events) => self.publish_events(&events),
                        Err(e) => debug!(error = %e, "conclude rejected"),
                    }
                }
            }
            MatchMessage::LoadMap { session, path } => {
                if self.require_host(session, "load a map") {
                    self.load_map(path);
                }
            }
            MatchMessage::MapLoaded(result) => self.install_map(result),
            MatchMessage::Shutdown => {}
        }
    }

    fn require_host(&self, session: SessionId, action: &str) -> bool {
        let ok = self.sessions.is_host(session);
        if !ok {
            debug!(session = session.0, action, "dropped host-only request");
        }
        ok
    }

    fn apply_command(&mut self, session: SessionId, command: ClientCommand) {
        let Some(issuer) = self.sessions.issuer(session) else {
            debug!(session = session.0, "dropped command from unknown session");
            return;
        };
        let kind = command.kind();
        if let Err(e) = self.state.handle_command(&issuer, command) {
            debug!(session = session.0, kind, error = %e, "dropped command");
        }
    }

    /// Parse the map off the loop and deliver it back as a message
    fn load_map(&self, path: PathBuf) {
        let Some(loopback) = self.loopback.upgrade() else {
            return;
        };
        info!(path = %path.display(), "loading map");
        tokio::spawn(async move {
            let result = match tokio::task::spawn_blocking(move || load_terrain(&path)).await {
                Ok(result) => result,
                Err(e) => Err(FrontlineError::InvalidConfig(format!("map loader failed: {}", e))),
            };
            let _ = loopback.send(MatchMessage::MapLoaded(result)).await;
        });
    }

    fn install_map(&mut self, result: Result<TerrainGrid>) {
        let terrain = match result {
            Ok(terrain) => terrain,
            Err(e) => {
                warn!(error = %e, "map load failed");
                return;
            }
        };

        let grid = self.state.grid;
        if terrain.cols != grid.cols || terrain.rows != grid.rows {
            warn!(
                map_cols = terrain.cols,
                map_rows = terrain.rows,
                grid_cols = grid.cols,
                grid_rows = grid.rows,
                "map size does not match grid, ignoring"
            );
            return;
        }

        match self.state.replace_terrain(Box::new(terrain)) {
            Ok(()) => info!("map installed"),
            Err(e) => warn!(error = %e, "map rejected"),
        }
    }

    fn publish(&self, message: ServerMessage) {
        // No subscribers is fine
        let _ = self.outbound.send(message);
    }

    fn publish_events(&self, events: &BattleEventLog) {
        for event in &events.events {
            let message = match &event.event_type {
                BattleEventType::PathState(path) => ServerMessage::PathState(path.clone()),
                BattleEventType::UnitKilled { unit_id, team } => ServerMessage::UnitKilled {
                    unit_id: *unit_id,
                    team: *team,
                },
                BattleEventType::BattleStarted => ServerMessage::BattleStarted { tick: event.tick },
                BattleEventType::BattleEnded { outcome } => {
                    ServerMessage::BattleEnded { outcome: *outcome }
                }
                _ => continue,
            };
            self.publish(message);
        }
    }

    fn publish_snapshot(&mut self) {
        self.publish(ServerMessage::Snapshot {
            tick: self.state.tick,
            phase: self.state.phase,
            units: self.state.unit_snapshots(),
        });

        let revision = self.state.field().revision();
        if self.published_revision != Some(revision) {
            self.published_revision = Some(revision);
            self.publish(ServerMessage::Influence(self.state.influence_snapshot()));
        }
    }
}

/// Read an ASCII terrain map from disk
pub fn load_terrain(path: &Path) -> Result<TerrainGrid> {
    let content = std::fs::read_to_string(path)?;
    TerrainGrid::from_ascii(&content)
}
