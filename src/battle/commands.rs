//! Client commands
//!
//! Commands arrive as JSON objects tagged by `type`. Parsing only checks
//! shape; ownership and liveness are checked by `BattleState` when the
//! command is applied.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::battle::movement::MovementCommandMode;
use crate::core::error::{FrontlineError, Result};
use crate::core::types::{Team, UnitId, Vec2};

/// Optional movement modifiers as sent by the client
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModeRequest {
    #[serde(default)]
    pub speed_multiplier: Option<f32>,
    #[serde(default)]
    pub rotate_to_face: Option<bool>,
}

impl ModeRequest {
    /// Fill defaults and clamp
    pub fn resolve(&self) -> MovementCommandMode {
        let defaults = MovementCommandMode::default();
        MovementCommandMode::new(
            self.speed_multiplier.unwrap_or(defaults.speed_multiplier),
            self.rotate_to_face.unwrap_or(defaults.rotate_to_face),
        )
    }
}

/// A command sent by a client session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum ClientCommand {
    #[serde(rename_all = "camelCase")]
    IssuePath {
        unit_id: UnitId,
        path: Vec<Vec2>,
        #[serde(default)]
        movement_command_mode: Option<ModeRequest>,
    },
    #[serde(rename_all = "camelCase")]
    CancelMovement { unit_id: UnitId },
    #[serde(rename_all = "camelCase")]
    TogglePause { unit_id: UnitId },
    TuningUpdate { tuning: Value },
}

impl ClientCommand {
    pub fn parse(text: &str) -> Result<Self> {
        serde_json::from_str(text).map_err(|e| FrontlineError::InvalidCommand(e.to_string()))
    }

    pub fn from_value(value: Value) -> Result<Self> {
        serde_json::from_value(value).map_err(|e| FrontlineError::InvalidCommand(e.to_string()))
    }

    /// Target unit, for unit commands
    pub fn unit_id(&self) -> Option<UnitId> {
        match self {
            ClientCommand::IssuePath { unit_id, .. }
            | ClientCommand::CancelMovement { unit_id }
            | ClientCommand::TogglePause { unit_id } => Some(*unit_id),
            ClientCommand::TuningUpdate { .. } => None,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            ClientCommand::IssuePath { .. } => "issue-path",
            ClientCommand::CancelMovement { .. } => "cancel-movement",
            ClientCommand::TogglePause { .. } => "toggle-pause",
            ClientCommand::TuningUpdate { .. } => "tuning-update",
        }
    }
}

/// Who sent a command
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CommandIssuer {
    /// Team assigned to the session; spectators have none
    pub team: Option<Team>,
    pub is_host: bool,
}

impl CommandIssuer {
    pub fn player(team: Team) -> Self {
        Self {
            team: Some(team),
            is_host: false,
        }
    }

    pub fn host(team: Team) -> Self {
        Self {
            team: Some(team),
            is_host: true,
        }
    }

    pub fn controls(&self, team: Team) -> bool {
        self.team == Some(team)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_issue_path() {
        let cmd = ClientCommand::parse(
            r#"{"type":"issue-path","unitId":3,"path":[{"x":10,"y":20.5}],
                "movementCommandMode":{"speedMultiplier":2}}"#,
        )
        .unwrap();

        match cmd {
            ClientCommand::IssuePath {
                unit_id,
                path,
                movement_command_mode,
            } => {
                assert_eq!(unit_id, UnitId(3));
                assert_eq!(path, vec![Vec2::new(10.0, 20.5)]);
                let mode = movement_command_mode.unwrap_or_default().resolve();
                assert_eq!(mode.speed_multiplier, 2.0);
                assert!(mode.rotate_to_face);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_parse_simple_commands() {
        assert_eq!(
            ClientCommand::parse(r#"{"type":"cancel-movement","unitId":1}"#).unwrap(),
            ClientCommand::CancelMovement { unit_id: UnitId(1) }
        );
        assert_eq!(
            ClientCommand::parse(r#"{"type":"toggle-pause","unitId":2}"#)
                .unwrap()
                .unit_id(),
            Some(UnitId(2))
        );
    }

    #[test]
    fn test_parse_tuning_keeps_raw_object() {
        let cmd = ClientCommand::parse(r#"{"type":"tuning-update","tuning":{"baseUnitHealth":200}}"#)
            .unwrap();
        assert_eq!(cmd.kind(), "tuning-update");
        assert_eq!(cmd.unit_id(), None);
    }

    #[test]
    fn test_malformed_commands_rejected() {
        for text in [
            r#"{"type":"launch-nukes","unitId":1}"#,
            r#"{"type":"issue-path","unitId":"one","path":[]}"#,
            r#"{"type":"cancel-movement"}"#,
            "not json",
        ] {
            assert!(
                matches!(ClientCommand::parse(text), Err(FrontlineError::InvalidCommand(_))),
                "{}",
                text
            );
        }
    }

    #[test]
    fn test_mode_clamped() {
        let mode = ModeRequest {
            speed_multiplier: Some(50.0),
            rotate_to_face: Some(false),
        }
        .resolve();
        assert_eq!(mode.speed_multiplier, 3.0);
        assert!(!mode.rotate_to_face);
    }

    #[test]
    fn test_issuer_controls() {
        assert!(CommandIssuer::player(Team::A).controls(Team::A));
        assert!(!CommandIssuer::player(Team::A).controls(Team::B));
        assert!(!CommandIssuer::default().controls(Team::A));
        assert!(CommandIssuer::host(Team::B).is_host);
    }
}
