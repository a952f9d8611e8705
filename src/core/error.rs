use thiserror::Error;

use crate::core::types::{Team, UnitId};

#[derive(Error, Debug)]
pub enum FrontlineError {
    #[error("Unit not found: {0}")]
    UnitNotFound(UnitId),

    #[error("Unit {unit} does not belong to team {team:?}")]
    Unauthorized { unit: UnitId, team: Option<Team> },

    #[error("Only the host may {0}")]
    NotHost(&'static str),

    #[error("Unit is dead: {0}")]
    UnitDead(UnitId),

    #[error("Match is not in an active battle")]
    NotInBattle,

    #[error("Invalid command: {0}")]
    InvalidCommand(String),

    #[error("Invalid config: {0}")]
    InvalidConfig(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerdeError(#[from] serde_json::Error),

    #[error("Config parse error: {0}")]
    TomlError(#[from] toml::de::Error),
}

pub type Result<T> = std::result::Result<T, FrontlineError>;
