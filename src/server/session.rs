//! Connected client sessions
//!
//! The first session to join a match becomes its host. When the host
//! leaves, the oldest remaining session takes over.

use ahash::AHashMap;
use serde::{Deserialize, Serialize};

use crate::battle::commands::CommandIssuer;
use crate::core::types::Team;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(pub u64);

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub id: SessionId,
    pub name: String,
    pub team: Option<Team>,
}

/// Sessions attached to one match
#[derive(Debug, Clone, Default)]
pub struct SessionRegistry {
    sessions: AHashMap<SessionId, Session>,
    host: Option<SessionId>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or update a session. Returns true if it is the host.
    pub fn join(&mut self, id: SessionId, name: impl Into<String>, team: Option<Team>) -> bool {
        self.sessions.insert(
            id,
            Session {
                id,
                name: name.into(),
                team,
            },
        );
        let host = *self.host.get_or_insert(id);
        host == id
    }

    pub fn leave(&mut self, id: SessionId) -> Option<Session> {
        let session = self.sessions.remove(&id)?;
        if self.host == Some(id) {
            self.host = self.sessions.keys().min().copied();
        }
        Some(session)
    }

    pub fn get(&self, id: SessionId) -> Option<&Session> {
        self.sessions.get(&id)
    }

    pub fn host(&self) -> Option<SessionId> {
        self.host
    }

    pub fn is_host(&self, id: SessionId) -> bool {
        self.host == Some(id)
    }

    /// Authority of a session's commands; `None` for unknown sessions
    pub fn issuer(&self, id: SessionId) -> Option<CommandIssuer> {
        self.sessions.get(&id).map(|s| CommandIssuer {
            team: s.team,
            is_host: self.is_host(id),
        })
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}
