use crate::turn::Turn;
use serde::{Deserialize, Serialize};

/// Persisted lifecycle of a session, as reported by the transcript API.
///
/// The collaborator marks sessions it has finished post-processing as
/// "analyzed"; for this client that is the same terminal state as completed.
/// Unknown future statuses deserialize as Active so a vocabulary addition on
/// the server never bricks resumption.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum SessionStatus {
    NotStarted,
    #[serde(alias = "analyzed")]
    Completed,
    #[default]
    #[serde(other)]
    Active,
}

impl SessionStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, SessionStatus::Completed)
    }
}

/// Where the controller is in the session lifecycle.
///
/// Starting and SendingTurn are the two in-flight phases; Idle,
/// AwaitingParticipant and Completed are stable; Errored is entered only
/// when an in-flight operation fails and is left by dismissing or retrying.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SessionPhase {
    Idle,
    Starting,
    AwaitingParticipant,
    SendingTurn,
    Completed,
    Errored,
}

impl SessionPhase {
    /// True while a transport stream is (or should be) open.
    pub fn is_in_flight(&self) -> bool {
        matches!(self, SessionPhase::Starting | SessionPhase::SendingTurn)
    }
}

/// One conversation instance, identified by a server-issued id.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub id: String,
    pub status: SessionStatus,
    pub turns: Vec<Turn>,
}

impl Session {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            status: SessionStatus::NotStarted,
            turns: Vec::new(),
        }
    }
}

/// The persisted turn history for a session, as fetched on resumption.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transcript {
    pub turns: Vec<Turn>,
    pub status: SessionStatus,
}
