use serde::{Deserialize, Serialize};

/// A session operation as data: what to run and with which arguments.
///
/// Retries re-dispatch the stored command rather than a captured closure, so
/// a retry survives serialization and shows up legibly in logs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum SessionCommand {
    /// Begin streaming the assistant's opening turn
    StartSession,
    /// Send participant text and stream the reply
    SendTurn { text: String },
}

impl SessionCommand {
    /// Deadline for this operation in milliseconds. A turn exchange includes
    /// a remote generation step, so it gets the longer one.
    pub fn deadline_ms(&self, start_ms: u64, turn_ms: u64) -> u64 {
        match self {
            SessionCommand::StartSession => start_ms,
            SessionCommand::SendTurn { .. } => turn_ms,
        }
    }

    /// Short name for logs, without the participant's text.
    pub fn label(&self) -> &'static str {
        match self {
            SessionCommand::StartSession => "start-session",
            SessionCommand::SendTurn { .. } => "send-turn",
        }
    }
}
