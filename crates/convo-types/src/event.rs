use crate::error::ErrorCategory;
use crate::session::SessionPhase;
use crate::{Result, SessionError};
use serde::{Deserialize, Serialize};

/// Typed events pushed by the server over one operation's stream.
///
/// This is the closed set of things the remote side can say. Decoding from
/// the wire happens only in [`StreamEvent::parse`]; everything downstream
/// matches on variants and never touches raw payloads.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum StreamEvent {
    /// The remote side accepted the request and is working on it
    Progress,

    /// An increment to append to a turn's content
    Fragment {
        #[serde(skip_serializing_if = "Option::is_none")]
        turn_id: Option<String>,
        text: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        seq: Option<u64>,
    },

    /// A non-text attachment for a turn, at most one per turn
    Structured {
        #[serde(skip_serializing_if = "Option::is_none")]
        turn_id: Option<String>,
        payload: serde_json::Value,
    },

    /// The logical operation finished successfully
    Completion {
        #[serde(skip_serializing_if = "Option::is_none")]
        turn_id: Option<String>,
        should_end_session: bool,
    },

    /// The remote side reported an error explicitly
    Failure { message: Option<String> },
}

impl StreamEvent {
    /// Decode one wire event. `kind` is the push-stream event name and
    /// `data` its JSON payload, both untrusted. Unknown kinds and malformed
    /// payloads come back as `Err` for the transport to log and skip; a
    /// recognized `failure` event with a broken payload still yields
    /// `Failure { message: None }` so the error surface falls back to a
    /// generic message instead of losing the failure.
    pub fn parse(kind: &str, data: &str) -> Result<StreamEvent> {
        let data = if data.trim().is_empty() { "{}" } else { data };
        match kind {
            "progress" => Ok(StreamEvent::Progress),
            "fragment" => {
                let p: FragmentPayload = serde_json::from_str(data)?;
                Ok(StreamEvent::Fragment {
                    turn_id: p.turn_id,
                    text: p.text.unwrap_or_default(),
                    seq: p.seq,
                })
            }
            "structured" => {
                let p: StructuredEventPayload = serde_json::from_str(data)?;
                Ok(StreamEvent::Structured {
                    turn_id: p.turn_id,
                    payload: p.payload.unwrap_or(serde_json::Value::Null),
                })
            }
            "completion" => {
                let p: CompletionPayload = serde_json::from_str(data)?;
                Ok(StreamEvent::Completion {
                    turn_id: p.turn_id,
                    should_end_session: p.should_end_session.unwrap_or(false),
                })
            }
            "failure" => {
                let p: FailurePayload = serde_json::from_str(data).unwrap_or_default();
                Ok(StreamEvent::Failure { message: p.message })
            }
            other => Err(SessionError::Serialization(format!(
                "unrecognized push event kind: {other}"
            ))),
        }
    }
}

// ─── Wire payload shapes ─────────────────────────────────────────────────────
// All fields optional: the collaborator's payloads are untrusted and every
// absence has a defined fallback.

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct FragmentPayload {
    turn_id: Option<String>,
    text: Option<String>,
    seq: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct StructuredEventPayload {
    turn_id: Option<String>,
    payload: Option<serde_json::Value>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct CompletionPayload {
    turn_id: Option<String>,
    should_end_session: Option<bool>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct FailurePayload {
    message: Option<String>,
}

/// Notifications emitted by the session controller.
/// The presentation layer subscribes to these for reactive updates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SessionEvent {
    /// The controller moved to a new lifecycle phase
    PhaseChanged { phase: SessionPhase },

    /// The turn list changed; re-read the snapshot
    TurnsUpdated,

    /// An error surfaced; `retryable` means a retry command is bound
    ErrorRaised {
        message: String,
        category: ErrorCategory,
        retryable: bool,
    },

    /// The active error was dismissed or cleared
    ErrorCleared,
}
