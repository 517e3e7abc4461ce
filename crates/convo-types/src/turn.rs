use serde::{Deserialize, Serialize};

/// Who produced a turn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Speaker {
    Assistant,
    Participant,
}

/// A single utterance in a conversation.
///
/// Turns are totally ordered by insertion. While a turn is open its content
/// grows by appending fragments; once a completion event freezes it the
/// content never changes again. Ids start out client-assigned for in-flight
/// turns and are rewritten with the server-assigned id on completion.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Turn {
    pub id: String,
    pub speaker: Speaker,
    /// Empty is valid: a turn may carry only a structured payload.
    #[serde(default)]
    pub content: String,
    /// Non-text attachment (e.g. a batch of sourced candidates) rendered
    /// alongside the text by the presentation layer.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub structured_payload: Option<serde_json::Value>,
    pub created_at: String,
    /// False while fragments may still arrive for this turn.
    #[serde(default = "default_complete")]
    pub complete: bool,
}

fn default_complete() -> bool {
    true
}

impl Turn {
    /// A participant turn, synthesized locally at send time.
    pub fn participant(text: impl Into<String>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            speaker: Speaker::Participant,
            content: text.into(),
            structured_payload: None,
            created_at: chrono::Utc::now().to_rfc3339(),
            complete: true,
        }
    }

    /// An open assistant turn awaiting fragments.
    pub fn assistant_open(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            speaker: Speaker::Assistant,
            content: String::new(),
            structured_payload: None,
            created_at: chrono::Utc::now().to_rfc3339(),
            complete: false,
        }
    }

    pub fn append(&mut self, text: &str) {
        self.content.push_str(text);
    }

    pub fn is_open(&self) -> bool {
        !self.complete
    }
}
