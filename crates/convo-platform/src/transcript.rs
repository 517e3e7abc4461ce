//! Transcript persistence adapter over the session HTTP API.

use async_trait::async_trait;
use gloo_net::http::Request;
use serde::Deserialize;

use convo_core::ports::TranscriptStorePort;
use convo_types::{
    config::ApiConfig,
    session::{SessionStatus, Transcript},
    turn::{Speaker, Turn},
    Result, SessionError,
};

pub struct ApiTranscriptStore {
    api: ApiConfig,
}

impl ApiTranscriptStore {
    pub fn new(api: ApiConfig) -> Self {
        Self { api }
    }
}

#[async_trait(?Send)]
impl TranscriptStorePort for ApiTranscriptStore {
    async fn fetch(&self, session_id: &str) -> Result<Transcript> {
        let url = format!("{}/sessions/{}/transcript", self.api.base_url, session_id);
        let mut builder = Request::get(&url);
        if !self.api.auth_token.is_empty() {
            builder = builder.header(
                "Authorization",
                &format!("Bearer {}", self.api.auth_token),
            );
        }
        let response = builder
            .send()
            .await
            .map_err(|e| SessionError::Network(e.to_string()))?;

        if !response.ok() {
            return Err(SessionError::Transcript(format!(
                "HTTP {}",
                response.status()
            )));
        }

        let body = response
            .text()
            .await
            .map_err(|e| SessionError::Transcript(e.to_string()))?;
        parse_transcript(&body)
    }

    async fn notify_complete(&self, session_id: &str) -> Result<()> {
        let url = format!("{}/sessions/{}/complete", self.api.base_url, session_id);
        let mut builder = Request::post(&url);
        if !self.api.auth_token.is_empty() {
            builder = builder.header(
                "Authorization",
                &format!("Bearer {}", self.api.auth_token),
            );
        }
        let response = builder
            .send()
            .await
            .map_err(|e| SessionError::Network(e.to_string()))?;

        if !response.ok() {
            return Err(SessionError::Network(format!(
                "HTTP {}",
                response.status()
            )));
        }
        Ok(())
    }
}

/// Decode a transcript payload into domain turns.
///
/// Rows are read leniently: missing ids and timestamps are synthesized so a
/// sparse row cannot block resumption. Fetched turns are always complete;
/// fragments only ever arrive over the live stream.
pub fn parse_transcript(json: &str) -> Result<Transcript> {
    let api: ApiTranscript =
        serde_json::from_str(json).map_err(|e| SessionError::Transcript(e.to_string()))?;
    let turns = api
        .turns
        .into_iter()
        .map(|t| Turn {
            id: t.id.unwrap_or_else(|| uuid::Uuid::new_v4().to_string()),
            speaker: t.speaker,
            content: t.content,
            structured_payload: t.payload,
            created_at: t
                .created_at
                .unwrap_or_else(|| chrono::Utc::now().to_rfc3339()),
            complete: true,
        })
        .collect();
    Ok(Transcript {
        turns,
        status: api.status,
    })
}

// ─── API response types ──────────────────────────────────────

#[derive(Deserialize)]
struct ApiTranscript {
    #[serde(default)]
    turns: Vec<ApiTurn>,
    #[serde(default)]
    status: SessionStatus,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiTurn {
    #[serde(default)]
    id: Option<String>,
    speaker: Speaker,
    #[serde(default)]
    content: String,
    #[serde(default, alias = "structuredPayload")]
    payload: Option<serde_json::Value>,
    #[serde(default)]
    created_at: Option<String>,
}
