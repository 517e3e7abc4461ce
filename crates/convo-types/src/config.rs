use serde::{Deserialize, Serialize};

/// Top-level client configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    pub api: ApiConfig,
    pub timing: TimingConfig,
    /// Expected total turn count for the progress label; a display
    /// heuristic, never a limit.
    pub expected_turns: u32,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api: ApiConfig::default(),
            timing: TimingConfig::default(),
            expected_turns: 12,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    pub base_url: String,
    /// Bearer token attached to every request when non-empty.
    pub auth_token: String,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: "/api".to_string(),
            auth_token: String::new(),
        }
    }
}

/// All the clocks in one place. Values are milliseconds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimingConfig {
    /// Deadline for the first progress/fragment after a session start.
    pub start_deadline_ms: u64,
    /// Deadline for the first progress/fragment after sending a turn.
    pub turn_deadline_ms: u64,
    /// Pause between the final completion event and the Completed phase, so
    /// the last assistant turn renders before the host redirects.
    pub completion_grace_ms: u64,
    /// How long a non-actionable error stays on screen before auto-dismiss.
    pub error_auto_dismiss_ms: u64,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            start_deadline_ms: 30_000,
            turn_deadline_ms: 60_000,
            completion_grace_ms: 1_500,
            error_auto_dismiss_ms: 10_000,
        }
    }
}
