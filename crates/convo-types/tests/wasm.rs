//! WASM-target tests for convo-types.
//!
//! Mirrors the native unit tests but runs under wasm32-unknown-unknown
//! via `wasm-pack test --node`.

use wasm_bindgen_test::*;

use convo_types::command::*;
use convo_types::config::*;
use convo_types::error::*;
use convo_types::event::*;
use convo_types::session::*;
use convo_types::turn::*;
use convo_types::SessionError;

// ─── Turn Tests ──────────────────────────────────────────

#[wasm_bindgen_test]
fn turn_participant() {
    let turn = Turn::participant("I have 5 years experience");
    assert_eq!(turn.speaker, Speaker::Participant);
    assert_eq!(turn.content, "I have 5 years experience");
    assert!(turn.complete);
    assert!(!turn.id.is_empty());
    assert!(!turn.created_at.is_empty());
}

#[wasm_bindgen_test]
fn turn_participant_ids_unique() {
    let a = Turn::participant("one");
    let b = Turn::participant("two");
    assert_ne!(a.id, b.id);
}

#[wasm_bindgen_test]
fn turn_assistant_open_and_append() {
    let mut turn = Turn::assistant_open("t1");
    assert!(turn.is_open());
    turn.append("Great");
    turn.append(", tell me more");
    assert_eq!(turn.content, "Great, tell me more");
}

#[wasm_bindgen_test]
fn turn_serialization_roundtrip() {
    let turn = Turn::participant("hello");
    let json = serde_json::to_string(&turn).unwrap();
    let deserialized: Turn = serde_json::from_str(&json).unwrap();
    assert_eq!(deserialized.speaker, Speaker::Participant);
    assert_eq!(deserialized.content, "hello");
}

#[wasm_bindgen_test]
fn speaker_serialization() {
    assert_eq!(serde_json::to_string(&Speaker::Assistant).unwrap(), r#""assistant""#);
    assert_eq!(serde_json::to_string(&Speaker::Participant).unwrap(), r#""participant""#);
}

// ─── Session Tests ───────────────────────────────────────

#[wasm_bindgen_test]
fn session_new() {
    let session = Session::new("s1");
    assert_eq!(session.id, "s1");
    assert_eq!(session.status, SessionStatus::NotStarted);
    assert!(session.turns.is_empty());
}

#[wasm_bindgen_test]
fn session_status_wire_vocabulary() {
    assert_eq!(serde_json::to_string(&SessionStatus::NotStarted).unwrap(), r#""not-started""#);
    assert_eq!(serde_json::to_string(&SessionStatus::Active).unwrap(), r#""active""#);
    assert_eq!(serde_json::to_string(&SessionStatus::Completed).unwrap(), r#""completed""#);

    let status: SessionStatus = serde_json::from_str(r#""analyzed""#).unwrap();
    assert_eq!(status, SessionStatus::Completed);

    let status: SessionStatus = serde_json::from_str(r#""paused-for-review""#).unwrap();
    assert_eq!(status, SessionStatus::Active);
}

#[wasm_bindgen_test]
fn session_phase_serialization() {
    assert_eq!(
        serde_json::to_string(&SessionPhase::AwaitingParticipant).unwrap(),
        r#""awaiting-participant""#
    );
    assert!(SessionPhase::Starting.is_in_flight());
    assert!(!SessionPhase::Completed.is_in_flight());
}

// ─── Stream Event Tests ──────────────────────────────────

#[wasm_bindgen_test]
fn parse_fragment() {
    let event = StreamEvent::parse("fragment", r#"{"turnId":"t1","text":"Great"}"#).unwrap();
    assert_eq!(
        event,
        StreamEvent::Fragment {
            turn_id: Some("t1".to_string()),
            text: "Great".to_string(),
            seq: None,
        }
    );
}

#[wasm_bindgen_test]
fn parse_completion_defaults() {
    let event = StreamEvent::parse("completion", "{}").unwrap();
    assert_eq!(
        event,
        StreamEvent::Completion {
            turn_id: None,
            should_end_session: false,
        }
    );
}

#[wasm_bindgen_test]
fn parse_failure_tolerates_malformed_payload() {
    let event = StreamEvent::parse("failure", "not json at all").unwrap();
    assert_eq!(event, StreamEvent::Failure { message: None });
}

#[wasm_bindgen_test]
fn parse_unknown_kind_is_error() {
    assert!(StreamEvent::parse("telemetry", "{}").is_err());
}

// ─── Command Tests ───────────────────────────────────────

#[wasm_bindgen_test]
fn command_roundtrip() {
    let cmd = SessionCommand::SendTurn { text: "hello".to_string() };
    let json = serde_json::to_string(&cmd).unwrap();
    assert!(json.contains("SendTurn"));
    let deserialized: SessionCommand = serde_json::from_str(&json).unwrap();
    assert_eq!(deserialized, cmd);
}

#[wasm_bindgen_test]
fn command_deadline() {
    assert_eq!(SessionCommand::StartSession.deadline_ms(30_000, 60_000), 30_000);
    let send = SessionCommand::SendTurn { text: "hi".to_string() };
    assert_eq!(send.deadline_ms(30_000, 60_000), 60_000);
}

// ─── Config Tests ────────────────────────────────────────

#[wasm_bindgen_test]
fn default_config() {
    let config = ClientConfig::default();
    assert_eq!(config.timing.start_deadline_ms, 30_000);
    assert_eq!(config.timing.turn_deadline_ms, 60_000);
    assert_eq!(config.timing.error_auto_dismiss_ms, 10_000);
}

#[wasm_bindgen_test]
fn config_serialization_roundtrip() {
    let config = ClientConfig::default();
    let json = serde_json::to_string(&config).unwrap();
    let deserialized: ClientConfig = serde_json::from_str(&json).unwrap();
    assert_eq!(deserialized.api.base_url, "/api");
}

// ─── Error Tests ─────────────────────────────────────────

#[wasm_bindgen_test]
fn error_display() {
    assert_eq!(SessionError::Offline.to_string(), "Offline");
    assert_eq!(SessionError::Timeout(60_000).to_string(), "No response after 60000ms");
    assert_eq!(SessionError::Cancelled.to_string(), "Cancelled");
}

#[wasm_bindgen_test]
fn error_categories() {
    assert_eq!(SessionError::Offline.category(), ErrorCategory::Connectivity);
    assert_eq!(
        SessionError::Remote("x".to_string()).category(),
        ErrorCategory::RemoteFailure
    );
    assert_eq!(
        SessionError::Other("x".to_string()).category(),
        ErrorCategory::Unknown
    );
}

#[wasm_bindgen_test]
fn error_state_retry_binding() {
    let retry = SessionCommand::SendTurn { text: "hi".to_string() };
    let state = ErrorState::from_error(&SessionError::Timeout(60_000), Some(retry));
    assert!(state.is_retryable());
    assert_eq!(state.category, ErrorCategory::Connectivity);
}
