//! Composition root — assembles platform adapters into a session controller.

use std::rc::Rc;

use serde::Serialize;

use convo_core::controller::SessionController;
use convo_core::event_bus::EventBus;
use convo_core::ports::{ConnectivityPort, SessionPorts};
use convo_platform::{ApiTranscriptStore, BrowserConnectivity, GlooScheduler, PushTransport};
use convo_types::config::{ApiConfig, ClientConfig};
use convo_types::error::ErrorCategory;
use convo_types::session::{SessionPhase, SessionStatus};
use convo_types::turn::Turn;
use convo_types::Result;

/// Wire the full adapter set for one session and hand back the controller.
pub fn build_controller(
    session_id: &str,
    base_url: &str,
    auth_token: &str,
    bus: EventBus,
) -> Result<Rc<SessionController>> {
    let config = ClientConfig {
        api: ApiConfig {
            base_url: base_url.trim_end_matches('/').to_string(),
            auth_token: auth_token.to_string(),
        },
        ..ClientConfig::default()
    };

    let connectivity = Rc::new(BrowserConnectivity::new()?);
    let ports = SessionPorts {
        transport: Rc::new(PushTransport::new(config.api.clone())),
        store: Rc::new(ApiTranscriptStore::new(config.api.clone())),
        connectivity: Rc::clone(&connectivity) as Rc<dyn ConnectivityPort>,
        scheduler: Rc::new(GlooScheduler),
    };

    let controller = Rc::new(SessionController::new(session_id, config, ports, bus));

    // Browser online/offline transitions flow straight into the controller.
    // The listener outlives the client, so it holds a Weak and goes quiet
    // once the controller is dropped.
    let weak = Rc::downgrade(&controller);
    connectivity.set_observer(Box::new(move |online| {
        if let Some(controller) = weak.upgrade() {
            controller.handle_connectivity(online);
        }
    }));

    Ok(controller)
}

// ─── State snapshot ──────────────────────────────────────────

/// Everything the host page renders, in one plain value.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    pub phase: SessionPhase,
    pub status: SessionStatus,
    pub turns: Vec<Turn>,
    pub responding: bool,
    pub stage: &'static str,
    pub error: Option<SnapshotError>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotError {
    pub message: String,
    pub category: ErrorCategory,
    pub retryable: bool,
}

pub fn snapshot(controller: &SessionController) -> Snapshot {
    let error = controller.error().map(|e| SnapshotError {
        retryable: e.is_retryable(),
        message: e.message,
        category: e.category,
    });
    Snapshot {
        phase: controller.phase(),
        status: controller.status(),
        turns: controller.turns(),
        responding: controller.is_responding(),
        stage: controller.stage_label(),
        error,
    }
}
