//! Convo App — WASM entry point.
//!
//! This crate is the composition root (DI wiring layer).
//! It assembles the platform adapters into a session controller and exposes
//! a wasm-bindgen facade to the embedding dashboard page.

mod app;

pub use app::{Snapshot, SnapshotError};

use std::rc::Rc;

use gloo_utils::format::JsValueSerdeExt;
use wasm_bindgen::prelude::*;

use convo_core::controller::SessionController;
use convo_core::event_bus::EventBus;

/// Set up logging once per page load.
#[wasm_bindgen(start)]
pub fn main() {
    wasm_logger::init(wasm_logger::Config::default());
    log::info!("convo client WASM starting...");
}

/// Embedding facade for one conversation session.
///
/// The host page constructs one client per session, registers a change
/// callback, and re-reads `snapshot()` whenever it fires. Reading a snapshot
/// also drains the notification queue, so hosts that only ever look at
/// snapshots never accumulate events.
#[wasm_bindgen]
pub struct ConversationClient {
    controller: Rc<SessionController>,
    bus: EventBus,
}

#[wasm_bindgen]
impl ConversationClient {
    /// Build a client for `session_id` against `base_url`. `auth_token` may
    /// be empty; `on_change` fires after every state change.
    #[wasm_bindgen(constructor)]
    pub fn new(
        session_id: String,
        base_url: String,
        auth_token: String,
        on_change: Option<js_sys::Function>,
    ) -> Result<ConversationClient, JsValue> {
        let bus = EventBus::new();
        if let Some(callback) = on_change {
            bus.set_wake(move || {
                if let Err(e) = callback.call0(&JsValue::NULL) {
                    log::warn!("change callback threw: {:?}", e);
                }
            });
        }
        let controller = app::build_controller(&session_id, &base_url, &auth_token, bus.clone())
            .map_err(|e| JsValue::from_str(&e.to_string()))?;
        log::info!("conversation client ready for session {}", session_id);
        Ok(ConversationClient { controller, bus })
    }

    /// Seed state from the persisted transcript.
    pub fn resume(&self) {
        let controller = Rc::clone(&self.controller);
        wasm_bindgen_futures::spawn_local(async move {
            controller.resume().await;
        });
    }

    /// Ask the assistant to open the session with its first turn.
    pub fn start(&self) {
        let controller = Rc::clone(&self.controller);
        wasm_bindgen_futures::spawn_local(async move {
            controller.start().await;
        });
    }

    /// Send one participant turn and stream the reply.
    pub fn send_turn(&self, text: String) {
        let controller = Rc::clone(&self.controller);
        wasm_bindgen_futures::spawn_local(async move {
            controller.send_turn(&text).await;
        });
    }

    /// Re-issue the operation behind the displayed error, if any.
    pub fn retry(&self) {
        let controller = Rc::clone(&self.controller);
        wasm_bindgen_futures::spawn_local(async move {
            controller.retry().await;
        });
    }

    pub fn dismiss_error(&self) {
        self.controller.dismiss_error();
    }

    /// Tear down the in-flight stream, if any. The client must not be used
    /// afterwards.
    pub fn dispose(&self) {
        self.controller.dispose();
    }

    /// Current state as a JS object.
    pub fn snapshot(&self) -> Result<JsValue, JsValue> {
        self.bus.drain();
        JsValue::from_serde(&app::snapshot(&self.controller))
            .map_err(|e| JsValue::from_str(&e.to_string()))
    }

    /// Current state as a JSON string, for hosts that prefer to parse.
    pub fn snapshot_json(&self) -> Result<String, JsValue> {
        self.bus.drain();
        serde_json::to_string(&app::snapshot(&self.controller))
            .map_err(|e| JsValue::from_str(&e.to_string()))
    }

    pub fn is_responding(&self) -> bool {
        self.controller.is_responding()
    }

    pub fn stage_label(&self) -> String {
        self.controller.stage_label().to_string()
    }
}
