//! Server-push transport over fetch + ReadableStream.
//!
//! Each `open` POSTs to the session's streaming endpoint with
//! `Accept: text/event-stream` and pumps the response body through the
//! incremental frame decoder into an unbounded channel; the consumer sees a
//! plain `Stream<Item = TransportEvent>`. Setup failures, mid-flight drops,
//! and deadline expiry all arrive as a single `Dropped` item on that stream.
//!
//! The response deadline is owned here: it arms when the request is
//! dispatched and disarms on the first progress or fragment event. Expiry
//! force-closes the body reader so the remote side observes the abort.

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::pin::Pin;
use std::rc::Rc;
use std::time::Duration;

use futures::channel::mpsc;
use futures::Stream;
use gloo_net::http::Request;
use serde_json::json;
use wasm_bindgen::{JsCast, JsValue};
use wasm_bindgen_futures::{spawn_local, JsFuture};
use web_sys::ReadableStreamDefaultReader;

use crate::sse::SseDecoder;
use convo_core::ports::{StreamHandle, StreamRequest, TransportEvent, TransportPort};
use convo_types::{command::SessionCommand, config::ApiConfig, event::StreamEvent, SessionError};

/// Transport adapter speaking the session streaming protocol.
pub struct PushTransport {
    api: ApiConfig,
    next_id: RefCell<u64>,
    /// Live streams keyed by handle id, for cancel and deadline bookkeeping.
    active: Rc<RefCell<HashMap<u64, ActiveStream>>>,
}

struct ActiveStream {
    sender: mpsc::UnboundedSender<TransportEvent>,
    /// Present once the response body is being pumped; cancel closes it.
    reader: Option<ReadableStreamDefaultReader>,
    /// Set on the first progress or fragment; the deadline checks it.
    acked: Rc<Cell<bool>>,
}

impl PushTransport {
    pub fn new(api: ApiConfig) -> Self {
        Self {
            api,
            next_id: RefCell::new(1),
            active: Rc::new(RefCell::new(HashMap::new())),
        }
    }

    fn next_stream_id(&self) -> u64 {
        let mut id = self.next_id.borrow_mut();
        let current = *id;
        *id += 1;
        current
    }

    fn endpoint(&self, req: &StreamRequest) -> String {
        match &req.command {
            SessionCommand::StartSession => {
                format!("{}/sessions/{}/start", self.api.base_url, req.session_id)
            }
            SessionCommand::SendTurn { .. } => {
                format!("{}/sessions/{}/turns", self.api.base_url, req.session_id)
            }
        }
    }
}

impl TransportPort for PushTransport {
    fn open(
        &self,
        req: StreamRequest,
    ) -> (StreamHandle, Pin<Box<dyn Stream<Item = TransportEvent>>>) {
        let id = self.next_stream_id();
        let (tx, rx) = mpsc::unbounded();
        let acked = Rc::new(Cell::new(false));

        self.active.borrow_mut().insert(
            id,
            ActiveStream {
                sender: tx,
                reader: None,
                acked: Rc::clone(&acked),
            },
        );

        let url = self.endpoint(&req);
        let body = request_body(&req.command);
        let auth_token = self.api.auth_token.clone();
        let deadline_ms = req.deadline_ms;

        // Deadline watchdog. Disarmed once the remote shows progress; on
        // expiry the stream is torn down so the consumer gets exactly one
        // Dropped.
        {
            let active = Rc::clone(&self.active);
            let acked = Rc::clone(&acked);
            spawn_local(async move {
                gloo_timers::future::sleep(Duration::from_millis(deadline_ms)).await;
                if acked.get() {
                    return;
                }
                let entry = active.borrow_mut().remove(&id);
                if let Some(entry) = entry {
                    log::warn!("stream {} saw no response within {}ms", id, deadline_ms);
                    let _ = entry
                        .sender
                        .unbounded_send(TransportEvent::Dropped(SessionError::Timeout(deadline_ms)));
                    if let Some(reader) = entry.reader {
                        let _ = reader.cancel();
                    }
                }
            });
        }

        {
            let active = Rc::clone(&self.active);
            let url = url.clone();
            spawn_local(async move {
                match pump(&active, id, &url, &auth_token, body).await {
                    Ok(()) => {
                        // Remote closed the stream; dropping the sender ends
                        // the consumer's side.
                        active.borrow_mut().remove(&id);
                    }
                    Err(err) => {
                        let entry = active.borrow_mut().remove(&id);
                        if let Some(entry) = entry {
                            log::warn!("stream {} dropped: {}", id, err);
                            let _ = entry.sender.unbounded_send(TransportEvent::Dropped(err));
                        }
                    }
                }
            });
        }

        log::debug!("opened push stream {} -> {}", id, url);
        (StreamHandle(id), Box::pin(rx))
    }

    fn cancel(&self, handle: StreamHandle) {
        let entry = self.active.borrow_mut().remove(&handle.0);
        if let Some(entry) = entry {
            if let Some(reader) = entry.reader {
                let _ = reader.cancel();
            }
            log::debug!("push stream {} closed", handle.0);
        }
    }
}

fn request_body(command: &SessionCommand) -> serde_json::Value {
    match command {
        SessionCommand::StartSession => json!({}),
        SessionCommand::SendTurn { text } => json!({ "text": text }),
    }
}

/// Drive one response body to completion, delivering decoded events through
/// the registry entry. Returns Ok on a clean close or after cancellation.
async fn pump(
    active: &Rc<RefCell<HashMap<u64, ActiveStream>>>,
    id: u64,
    url: &str,
    auth_token: &str,
    body: serde_json::Value,
) -> convo_types::Result<()> {
    let mut builder = Request::post(url)
        .header("Content-Type", "application/json")
        .header("Accept", "text/event-stream");
    if !auth_token.is_empty() {
        builder = builder.header("Authorization", &format!("Bearer {}", auth_token));
    }
    let response = builder
        .json(&body)
        .map_err(|e| SessionError::Network(e.to_string()))?
        .send()
        .await
        .map_err(|e| SessionError::Network(e.to_string()))?;

    if !response.ok() {
        return Err(SessionError::Network(format!("HTTP {}", response.status())));
    }

    let stream = response
        .body()
        .ok_or_else(|| SessionError::Network("response has no body".to_string()))?;
    let reader: ReadableStreamDefaultReader = stream.get_reader().unchecked_into();

    // Register the reader for cancel; if the handle was already cancelled
    // during setup, release the body and stop quietly.
    {
        let mut registry = active.borrow_mut();
        match registry.get_mut(&id) {
            Some(entry) => entry.reader = Some(reader.clone()),
            None => {
                let _ = reader.cancel();
                return Ok(());
            }
        }
    }

    let mut decoder = SseDecoder::new();
    loop {
        let chunk = JsFuture::from(reader.read())
            .await
            .map_err(|e| SessionError::Network(format!("{:?}", e)))?;
        let done = js_sys::Reflect::get(&chunk, &JsValue::from_str("done"))
            .ok()
            .and_then(|v| v.as_bool())
            .unwrap_or(true);
        if done {
            break;
        }
        let value = js_sys::Reflect::get(&chunk, &JsValue::from_str("value"))
            .map_err(|e| SessionError::JsInterop(format!("{:?}", e)))?;
        let bytes = js_sys::Uint8Array::new(&value).to_vec();

        for frame in decoder.push(&bytes) {
            if !deliver(active, id, frame.kind.as_deref(), &frame.data) {
                let _ = reader.cancel();
                return Ok(());
            }
        }
    }
    if let Some(frame) = decoder.flush() {
        deliver(active, id, frame.kind.as_deref(), &frame.data);
    }
    Ok(())
}

/// Parse and forward one frame. Returns false once the handle is gone
/// (cancelled or timed out), telling the pump to stop.
fn deliver(
    active: &Rc<RefCell<HashMap<u64, ActiveStream>>>,
    id: u64,
    kind: Option<&str>,
    data: &str,
) -> bool {
    let registry = active.borrow();
    let Some(entry) = registry.get(&id) else {
        return false;
    };
    let Some(kind) = kind else {
        log::debug!("push frame without an event kind, skipping");
        return true;
    };
    match StreamEvent::parse(kind, data) {
        Ok(event) => {
            if matches!(event, StreamEvent::Progress | StreamEvent::Fragment { .. }) {
                entry.acked.set(true);
            }
            let _ = entry.sender.unbounded_send(TransportEvent::Push(event));
        }
        // A frame we cannot decode is skipped, never fatal: the stream's
        // terminal events decide the operation's outcome.
        Err(e) => log::warn!("undecodable {} event, skipping: {}", kind, e),
    }
    true
}
