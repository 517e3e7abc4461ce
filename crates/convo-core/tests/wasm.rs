//! WASM-target tests for convo-core.
//!
//! Runs EventBus, MessageAssembler, and SessionController tests under
//! wasm32-unknown-unknown via `wasm-pack test --node`.

use wasm_bindgen_test::*;

use convo_core::assembler::MessageAssembler;
use convo_core::controller::SessionController;
use convo_core::event_bus::EventBus;
use convo_core::ports::*;
use convo_core::stage::stage_label;
use convo_types::command::SessionCommand;
use convo_types::config::ClientConfig;
use convo_types::error::ErrorCategory;
use convo_types::event::{SessionEvent, StreamEvent};
use convo_types::session::{SessionPhase, SessionStatus, Transcript};
use convo_types::turn::Speaker;

use async_trait::async_trait;
use futures::future::LocalBoxFuture;
use futures::{stream, Stream};
use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::pin::Pin;
use std::rc::Rc;

// ─── EventBus Tests ──────────────────────────────────────

#[wasm_bindgen_test]
fn event_bus_new_is_empty() {
    let bus = EventBus::new();
    assert!(!bus.has_pending());
    assert!(bus.drain().is_empty());
}

#[wasm_bindgen_test]
fn event_bus_emit_and_drain() {
    let bus = EventBus::new();
    bus.emit(SessionEvent::TurnsUpdated);
    bus.emit(SessionEvent::PhaseChanged { phase: SessionPhase::Starting });

    assert!(bus.has_pending());

    let events = bus.drain();
    assert_eq!(events.len(), 2);
    assert!(!bus.has_pending());
}

#[wasm_bindgen_test]
fn event_bus_wake_fires_on_emit() {
    let bus = EventBus::new();
    let woken = Rc::new(Cell::new(0u32));
    let counter = Rc::clone(&woken);
    bus.set_wake(move || counter.set(counter.get() + 1));

    bus.emit(SessionEvent::TurnsUpdated);
    assert_eq!(woken.get(), 1);
}

// ─── Assembler Tests ─────────────────────────────────────

fn fragment(turn_id: &str, text: &str) -> StreamEvent {
    StreamEvent::Fragment {
        turn_id: Some(turn_id.to_string()),
        text: text.to_string(),
        seq: None,
    }
}

fn completion(turn_id: &str) -> StreamEvent {
    StreamEvent::Completion {
        turn_id: Some(turn_id.to_string()),
        should_end_session: false,
    }
}

#[wasm_bindgen_test]
fn assembler_concatenates_fragments() {
    let mut asm = MessageAssembler::new();
    let mut turns = Vec::new();

    asm.apply(&mut turns, &fragment("t1", "Great"));
    asm.apply(&mut turns, &fragment("t1", ", tell me more"));
    asm.apply(&mut turns, &completion("t1"));

    assert_eq!(turns.len(), 1);
    assert_eq!(turns[0].content, "Great, tell me more");
    assert!(turns[0].complete);
}

#[wasm_bindgen_test]
fn assembler_discards_duplicate_fragment() {
    let mut asm = MessageAssembler::new();
    let mut turns = Vec::new();

    asm.apply(&mut turns, &fragment("t1", "Hello"));
    asm.apply(&mut turns, &fragment("t1", "Hello"));

    assert_eq!(turns[0].content, "Hello");
}

#[wasm_bindgen_test]
fn assembler_freezes_completed_turn() {
    let mut asm = MessageAssembler::new();
    let mut turns = Vec::new();

    asm.apply(&mut turns, &fragment("t1", "done"));
    asm.apply(&mut turns, &completion("t1"));
    asm.apply(&mut turns, &fragment("t1", " late"));

    assert_eq!(turns[0].content, "done");
}

#[wasm_bindgen_test]
fn stage_label_thresholds() {
    assert_eq!(stage_label(0, 12), "early");
    assert_eq!(stage_label(6, 12), "mid");
    assert_eq!(stage_label(9, 12), "late");
    assert_eq!(stage_label(12, 12), "wrap-up");
}

// ─── Mock Ports ──────────────────────────────────────────

struct MockTransport {
    episodes: RefCell<VecDeque<Vec<TransportEvent>>>,
    opens: RefCell<Vec<StreamRequest>>,
    next_id: Cell<u64>,
}

impl MockTransport {
    fn new() -> Rc<Self> {
        Rc::new(Self {
            episodes: RefCell::new(VecDeque::new()),
            opens: RefCell::new(Vec::new()),
            next_id: Cell::new(1),
        })
    }

    fn script(&self, events: Vec<TransportEvent>) {
        self.episodes.borrow_mut().push_back(events);
    }
}

impl TransportPort for MockTransport {
    fn open(
        &self,
        req: StreamRequest,
    ) -> (StreamHandle, Pin<Box<dyn Stream<Item = TransportEvent>>>) {
        self.opens.borrow_mut().push(req);
        let id = self.next_id.get();
        self.next_id.set(id + 1);
        let events = self.episodes.borrow_mut().pop_front().unwrap_or_default();
        (StreamHandle(id), Box::pin(stream::iter(events)))
    }

    fn cancel(&self, _handle: StreamHandle) {}
}

struct MockStore {
    fetch_result: RefCell<convo_types::Result<Transcript>>,
}

#[async_trait(?Send)]
impl TranscriptStorePort for MockStore {
    async fn fetch(&self, _session_id: &str) -> convo_types::Result<Transcript> {
        self.fetch_result.borrow().clone()
    }

    async fn notify_complete(&self, _session_id: &str) -> convo_types::Result<()> {
        Ok(())
    }
}

struct MockConnectivity {
    online: Cell<bool>,
}

impl ConnectivityPort for MockConnectivity {
    fn is_online(&self) -> bool {
        self.online.get()
    }

    fn set_observer(&self, _observer: Box<dyn Fn(bool)>) {}
}

/// Sleeps resolve immediately; spawned background work is parked, since
/// nothing here asserts on it.
struct MockScheduler {
    spawned: RefCell<Vec<LocalBoxFuture<'static, ()>>>,
}

#[async_trait(?Send)]
impl SchedulerPort for MockScheduler {
    async fn sleep(&self, _ms: u64) {}

    fn spawn(&self, fut: LocalBoxFuture<'static, ()>) {
        self.spawned.borrow_mut().push(fut);
    }
}

fn controller_with(
    transport: Rc<MockTransport>,
    online: bool,
) -> (SessionController, EventBus) {
    let bus = EventBus::new();
    let controller = SessionController::new(
        "s1",
        ClientConfig::default(),
        SessionPorts {
            transport,
            store: Rc::new(MockStore {
                fetch_result: RefCell::new(Ok(Transcript {
                    turns: Vec::new(),
                    status: SessionStatus::NotStarted,
                })),
            }),
            connectivity: Rc::new(MockConnectivity { online: Cell::new(online) }),
            scheduler: Rc::new(MockScheduler { spawned: RefCell::new(Vec::new()) }),
        },
        bus.clone(),
    );
    (controller, bus)
}

// ─── SessionController Tests (async) ─────────────────────

#[wasm_bindgen_test]
async fn controller_start_streams_opening_turn() {
    let transport = MockTransport::new();
    transport.script(vec![
        TransportEvent::Push(StreamEvent::Progress),
        TransportEvent::Push(fragment("t1", "Welcome")),
        TransportEvent::Push(completion("t1")),
    ]);
    let (controller, _bus) = controller_with(transport.clone(), true);

    controller.start().await;

    assert_eq!(controller.phase(), SessionPhase::AwaitingParticipant);
    assert_eq!(controller.turn_count(), 1);
    assert_eq!(controller.turns()[0].content, "Welcome");
    assert_eq!(transport.opens.borrow()[0].deadline_ms, 30_000);
}

#[wasm_bindgen_test]
async fn controller_send_turn_appends_both_sides() {
    let transport = MockTransport::new();
    transport.script(vec![
        TransportEvent::Push(fragment("t1", "Hi there")),
        TransportEvent::Push(completion("t1")),
    ]);
    transport.script(vec![
        TransportEvent::Push(fragment("t2", "Great")),
        TransportEvent::Push(completion("t2")),
    ]);
    let (controller, _bus) = controller_with(transport.clone(), true);

    controller.start().await;
    controller.send_turn("I built a compiler").await;

    let turns = controller.turns();
    assert_eq!(turns.len(), 3);
    assert_eq!(turns[1].speaker, Speaker::Participant);
    assert_eq!(turns[1].content, "I built a compiler");
    assert_eq!(turns[2].content, "Great");
    assert_eq!(transport.opens.borrow()[1].deadline_ms, 60_000);
}

#[wasm_bindgen_test]
async fn controller_offline_start_is_rejected() {
    let transport = MockTransport::new();
    let (controller, _bus) = controller_with(transport.clone(), false);

    controller.start().await;

    assert!(transport.opens.borrow().is_empty());
    let error = controller.error().unwrap();
    assert_eq!(error.category, ErrorCategory::Connectivity);
    assert_eq!(error.retry, Some(SessionCommand::StartSession));
}

#[wasm_bindgen_test]
async fn controller_end_session_goes_terminal() {
    let transport = MockTransport::new();
    transport.script(vec![
        TransportEvent::Push(fragment("t1", "Hello")),
        TransportEvent::Push(completion("t1")),
    ]);
    transport.script(vec![TransportEvent::Push(StreamEvent::Completion {
        turn_id: None,
        should_end_session: true,
    })]);
    let (controller, _bus) = controller_with(transport.clone(), true);

    controller.start().await;
    controller.send_turn("goodbye").await;

    assert_eq!(controller.phase(), SessionPhase::Completed);
    assert_eq!(controller.status(), SessionStatus::Completed);
}
