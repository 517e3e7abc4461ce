//! Session controller — the protocol state machine.
//!
//! Sequences session start → turn exchange → completion over the transport
//! port, applying events through the assembler and surfacing every failure
//! as a single participant-facing ErrorState. One controller per session
//! instance; two tabs get two controllers.
//!
//! Async methods are driven by the host via
//! `wasm_bindgen_futures::spawn_local`. State lives behind one RefCell and
//! every borrow is released before the next await, so each transport event
//! applies atomically with respect to connectivity callbacks and timers.

use crate::assembler::MessageAssembler;
use crate::event_bus::EventBus;
use crate::ports::*;
use crate::stage::stage_label;
use convo_types::{
    command::SessionCommand,
    config::ClientConfig,
    error::{ErrorCategory, ErrorState},
    event::{SessionEvent, StreamEvent},
    session::{Session, SessionPhase, SessionStatus},
    turn::Turn,
    SessionError,
};
use futures::StreamExt;
use std::cell::{Cell, RefCell};
use std::rc::Rc;

/// Shown when the remote side reports a failure without a usable message.
const GENERIC_REMOTE_FAILURE: &str = "the assistant hit a problem while responding";

/// The single in-flight operation (single-flight invariant).
struct PendingRequest {
    handle: StreamHandle,
    command: SessionCommand,
}

/// Everything the controller mutates.
struct ControllerState {
    session: Session,
    phase: SessionPhase,
    /// Stable phase to return to when the active error is dismissed.
    resume_phase: SessionPhase,
    assembler: MessageAssembler,
    pending: Option<PendingRequest>,
    error: Option<ErrorState>,
    /// Bumped on every surfaced error so a stale auto-dismiss timer never
    /// clears a newer one.
    error_seq: u64,
    /// Whether the displayed error's bound command already appended its
    /// participant turn. A dispatched send keeps its optimistic turn on
    /// failure, so retry must not append it a second time; a send rejected
    /// before dispatch never appended at all.
    retry_turn_appended: bool,
}

pub struct SessionController {
    state: Rc<RefCell<ControllerState>>,
    ports: SessionPorts,
    bus: EventBus,
    config: ClientConfig,
    /// False after dispose(); spawned work checks it before touching state.
    alive: Rc<Cell<bool>>,
}

impl SessionController {
    pub fn new(
        session_id: impl Into<String>,
        config: ClientConfig,
        ports: SessionPorts,
        bus: EventBus,
    ) -> Self {
        Self {
            state: Rc::new(RefCell::new(ControllerState {
                session: Session::new(session_id),
                phase: SessionPhase::Idle,
                resume_phase: SessionPhase::Idle,
                assembler: MessageAssembler::new(),
                pending: None,
                error: None,
                error_seq: 0,
                retry_turn_appended: false,
            })),
            ports,
            bus,
            config,
            alive: Rc::new(Cell::new(true)),
        }
    }

    // ─── Read surface ────────────────────────────────────────

    pub fn phase(&self) -> SessionPhase {
        self.state.borrow().phase
    }

    pub fn status(&self) -> SessionStatus {
        self.state.borrow().session.status
    }

    pub fn session_id(&self) -> String {
        self.state.borrow().session.id.clone()
    }

    /// Snapshot of the turn list. The list itself is mutated only by the
    /// controller; callers render the clone.
    pub fn turns(&self) -> Vec<Turn> {
        self.state.borrow().session.turns.clone()
    }

    pub fn turn_count(&self) -> usize {
        self.state.borrow().session.turns.len()
    }

    pub fn error(&self) -> Option<ErrorState> {
        self.state.borrow().error.clone()
    }

    /// True while the assistant is producing (or expected to produce) output.
    pub fn is_responding(&self) -> bool {
        self.phase().is_in_flight()
    }

    pub fn stage_label(&self) -> &'static str {
        stage_label(self.turn_count(), self.config.expected_turns)
    }

    // ─── Lifecycle ───────────────────────────────────────────

    /// Seed state from the persisted transcript. A non-empty history lands
    /// in AwaitingParticipant (a reloaded page must not re-trigger start);
    /// a terminal status lands in Completed. Fetch failures are logged and
    /// the session begins as if fresh: an interview must remain startable
    /// even when history retrieval is down.
    pub async fn resume(&self) {
        let session_id = self.session_id();
        match self.ports.store.fetch(&session_id).await {
            Ok(transcript) => {
                if !self.alive.get() {
                    return;
                }
                let seeded = !transcript.turns.is_empty();
                {
                    let mut st = self.state.borrow_mut();
                    if transcript.status.is_terminal() {
                        st.session.turns = transcript.turns;
                        st.session.status = SessionStatus::Completed;
                        st.phase = SessionPhase::Completed;
                        st.resume_phase = SessionPhase::Completed;
                    } else if seeded {
                        st.session.turns = transcript.turns;
                        st.session.status = transcript.status;
                        st.phase = SessionPhase::AwaitingParticipant;
                        st.resume_phase = SessionPhase::AwaitingParticipant;
                    } else {
                        st.session.status = transcript.status;
                    }
                }
                if seeded {
                    self.bus.emit(SessionEvent::TurnsUpdated);
                }
                log::info!(
                    "resumed session {} with {} turns, phase {:?}",
                    session_id,
                    self.turn_count(),
                    self.phase()
                );
            }
            Err(e) => {
                log::warn!("transcript fetch for {} failed ({}), starting fresh", session_id, e);
            }
        }
        if !self.alive.get() {
            return;
        }
        self.bus.emit(SessionEvent::PhaseChanged { phase: self.phase() });
    }

    /// Begin streaming the assistant's opening turn. Only valid from Idle.
    pub async fn start(&self) {
        if self.phase() != SessionPhase::Idle {
            log::debug!("start ignored in phase {:?}", self.phase());
            return;
        }
        self.run(SessionCommand::StartSession, true).await;
    }

    /// Send participant text and stream the assistant's reply. Only valid
    /// while awaiting the participant; anything else is a logged no-op, in
    /// particular while another operation is pending.
    pub async fn send_turn(&self, text: &str) {
        {
            let st = self.state.borrow();
            if st.pending.is_some() {
                log::debug!("send_turn ignored, operation already pending");
                return;
            }
            if st.phase != SessionPhase::AwaitingParticipant {
                log::debug!("send_turn ignored in phase {:?}", st.phase);
                return;
            }
        }
        self.run(SessionCommand::SendTurn { text: text.to_string() }, true).await;
    }

    /// Re-dispatch the operation bound to the active error, if any. Without
    /// a bound operation this is just a dismiss.
    pub async fn retry(&self) {
        let (command, append_turn) = {
            let mut st = self.state.borrow_mut();
            let Some(error) = st.error.take() else {
                return;
            };
            if st.phase == SessionPhase::Errored {
                st.phase = st.resume_phase;
            }
            (error.retry, !st.retry_turn_appended)
        };
        self.bus.emit(SessionEvent::ErrorCleared);
        self.bus.emit(SessionEvent::PhaseChanged { phase: self.phase() });
        match command {
            Some(command) => {
                log::info!("retrying {}", command.label());
                self.run(command, append_turn).await;
            }
            None => log::debug!("retry with no bound operation, dismissed"),
        }
    }

    /// Clear the active error and return to the stable phase it interrupted.
    pub fn dismiss_error(&self) {
        let restored = {
            let mut st = self.state.borrow_mut();
            if st.error.take().is_none() {
                return;
            }
            if st.phase == SessionPhase::Errored {
                st.phase = st.resume_phase;
                Some(st.phase)
            } else {
                None
            }
        };
        self.bus.emit(SessionEvent::ErrorCleared);
        if let Some(phase) = restored {
            self.bus.emit(SessionEvent::PhaseChanged { phase });
        }
    }

    /// Feed an online/offline transition into the machine. Wired to the
    /// connectivity port by the composition root.
    pub fn handle_connectivity(&self, online: bool) {
        if !self.alive.get() {
            return;
        }
        if online {
            log::info!("connectivity restored");
            // Only the offline notice clears itself; actionable failures
            // wait for the participant. No automatic retry.
            let cleared = {
                let mut st = self.state.borrow_mut();
                match &st.error {
                    Some(e) if e.retry.is_none() && e.category == ErrorCategory::Connectivity => {
                        st.error = None;
                        true
                    }
                    _ => false,
                }
            };
            if cleared {
                self.bus.emit(SessionEvent::ErrorCleared);
            }
        } else {
            log::warn!("connectivity lost");
            // A notice never replaces an actionable failure: clearing one
            // later would strand the Errored phase with nothing to dismiss,
            // and the retry path already reports offline on its own.
            let actionable = self
                .state
                .borrow()
                .error
                .as_ref()
                .is_some_and(|e| e.is_retryable());
            if !actionable {
                self.surface_error(&SessionError::Offline, None, None);
            }
        }
    }

    /// Tear down: cancel any open transport and stop all spawned work from
    /// touching this controller again. Idempotent.
    pub fn dispose(&self) {
        if !self.alive.replace(false) {
            return;
        }
        let handle = self.state.borrow_mut().pending.take().map(|p| p.handle);
        if let Some(handle) = handle {
            self.ports.transport.cancel(handle);
        }
        log::info!("controller for session {} disposed", self.session_id());
    }

    // ─── Operation dispatch ──────────────────────────────────

    async fn run(&self, command: SessionCommand, append_turn: bool) {
        // Offline rejection happens before any transport work and carries
        // the command, so the participant can retry once back online.
        if !self.ports.connectivity.is_online() {
            log::warn!("{} rejected while offline", command.label());
            self.surface_error(&SessionError::Offline, Some(command), None);
            return;
        }

        let (origin, in_flight) = match &command {
            SessionCommand::StartSession => (SessionPhase::Idle, SessionPhase::Starting),
            SessionCommand::SendTurn { .. } => {
                (SessionPhase::AwaitingParticipant, SessionPhase::SendingTurn)
            }
        };

        let appended = {
            let mut st = self.state.borrow_mut();
            if st.pending.is_some() {
                log::debug!("{} ignored, operation already pending", command.label());
                return;
            }
            // Optimistic append: the participant's turn is visible at once
            // and stays visible even if the send fails. A retried send
            // skips this; its turn is already in the list.
            let mut appended = false;
            if let SessionCommand::SendTurn { text } = &command {
                if append_turn {
                    st.session.turns.push(Turn::participant(text.clone()));
                    appended = true;
                }
            }
            st.phase = in_flight;
            appended
        };
        if appended {
            self.bus.emit(SessionEvent::TurnsUpdated);
        }
        self.bus.emit(SessionEvent::PhaseChanged { phase: in_flight });

        let deadline_ms = command.deadline_ms(
            self.config.timing.start_deadline_ms,
            self.config.timing.turn_deadline_ms,
        );
        let (handle, mut events) = self.ports.transport.open(StreamRequest {
            session_id: self.session_id(),
            command: command.clone(),
            deadline_ms,
        });
        log::info!("dispatched {} for session {}", command.label(), self.session_id());
        self.state.borrow_mut().pending = Some(PendingRequest { handle, command });

        let mut completed = false;
        let mut end_session = false;
        let mut failure: Option<SessionError> = None;

        while let Some(event) = events.next().await {
            if !self.alive.get() {
                self.ports.transport.cancel(handle);
                return;
            }
            match event {
                TransportEvent::Push(ev) => {
                    let changed = {
                        let mut st = self.state.borrow_mut();
                        let ControllerState { session, assembler, .. } = &mut *st;
                        assembler.apply(&mut session.turns, &ev)
                    };
                    if changed {
                        self.bus.emit(SessionEvent::TurnsUpdated);
                    }
                    match ev {
                        StreamEvent::Completion { should_end_session, .. } => {
                            completed = true;
                            end_session = should_end_session;
                            break;
                        }
                        StreamEvent::Failure { message } => {
                            failure = Some(SessionError::Remote(
                                message.unwrap_or_else(|| GENERIC_REMOTE_FAILURE.to_string()),
                            ));
                            break;
                        }
                        _ => {}
                    }
                }
                TransportEvent::Dropped(err) => {
                    failure = Some(err);
                    break;
                }
            }
        }

        // Closing twice is fine; this also disarms the adapter's deadline.
        self.ports.transport.cancel(handle);
        if !self.alive.get() {
            return;
        }
        // The retry action rides on the pending request it belongs to.
        let command = match self.state.borrow_mut().pending.take() {
            Some(pending) => pending.command,
            None => return,
        };

        if let Some(err) = failure {
            log::warn!("{} failed: {}", command.label(), err);
            self.surface_error(&err, Some(command), Some(origin));
            return;
        }
        if !completed {
            // The stream closed without a terminal event.
            let err = SessionError::Network("stream closed before completion".to_string());
            log::warn!("{} failed: {}", command.label(), err);
            self.surface_error(&err, Some(command), Some(origin));
            return;
        }

        if end_session {
            self.complete_session().await;
        } else {
            {
                let mut st = self.state.borrow_mut();
                st.phase = SessionPhase::AwaitingParticipant;
                st.resume_phase = SessionPhase::AwaitingParticipant;
                if st.session.status == SessionStatus::NotStarted {
                    st.session.status = SessionStatus::Active;
                }
            }
            self.bus.emit(SessionEvent::PhaseChanged {
                phase: SessionPhase::AwaitingParticipant,
            });
        }
    }

    /// Wind the session down: notify the collaborator (fire-and-forget),
    /// give the final assistant turn a moment to render, then go terminal.
    async fn complete_session(&self) {
        let store = Rc::clone(&self.ports.store);
        let session_id = self.session_id();
        self.ports.scheduler.spawn(Box::pin(async move {
            if let Err(e) = store.notify_complete(&session_id).await {
                log::warn!("completion notification failed: {}", e);
            }
        }));

        self.ports.scheduler.sleep(self.config.timing.completion_grace_ms).await;
        if !self.alive.get() {
            return;
        }
        {
            let mut st = self.state.borrow_mut();
            st.phase = SessionPhase::Completed;
            st.resume_phase = SessionPhase::Completed;
            st.session.status = SessionStatus::Completed;
        }
        self.bus.emit(SessionEvent::PhaseChanged { phase: SessionPhase::Completed });
        log::info!("session {} completed", self.session_id());
    }

    /// Publish an ErrorState, replacing any displayed one. `errored_from`
    /// is the stable phase a failed operation originated in; notices that
    /// interrupt no operation pass None and leave the phase alone.
    fn surface_error(
        &self,
        err: &SessionError,
        retry: Option<SessionCommand>,
        errored_from: Option<SessionPhase>,
    ) {
        let error = ErrorState::from_error(err, retry);
        let retryable = error.is_retryable();
        let seq = {
            let mut st = self.state.borrow_mut();
            st.error_seq += 1;
            if let Some(origin) = errored_from {
                st.phase = SessionPhase::Errored;
                st.resume_phase = origin;
            }
            // Only a dispatched operation has placed its optimistic turn.
            st.retry_turn_appended = errored_from.is_some();
            st.error = Some(error.clone());
            st.error_seq
        };
        self.bus.emit(SessionEvent::ErrorRaised {
            message: error.message.clone(),
            category: error.category,
            retryable,
        });
        if errored_from.is_some() {
            self.bus.emit(SessionEvent::PhaseChanged { phase: SessionPhase::Errored });
        }

        // Nothing to act on means nothing worth keeping on screen: clear it
        // on a timer unless a newer error replaced it first.
        if !retryable {
            let state = Rc::clone(&self.state);
            let alive = Rc::clone(&self.alive);
            let bus = self.bus.clone();
            let scheduler = Rc::clone(&self.ports.scheduler);
            let dismiss_ms = self.config.timing.error_auto_dismiss_ms;
            self.ports.scheduler.spawn(Box::pin(async move {
                scheduler.sleep(dismiss_ms).await;
                if !alive.get() {
                    return;
                }
                let cleared = {
                    let mut st = state.borrow_mut();
                    if st.error_seq == seq && st.error.is_some() {
                        st.error = None;
                        true
                    } else {
                        false
                    }
                };
                if cleared {
                    bus.emit(SessionEvent::ErrorCleared);
                }
            }));
        }
    }
}
