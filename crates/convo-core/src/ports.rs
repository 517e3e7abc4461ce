//! Port traits — the hexagonal architecture boundary.
//!
//! These traits are defined here in `convo-core` (pure Rust).
//! Implementations live in `convo-platform` (browser adapters).
//! The core never imports platform code; it only depends on these traits.

use async_trait::async_trait;
use convo_types::{command::SessionCommand, event::StreamEvent, session::Transcript, Result, SessionError};
use futures::future::LocalBoxFuture;
use futures::Stream;
use std::pin::Pin;
use std::rc::Rc;

// ─── Transport Port ──────────────────────────────────────────

/// Identifies one open server-push stream. Handles stay valid for `cancel`
/// after the stream closes; cancelling twice is a no-op.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StreamHandle(pub u64);

/// One logical operation to run over a server-push stream.
#[derive(Debug, Clone)]
pub struct StreamRequest {
    pub session_id: String,
    pub command: SessionCommand,
    /// Force-close if no progress/fragment arrives within this window.
    pub deadline_ms: u64,
}

/// What the transport yields: decoded push events, or the reasons it could
/// not produce any more of them.
#[derive(Debug, Clone)]
pub enum TransportEvent {
    /// A decoded event from the remote side
    Push(StreamEvent),
    /// The stream failed below the application protocol: never opened,
    /// dropped mid-flight, or deadline exceeded
    Dropped(SessionError),
}

pub trait TransportPort {
    /// Open a server-push stream for one logical operation. Setup failures
    /// are reported as a `Dropped` item on the returned stream so the
    /// consumer has a single error path.
    fn open(&self, req: StreamRequest) -> (StreamHandle, Pin<Box<dyn Stream<Item = TransportEvent>>>);

    /// Force-close an open stream and disarm its deadline. Always safe to
    /// call, including on handles that already completed.
    fn cancel(&self, handle: StreamHandle);
}

// ─── Transcript Store Port ───────────────────────────────────

#[async_trait(?Send)]
pub trait TranscriptStorePort {
    /// Fetch the persisted turn history and status for a session.
    async fn fetch(&self, session_id: &str) -> Result<Transcript>;

    /// Tell the collaborator the session ended. Fire-and-forget at the call
    /// site: a delivery failure never blocks the local transition.
    async fn notify_complete(&self, session_id: &str) -> Result<()>;
}

// ─── Connectivity Port ───────────────────────────────────────

pub trait ConnectivityPort {
    /// Current best knowledge of whether the network is reachable.
    fn is_online(&self) -> bool;

    /// Register the single observer for online/offline transitions.
    fn set_observer(&self, observer: Box<dyn Fn(bool)>);
}

// ─── Scheduler Port ──────────────────────────────────────────

/// Timers and task spawning. Grace periods and auto-dismiss live in the
/// controller, but clocks are a platform primitive, so they cross the port
/// boundary like everything else platform-specific.
#[async_trait(?Send)]
pub trait SchedulerPort {
    async fn sleep(&self, ms: u64);

    /// Run a future to completion in the background.
    fn spawn(&self, fut: LocalBoxFuture<'static, ()>);
}

/// The full adapter set a controller needs, bundled for wiring.
pub struct SessionPorts {
    pub transport: Rc<dyn TransportPort>,
    pub store: Rc<dyn TranscriptStorePort>,
    pub connectivity: Rc<dyn ConnectivityPort>,
    pub scheduler: Rc<dyn SchedulerPort>,
}
