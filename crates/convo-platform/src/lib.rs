pub mod connectivity;
pub mod scheduler;
pub mod sse;
pub mod transcript;
pub mod transport;

pub use connectivity::BrowserConnectivity;
pub use scheduler::GlooScheduler;
pub use transcript::ApiTranscriptStore;
pub use transport::PushTransport;
