pub mod turn;
pub mod session;
pub mod event;
pub mod command;
pub mod config;
pub mod error;


pub use error::SessionError;
pub type Result<T> = std::result::Result<T, SessionError>;
