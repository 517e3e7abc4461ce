pub mod assembler;
pub mod controller;
pub mod event_bus;
pub mod ports;
pub mod stage;
