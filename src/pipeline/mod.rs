// src/pipeline/mod.rs

pub mod alert_bus;
pub mod dispatcher;

pub use alert_bus::AlertBus;
pub use dispatcher::FrameDispatcher;
