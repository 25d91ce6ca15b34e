// src/modules/mod.rs

pub mod collision;
pub mod intrusion;
pub mod ppe;
pub mod throwing;
pub mod vehicle;

pub use collision::CollisionMonitor;
pub use intrusion::{IntrusionMonitor, IntrusionTransition};
pub use ppe::PpeMonitor;
pub use throwing::ThrowingMonitor;
pub use vehicle::{SpeedEvent, SpeedMonitor};
