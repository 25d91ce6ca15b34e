// src/lib.rs
//
// Per-frame surveillance alert core. Consumes tracked detections one frame
// at a time and emits discrete "violation started"/"violation ended"
// alerts for five modules: perimeter intrusion, throwing, vehicle
// overspeed, human-vehicle collision risk and PPE compliance. Detection
// and tracking happen upstream; rendering and alert persistence happen
// downstream.

pub mod buffers;
pub mod config;
pub mod geometry;
pub mod kalman;
pub mod modules;
pub mod pipeline;
pub mod types;

pub use buffers::{ClassSmoothingBuffer, CooldownTracker, PersistenceBuffer};
pub use kalman::{EmaFilter, PositionKalman, ScalarKalman};
pub use pipeline::{AlertBus, FrameDispatcher};
pub use types::{Alert, Config, Detection, FrameData, ModuleKind, Point};
