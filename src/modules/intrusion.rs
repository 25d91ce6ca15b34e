// src/modules/intrusion.rs
//
// Perimeter intrusion: a two-state machine (CLEAR / ALERT) over a sliding
// window of "anyone inside the zone this frame" booleans. Hysteresis comes
// from requiring the window count to cross the threshold in each direction.

use crate::geometry::point_in_polygon;
use crate::types::{IntrusionConfig, PersonView, Point};
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntrusionTransition {
    /// CLEAR → ALERT, emit a "violation started" alert.
    Started,
    /// ALERT → CLEAR, emit a "violation ended" alert.
    Ended,
}

pub struct IntrusionMonitor {
    roi: Vec<Point>,
    buffer_size: usize,
    threshold: usize,
    window: Vec<bool>,
    state: u8,
    last_state_change: Option<f64>,
}

impl IntrusionMonitor {
    pub fn new(config: &IntrusionConfig) -> Self {
        Self {
            roi: config.roi.clone(),
            buffer_size: config.buffer_size,
            threshold: config.threshold,
            window: Vec::with_capacity(config.buffer_size),
            state: 0,
            last_state_change: None,
        }
    }

    /// Feed one frame's person detections. Returns a transition when the
    /// window count crosses the threshold, `None` while it stays on the
    /// same side.
    pub fn update(&mut self, persons: &[PersonView], t: f64) -> Option<IntrusionTransition> {
        let any_in_roi = persons
            .iter()
            .any(|p| point_in_polygon(p.bottom_center, &self.roi));

        self.window.push(any_in_roi);
        while self.window.len() > self.buffer_size {
            self.window.remove(0);
        }

        let true_count = self.window.iter().filter(|&&v| v).count();

        let transition = if self.state == 0 && true_count >= self.threshold {
            self.state = 1;
            Some(IntrusionTransition::Started)
        } else if self.state == 1 && true_count < self.threshold {
            self.state = 0;
            Some(IntrusionTransition::Ended)
        } else {
            None
        };

        if let Some(tr) = transition {
            self.last_state_change = Some(t);
            debug!(
                count = true_count,
                threshold = self.threshold,
                t,
                "intrusion transition: {:?}",
                tr
            );
        }

        transition
    }

    /// Current machine state: 0 = CLEAR, 1 = ALERT.
    pub fn state(&self) -> u8 {
        self.state
    }

    pub fn window(&self) -> &[bool] {
        &self.window
    }

    pub fn last_state_change(&self) -> Option<f64> {
        self.last_state_change
    }
}
