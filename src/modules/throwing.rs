// src/modules/throwing.rs
//
// Throwing/littering: per-track smoothing of binary class labels plus a
// consecutive-frame counter. The alert fires exactly when the counter hits
// the threshold, so a sustained violation produces one alert, not a stream.

use crate::types::{ThrowingConfig, ThrowingView};
use std::collections::HashMap;
use tracing::debug;

#[derive(Debug, Clone, Default)]
struct ThrowingTrack {
    class_history: Vec<u8>,
    smoothed: u8,
    consecutive: u32,
    last_seen: f64,
}

pub struct ThrowingMonitor {
    smoothing_window: usize,
    consecutive_threshold: u32,
    tracks: HashMap<i64, ThrowingTrack>,
}

impl ThrowingMonitor {
    pub fn new(config: &ThrowingConfig) -> Self {
        Self {
            smoothing_window: config.smoothing_window,
            consecutive_threshold: config.consecutive_threshold,
            tracks: HashMap::new(),
        }
    }

    /// Feed one labelled detection. Returns true exactly when the track's
    /// consecutive smoothed-throwing count reaches the threshold.
    pub fn update(&mut self, view: ThrowingView, t: f64) -> bool {
        let track = self.tracks.entry(view.track_id).or_default();
        track.last_seen = t;

        track.class_history.push(view.label);
        while track.class_history.len() > self.smoothing_window {
            track.class_history.remove(0);
        }

        let mean = track.class_history.iter().map(|&v| v as f64).sum::<f64>()
            / track.class_history.len() as f64;
        track.smoothed = mean.round() as u8;
        track.consecutive = if track.smoothed == 1 {
            track.consecutive + 1
        } else {
            0
        };

        let fired = track.consecutive == self.consecutive_threshold;
        if fired {
            debug!(track_id = view.track_id, t, "throwing threshold reached");
        }
        fired
    }

    pub fn track_count(&self) -> usize {
        self.tracks.len()
    }

    /// Last smoothed label for a track: 1 = throwing, 0 = normal.
    pub fn smoothed_label(&self, track_id: i64) -> Option<u8> {
        self.tracks.get(&track_id).map(|tr| tr.smoothed)
    }

    /// Drop tracks last updated before `cutoff`.
    pub fn evict_stale(&mut self, cutoff: f64) {
        self.tracks.retain(|_, track| track.last_seen >= cutoff);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn monitor(threshold: u32) -> ThrowingMonitor {
        ThrowingMonitor::new(&ThrowingConfig {
            smoothing_window: 3,
            consecutive_threshold: threshold,
        })
    }

    fn throwing(track_id: i64) -> ThrowingView {
        ThrowingView { track_id, label: 1 }
    }

    fn normal(track_id: i64) -> ThrowingView {
        ThrowingView { track_id, label: 0 }
    }

    #[test]
    fn test_fires_exactly_once_at_threshold() {
        let mut m = monitor(5);
        let mut fired = Vec::new();
        for i in 0..8 {
            fired.push(m.update(throwing(1), i as f64 * 0.04));
        }
        // Fires on the fifth consecutive smoothed-throwing frame only.
        assert_eq!(fired, vec![false, false, false, false, true, false, false, false]);
    }

    #[test]
    fn test_counter_resets_on_smoothed_normal() {
        let mut m = monitor(3);
        assert!(!m.update(throwing(1), 0.0));
        assert!(!m.update(throwing(1), 0.04));
        // Window [1,1,0] → mean 0.667 → rounds to 1, still counts.
        assert!(m.update(normal(1), 0.08));
        // Window [1,0,0] → mean 0.333 → rounds to 0, counter resets.
        assert!(!m.update(normal(1), 0.12));
        assert_eq!(m.smoothed_label(1), Some(0));
        // Climbing back: the first throwing frame is still outvoted by the
        // window ([0,0,1] → 0), so three smoothed-throwing frames take four
        // raw ones.
        assert!(!m.update(throwing(1), 0.16));
        assert!(!m.update(throwing(1), 0.20));
        assert!(!m.update(throwing(1), 0.24));
        assert!(m.update(throwing(1), 0.28));
    }

    #[test]
    fn test_tracks_are_independent() {
        let mut m = monitor(2);
        assert!(!m.update(throwing(1), 0.0));
        assert!(!m.update(throwing(2), 0.0));
        assert!(m.update(throwing(1), 0.04));
        assert!(m.update(throwing(2), 0.04));
        assert_eq!(m.track_count(), 2);
    }

    #[test]
    fn test_evict_stale() {
        let mut m = monitor(5);
        m.update(throwing(1), 0.0);
        m.update(throwing(2), 10.0);
        m.evict_stale(5.0);
        assert_eq!(m.track_count(), 1);
    }
}
