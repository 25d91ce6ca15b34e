// src/modules/ppe.rs
//
// PPE compliance: per-track count of consecutive frames reporting missing
// equipment. Fires once at the persistence threshold with the recorded
// item list, then freezes the track for the cooldown window.

use crate::types::{PpeConfig, PpeView};
use std::collections::HashMap;
use tracing::debug;

#[derive(Debug, Clone, Default)]
struct PpeTrack {
    violation_frames: u32,
    cooldown_until: Option<f64>,
    last_violations: Vec<String>,
    last_seen: f64,
}

pub struct PpeMonitor {
    persistence_frames: u32,
    cooldown_seconds: f64,
    tracks: HashMap<i64, PpeTrack>,
}

impl PpeMonitor {
    pub fn new(config: &PpeConfig) -> Self {
        Self {
            persistence_frames: config.persistence_frames,
            cooldown_seconds: config.cooldown_seconds,
            tracks: HashMap::new(),
        }
    }

    /// Feed one PPE detection. Returns the missing-item list exactly when
    /// the violation count reaches the persistence threshold.
    ///
    /// A track on cooldown is frozen: no counting, no list updates.
    pub fn update(&mut self, view: &PpeView, t: f64) -> Option<Vec<String>> {
        let track = self.tracks.entry(view.track_id).or_default();

        if let Some(until) = track.cooldown_until {
            if t < until {
                return None;
            }
        }

        track.last_seen = t;
        if view.missing.is_empty() {
            track.violation_frames = 0;
            track.last_violations.clear();
        } else {
            track.violation_frames += 1;
            track.last_violations = view.missing.clone();
        }

        if track.violation_frames == self.persistence_frames {
            track.cooldown_until = Some(t + self.cooldown_seconds);
            track.violation_frames = 0;
            debug!(
                track_id = view.track_id,
                t,
                violations = ?track.last_violations,
                "ppe violation persisted"
            );
            return Some(track.last_violations.clone());
        }

        None
    }

    pub fn track_count(&self) -> usize {
        self.tracks.len()
    }

    /// Drop tracks last updated before `cutoff`. A track whose cooldown is
    /// still running past the cutoff is kept even while frozen, so the
    /// suppression window survives eviction.
    pub fn evict_stale(&mut self, cutoff: f64) {
        self.tracks.retain(|_, track| {
            track.last_seen >= cutoff || track.cooldown_until.map_or(false, |until| until >= cutoff)
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn monitor(persistence: u32, cooldown: f64) -> PpeMonitor {
        PpeMonitor::new(&PpeConfig {
            persistence_frames: persistence,
            cooldown_seconds: cooldown,
        })
    }

    fn missing(track_id: i64, items: &[&str]) -> PpeView {
        PpeView {
            track_id,
            missing: items.iter().map(|s| s.to_string()).collect(),
        }
    }

    #[test]
    fn test_fires_at_persistence_threshold_with_items() {
        let mut m = monitor(3, 20.0);
        let view = missing(1, &["helmet", "vest"]);

        assert_eq!(m.update(&view, 0.0), None);
        assert_eq!(m.update(&view, 0.04), None);
        assert_eq!(
            m.update(&view, 0.08),
            Some(vec!["helmet".to_string(), "vest".to_string()])
        );
    }

    #[test]
    fn test_compliant_frame_resets_counter() {
        let mut m = monitor(3, 20.0);
        let bad = missing(1, &["helmet"]);
        let ok = missing(1, &[]);

        assert_eq!(m.update(&bad, 0.0), None);
        assert_eq!(m.update(&bad, 0.04), None);
        assert_eq!(m.update(&ok, 0.08), None);
        // Counter restarted; two more bad frames are not enough.
        assert_eq!(m.update(&bad, 0.12), None);
        assert_eq!(m.update(&bad, 0.16), None);
        assert!(m.update(&bad, 0.20).is_some());
    }

    #[test]
    fn test_cooldown_freezes_track() {
        let mut m = monitor(2, 30.0);
        let bad = missing(1, &["gloves"]);

        m.update(&bad, 0.0);
        assert!(m.update(&bad, 0.04).is_some());

        // Frozen: violations during cooldown neither count nor fire.
        for i in 2..50 {
            assert_eq!(m.update(&bad, i as f64 * 0.04), None);
        }

        // After expiry the counter restarts from zero.
        assert_eq!(m.update(&bad, 31.0), None);
        assert!(m.update(&bad, 31.04).is_some());
    }

    #[test]
    fn test_latest_item_list_is_reported() {
        let mut m = monitor(3, 20.0);
        m.update(&missing(1, &["helmet"]), 0.0);
        m.update(&missing(1, &["helmet", "vest"]), 0.04);
        // The list recorded on the firing frame wins.
        assert_eq!(
            m.update(&missing(1, &["vest"]), 0.08),
            Some(vec!["vest".to_string()])
        );
    }

    #[test]
    fn test_eviction_spares_tracks_on_cooldown() {
        let mut m = monitor(2, 30.0);
        let bad = missing(1, &["gloves"]);

        m.update(&bad, 0.0);
        assert!(m.update(&bad, 0.04).is_some());

        // The frozen track never refreshes last_seen, but a TTL sweep
        // inside the 30 s cooldown must not clear its suppression window.
        m.evict_stale(5.0);
        assert_eq!(m.track_count(), 1);
        assert_eq!(m.update(&bad, 10.0), None);
        assert_eq!(m.update(&bad, 10.04), None);
    }

    #[test]
    fn test_evict_stale() {
        let mut m = monitor(5, 20.0);
        m.update(&missing(1, &["helmet"]), 0.0);
        m.update(&missing(2, &["helmet"]), 40.0);
        m.evict_stale(10.0);
        assert_eq!(m.track_count(), 1);
    }
}
