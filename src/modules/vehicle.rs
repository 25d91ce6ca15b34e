// src/modules/vehicle.rs
//
// Vehicle overspeed: one position filter per track, speed taken from the
// upstream tracker when it supplies one, else derived from the filter's
// velocity. A per-track cooldown suppresses repeat alerts.

use crate::buffers::CooldownTracker;
use crate::kalman::PositionKalman;
use crate::types::{Point, VehicleConfig, VehicleView};
use std::collections::HashMap;
use tracing::debug;

const CENTROID_HISTORY_CAP: usize = 30;

/// An overspeed alert for one track, speed rounded to one decimal.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpeedEvent {
    pub track_id: i64,
    pub speed_kmh: f64,
}

#[derive(Debug, Clone)]
struct VehicleTrack {
    centroid_history: Vec<Point>,
    computed_speed: f64,
    plane: i32,
    last_seen: f64,
}

pub struct SpeedMonitor {
    config: VehicleConfig,
    filters: HashMap<i64, PositionKalman>,
    tracks: HashMap<i64, VehicleTrack>,
    cooldowns: CooldownTracker,
}

impl SpeedMonitor {
    pub fn new(config: &VehicleConfig) -> Self {
        Self {
            config: config.clone(),
            filters: HashMap::new(),
            tracks: HashMap::new(),
            cooldowns: CooldownTracker::new(),
        }
    }

    /// Feed one vehicle detection. Returns an event when the track's speed
    /// exceeds the threshold and the track is off cooldown.
    pub fn update(&mut self, view: VehicleView, t: f64) -> Option<SpeedEvent> {
        let cx = view.centroid.x;
        let cy = view.centroid.y;

        let filter = self.filters.entry(view.track_id).or_insert_with(|| {
            PositionKalman::new(
                cx,
                cy,
                self.config.process_noise,
                self.config.measurement_noise,
                1.0 / self.config.fps,
            )
        });
        filter.predict();
        filter.update(cx, cy);

        let speed_kmh = view
            .speed_kmh
            .unwrap_or_else(|| filter.speed_kmh(self.config.meters_per_pixel));

        let track = self
            .tracks
            .entry(view.track_id)
            .or_insert_with(|| VehicleTrack {
                centroid_history: Vec::new(),
                computed_speed: 0.0,
                plane: view.plane_hint.unwrap_or(0),
                last_seen: t,
            });
        track.computed_speed = speed_kmh;
        track.last_seen = t;
        if let Some(plane) = view.plane_hint {
            track.plane = plane;
        }
        track.centroid_history.push(view.centroid);
        while track.centroid_history.len() > CENTROID_HISTORY_CAP {
            track.centroid_history.remove(0);
        }

        let key = view.track_id.to_string();
        if speed_kmh > self.config.speed_threshold_kmh && !self.cooldowns.is_on_cooldown(&key, t) {
            self.cooldowns
                .set_cooldown(&key, t, self.config.cooldown_seconds);
            debug!(track_id = view.track_id, speed_kmh, t, "overspeed");
            return Some(SpeedEvent {
                track_id: view.track_id,
                speed_kmh: (speed_kmh * 10.0).round() / 10.0,
            });
        }

        None
    }

    pub fn speed_of(&self, track_id: i64) -> Option<f64> {
        self.tracks.get(&track_id).map(|tr| tr.computed_speed)
    }

    /// Recent centroids for a track, oldest first (capped at 30).
    pub fn trajectory_of(&self, track_id: i64) -> Option<&[Point]> {
        self.tracks
            .get(&track_id)
            .map(|tr| tr.centroid_history.as_slice())
    }

    pub fn plane_of(&self, track_id: i64) -> Option<i32> {
        self.tracks.get(&track_id).map(|tr| tr.plane)
    }

    pub fn track_count(&self) -> usize {
        self.tracks.len()
    }

    /// Drop tracks (and their filters) last updated before `cutoff`, and
    /// any cooldown entries that have expired by then.
    pub fn evict_stale(&mut self, cutoff: f64) {
        self.tracks.retain(|_, track| track.last_seen >= cutoff);
        let tracks = &self.tracks;
        self.filters.retain(|id, _| tracks.contains_key(id));
        self.cooldowns.clear_expired(cutoff);
    }
}
