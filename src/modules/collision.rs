// src/modules/collision.rs
//
// Human-vehicle collision risk, keyed by (human, vehicle) track pair. A
// pair alerts only when its whole proximity window is true; after firing
// the pair is frozen for the cooldown window and its buffer starts over.

use crate::buffers::PersistenceBuffer;
use crate::geometry::distance;
use crate::types::{CollisionConfig, PersonView, VehicleView};
use std::collections::HashMap;
use tracing::debug;

#[derive(Debug, Clone)]
struct PairState {
    buffer: PersistenceBuffer,
    cooldown_until: Option<f64>,
    last_seen: f64,
}

pub struct CollisionMonitor {
    distance_threshold_px: f64,
    buffer_frames: usize,
    cooldown_seconds: f64,
    pairs: HashMap<(i64, i64), PairState>,
}

impl CollisionMonitor {
    pub fn new(config: &CollisionConfig) -> Self {
        Self {
            distance_threshold_px: config.distance_threshold_px,
            buffer_frames: config.buffer_frames,
            cooldown_seconds: config.cooldown_seconds,
            pairs: HashMap::new(),
        }
    }

    /// Feed one human/vehicle pairing for this frame. Returns true when
    /// the pair's proximity buffer is full and every entry is true.
    ///
    /// While the pair is on cooldown nothing is updated at all; its state
    /// is frozen until the cooldown expires.
    pub fn update(&mut self, human: &PersonView, vehicle: &VehicleView, t: f64) -> bool {
        let key = (human.track_id, vehicle.track_id);
        let pair = self.pairs.entry(key).or_insert_with(|| PairState {
            buffer: PersistenceBuffer::new(self.buffer_frames),
            cooldown_until: None,
            last_seen: t,
        });

        if let Some(until) = pair.cooldown_until {
            if t < until {
                return false;
            }
        }

        pair.last_seen = t;
        let is_close = distance(human.bottom_center, vehicle.centroid) < self.distance_threshold_px;
        pair.buffer.push(is_close);

        let fired = pair.buffer.is_full() && pair.buffer.count() == self.buffer_frames;
        if fired {
            pair.cooldown_until = Some(t + self.cooldown_seconds);
            pair.buffer.reset();
            debug!(
                human_id = human.track_id,
                vehicle_id = vehicle.track_id,
                t,
                "collision risk persisted across window"
            );
        }
        fired
    }

    pub fn pair_count(&self) -> usize {
        self.pairs.len()
    }

    /// Drop pairs last updated before `cutoff`. A pair whose cooldown is
    /// still running past the cutoff is kept even if it has gone quiet, so
    /// the suppression window survives eviction.
    pub fn evict_stale(&mut self, cutoff: f64) {
        self.pairs.retain(|_, pair| {
            pair.last_seen >= cutoff || pair.cooldown_until.map_or(false, |until| until >= cutoff)
        });
    }
}
