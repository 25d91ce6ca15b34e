// src/pipeline/dispatcher.rs
//
// Routes each frame to the active module's monitor. Owns all per-module
// state: switching modules discards every state map and motion filter and
// rebuilds from config. Processing is synchronous, one frame at a time.

use crate::modules::{
    CollisionMonitor, IntrusionMonitor, IntrusionTransition, PpeMonitor, SpeedMonitor,
    ThrowingMonitor,
};
use crate::pipeline::AlertBus;
use crate::types::{
    Alert, Config, Detection, FrameData, ModuleKind, PersonView, PpeView, ThrowingView,
    VehicleView,
};
use tracing::{debug, info};

/// Frames closer than this to the last processed timestamp are treated as
/// re-deliveries of the same frame and dropped.
const DUPLICATE_FRAME_EPSILON: f64 = 0.01;

enum ActiveMonitor {
    Intrusion(IntrusionMonitor),
    Throwing(ThrowingMonitor),
    Vehicle(SpeedMonitor),
    Collision(CollisionMonitor),
    Ppe(PpeMonitor),
}

impl ActiveMonitor {
    fn build(kind: ModuleKind, config: &Config) -> Self {
        match kind {
            ModuleKind::Intrusion => {
                ActiveMonitor::Intrusion(IntrusionMonitor::new(&config.intrusion))
            }
            ModuleKind::Throwing => {
                ActiveMonitor::Throwing(ThrowingMonitor::new(&config.throwing))
            }
            ModuleKind::Vehicle => ActiveMonitor::Vehicle(SpeedMonitor::new(&config.vehicle)),
            ModuleKind::Collision => {
                ActiveMonitor::Collision(CollisionMonitor::new(&config.collision))
            }
            ModuleKind::Ppe => ActiveMonitor::Ppe(PpeMonitor::new(&config.ppe)),
        }
    }

    fn kind(&self) -> ModuleKind {
        match self {
            ActiveMonitor::Intrusion(_) => ModuleKind::Intrusion,
            ActiveMonitor::Throwing(_) => ModuleKind::Throwing,
            ActiveMonitor::Vehicle(_) => ModuleKind::Vehicle,
            ActiveMonitor::Collision(_) => ModuleKind::Collision,
            ActiveMonitor::Ppe(_) => ModuleKind::Ppe,
        }
    }
}

pub struct FrameDispatcher {
    config: Config,
    active: ActiveMonitor,
    bus: AlertBus,
    last_processed_t: Option<f64>,
}

impl FrameDispatcher {
    pub fn new(config: Config, module: ModuleKind) -> Self {
        let active = ActiveMonitor::build(module, &config);
        let bus = AlertBus::new(config.max_pending_alerts);
        Self {
            config,
            active,
            bus,
            last_processed_t: None,
        }
    }

    pub fn active_module(&self) -> ModuleKind {
        self.active.kind()
    }

    /// Switch the active module. This is a cancellation point: all
    /// per-track state and motion filters are discarded and rebuilt from
    /// config. The duplicate-frame guard is unaffected.
    pub fn set_module(&mut self, module: ModuleKind) {
        if module != self.active.kind() {
            info!(camera = %self.config.camera_id, %module, "switching active module");
        }
        self.active = ActiveMonitor::build(module, &self.config);
    }

    /// Process one frame. Frames must arrive in non-decreasing timestamp
    /// order; near-duplicates of the last processed timestamp are dropped
    /// before any state machine runs. Returns the number of alerts
    /// published for this frame.
    pub fn process_frame(&mut self, frame: &FrameData) -> usize {
        if let Some(last) = self.last_processed_t {
            if (frame.t - last).abs() < DUPLICATE_FRAME_EPSILON {
                debug!(t = frame.t, last, "dropping near-duplicate frame");
                return 0;
            }
        }
        self.last_processed_t = Some(frame.t);

        let mut published = 0;
        match &mut self.active {
            ActiveMonitor::Intrusion(monitor) => {
                let persons = person_views(&frame.detections);
                if let Some(transition) = monitor.update(&persons, frame.t) {
                    let state = match transition {
                        IntrusionTransition::Started => 1,
                        IntrusionTransition::Ended => 0,
                    };
                    let alert = Alert::new(
                        &self.config.camera_id,
                        ModuleKind::Intrusion,
                        state,
                        frame.t,
                    );
                    info!(camera = %self.config.camera_id, state, t = frame.t, "intrusion alert");
                    self.bus.publish(alert);
                    published += 1;
                }
            }
            ActiveMonitor::Throwing(monitor) => {
                for view in throwing_views(&frame.detections) {
                    if monitor.update(view, frame.t) {
                        let mut alert = Alert::new(
                            &self.config.camera_id,
                            ModuleKind::Throwing,
                            1,
                            frame.t,
                        );
                        alert.track_id = Some(view.track_id);
                        info!(camera = %self.config.camera_id, track_id = view.track_id, t = frame.t, "throwing alert");
                        self.bus.publish(alert);
                        published += 1;
                    }
                }
            }
            ActiveMonitor::Vehicle(monitor) => {
                for view in vehicle_views(&frame.detections, &self.config.vehicle.vehicle_classes)
                {
                    if let Some(event) = monitor.update(view, frame.t) {
                        let mut alert = Alert::new(
                            &self.config.camera_id,
                            ModuleKind::Vehicle,
                            1,
                            frame.t,
                        );
                        alert.vehicle_id = Some(event.track_id);
                        alert.speed = Some(event.speed_kmh);
                        info!(camera = %self.config.camera_id, vehicle_id = event.track_id, speed = event.speed_kmh, t = frame.t, "overspeed alert");
                        self.bus.publish(alert);
                        published += 1;
                    }
                }
            }
            ActiveMonitor::Collision(monitor) => {
                let persons = person_views(&frame.detections);
                let vehicles =
                    vehicle_views(&frame.detections, &self.config.vehicle.vehicle_classes);
                for person in &persons {
                    for vehicle in &vehicles {
                        if monitor.update(person, vehicle, frame.t) {
                            let mut alert = Alert::new(
                                &self.config.camera_id,
                                ModuleKind::Collision,
                                1,
                                frame.t,
                            );
                            alert.human_id = Some(person.track_id);
                            alert.piv_id = Some(vehicle.track_id);
                            info!(camera = %self.config.camera_id, human_id = person.track_id, piv_id = vehicle.track_id, t = frame.t, "collision risk alert");
                            self.bus.publish(alert);
                            published += 1;
                        }
                    }
                }
            }
            ActiveMonitor::Ppe(monitor) => {
                for view in ppe_views(&frame.detections) {
                    if let Some(violations) = monitor.update(&view, frame.t) {
                        let mut alert = Alert::new(
                            &self.config.camera_id,
                            ModuleKind::Ppe,
                            1,
                            frame.t,
                        );
                        alert.track_id = Some(view.track_id);
                        alert.violations = Some(violations);
                        info!(camera = %self.config.camera_id, track_id = view.track_id, t = frame.t, "ppe alert");
                        self.bus.publish(alert);
                        published += 1;
                    }
                }
            }
        }

        if let Some(ttl) = self.config.track_ttl_seconds {
            self.evict_stale(frame.t - ttl);
        }

        published
    }

    /// Hand accumulated alerts to the external sink.
    pub fn drain_alerts(&mut self) -> Vec<Alert> {
        self.bus.drain()
    }

    pub fn pending_alerts(&self) -> usize {
        self.bus.pending_count()
    }

    fn evict_stale(&mut self, cutoff: f64) {
        match &mut self.active {
            ActiveMonitor::Intrusion(_) => {}
            ActiveMonitor::Throwing(monitor) => monitor.evict_stale(cutoff),
            ActiveMonitor::Vehicle(monitor) => monitor.evict_stale(cutoff),
            ActiveMonitor::Collision(monitor) => monitor.evict_stale(cutoff),
            ActiveMonitor::Ppe(monitor) => monitor.evict_stale(cutoff),
        }
    }
}

// Per-module projections. Detections missing a required field are skipped
// silently: that is an upstream data gap, not an error.

fn person_views(detections: &[Detection]) -> Vec<PersonView> {
    detections
        .iter()
        .filter(|d| d.cls == "person")
        .filter_map(|d| {
            d.bottom_center.map(|bc| PersonView {
                track_id: d.track_id,
                bottom_center: bc.into(),
            })
        })
        .collect()
}

fn throwing_views(detections: &[Detection]) -> Vec<ThrowingView> {
    detections
        .iter()
        .filter(|d| d.cls == "throwing" || d.cls == "normal")
        .map(|d| ThrowingView {
            track_id: d.track_id,
            label: u8::from(d.cls == "throwing"),
        })
        .collect()
}

fn vehicle_views(detections: &[Detection], vehicle_classes: &[String]) -> Vec<VehicleView> {
    detections
        .iter()
        .filter(|d| vehicle_classes.iter().any(|c| *c == d.cls))
        .filter_map(|d| {
            d.centroid.map(|c| VehicleView {
                track_id: d.track_id,
                centroid: c.into(),
                speed_kmh: d.speed_kmh,
                plane_hint: d.plane_hint,
            })
        })
        .collect()
}

fn ppe_views(detections: &[Detection]) -> Vec<PpeView> {
    detections
        .iter()
        .filter_map(|d| {
            d.missing.as_ref().map(|missing| PpeView {
                track_id: d.track_id,
                missing: missing.clone(),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Point;

    fn config() -> Config {
        let mut cfg = Config::with_defaults("cam-test");
        cfg.intrusion.roi = vec![
            Point::new(0.0, 0.0),
            Point::new(100.0, 0.0),
            Point::new(100.0, 100.0),
            Point::new(0.0, 100.0),
        ];
        cfg.collision.buffer_frames = 3;
        cfg.ppe.persistence_frames = 2;
        cfg
    }

    fn person(track_id: i64, x: f64, y: f64) -> Detection {
        Detection {
            track_id,
            cls: "person".to_string(),
            conf: 0.9,
            bbox: [x - 10.0, y - 40.0, x + 10.0, y],
            bottom_center: Some([x, y]),
            centroid: None,
            missing: None,
            speed_kmh: None,
            plane_hint: None,
        }
    }

    fn car(track_id: i64, x: f64, y: f64, speed: Option<f64>) -> Detection {
        Detection {
            track_id,
            cls: "car".to_string(),
            conf: 0.9,
            bbox: [x - 20.0, y - 20.0, x + 20.0, y + 20.0],
            bottom_center: None,
            centroid: Some([x, y]),
            missing: None,
            speed_kmh: speed,
            plane_hint: None,
        }
    }

    fn frame(t: f64, detections: Vec<Detection>) -> FrameData {
        FrameData { t, detections }
    }

    #[test]
    fn test_near_duplicate_frames_dropped() {
        let mut d = FrameDispatcher::new(config(), ModuleKind::Vehicle);
        assert_eq!(d.process_frame(&frame(1.0, vec![car(1, 0.0, 0.0, Some(90.0))])), 1);
        // Re-delivery of the same frame within 0.01 s: no alert, no state.
        assert_eq!(d.process_frame(&frame(1.005, vec![car(2, 0.0, 0.0, Some(90.0))])), 0);
        assert_eq!(d.process_frame(&frame(1.02, vec![car(2, 0.0, 0.0, Some(90.0))])), 1);
    }

    #[test]
    fn test_intrusion_flow_start_and_end() {
        // Route module logs through the test harness writer.
        let _ = tracing_subscriber::fmt().with_test_writer().try_init();
        let mut d = FrameDispatcher::new(config(), ModuleKind::Intrusion);
        // Three frames inside the ROI reach the threshold.
        for i in 0..3 {
            d.process_frame(&frame(i as f64 * 0.04, vec![person(1, 50.0, 50.0)]));
        }
        // Drain the window with empty frames until the end alert fires.
        for i in 3..8 {
            d.process_frame(&frame(i as f64 * 0.04, vec![]));
        }

        let alerts = d.drain_alerts();
        assert_eq!(alerts.len(), 2);
        assert_eq!(alerts[0].state, 1);
        assert_eq!(alerts[0].module, ModuleKind::Intrusion);
        assert_eq!(alerts[0].camera_id, "cam-test");
        assert_eq!(alerts[1].state, 0);
    }

    #[test]
    fn test_missing_fields_skipped_silently() {
        let mut d = FrameDispatcher::new(config(), ModuleKind::Intrusion);
        let mut no_feet = person(1, 50.0, 50.0);
        no_feet.bottom_center = None;
        // Frames with an unusable detection count as "nobody in zone".
        for i in 0..10 {
            d.process_frame(&frame(i as f64 * 0.04, vec![no_feet.clone()]));
        }
        assert_eq!(d.pending_alerts(), 0);
    }

    #[test]
    fn test_collision_cross_product_pairs() {
        let mut d = FrameDispatcher::new(config(), ModuleKind::Collision);
        // One person near two vehicles; both pairs fill in lockstep.
        for i in 0..3 {
            d.process_frame(&frame(
                i as f64 * 0.04,
                vec![
                    person(1, 0.0, 0.0),
                    car(10, 30.0, 0.0, None),
                    car(11, 0.0, 40.0, None),
                ],
            ));
        }
        let alerts = d.drain_alerts();
        assert_eq!(alerts.len(), 2);
        assert!(alerts.iter().all(|a| a.human_id == Some(1)));
        let piv_ids: Vec<_> = alerts.iter().map(|a| a.piv_id.unwrap()).collect();
        assert!(piv_ids.contains(&10) && piv_ids.contains(&11));
    }

    #[test]
    fn test_frame_alert_count_survives_bus_overflow() {
        let mut cfg = config();
        cfg.max_pending_alerts = 1;
        let mut d = FrameDispatcher::new(cfg, ModuleKind::Collision);
        // Both pairs fire on the third frame; the one-slot bus drops the
        // older alert but the per-frame count still reports both.
        for i in 0..2 {
            d.process_frame(&frame(
                i as f64 * 0.04,
                vec![
                    person(1, 0.0, 0.0),
                    car(10, 30.0, 0.0, None),
                    car(11, 0.0, 40.0, None),
                ],
            ));
        }
        let published = d.process_frame(&frame(
            0.08,
            vec![
                person(1, 0.0, 0.0),
                car(10, 30.0, 0.0, None),
                car(11, 0.0, 40.0, None),
            ],
        ));
        assert_eq!(published, 2);
        assert_eq!(d.drain_alerts().len(), 1);
    }

    #[test]
    fn test_ppe_alert_carries_violations() {
        let mut d = FrameDispatcher::new(config(), ModuleKind::Ppe);
        let mut worker = person(3, 10.0, 10.0);
        worker.missing = Some(vec!["helmet".to_string()]);
        d.process_frame(&frame(0.0, vec![worker.clone()]));
        d.process_frame(&frame(0.04, vec![worker]));

        let alerts = d.drain_alerts();
        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].track_id, Some(3));
        assert_eq!(alerts[0].violations, Some(vec!["helmet".to_string()]));
    }

    #[test]
    fn test_module_switch_discards_state() {
        let mut d = FrameDispatcher::new(config(), ModuleKind::Intrusion);
        for i in 0..2 {
            d.process_frame(&frame(i as f64 * 0.04, vec![person(1, 50.0, 50.0)]));
        }
        // Two trues banked; switching away and back clears the window.
        d.set_module(ModuleKind::Ppe);
        d.set_module(ModuleKind::Intrusion);
        assert_eq!(d.active_module(), ModuleKind::Intrusion);

        d.process_frame(&frame(0.2, vec![person(1, 50.0, 50.0)]));
        assert_eq!(d.pending_alerts(), 0);

        d.process_frame(&frame(0.24, vec![person(1, 50.0, 50.0)]));
        d.process_frame(&frame(0.28, vec![person(1, 50.0, 50.0)]));
        assert_eq!(d.pending_alerts(), 1);
    }

    #[test]
    fn test_unknown_classes_ignored_by_vehicle_module() {
        let mut d = FrameDispatcher::new(config(), ModuleKind::Vehicle);
        let mut bike = car(1, 0.0, 0.0, Some(99.0));
        bike.cls = "bicycle".to_string();
        d.process_frame(&frame(0.0, vec![bike]));
        assert_eq!(d.pending_alerts(), 0);
    }

    #[test]
    fn test_stale_tracks_evicted_when_ttl_set() {
        let mut cfg = config();
        cfg.track_ttl_seconds = Some(5.0);
        let mut d = FrameDispatcher::new(cfg, ModuleKind::Ppe);

        let mut worker = person(3, 10.0, 10.0);
        worker.missing = Some(vec!["helmet".to_string()]);
        d.process_frame(&frame(0.0, vec![worker.clone()]));
        // Track 3 idle past the TTL; its one banked violation frame is
        // gone, so two fresh frames are needed again.
        d.process_frame(&frame(10.0, vec![]));
        d.process_frame(&frame(10.04, vec![worker.clone()]));
        assert_eq!(d.pending_alerts(), 0);
        d.process_frame(&frame(10.08, vec![worker]));
        assert_eq!(d.pending_alerts(), 1);
    }
}
