use serde::{Deserialize, Serialize};

/// A 2D point in pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

impl From<[f64; 2]> for Point {
    fn from(p: [f64; 2]) -> Self {
        Self { x: p[0], y: p[1] }
    }
}

/// Axis-aligned bounding box as `[x1, y1, x2, y2]`.
pub type BBox = [f64; 4];

/// The five surveillance modules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModuleKind {
    Intrusion,
    Throwing,
    Vehicle,
    Collision,
    Ppe,
}

impl std::fmt::Display for ModuleKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ModuleKind::Intrusion => "intrusion",
            ModuleKind::Throwing => "throwing",
            ModuleKind::Vehicle => "vehicle",
            ModuleKind::Collision => "collision",
            ModuleKind::Ppe => "ppe",
        };
        write!(f, "{name}")
    }
}

/// One tracked object as delivered by the upstream detector/tracker.
///
/// Track identity and class labels arrive already assigned. Optional fields
/// are only populated for the modules that need them; a detection missing a
/// field required by the active module is skipped, not an error.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Detection {
    pub track_id: i64,
    pub cls: String,
    #[serde(default)]
    pub conf: f64,
    pub bbox: BBox,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bottom_center: Option<[f64; 2]>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub centroid: Option<[f64; 2]>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub missing: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub speed_kmh: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub plane_hint: Option<i32>,
}

/// One frame's worth of detections, timestamped in seconds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FrameData {
    pub t: f64,
    pub detections: Vec<Detection>,
}

impl FrameData {
    /// Parse a frame from the loader's JSON wire shape.
    pub fn from_json(raw: &str) -> anyhow::Result<Self> {
        Ok(serde_json::from_str(raw)?)
    }
}

/// Per-module projections of a [`Detection`], built by the dispatcher.
/// Each module sees only the fields it consumes.
#[derive(Debug, Clone, Copy)]
pub struct PersonView {
    pub track_id: i64,
    pub bottom_center: Point,
}

#[derive(Debug, Clone, Copy)]
pub struct ThrowingView {
    pub track_id: i64,
    /// 1 = throwing, 0 = normal.
    pub label: u8,
}

#[derive(Debug, Clone, Copy)]
pub struct VehicleView {
    pub track_id: i64,
    pub centroid: Point,
    pub speed_kmh: Option<f64>,
    pub plane_hint: Option<i32>,
}

#[derive(Debug, Clone)]
pub struct PpeView {
    pub track_id: i64,
    pub missing: Vec<String>,
}

/// A discrete alert event, handed to the external sink on emission.
///
/// `state` is 1 for "violation started" and 0 for "violation ended".
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Alert {
    pub camera_id: String,
    pub module: ModuleKind,
    pub state: u8,
    pub detected_time: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub track_id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vehicle_id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub speed: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub human_id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub piv_id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub violations: Option<Vec<String>>,
}

impl Alert {
    /// JSON payload for the external sink; unset optional fields are
    /// omitted entirely.
    pub fn to_json(&self) -> anyhow::Result<serde_json::Value> {
        Ok(serde_json::to_value(self)?)
    }

    pub fn new(camera_id: &str, module: ModuleKind, state: u8, detected_time: f64) -> Self {
        Self {
            camera_id: camera_id.to_string(),
            module,
            state,
            detected_time,
            track_id: None,
            vehicle_id: None,
            speed: None,
            human_id: None,
            piv_id: None,
            violations: None,
        }
    }
}

/// Full configuration for one camera's alert core.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub camera_id: String,
    #[serde(default)]
    pub intrusion: IntrusionConfig,
    #[serde(default)]
    pub throwing: ThrowingConfig,
    #[serde(default)]
    pub vehicle: VehicleConfig,
    #[serde(default)]
    pub collision: CollisionConfig,
    #[serde(default)]
    pub ppe: PpeConfig,
    /// Evict per-track state not updated for this many seconds. Off when
    /// unset; the observed reference system never evicts.
    #[serde(default)]
    pub track_ttl_seconds: Option<f64>,
    /// Bound on alerts queued in the bus before the oldest is dropped.
    #[serde(default = "default_max_pending_alerts")]
    pub max_pending_alerts: usize,
}

fn default_max_pending_alerts() -> usize {
    256
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IntrusionConfig {
    /// Restricted-zone polygon. Fewer than 3 vertices disables the zone.
    #[serde(default)]
    pub roi: Vec<Point>,
    #[serde(default = "default_intrusion_buffer_size")]
    pub buffer_size: usize,
    #[serde(default = "default_intrusion_threshold")]
    pub threshold: usize,
}

fn default_intrusion_buffer_size() -> usize {
    5
}

fn default_intrusion_threshold() -> usize {
    3
}

impl Default for IntrusionConfig {
    fn default() -> Self {
        Self {
            roi: Vec::new(),
            buffer_size: default_intrusion_buffer_size(),
            threshold: default_intrusion_threshold(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ThrowingConfig {
    #[serde(default = "default_smoothing_window")]
    pub smoothing_window: usize,
    #[serde(default = "default_consecutive_threshold")]
    pub consecutive_threshold: u32,
}

fn default_smoothing_window() -> usize {
    3
}

fn default_consecutive_threshold() -> u32 {
    10
}

impl Default for ThrowingConfig {
    fn default() -> Self {
        Self {
            smoothing_window: default_smoothing_window(),
            consecutive_threshold: default_consecutive_threshold(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VehicleConfig {
    #[serde(default = "default_speed_threshold")]
    pub speed_threshold_kmh: f64,
    #[serde(default = "default_meters_per_pixel")]
    pub meters_per_pixel: f64,
    #[serde(default = "default_vehicle_cooldown")]
    pub cooldown_seconds: f64,
    #[serde(default = "default_fps")]
    pub fps: f64,
    #[serde(default = "default_process_noise")]
    pub process_noise: f64,
    #[serde(default = "default_measurement_noise")]
    pub measurement_noise: f64,
    #[serde(default = "default_vehicle_classes")]
    pub vehicle_classes: Vec<String>,
}

fn default_speed_threshold() -> f64 {
    30.0
}

fn default_meters_per_pixel() -> f64 {
    0.05
}

fn default_vehicle_cooldown() -> f64 {
    30.0
}

fn default_fps() -> f64 {
    25.0
}

fn default_process_noise() -> f64 {
    0.5
}

fn default_measurement_noise() -> f64 {
    2.0
}

fn default_vehicle_classes() -> Vec<String> {
    ["car", "truck", "bus", "motorcycle", "forklift"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

impl Default for VehicleConfig {
    fn default() -> Self {
        Self {
            speed_threshold_kmh: default_speed_threshold(),
            meters_per_pixel: default_meters_per_pixel(),
            cooldown_seconds: default_vehicle_cooldown(),
            fps: default_fps(),
            process_noise: default_process_noise(),
            measurement_noise: default_measurement_noise(),
            vehicle_classes: default_vehicle_classes(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CollisionConfig {
    #[serde(default = "default_collision_distance")]
    pub distance_threshold_px: f64,
    #[serde(default = "default_collision_buffer")]
    pub buffer_frames: usize,
    #[serde(default = "default_collision_cooldown")]
    pub cooldown_seconds: f64,
}

fn default_collision_distance() -> f64 {
    100.0
}

fn default_collision_buffer() -> usize {
    5
}

fn default_collision_cooldown() -> f64 {
    30.0
}

impl Default for CollisionConfig {
    fn default() -> Self {
        Self {
            distance_threshold_px: default_collision_distance(),
            buffer_frames: default_collision_buffer(),
            cooldown_seconds: default_collision_cooldown(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PpeConfig {
    #[serde(default = "default_ppe_persistence")]
    pub persistence_frames: u32,
    #[serde(default = "default_ppe_cooldown")]
    pub cooldown_seconds: f64,
}

fn default_ppe_persistence() -> u32 {
    15
}

fn default_ppe_cooldown() -> f64 {
    60.0
}

impl Default for PpeConfig {
    fn default() -> Self {
        Self {
            persistence_frames: default_ppe_persistence(),
            cooldown_seconds: default_ppe_cooldown(),
        }
    }
}
