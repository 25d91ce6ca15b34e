use crate::types::Config;
use anyhow::{Context, Result};
use std::fs;
use std::path::Path;

impl Config {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path)
            .with_context(|| format!("failed to read config {}", path.display()))?;
        let config: Config = serde_yaml::from_str(&contents)
            .with_context(|| format!("failed to parse config {}", path.display()))?;
        Ok(config)
    }

    /// Defaults for every threshold, with the given camera id.
    pub fn with_defaults(camera_id: &str) -> Self {
        Self {
            camera_id: camera_id.to_string(),
            intrusion: Default::default(),
            throwing: Default::default(),
            vehicle: Default::default(),
            collision: Default::default(),
            ppe: Default::default(),
            track_ttl_seconds: None,
            max_pending_alerts: 256,
        }
    }
}
