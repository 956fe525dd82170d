use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::Result;

mod store;

pub use store::{
    ConfigStore, JsonFileStore, Language, MemoryStore, StageRecord, TrickConfig, TriggerRecord,
    CONFIG_FILE_NAME, DEFAULT_BLOW_THRESHOLD,
};

/// Runtime tuning for the classifiers. This is host-side configuration and is
/// separate from the persisted [`TrickConfig`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub audio: AudioConfig,
    pub gestures: GestureConfig,
    pub motion: MotionConfig,
}

impl AppConfig {
    /// Reads tuning overrides from a JSON file. Missing fields keep defaults.
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let data = std::fs::read(path)?;
        Ok(serde_json::from_slice(&data)?)
    }
}

/// Configuration specific to the audio capture path.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AudioConfig {
    pub sample_rate: u32,
    pub block_size: usize,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            sample_rate: 48_000,
            block_size: 1024,
        }
    }
}

/// Thresholds for the touch classifiers.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GestureConfig {
    /// Maximum gap between taps that still counts as the same burst.
    pub tap_window_ms: u64,
    pub long_press_min_ms: u64,
    /// A circle needs strictly more points than this.
    pub circle_min_points: usize,
    pub circle_min_extent: f32,
    pub circle_min_aspect: f32,
    pub circle_max_aspect: f32,
    /// Start/end distance must stay below this fraction of the mean extent.
    pub circle_closure_factor: f32,
}

impl Default for GestureConfig {
    fn default() -> Self {
        Self {
            tap_window_ms: 400,
            long_press_min_ms: 500,
            circle_min_points: 10,
            circle_min_extent: 50.0,
            circle_min_aspect: 0.5,
            circle_max_aspect: 2.0,
            circle_closure_factor: 0.5,
        }
    }
}

/// Accelerometer impulse thresholds, in g.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MotionConfig {
    pub shake_threshold_g: f32,
    /// The shake detector re-arms once the magnitude drops below this.
    pub shake_release_g: f32,
}

impl Default for MotionConfig {
    fn default() -> Self {
        Self {
            shake_threshold_g: 2.5,
            shake_release_g: 1.5,
        }
    }
}
