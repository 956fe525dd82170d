use std::{
    io::ErrorKind,
    path::{Path, PathBuf},
    sync::Mutex,
};

use serde::{Deserialize, Serialize};

use crate::{
    graph::{MediaKind, PlaybackMode, TriggerType},
    ImagicError, Result,
};

pub const CONFIG_FILE_NAME: &str = "magic_config.json";
pub const DEFAULT_BLOW_THRESHOLD: f64 = -10.0;

/// Interface language of the settings surface. Only persisted here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Language {
    #[default]
    English,
    #[serde(rename = "中文")]
    Chinese,
    #[serde(rename = "日本語")]
    Japanese,
    #[serde(rename = "Français")]
    French,
    #[serde(rename = "Deutsch")]
    German,
    #[serde(rename = "Español")]
    Spanish,
}

/// Persisted trick configuration as it appears on disk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrickConfig {
    #[serde(default)]
    pub stages: Vec<StageRecord>,
    #[serde(default = "default_blow_threshold")]
    pub blow_threshold: f64,
    #[serde(default)]
    pub language: Language,
}

impl Default for TrickConfig {
    fn default() -> Self {
        Self {
            stages: Vec::new(),
            blow_threshold: DEFAULT_BLOW_THRESHOLD,
            language: Language::default(),
        }
    }
}

fn default_blow_threshold() -> f64 {
    DEFAULT_BLOW_THRESHOLD
}

impl TrickConfig {
    /// Replaces the stage with the same id, or appends it.
    pub fn upsert_stage(&mut self, stage: StageRecord) {
        match self.stages.iter_mut().find(|s| s.id == stage.id) {
            Some(slot) => *slot = stage,
            None => self.stages.push(stage),
        }
    }

    /// Removes a stage by id. Triggers pointing at it are left alone and will
    /// fail validation until they are retargeted.
    pub fn remove_stage(&mut self, id: &str) -> Option<StageRecord> {
        let index = self.stages.iter().position(|s| s.id == id)?;
        Some(self.stages.remove(index))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StageRecord {
    pub id: String,
    #[serde(rename = "type", default)]
    pub kind: MediaKind,
    #[serde(default)]
    pub source: String,
    #[serde(default)]
    pub mode: PlaybackMode,
    #[serde(default)]
    pub triggers: Vec<TriggerRecord>,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub show_time: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TriggerRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(rename = "type")]
    pub kind: TriggerType,
    pub next_stage_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action: Option<String>,
}

impl TriggerRecord {
    pub fn new(kind: TriggerType, next_stage_id: impl Into<String>) -> Self {
        Self {
            id: None,
            kind,
            next_stage_id: next_stage_id.into(),
            action: None,
        }
    }
}

/// Persistence collaborator for the trick config.
pub trait ConfigStore {
    /// Returns `Ok(None)` when nothing has been saved yet.
    fn load(&self) -> Result<Option<TrickConfig>>;

    fn save(&self, config: &TrickConfig) -> Result<()>;

    /// Loads the stored config, falling back to the empty default when the
    /// store is empty, unreadable or corrupt.
    fn load_or_default(&self) -> TrickConfig {
        match self.load() {
            Ok(Some(config)) => config,
            Ok(None) => {
                tracing::info!("no saved config, starting from an empty graph");
                TrickConfig::default()
            }
            Err(err) => {
                tracing::warn!(error = %err, "failed to load config, starting from an empty graph");
                TrickConfig::default()
            }
        }
    }
}

/// Stores the config as pretty-printed JSON in a single file.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Uses [`CONFIG_FILE_NAME`] inside `dir`.
    pub fn in_dir(dir: impl AsRef<Path>) -> Self {
        Self::new(dir.as_ref().join(CONFIG_FILE_NAME))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ConfigStore for JsonFileStore {
    fn load(&self) -> Result<Option<TrickConfig>> {
        let data = match std::fs::read(&self.path) {
            Ok(data) => data,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(ImagicError::ConfigIo(format!("{}: {err}", self.path.display()))),
        };
        serde_json::from_slice(&data)
            .map(Some)
            .map_err(|err| ImagicError::ConfigIo(format!("{}: {err}", self.path.display())))
    }

    fn save(&self, config: &TrickConfig) -> Result<()> {
        let data = serde_json::to_vec_pretty(config)?;
        std::fs::write(&self.path, data)
            .map_err(|err| ImagicError::ConfigIo(format!("{}: {err}", self.path.display())))
    }
}

/// In-process store, mostly useful for tests and previews.
#[derive(Debug, Default)]
pub struct MemoryStore {
    slot: Mutex<Option<TrickConfig>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: TrickConfig) -> Self {
        Self {
            slot: Mutex::new(Some(config)),
        }
    }
}

impl ConfigStore for MemoryStore {
    fn load(&self) -> Result<Option<TrickConfig>> {
        let slot = self
            .slot
            .lock()
            .map_err(|_| ImagicError::ConfigIo("memory store has been poisoned".into()))?;
        Ok(slot.clone())
    }

    fn save(&self, config: &TrickConfig) -> Result<()> {
        let mut slot = self
            .slot
            .lock()
            .map_err(|_| ImagicError::ConfigIo("memory store has been poisoned".into()))?;
        *slot = Some(config.clone());
        Ok(())
    }
}
