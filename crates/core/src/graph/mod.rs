//! Validated, immutable stage graph.
//!
//! A [`StageGraph`] is built from a persisted [`TrickConfig`] by
//! [`StageGraph::load`]. Loading is the only place structural correctness is
//! checked; everything downstream trusts a loaded graph. Edits never mutate a
//! graph in place: the editor produces a new [`TrickConfig`], loads it, and the
//! engine swaps the whole generation.

use std::collections::{BTreeSet, HashMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::{
    config::{Language, StageRecord, TrickConfig, TriggerRecord},
    error::ValidationKind,
    ImagicError, Result,
};

/// Target id that terminates the trick instead of entering a stage.
pub const EXIT_SENTINEL: &str = "exit";

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum TriggerType {
    /// Natural end of a one-shot stage's media.
    #[serde(rename = "auto")]
    Auto,
    #[serde(rename = "tap_1", alias = "tap1")]
    Tap1,
    #[serde(rename = "tap_2", alias = "tap2")]
    Tap2,
    #[serde(rename = "tap_3", alias = "tap3")]
    Tap3,
    #[serde(rename = "long_press")]
    LongPress,
    #[serde(rename = "blow")]
    Blow,
    #[serde(rename = "circle")]
    Circle,
    #[serde(rename = "shake")]
    Shake,
    #[serde(rename = "proximity")]
    Proximity,
    /// Placeholder used by the editor. Never produced by a classifier.
    #[serde(rename = "none")]
    None,
}

impl TriggerType {
    pub const ALL: [TriggerType; 10] = [
        TriggerType::Auto,
        TriggerType::Tap1,
        TriggerType::Tap2,
        TriggerType::Tap3,
        TriggerType::LongPress,
        TriggerType::Blow,
        TriggerType::Circle,
        TriggerType::Shake,
        TriggerType::Proximity,
        TriggerType::None,
    ];

    /// Maps a resolved tap burst count to its trigger.
    pub fn tap(count: u32) -> Option<Self> {
        match count {
            1 => Some(Self::Tap1),
            2 => Some(Self::Tap2),
            3 => Some(Self::Tap3),
            _ => None,
        }
    }

    /// Whether a classifier has to run for this trigger to ever fire.
    pub fn needs_classifier(self) -> bool {
        !matches!(self, Self::Auto | Self::None)
    }

    /// Persisted name, e.g. `tap_3`.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Auto => "auto",
            Self::Tap1 => "tap_1",
            Self::Tap2 => "tap_2",
            Self::Tap3 => "tap_3",
            Self::LongPress => "long_press",
            Self::Blow => "blow",
            Self::Circle => "circle",
            Self::Shake => "shake",
            Self::Proximity => "proximity",
            Self::None => "none",
        }
    }
}

impl std::fmt::Display for TriggerType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MediaKind {
    Image,
    #[default]
    Video,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlaybackMode {
    #[default]
    OneShot,
    Loop,
}

/// Where a trigger leads.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
    Stage(String),
    Exit,
}

impl Target {
    fn parse(raw: &str) -> Self {
        if raw == EXIT_SENTINEL {
            Self::Exit
        } else {
            Self::Stage(raw.to_string())
        }
    }

    fn as_str(&self) -> &str {
        match self {
            Self::Stage(id) => id,
            Self::Exit => EXIT_SENTINEL,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Trigger {
    pub id: String,
    pub kind: TriggerType,
    pub target: Target,
    /// Free-form editor annotation, carried through untouched.
    pub action: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Stage {
    pub id: String,
    pub media_kind: MediaKind,
    pub source: String,
    pub playback_mode: PlaybackMode,
    pub triggers: Vec<Trigger>,
    pub show_clock: bool,
    pub description: String,
}

impl Stage {
    /// First trigger of the given type in declaration order.
    pub fn trigger_for(&self, kind: TriggerType) -> Option<&Trigger> {
        self.triggers.iter().find(|trigger| trigger.kind == kind)
    }

    /// Trigger types that need a running classifier while this stage is current.
    pub fn monitored_types(&self) -> BTreeSet<TriggerType> {
        self.triggers
            .iter()
            .map(|trigger| trigger.kind)
            .filter(|kind| kind.needs_classifier())
            .collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WarningKind {
    /// An earlier trigger of the same type on the same stage always wins.
    UnreachableTrigger,
    /// Triggers of type `none` never fire.
    InertTrigger,
    /// A stage named like the exit sentinel can never be entered.
    ReservedStageId,
}

/// Non-fatal findings collected while loading.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GraphWarning {
    pub kind: WarningKind,
    pub offending_id: String,
}

#[derive(Debug, Clone)]
pub struct StageGraph {
    stages: Vec<Stage>,
    index: HashMap<String, usize>,
    blow_threshold: f32,
    language: Language,
    warnings: Vec<GraphWarning>,
}

impl Default for StageGraph {
    fn default() -> Self {
        Self::empty()
    }
}

impl StageGraph {
    /// Graph with no stages. The engine idles in `no-stage` on it.
    pub fn empty() -> Self {
        Self {
            stages: Vec::new(),
            index: HashMap::new(),
            blow_threshold: crate::config::DEFAULT_BLOW_THRESHOLD as f32,
            language: Language::default(),
            warnings: Vec::new(),
        }
    }

    /// Validates a persisted config and builds the graph from it.
    pub fn load(config: &TrickConfig) -> Result<Self> {
        // Checked after narrowing: finite f64 values can still overflow f32.
        let threshold = config.blow_threshold as f32;
        if !threshold.is_finite() || threshold > 0.0 {
            return Err(ImagicError::validation(
                ValidationKind::InvalidBlowThreshold,
                config.blow_threshold.to_string(),
            ));
        }

        let mut index = HashMap::with_capacity(config.stages.len());
        for (position, stage) in config.stages.iter().enumerate() {
            if index.insert(stage.id.clone(), position).is_some() {
                return Err(ImagicError::validation(
                    ValidationKind::DuplicateStageId,
                    &stage.id,
                ));
            }
        }

        let mut trigger_ids = HashSet::new();
        let mut warnings = Vec::new();
        let mut stages = Vec::with_capacity(config.stages.len());

        for record in &config.stages {
            if record.id == EXIT_SENTINEL {
                warnings.push(GraphWarning {
                    kind: WarningKind::ReservedStageId,
                    offending_id: record.id.clone(),
                });
            }

            let mut seen_types = HashSet::new();
            let mut triggers = Vec::with_capacity(record.triggers.len());
            for (position, trigger) in record.triggers.iter().enumerate() {
                let id = trigger
                    .id
                    .clone()
                    .unwrap_or_else(|| format!("{}#{position}", record.id));
                if !trigger_ids.insert(id.clone()) {
                    return Err(ImagicError::validation(
                        ValidationKind::DuplicateTriggerId,
                        id,
                    ));
                }

                let target = Target::parse(&trigger.next_stage_id);
                if let Target::Stage(next) = &target {
                    if !index.contains_key(next) {
                        return Err(ImagicError::validation(
                            ValidationKind::DanglingTarget,
                            id,
                        ));
                    }
                }

                if trigger.kind == TriggerType::None {
                    warnings.push(GraphWarning {
                        kind: WarningKind::InertTrigger,
                        offending_id: id.clone(),
                    });
                } else if !seen_types.insert(trigger.kind) {
                    warnings.push(GraphWarning {
                        kind: WarningKind::UnreachableTrigger,
                        offending_id: id.clone(),
                    });
                }

                triggers.push(Trigger {
                    id,
                    kind: trigger.kind,
                    target,
                    action: trigger.action.clone(),
                });
            }

            stages.push(Stage {
                id: record.id.clone(),
                media_kind: record.kind,
                source: record.source.clone(),
                playback_mode: record.mode,
                triggers,
                show_clock: record.show_time,
                description: record.description.clone(),
            });
        }

        for warning in &warnings {
            tracing::warn!(kind = ?warning.kind, id = %warning.offending_id, "stage graph warning");
        }

        Ok(Self {
            stages,
            index,
            blow_threshold: threshold,
            language: config.language,
            warnings,
        })
    }

    /// Converts the graph back into its persisted form.
    pub fn to_config(&self) -> TrickConfig {
        TrickConfig {
            stages: self
                .stages
                .iter()
                .map(|stage| StageRecord {
                    id: stage.id.clone(),
                    kind: stage.media_kind,
                    source: stage.source.clone(),
                    mode: stage.playback_mode,
                    triggers: stage
                        .triggers
                        .iter()
                        .map(|trigger| TriggerRecord {
                            id: Some(trigger.id.clone()),
                            kind: trigger.kind,
                            next_stage_id: trigger.target.as_str().to_string(),
                            action: trigger.action.clone(),
                        })
                        .collect(),
                    description: stage.description.clone(),
                    show_time: stage.show_clock,
                })
                .collect(),
            blow_threshold: f64::from(self.blow_threshold),
            language: self.language,
        }
    }

    /// Looks a stage up by id.
    pub fn stage(&self, id: &str) -> Option<&Stage> {
        self.index.get(id).map(|&position| &self.stages[position])
    }

    /// Entry stage: the first one in declaration order.
    pub fn first_stage(&self) -> Option<&Stage> {
        self.stages.first()
    }

    /// All stages in declaration order.
    pub fn stages(&self) -> &[Stage] {
        &self.stages
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    /// Blow detection threshold in dBFS.
    pub fn blow_threshold(&self) -> f32 {
        self.blow_threshold
    }

    /// Interface language the graph was saved with.
    pub fn language(&self) -> Language {
        self.language
    }

    /// Non-fatal problems found while loading, such as unreachable stages.
    pub fn warnings(&self) -> &[GraphWarning] {
        &self.warnings
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(json: serde_json::Value) -> TrickConfig {
        serde_json::from_value(json).unwrap()
    }

    fn two_stage() -> TrickConfig {
        config(serde_json::json!({
            "stages": [
                { "id": "A", "type": "video", "source": "a.mp4", "mode": "loop",
                  "triggers": [{ "type": "tap_3", "nextStageId": "B" }] },
                { "id": "B", "type": "image", "source": "b.png",
                  "triggers": [{ "type": "auto", "nextStageId": "exit" }] }
            ],
            "blowThreshold": -10.0
        }))
    }

    fn validation_kind(result: Result<StageGraph>) -> (ValidationKind, String) {
        match result {
            Err(ImagicError::Validation { kind, offending_id }) => (kind, offending_id),
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn loads_valid_graph() {
        let graph = StageGraph::load(&two_stage()).unwrap();
        assert_eq!(graph.stages().len(), 2);
        assert_eq!(graph.first_stage().unwrap().id, "A");
        let b = graph.stage("B").unwrap();
        assert_eq!(b.media_kind, MediaKind::Image);
        assert_eq!(b.triggers[0].target, Target::Exit);
        assert_eq!(b.triggers[0].id, "B#0");
        assert!(graph.warnings().is_empty());
    }

    #[test]
    fn rejects_dangling_target() {
        let mut raw = two_stage();
        raw.stages[0].triggers[0].next_stage_id = "C".into();
        let (kind, offending) = validation_kind(StageGraph::load(&raw));
        assert_eq!(kind, ValidationKind::DanglingTarget);
        assert_eq!(offending, "A#0");
    }

    #[test]
    fn rejects_duplicate_ids() {
        let mut raw = two_stage();
        raw.stages[1].id = "A".into();
        let (kind, _) = validation_kind(StageGraph::load(&raw));
        assert_eq!(kind, ValidationKind::DuplicateStageId);

        let mut raw = two_stage();
        raw.stages[0].triggers[0].id = Some("t".into());
        raw.stages[1].triggers[0].id = Some("t".into());
        let (kind, offending) = validation_kind(StageGraph::load(&raw));
        assert_eq!(kind, ValidationKind::DuplicateTriggerId);
        assert_eq!(offending, "t");
    }

    #[test]
    fn rejects_positive_or_nan_threshold() {
        let mut raw = two_stage();
        raw.blow_threshold = 3.0;
        assert_eq!(
            validation_kind(StageGraph::load(&raw)).0,
            ValidationKind::InvalidBlowThreshold
        );
        raw.blow_threshold = f64::NAN;
        assert_eq!(
            validation_kind(StageGraph::load(&raw)).0,
            ValidationKind::InvalidBlowThreshold
        );
        raw.blow_threshold = -1e300;
        assert_eq!(
            validation_kind(StageGraph::load(&raw)).0,
            ValidationKind::InvalidBlowThreshold
        );
        raw.blow_threshold = 0.0;
        assert!(StageGraph::load(&raw).is_ok());
    }

    #[test]
    fn duplicate_trigger_types_only_warn() {
        let raw = config(serde_json::json!({
            "stages": [
                { "id": "A", "triggers": [
                    { "type": "tap_1", "nextStageId": "B" },
                    { "type": "tap_1", "nextStageId": "C" },
                    { "type": "none", "nextStageId": "exit" }
                ] },
                { "id": "B" },
                { "id": "C" }
            ]
        }));
        let graph = StageGraph::load(&raw).unwrap();
        let kinds: Vec<_> = graph.warnings().iter().map(|w| w.kind).collect();
        assert_eq!(
            kinds,
            vec![WarningKind::UnreachableTrigger, WarningKind::InertTrigger]
        );
        let first = graph.stage("A").unwrap().trigger_for(TriggerType::Tap1).unwrap();
        assert_eq!(first.target, Target::Stage("B".into()));
    }

    #[test]
    fn monitored_types_skip_auto_and_none() {
        let raw = config(serde_json::json!({
            "stages": [{ "id": "A", "triggers": [
                { "type": "auto", "nextStageId": "A" },
                { "type": "blow", "nextStageId": "A" },
                { "type": "none", "nextStageId": "A" },
                { "type": "proximity", "nextStageId": "exit" }
            ] }]
        }));
        let graph = StageGraph::load(&raw).unwrap();
        let monitored: Vec<_> = graph.stage("A").unwrap().monitored_types().into_iter().collect();
        assert_eq!(monitored, vec![TriggerType::Blow, TriggerType::Proximity]);
    }

    #[test]
    fn converts_back_to_config() {
        let graph = StageGraph::load(&two_stage()).unwrap();
        let saved = graph.to_config();
        assert_eq!(saved.stages[1].triggers[0].next_stage_id, EXIT_SENTINEL);
        assert_eq!(saved.stages[0].triggers[0].id.as_deref(), Some("A#0"));
        assert!(StageGraph::load(&saved).is_ok());
    }
}
