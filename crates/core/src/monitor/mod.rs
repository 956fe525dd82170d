use std::{
    collections::BTreeSet,
    sync::{Arc, RwLock},
};

use crate::{audio::AudioMonitor, graph::Stage, TriggerType};

/// Trigger types whose classifiers are currently wanted, readable from
/// producer threads. Only the control sequence writes it.
#[derive(Debug, Clone, Default)]
pub struct ClassifierGates {
    enabled: Arc<RwLock<BTreeSet<TriggerType>>>,
}

impl ClassifierGates {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_enabled(&self, kind: TriggerType) -> bool {
        self.enabled
            .read()
            .map(|enabled| enabled.contains(&kind))
            .unwrap_or(false)
    }

    pub fn snapshot(&self) -> BTreeSet<TriggerType> {
        self.enabled
            .read()
            .map(|enabled| enabled.clone())
            .unwrap_or_default()
    }

    fn replace(&self, kinds: &BTreeSet<TriggerType>) {
        match self.enabled.write() {
            Ok(mut enabled) => *enabled = kinds.clone(),
            Err(_) => tracing::warn!("classifier gates have been poisoned"),
        }
    }
}

/// Hardware side of classifier activation: starts and stops capture.
pub trait SensorControl: Send {
    fn set_enabled(&mut self, kind: TriggerType, enabled: bool);

    fn set_blow_threshold(&mut self, _threshold_db: f32) {}
}

/// For hosts without any capture hardware.
#[derive(Debug, Default)]
pub struct NoSensors;

impl SensorControl for NoSensors {
    fn set_enabled(&mut self, _kind: TriggerType, _enabled: bool) {}
}

/// Default [`SensorControl`]: drives microphone capture. Touch, motion and
/// proximity classifiers only need the gates.
#[derive(Debug, Default)]
pub struct SensorHub {
    audio: Option<AudioMonitor>,
}

impl SensorHub {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_audio(audio: AudioMonitor) -> Self {
        Self { audio: Some(audio) }
    }
}

impl SensorControl for SensorHub {
    fn set_enabled(&mut self, kind: TriggerType, enabled: bool) {
        let Some(audio) = self.audio.as_ref().filter(|_| kind == TriggerType::Blow) else {
            tracing::trace!(%kind, enabled, "classifier gate changed");
            return;
        };
        let result = if enabled { audio.start() } else { audio.stop() };
        if let Err(err) = result {
            tracing::warn!(error = %err, enabled, "failed to switch audio capture");
        }
    }

    fn set_blow_threshold(&mut self, threshold_db: f32) {
        if let Some(audio) = &self.audio {
            if let Err(err) = audio.set_threshold(threshold_db) {
                tracing::warn!(error = %err, "failed to update blow threshold");
            }
        }
    }
}

/// Keeps running classifiers in line with the current stage's trigger table.
pub struct MonitoringCoordinator {
    control: Box<dyn SensorControl>,
    gates: ClassifierGates,
}

impl MonitoringCoordinator {
    pub fn new(control: Box<dyn SensorControl>) -> Self {
        Self {
            control,
            gates: ClassifierGates::new(),
        }
    }

    pub fn gates(&self) -> ClassifierGates {
        self.gates.clone()
    }

    /// Starts what the stage needs and stops what it no longer does.
    /// `None` stops everything.
    pub fn reconcile(&mut self, active: &mut BTreeSet<TriggerType>, stage: Option<&Stage>) {
        let wanted = stage.map(Stage::monitored_types).unwrap_or_default();

        for kind in active.difference(&wanted) {
            self.control.set_enabled(*kind, false);
        }
        for kind in wanted.difference(active) {
            self.control.set_enabled(*kind, true);
        }

        self.gates.replace(&wanted);
        *active = wanted;
    }

    pub fn apply_blow_threshold(&mut self, threshold_db: f32) {
        self.control.set_blow_threshold(threshold_db);
    }
}

impl std::fmt::Debug for MonitoringCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MonitoringCoordinator")
            .field("gates", &self.gates.snapshot())
            .finish()
    }
}
