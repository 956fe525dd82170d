//! Recording collaborators shared by the unit tests.

use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc, Mutex,
};

use crate::{
    assets::MediaRequest,
    engine::{ExitHandler, HostUi},
    graph::Stage,
    media::{HandoffId, MediaBackend, Slot},
    monitor::SensorControl,
    ImagicError, Result, TriggerType,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackendCall {
    Prime {
        slot: Slot,
        stage_id: String,
        handoff: HandoffId,
    },
    Present {
        show: Slot,
        retire: Option<Slot>,
    },
    Restart(Slot),
    Release(Slot),
}

#[derive(Debug, Clone, Default)]
pub struct RecordingBackend {
    calls: Arc<Mutex<Vec<BackendCall>>>,
}

impl RecordingBackend {
    pub fn calls(&self) -> Vec<BackendCall> {
        self.calls.lock().unwrap().clone()
    }

    /// Handoff ids in the order they were primed.
    pub fn primed(&self) -> Vec<(String, HandoffId)> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                BackendCall::Prime {
                    stage_id, handoff, ..
                } => Some((stage_id, handoff)),
                _ => None,
            })
            .collect()
    }

    pub fn last_handoff(&self) -> HandoffId {
        self.primed().last().unwrap().1
    }

    fn push(&self, call: BackendCall) {
        self.calls.lock().unwrap().push(call);
    }
}

impl MediaBackend for RecordingBackend {
    fn prime(&mut self, slot: Slot, request: &MediaRequest, handoff: HandoffId) -> Result<()> {
        self.push(BackendCall::Prime {
            slot,
            stage_id: request.stage_id.clone(),
            handoff,
        });
        Ok(())
    }

    fn present(&mut self, show: Slot, retire: Option<Slot>) {
        self.push(BackendCall::Present { show, retire });
    }

    fn restart(&mut self, slot: Slot) {
        self.push(BackendCall::Restart(slot));
    }

    fn release(&mut self, slot: Slot) {
        self.push(BackendCall::Release(slot));
    }
}

#[derive(Debug, Clone, Default)]
pub struct RecordingExit {
    calls: Arc<AtomicUsize>,
}

impl RecordingExit {
    pub fn count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl ExitHandler for RecordingExit {
    fn exit(&mut self) {
        self.calls.fetch_add(1, Ordering::SeqCst);
    }
}

#[derive(Debug, Clone, Default)]
pub struct RecordingSensors {
    toggles: Arc<Mutex<Vec<(TriggerType, bool)>>>,
    threshold: Arc<Mutex<Option<f32>>>,
}

impl RecordingSensors {
    pub fn toggles(&self) -> Vec<(TriggerType, bool)> {
        self.toggles.lock().unwrap().clone()
    }

    pub fn threshold(&self) -> Option<f32> {
        *self.threshold.lock().unwrap()
    }
}

impl SensorControl for RecordingSensors {
    fn set_enabled(&mut self, kind: TriggerType, enabled: bool) {
        self.toggles.lock().unwrap().push((kind, enabled));
    }

    fn set_blow_threshold(&mut self, threshold_db: f32) {
        *self.threshold.lock().unwrap() = Some(threshold_db);
    }
}

#[derive(Debug, Clone, Default)]
pub struct RecordingHost {
    ready: Arc<Mutex<Vec<String>>>,
    failures: Arc<Mutex<Vec<String>>>,
    cleared: Arc<AtomicUsize>,
}

impl RecordingHost {
    pub fn ready(&self) -> Vec<String> {
        self.ready.lock().unwrap().clone()
    }

    pub fn failures(&self) -> Vec<String> {
        self.failures.lock().unwrap().clone()
    }

    pub fn cleared(&self) -> usize {
        self.cleared.load(Ordering::SeqCst)
    }
}

impl HostUi for RecordingHost {
    fn stage_ready(&mut self, stage: &Stage) {
        self.ready.lock().unwrap().push(stage.id.clone());
    }

    fn media_failed(&mut self, stage_id: &str, _error: &ImagicError) {
        self.failures.lock().unwrap().push(stage_id.to_string());
    }

    fn stage_cleared(&mut self) {
        self.cleared.fetch_add(1, Ordering::SeqCst);
    }
}
