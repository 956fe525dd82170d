use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
};

use imagic_core::{
    EngineHandle, HandoffId, HostUi, ImagicError, MediaBackend, MediaRequest, Result, Slot, Stage,
};

#[derive(Debug, Default)]
struct Slots {
    loaded: HashMap<Slot, (HandoffId, String)>,
    visible: Option<Slot>,
    fail_next: Option<String>,
}

/// Media backend without a screen. Priming "decodes" instantly and reports
/// ready through the control queue, like a real backend would from its own
/// thread.
#[derive(Debug)]
pub struct HeadlessBackend {
    handle: EngineHandle,
    slots: Arc<Mutex<Slots>>,
}

/// Script-side view of the headless backend.
#[derive(Debug, Clone)]
pub struct PlaybackProbe {
    slots: Arc<Mutex<Slots>>,
}

impl HeadlessBackend {
    pub fn new(handle: EngineHandle) -> (Self, PlaybackProbe) {
        let slots = Arc::new(Mutex::new(Slots::default()));
        (
            Self {
                handle,
                slots: slots.clone(),
            },
            PlaybackProbe { slots },
        )
    }

    fn with_slots<T>(&self, f: impl FnOnce(&mut Slots) -> T) -> Result<T> {
        let mut slots = self
            .slots
            .lock()
            .map_err(|_| ImagicError::msg("headless slots have been poisoned"))?;
        Ok(f(&mut slots))
    }
}

impl MediaBackend for HeadlessBackend {
    fn prime(&mut self, slot: Slot, request: &MediaRequest, handoff: HandoffId) -> Result<()> {
        let failure = self.with_slots(|slots| {
            slots
                .loaded
                .insert(slot, (handoff, request.locator.to_string()));
            slots.fail_next.take()
        })?;

        tracing::info!(?slot, %handoff, locator = %request.locator, "priming");
        match failure {
            Some(reason) => self.handle.media_failed(handoff, reason),
            None => self.handle.media_ready(handoff),
        }
    }

    fn present(&mut self, show: Slot, retire: Option<Slot>) {
        let result = self.with_slots(|slots| {
            if let Some(retired) = retire {
                slots.loaded.remove(&retired);
            }
            slots.visible = Some(show);
            slots.loaded.get(&show).map(|(_, locator)| locator.clone())
        });
        match result {
            Ok(Some(locator)) => tracing::info!(?show, ?retire, %locator, "presenting"),
            Ok(None) => {}
            Err(err) => tracing::warn!(?show, error = %err, "failed to present slot"),
        }
    }

    fn restart(&mut self, slot: Slot) {
        tracing::info!(?slot, "looping");
    }

    fn release(&mut self, slot: Slot) {
        let result = self.with_slots(|slots| {
            slots.loaded.remove(&slot);
            if slots.visible == Some(slot) {
                slots.visible = None;
            }
        });
        if let Err(err) = result {
            tracing::warn!(?slot, error = %err, "failed to release slot");
        }
    }
}

impl PlaybackProbe {
    /// Handoff of the media currently on screen.
    pub fn visible_handoff(&self) -> Option<HandoffId> {
        let slots = self.slots.lock().ok()?;
        let visible = slots.visible?;
        slots.loaded.get(&visible).map(|(handoff, _)| *handoff)
    }

    /// Makes the next prime report a failure instead of readiness.
    pub fn fail_next(&self, reason: impl Into<String>) {
        if let Ok(mut slots) = self.slots.lock() {
            slots.fail_next = Some(reason.into());
        }
    }
}

/// Host UI that logs to the console.
#[derive(Debug, Default)]
pub struct ConsoleHost;

impl HostUi for ConsoleHost {
    fn stage_ready(&mut self, stage: &Stage) {
        tracing::info!(
            stage = %stage.id,
            clock = stage.show_clock,
            description = %stage.description,
            "stage on screen"
        );
    }

    fn media_failed(&mut self, stage_id: &str, error: &ImagicError) {
        tracing::error!(stage = stage_id, %error, "stage media failed");
    }

    fn stage_cleared(&mut self) {
        tracing::info!("no stage loaded");
    }
}
