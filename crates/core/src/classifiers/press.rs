use crate::TriggerType;

/// Emits `long_press` once when a press has been held for the minimum duration.
#[derive(Debug, Clone)]
pub struct LongPressDetector {
    min_hold_ms: u64,
    pressed_at: Option<u64>,
    fired: bool,
}

impl Default for LongPressDetector {
    fn default() -> Self {
        Self::new(500)
    }
}

impl LongPressDetector {
    pub fn new(min_hold_ms: u64) -> Self {
        Self {
            min_hold_ms,
            pressed_at: None,
            fired: false,
        }
    }

    pub fn press_began(&mut self, at_ms: u64) {
        self.pressed_at = Some(at_ms);
        self.fired = false;
    }

    /// Checks the running press. Fires at most once per physical press.
    pub fn poll(&mut self, at_ms: u64) -> Option<TriggerType> {
        let started = self.pressed_at?;
        if self.fired || at_ms.saturating_sub(started) < self.min_hold_ms {
            return None;
        }
        self.fired = true;
        Some(TriggerType::LongPress)
    }

    /// Ends the press. A release after the threshold that was never polled
    /// still counts as a long press.
    pub fn press_ended(&mut self, at_ms: u64) -> Option<TriggerType> {
        let emitted = self.poll(at_ms);
        self.cancel();
        emitted
    }

    pub fn cancel(&mut self) {
        self.pressed_at = None;
        self.fired = false;
    }

    pub fn is_pressed(&self) -> bool {
        self.pressed_at.is_some()
    }
}
