use crate::TriggerType;

/// Counts taps inside a burst window and emits `tap_1`..`tap_3`.
#[derive(Debug, Clone)]
pub struct TapCounter {
    window_ms: u64,
    count: u32,
    last_tap_ms: Option<u64>,
}

impl Default for TapCounter {
    fn default() -> Self {
        Self::new(400)
    }
}

impl TapCounter {
    pub fn new(window_ms: u64) -> Self {
        Self {
            window_ms,
            count: 0,
            last_tap_ms: None,
        }
    }

    /// Registers a tap at `at_ms` and returns the trigger for the running count.
    pub fn tap(&mut self, at_ms: u64) -> Option<TriggerType> {
        let in_burst = self
            .last_tap_ms
            .map(|last| at_ms.saturating_sub(last) < self.window_ms)
            .unwrap_or(false);

        self.count = if in_burst { self.count + 1 } else { 1 };
        self.last_tap_ms = Some(at_ms);

        let emitted = TriggerType::tap(self.count);
        // A triple tap closes the burst; the next rapid tap starts over at one.
        if self.count >= 3 {
            self.count = 0;
        }
        emitted
    }
}
