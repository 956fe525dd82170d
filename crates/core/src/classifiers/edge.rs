/// Turns a level signal into rising-edge events.
#[derive(Debug, Clone, Copy, Default)]
pub struct EdgeTrigger {
    high: bool,
}

impl EdgeTrigger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` only on a low to high transition.
    pub fn update(&mut self, level: bool) -> bool {
        let rising = level && !self.high;
        self.high = level;
        rising
    }

    pub fn is_high(&self) -> bool {
        self.high
    }

    pub fn reset(&mut self) {
        self.high = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fires_once_per_rising_edge() {
        let mut edge = EdgeTrigger::new();
        let fired: Vec<bool> = [false, true, true, true, false, true]
            .into_iter()
            .map(|level| edge.update(level))
            .collect();
        assert_eq!(fired, vec![false, true, false, false, false, true]);
    }

    #[test]
    fn reset_rearms() {
        let mut edge = EdgeTrigger::new();
        assert!(edge.update(true));
        edge.reset();
        assert!(edge.update(true));
    }
}
