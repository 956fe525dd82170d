use crate::{classifiers::EdgeTrigger, config::MotionConfig, TriggerType};

/// Emits `shake` when the acceleration magnitude spikes past a threshold.
/// Re-arms once the magnitude settles below the release level.
#[derive(Debug, Clone)]
pub struct ShakeDetector {
    threshold_g: f32,
    release_g: f32,
    engaged: bool,
}

impl Default for ShakeDetector {
    fn default() -> Self {
        Self::from(&MotionConfig::default())
    }
}

impl From<&MotionConfig> for ShakeDetector {
    fn from(config: &MotionConfig) -> Self {
        Self::new(config.shake_threshold_g, config.shake_release_g)
    }
}

impl ShakeDetector {
    pub fn new(threshold_g: f32, release_g: f32) -> Self {
        Self {
            threshold_g,
            release_g: release_g.min(threshold_g),
            engaged: false,
        }
    }

    /// Feeds one acceleration magnitude sample, in g.
    pub fn sample(&mut self, magnitude_g: f32) -> Option<TriggerType> {
        if !magnitude_g.is_finite() {
            return None;
        }
        if self.engaged {
            if magnitude_g < self.release_g {
                self.engaged = false;
            }
            return None;
        }
        if magnitude_g >= self.threshold_g {
            self.engaged = true;
            return Some(TriggerType::Shake);
        }
        None
    }

    /// Feeds a raw three-axis reading, in g.
    pub fn sample_axes(&mut self, x: f32, y: f32, z: f32) -> Option<TriggerType> {
        self.sample((x * x + y * y + z * z).sqrt())
    }

    pub fn reset(&mut self) {
        self.engaged = false;
    }
}

/// Emits `proximity` when the sensor becomes covered.
#[derive(Debug, Clone, Default)]
pub struct ProximityDetector {
    edge: EdgeTrigger,
}

impl ProximityDetector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn update(&mut self, covered: bool) -> Option<TriggerType> {
        self.edge.update(covered).then_some(TriggerType::Proximity)
    }

    pub fn is_covered(&self) -> bool {
        self.edge.is_high()
    }

    pub fn reset(&mut self) {
        self.edge.reset();
    }
}
