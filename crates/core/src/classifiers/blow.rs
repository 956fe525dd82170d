use crate::{classifiers::EdgeTrigger, TriggerType};

/// Level reported for digital silence instead of negative infinity.
pub const SILENCE_FLOOR_DB: f32 = f32::MIN;

/// Root mean square of a block of samples. Empty blocks are silent.
pub fn rms(samples: &[f32]) -> f32 {
    if samples.is_empty() {
        return 0.0;
    }
    let sum: f32 = samples.iter().map(|sample| sample * sample).sum();
    (sum / samples.len() as f32).sqrt()
}

/// Converts an RMS amplitude to dBFS, clamping silence to [`SILENCE_FLOOR_DB`].
pub fn rms_to_dbfs(rms: f32) -> f32 {
    if rms > 0.0 && rms.is_finite() {
        20.0 * rms.log10()
    } else {
        SILENCE_FLOOR_DB
    }
}

/// Result of analysing one capture buffer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BlowReading {
    pub rms: f32,
    pub db: f32,
    /// Level is above the threshold for this buffer.
    pub loud: bool,
    /// Set only on the buffer where the level first rises above the threshold.
    pub trigger: Option<TriggerType>,
}

/// Detects a blow into the microphone from per-buffer loudness.
///
/// The raw comparison is level-triggered; an [`EdgeTrigger`] turns it into a
/// single `blow` per loud episode so a sustained sound cannot re-enter the
/// current stage on every buffer.
#[derive(Debug, Clone)]
pub struct BlowDetector {
    threshold_db: f32,
    edge: EdgeTrigger,
}

impl BlowDetector {
    pub fn new(threshold_db: f32) -> Self {
        Self {
            threshold_db,
            edge: EdgeTrigger::new(),
        }
    }

    pub fn threshold_db(&self) -> f32 {
        self.threshold_db
    }

    pub fn set_threshold(&mut self, threshold_db: f32) {
        self.threshold_db = threshold_db;
    }

    /// Strict comparison: a level equal to the threshold does not count.
    pub fn exceeds(&self, db: f32) -> bool {
        db > self.threshold_db
    }

    /// Analyses one buffer. O(n) over the samples, no allocation.
    pub fn process(&mut self, samples: &[f32]) -> BlowReading {
        let rms = rms(samples);
        self.process_level(rms)
    }

    pub fn process_level(&mut self, rms: f32) -> BlowReading {
        let db = rms_to_dbfs(rms);
        let loud = self.exceeds(db);
        let trigger = self.edge.update(loud).then_some(TriggerType::Blow);
        BlowReading {
            rms,
            db,
            loud,
            trigger,
        }
    }

    pub fn reset(&mut self) {
        self.edge.reset();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn converts_rms_to_decibels() {
        assert!((rms_to_dbfs(0.4) + 7.9588).abs() < 1e-3);
        assert!(rms_to_dbfs(1.0).abs() < 1e-6);
        assert_eq!(rms_to_dbfs(0.0), SILENCE_FLOOR_DB);
    }

    #[test]
    fn computes_rms_of_constant_block() {
        assert!((rms(&[0.5; 64]) - 0.5).abs() < 1e-6);
        assert_eq!(rms(&[]), 0.0);
    }

    #[test]
    fn fires_above_threshold_only() {
        let mut detector = BlowDetector::new(-10.0);
        let reading = detector.process(&[0.4; 256]);
        assert!(reading.db > -10.0);
        assert_eq!(reading.trigger, Some(TriggerType::Blow));

        assert!(!detector.exceeds(-10.0));
        assert!(detector.exceeds(-9.99));
    }

    #[test]
    fn sustained_sound_fires_once() {
        let mut detector = BlowDetector::new(-10.0);
        let loud = [0.8_f32; 128];
        let quiet = [0.01_f32; 128];

        let fired: Vec<bool> = [&loud, &loud, &loud, &quiet, &loud]
            .into_iter()
            .map(|block| detector.process(block).trigger.is_some())
            .collect();
        assert_eq!(fired, vec![true, false, false, false, true]);
    }

    #[test]
    fn silence_never_fires() {
        let mut detector = BlowDetector::new(0.0);
        let reading = detector.process(&[0.0; 1024]);
        assert!(!reading.loud);
        assert_eq!(reading.trigger, None);
    }
}
