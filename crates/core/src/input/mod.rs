use crate::{
    classifiers::{
        CircleGestureClassifier, CircleParams, LongPressDetector, Point, ProximityDetector,
        ShakeDetector, TapCounter,
    },
    monitor::ClassifierGates,
    AppConfig, EngineHandle, Result, TriggerType,
};

/// Producer-side router for touch, motion and proximity input.
///
/// Owns the classifiers for those streams and forwards every trigger they
/// emit to the engine, unless the current stage has no use for it. Classifier
/// state is updated either way so bursts and presses stay consistent.
#[derive(Debug)]
pub struct InputFrontend {
    taps: TapCounter,
    press: LongPressDetector,
    circle: CircleGestureClassifier,
    shake: ShakeDetector,
    proximity: ProximityDetector,
    gates: ClassifierGates,
    sink: EngineHandle,
}

impl InputFrontend {
    pub fn new(config: &AppConfig, gates: ClassifierGates, sink: EngineHandle) -> Self {
        Self {
            taps: TapCounter::new(config.gestures.tap_window_ms),
            press: LongPressDetector::new(config.gestures.long_press_min_ms),
            circle: CircleGestureClassifier::new(CircleParams::from(&config.gestures)),
            shake: ShakeDetector::from(&config.motion),
            proximity: ProximityDetector::new(),
            gates,
            sink,
        }
    }

    pub fn tap(&mut self, at_ms: u64) -> Result<Option<TriggerType>> {
        let emitted = self.taps.tap(at_ms);
        self.forward(emitted)
    }

    pub fn press_began(&mut self, at_ms: u64) {
        self.press.press_began(at_ms);
    }

    /// Periodic check while a press is held.
    pub fn press_held(&mut self, at_ms: u64) -> Result<Option<TriggerType>> {
        let emitted = self.press.poll(at_ms);
        self.forward(emitted)
    }

    pub fn press_ended(&mut self, at_ms: u64) -> Result<Option<TriggerType>> {
        let emitted = self.press.press_ended(at_ms);
        self.forward(emitted)
    }

    pub fn press_cancelled(&mut self) {
        self.press.cancel();
    }

    pub fn pointer_began(&mut self, point: Point) {
        self.circle.begin(point);
    }

    pub fn pointer_moved(&mut self, point: Point) {
        self.circle.extend(point);
    }

    pub fn pointer_ended(&mut self) -> Result<Option<TriggerType>> {
        let emitted = self.circle.end();
        self.forward(emitted)
    }

    pub fn pointer_cancelled(&mut self) {
        self.circle.cancel();
    }

    /// Acceleration magnitude sample, in g.
    pub fn acceleration(&mut self, magnitude_g: f32) -> Result<Option<TriggerType>> {
        let emitted = self.shake.sample(magnitude_g);
        self.forward(emitted)
    }

    pub fn proximity(&mut self, covered: bool) -> Result<Option<TriggerType>> {
        let emitted = self.proximity.update(covered);
        self.forward(emitted)
    }

    fn forward(&self, emitted: Option<TriggerType>) -> Result<Option<TriggerType>> {
        match emitted {
            Some(kind) if self.gates.is_enabled(kind) => {
                self.sink.trigger(kind)?;
                Ok(Some(kind))
            }
            Some(kind) => {
                tracing::trace!(%kind, "classifier output gated off");
                Ok(None)
            }
            None => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use super::*;
    use crate::{
        graph::{MediaKind, PlaybackMode, Stage, Target, Trigger},
        monitor::{MonitoringCoordinator, NoSensors},
        EngineEvent,
    };

    fn frontend(kinds: &[TriggerType]) -> (InputFrontend, crossbeam_channel::Receiver<EngineEvent>) {
        let stage = Stage {
            id: "S".into(),
            media_kind: MediaKind::Image,
            source: "s.png".into(),
            playback_mode: PlaybackMode::OneShot,
            triggers: kinds
                .iter()
                .enumerate()
                .map(|(i, kind)| Trigger {
                    id: format!("t{i}"),
                    kind: *kind,
                    target: Target::Exit,
                    action: None,
                })
                .collect(),
            show_clock: false,
            description: String::new(),
        };
        let mut monitor = MonitoringCoordinator::new(Box::new(NoSensors));
        monitor.reconcile(&mut BTreeSet::new(), Some(&stage));

        let (handle, events) = EngineHandle::channel();
        (InputFrontend::new(&AppConfig::default(), monitor.gates(), handle), events)
    }

    fn triggers(events: &crossbeam_channel::Receiver<EngineEvent>) -> Vec<TriggerType> {
        events
            .try_iter()
            .filter_map(|event| match event {
                EngineEvent::Trigger(kind) => Some(kind),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn forwards_only_gated_taps() {
        let (mut input, events) = frontend(&[TriggerType::Tap3]);
        assert_eq!(input.tap(0).unwrap(), None);
        assert_eq!(input.tap(300).unwrap(), None);
        assert_eq!(input.tap(600).unwrap(), Some(TriggerType::Tap3));
        assert_eq!(triggers(&events), vec![TriggerType::Tap3]);
    }

    #[test]
    fn routes_press_circle_motion_and_cover() {
        let (mut input, events) = frontend(&[
            TriggerType::LongPress,
            TriggerType::Circle,
            TriggerType::Shake,
            TriggerType::Proximity,
        ]);

        input.press_began(0);
        input.press_held(600).unwrap();
        input.press_ended(900).unwrap();

        input.pointer_began(Point::new(100.0, 0.0));
        for i in 1..40 {
            let theta = (std::f32::consts::TAU - 0.3) * i as f32 / 39.0;
            input.pointer_moved(Point::new(100.0 * theta.cos(), 100.0 * theta.sin()));
        }
        input.pointer_ended().unwrap();

        input.acceleration(3.0).unwrap();
        input.proximity(true).unwrap();
        input.proximity(true).unwrap();

        assert_eq!(
            triggers(&events),
            vec![
                TriggerType::LongPress,
                TriggerType::Circle,
                TriggerType::Shake,
                TriggerType::Proximity,
            ]
        );
    }

    #[test]
    fn disabled_sensors_stay_quiet() {
        let (mut input, events) = frontend(&[]);
        input.acceleration(5.0).unwrap();
        input.proximity(true).unwrap();
        assert!(triggers(&events).is_empty());
    }
}
