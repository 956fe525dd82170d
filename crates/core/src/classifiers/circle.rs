use serde::{Deserialize, Serialize};

use crate::{config::GestureConfig, TriggerType};

/// A pointer position in device-independent units.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub fn distance(self, other: Point) -> f32 {
        (self.x - other.x).hypot(self.y - other.y)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CircleParams {
    pub min_points: usize,
    pub min_extent: f32,
    pub min_aspect: f32,
    pub max_aspect: f32,
    pub closure_factor: f32,
}

impl Default for CircleParams {
    fn default() -> Self {
        Self::from(&GestureConfig::default())
    }
}

impl From<&GestureConfig> for CircleParams {
    fn from(config: &GestureConfig) -> Self {
        Self {
            min_points: config.circle_min_points,
            min_extent: config.circle_min_extent,
            min_aspect: config.circle_min_aspect,
            max_aspect: config.circle_max_aspect,
            closure_factor: config.circle_closure_factor,
        }
    }
}

/// Decides whether a finished trace is a closed, roughly round loop.
pub fn is_circle(points: &[Point], params: &CircleParams) -> bool {
    if points.len() <= params.min_points {
        return false;
    }

    let (mut min_x, mut max_x) = (f32::INFINITY, f32::NEG_INFINITY);
    let (mut min_y, mut max_y) = (f32::INFINITY, f32::NEG_INFINITY);
    for point in points {
        min_x = min_x.min(point.x);
        max_x = max_x.max(point.x);
        min_y = min_y.min(point.y);
        max_y = max_y.max(point.y);
    }
    let width = max_x - min_x;
    let height = max_y - min_y;

    if !(width >= params.min_extent && height >= params.min_extent) {
        return false;
    }

    let aspect = width / height;
    if aspect < params.min_aspect || aspect > params.max_aspect {
        return false;
    }

    let (Some(&first), Some(&last)) = (points.first(), points.last()) else {
        return false;
    };
    first.distance(last) < params.closure_factor * (width + height) / 2.0
}

/// Collects one continuous pointer gesture and classifies it on release.
#[derive(Debug, Clone, Default)]
pub struct CircleGestureClassifier {
    params: CircleParams,
    points: Vec<Point>,
    tracking: bool,
}

impl CircleGestureClassifier {
    pub fn new(params: CircleParams) -> Self {
        Self {
            params,
            points: Vec::new(),
            tracking: false,
        }
    }

    pub fn begin(&mut self, point: Point) {
        self.points.clear();
        self.points.push(point);
        self.tracking = true;
    }

    pub fn extend(&mut self, point: Point) {
        if self.tracking {
            self.points.push(point);
        }
    }

    /// Finishes the gesture. The trace is dropped whatever the outcome.
    pub fn end(&mut self) -> Option<TriggerType> {
        if !self.tracking {
            return None;
        }
        self.tracking = false;
        let matched = is_circle(&self.points, &self.params);
        self.points.clear();
        matched.then_some(TriggerType::Circle)
    }

    /// Aborted gestures are discarded without classification.
    pub fn cancel(&mut self) {
        self.tracking = false;
        self.points.clear();
    }

    pub fn points(&self) -> &[Point] {
        &self.points
    }
}

#[cfg(test)]
mod tests {
    use std::f32::consts::TAU;

    use super::*;

    /// Ellipse 120 wide and 100 tall, stopping 0.4 rad short of closing.
    fn open_ellipse(count: usize) -> Vec<Point> {
        (0..count)
            .map(|i| {
                let theta = (TAU - 0.4) * i as f32 / (count - 1) as f32;
                Point::new(60.0 * theta.cos(), 50.0 * theta.sin())
            })
            .collect()
    }

    #[test]
    fn closed_loop_is_a_circle() {
        let points = open_ellipse(40);
        let gap = points[0].distance(points[39]);
        assert!((gap - 20.0).abs() < 1.0);
        assert!(is_circle(&points, &CircleParams::default()));
    }

    #[test]
    fn vertical_stroke_is_rejected() {
        let points: Vec<Point> = (0..31)
            .map(|i| Point::new((i % 2) as f32 * 5.0, i as f32 * 10.0))
            .collect();
        assert!(!is_circle(&points, &CircleParams::default()));
    }

    #[test]
    fn too_few_points_or_open_arc_is_rejected() {
        let params = CircleParams::default();
        assert!(!is_circle(&open_ellipse(10), &params));
        assert!(!is_circle(&[], &params));

        let half: Vec<Point> = (0..30)
            .map(|i| {
                let theta = std::f32::consts::PI * i as f32 / 29.0;
                Point::new(60.0 * theta.cos(), 60.0 * theta.sin())
            })
            .collect();
        assert!(!is_circle(&half, &params));
    }

    #[test]
    fn flat_loop_fails_aspect_check() {
        let points: Vec<Point> = (0..40)
            .map(|i| {
                let theta = (TAU - 0.2) * i as f32 / 39.0;
                Point::new(150.0 * theta.cos(), 30.0 * theta.sin())
            })
            .collect();
        let params = CircleParams {
            min_extent: 10.0,
            ..CircleParams::default()
        };
        assert!(!is_circle(&points, &params));
    }

    #[test]
    fn classifier_tracks_one_gesture_at_a_time() {
        let mut circle = CircleGestureClassifier::default();
        let points = open_ellipse(40);

        circle.extend(points[0]);
        assert!(circle.points().is_empty());

        circle.begin(Point::new(500.0, 500.0));
        circle.cancel();
        assert_eq!(circle.end(), None);

        circle.begin(points[0]);
        for point in &points[1..] {
            circle.extend(*point);
        }
        assert_eq!(circle.end(), Some(TriggerType::Circle));
        assert!(circle.points().is_empty());
        assert_eq!(circle.end(), None);
    }
}
