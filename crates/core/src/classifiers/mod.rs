//! Signal classifiers.
//!
//! Each classifier turns one raw input stream into discrete
//! [`TriggerType`](crate::TriggerType) candidates. They keep only the small
//! amount of state they need and never touch engine state; the producer that
//! owns a classifier forwards whatever it emits to the engine's control queue.
//! Malformed input (empty buffers, degenerate traces) resolves to "nothing
//! emitted" rather than an error.

mod blow;
mod circle;
mod edge;
mod motion;
mod press;
mod tap;

pub use blow::{rms, rms_to_dbfs, BlowDetector, BlowReading, SILENCE_FLOOR_DB};
pub use circle::{is_circle, CircleGestureClassifier, CircleParams, Point};
pub use edge::EdgeTrigger;
pub use motion::{ProximityDetector, ShakeDetector};
pub use press::LongPressDetector;
pub use tap::TapCounter;
