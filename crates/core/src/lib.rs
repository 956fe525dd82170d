//! Core library for Imagic, a hidden multi-stage presentation player.
//!
//! A trick is a small graph of stages. Each stage shows one image or video and
//! lists the physical triggers (taps, long press, a drawn circle, blowing into
//! the microphone, shaking, covering the proximity sensor) that move it on.
//! The crate owns the state machine, the classifiers that turn raw input into
//! triggers, and the double-buffered media handoff; rendering, capture and
//! persistence sit behind small traits.

pub mod assets;
pub mod audio;
pub mod classifiers;
pub mod config;
pub mod dispatch;
pub mod engine;
pub mod error;
pub mod graph;
pub mod input;
pub mod media;
pub mod monitor;

#[cfg(test)]
mod testing;

pub use assets::{Locator, MediaLibrary, MediaRequest};
pub use audio::AudioMonitor;
pub use classifiers::Point;
pub use config::{
    AppConfig, AudioConfig, ConfigStore, GestureConfig, JsonFileStore, Language, MemoryStore,
    MotionConfig, StageRecord, TrickConfig, TriggerRecord,
};
pub use dispatch::Transition;
pub use engine::{
    Collaborators, Engine, EngineEvent, EngineHandle, EngineState, ExitHandler, HostUi, NullHost,
    ProcessExit,
};
pub use error::{ImagicError, Result, ValidationKind};
pub use graph::{
    GraphWarning, MediaKind, PlaybackMode, Stage, StageGraph, Target, Trigger, TriggerType,
    WarningKind, EXIT_SENTINEL,
};
pub use input::InputFrontend;
pub use media::{HandoffId, MediaBackend, MediaEvent, MediaTransitionController, Slot};
pub use monitor::{ClassifierGates, MonitoringCoordinator, NoSensors, SensorControl, SensorHub};
