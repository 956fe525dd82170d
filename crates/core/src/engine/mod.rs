//! Engine root.
//!
//! The [`Engine`] is the single writer of [`EngineState`]. Producers on other
//! threads (classifiers, media backends, editors) only ever talk to it through
//! an [`EngineHandle`], which pushes [`EngineEvent`]s onto the control queue.
//! Events are handled one at a time in arrival order.

use std::{collections::BTreeSet, sync::Arc};

use crossbeam_channel::{Receiver, Sender};

use crate::{
    assets::MediaLibrary,
    dispatch::{self, Transition},
    graph::{Stage, StageGraph},
    media::{EndOutcome, HandoffId, MediaBackend, MediaEvent, MediaTransitionController},
    monitor::{ClassifierGates, MonitoringCoordinator, SensorControl},
    ImagicError, Result, TriggerType,
};

/// Work item on the control queue.
#[derive(Debug, Clone)]
pub enum EngineEvent {
    Trigger(TriggerType),
    Media(MediaEvent),
    /// Swap in a new graph generation.
    ReplaceGraph(Arc<StageGraph>),
    /// Re-enter the first stage of the current graph.
    Reload,
    Shutdown,
}

/// Cloneable, thread-safe sender onto the engine's control queue.
#[derive(Debug, Clone)]
pub struct EngineHandle {
    sender: Sender<EngineEvent>,
}

impl EngineHandle {
    /// Creates a control queue. The receiver goes to [`Engine::new`].
    pub fn channel() -> (Self, Receiver<EngineEvent>) {
        let (sender, receiver) = crossbeam_channel::unbounded();
        (Self { sender }, receiver)
    }

    /// Queues a raw event. Fails with `Disconnected` once the engine is gone.
    pub fn send(&self, event: EngineEvent) -> Result<()> {
        self.sender
            .send(event)
            .map_err(|_| ImagicError::Disconnected)
    }

    /// Reports a classified trigger to the engine.
    pub fn trigger(&self, kind: TriggerType) -> Result<()> {
        self.send(EngineEvent::Trigger(kind))
    }

    /// Backend callback: the primed slot can be shown.
    pub fn media_ready(&self, handoff: HandoffId) -> Result<()> {
        self.send(EngineEvent::Media(MediaEvent::Ready(handoff)))
    }

    /// Backend callback: playback of the shown slot reached its end.
    pub fn media_ended(&self, handoff: HandoffId) -> Result<()> {
        self.send(EngineEvent::Media(MediaEvent::Ended(handoff)))
    }

    /// Backend callback: loading or playback failed for `handoff`.
    pub fn media_failed(&self, handoff: HandoffId, reason: impl Into<String>) -> Result<()> {
        self.send(EngineEvent::Media(MediaEvent::Failed {
            handoff,
            reason: reason.into(),
        }))
    }

    /// Hands an edited graph to the engine as the next generation.
    pub fn replace_graph(&self, graph: StageGraph) -> Result<()> {
        self.send(EngineEvent::ReplaceGraph(Arc::new(graph)))
    }

    /// Asks the engine to restart from the first stage.
    pub fn reload(&self) -> Result<()> {
        self.send(EngineEvent::Reload)
    }

    /// Stops [`Engine::run`] after the events already queued.
    pub fn shutdown(&self) -> Result<()> {
        self.send(EngineEvent::Shutdown)
    }
}

/// Terminates the application. Invoked at most once.
pub trait ExitHandler: Send {
    fn exit(&mut self);
}

/// Ends the process with status 0.
#[derive(Debug, Default)]
pub struct ProcessExit;

impl ExitHandler for ProcessExit {
    fn exit(&mut self) {
        tracing::info!("exit trigger reached, terminating");
        std::process::exit(0);
    }
}

/// Notifications for the hosting UI.
pub trait HostUi: Send {
    /// The stage's media is on screen; compositing that depends on the stage
    /// (clock overlay, description) can finalize now.
    fn stage_ready(&mut self, _stage: &Stage) {}

    fn media_failed(&mut self, _stage_id: &str, _error: &ImagicError) {}

    /// The graph became empty and nothing is shown.
    fn stage_cleared(&mut self) {}
}

#[derive(Debug, Default)]
pub struct NullHost;

impl HostUi for NullHost {}

/// What is on screen and which signals matter right now.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EngineState {
    pub current_stage_id: Option<String>,
    pub active_classifiers: BTreeSet<TriggerType>,
}

/// External collaborators the engine drives.
pub struct Collaborators {
    pub media: Box<dyn MediaBackend>,
    pub library: MediaLibrary,
    pub sensors: Box<dyn SensorControl>,
    pub exit: Box<dyn ExitHandler>,
    pub host: Box<dyn HostUi>,
}

pub struct Engine {
    graph: Arc<StageGraph>,
    generation: u64,
    state: EngineState,
    monitor: MonitoringCoordinator,
    media: MediaTransitionController,
    exit: Box<dyn ExitHandler>,
    host: Box<dyn HostUi>,
    handle: EngineHandle,
    events: Receiver<EngineEvent>,
    terminated: bool,
}

impl Engine {
    /// Builds an idle engine on `graph`. Call [`Engine::start`] to enter the
    /// first stage.
    pub fn new(
        graph: StageGraph,
        parts: Collaborators,
        handle: EngineHandle,
        events: Receiver<EngineEvent>,
    ) -> Self {
        let mut monitor = MonitoringCoordinator::new(parts.sensors);
        monitor.apply_blow_threshold(graph.blow_threshold());
        Self {
            graph: Arc::new(graph),
            generation: 0,
            state: EngineState::default(),
            monitor,
            media: MediaTransitionController::new(parts.media, parts.library),
            exit: parts.exit,
            host: parts.host,
            handle,
            events,
            terminated: false,
        }
    }

    pub fn handle(&self) -> EngineHandle {
        self.handle.clone()
    }

    pub fn gates(&self) -> ClassifierGates {
        self.monitor.gates()
    }

    /// Snapshot of the engine's externally visible state.
    pub fn state(&self) -> &EngineState {
        &self.state
    }

    pub fn graph(&self) -> &Arc<StageGraph> {
        &self.graph
    }

    /// Number of graph replacements applied so far.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Stage the engine considers current.
    pub fn current_stage(&self) -> Option<&Stage> {
        self.graph.stage(self.state.current_stage_id.as_deref()?)
    }

    /// Stage whose media is actually on screen. Lags the current stage while a
    /// handoff is in flight.
    pub fn visible_stage(&self) -> Option<&str> {
        self.media.shown_stage()
    }

    /// Whether an `exit` target has been reached.
    pub fn is_terminated(&self) -> bool {
        self.terminated
    }

    /// Enters the first stage, if there is one.
    pub fn start(&mut self) {
        self.enter_first();
    }

    /// Resolves `trigger` against the current stage and applies the result.
    pub fn dispatch(&mut self, trigger: TriggerType) -> Transition {
        if self.terminated {
            return Transition::Ignored;
        }

        let transition = dispatch::resolve(&self.graph, self.state.current_stage_id.as_deref(), trigger);
        match &transition {
            Transition::Ignored => {}
            Transition::Enter(next) => {
                tracing::info!(%trigger, from = ?self.state.current_stage_id, to = %next, "trigger matched");
                self.enter(next);
            }
            Transition::Terminate => {
                tracing::info!(%trigger, "trigger leads to exit");
                self.terminate();
            }
        }
        transition
    }

    /// Swaps in a new graph generation. The current stage is refreshed if it
    /// survived the edit, otherwise the first stage is entered.
    pub fn replace_graph(&mut self, graph: Arc<StageGraph>) {
        if self.terminated {
            return;
        }
        self.graph = graph;
        self.generation += 1;
        self.monitor.apply_blow_threshold(self.graph.blow_threshold());
        tracing::info!(generation = self.generation, stages = self.graph.stages().len(), "stage graph replaced");

        match self.state.current_stage_id.clone() {
            Some(current) if self.graph.stage(&current).is_some() => self.enter(&current),
            _ => self.enter_first(),
        }
    }

    pub fn reload(&mut self) {
        if !self.terminated {
            self.enter_first();
        }
    }

    /// Handles one queued event. Returns `false` once the engine should stop.
    pub fn handle_event(&mut self, event: EngineEvent) -> bool {
        if self.terminated {
            tracing::debug!(?event, "engine terminated, dropping event");
            return false;
        }

        match event {
            EngineEvent::Trigger(kind) => {
                self.dispatch(kind);
            }
            EngineEvent::Media(media) => self.on_media_event(media),
            EngineEvent::ReplaceGraph(graph) => self.replace_graph(graph),
            EngineEvent::Reload => self.reload(),
            EngineEvent::Shutdown => {
                self.monitor.reconcile(&mut self.state.active_classifiers, None);
                return false;
            }
        }
        !self.terminated
    }

    /// Drains whatever is queued without blocking. Returns the number of
    /// events handled.
    pub fn process_pending(&mut self) -> usize {
        let mut handled = 0;
        while let Ok(event) = self.events.try_recv() {
            handled += 1;
            if !self.handle_event(event) {
                break;
            }
        }
        handled
    }

    /// Blocks on the control queue until shutdown or termination.
    pub fn run(&mut self) -> Result<()> {
        while !self.terminated {
            let event = self.events.recv().map_err(|_| ImagicError::Disconnected)?;
            if !self.handle_event(event) {
                break;
            }
        }
        Ok(())
    }

    fn enter_first(&mut self) {
        let first = self.graph.first_stage().map(|stage| stage.id.clone());
        match first {
            Some(id) => self.enter(&id),
            None => self.clear(),
        }
    }

    fn enter(&mut self, stage_id: &str) {
        let graph = Arc::clone(&self.graph);
        let Some(stage) = graph.stage(stage_id) else {
            tracing::warn!(stage = stage_id, "cannot enter unknown stage");
            return;
        };

        tracing::info!(stage = %stage.id, kind = ?stage.media_kind, "entering stage");
        self.state.current_stage_id = Some(stage.id.clone());
        self.monitor.reconcile(&mut self.state.active_classifiers, Some(stage));

        if let Err(err) = self.media.begin(stage) {
            tracing::warn!(stage = %stage.id, error = %err, "stage media failed to load");
            self.host.media_failed(&stage.id, &err);
        }
    }

    fn clear(&mut self) {
        self.state.current_stage_id = None;
        self.monitor.reconcile(&mut self.state.active_classifiers, None);
        self.media.clear();
        self.host.stage_cleared();
    }

    fn terminate(&mut self) {
        self.terminated = true;
        self.monitor.reconcile(&mut self.state.active_classifiers, None);
        self.exit.exit();
    }

    fn on_media_event(&mut self, event: MediaEvent) {
        match event {
            MediaEvent::Ready(handoff) => {
                let Some(stage_id) = self.media.on_ready(handoff) else {
                    return;
                };
                let graph = Arc::clone(&self.graph);
                if let Some(stage) = graph.stage(&stage_id) {
                    tracing::debug!(stage = %stage.id, %handoff, "stage ready");
                    self.host.stage_ready(stage);
                }
            }
            MediaEvent::Ended(handoff) => match self.media.on_ended(handoff) {
                EndOutcome::Finished => {
                    // The visible media only speaks for the current stage.
                    if self.media.shown_stage() == self.state.current_stage_id.as_deref() {
                        self.dispatch(TriggerType::Auto);
                    }
                }
                EndOutcome::Looped | EndOutcome::Superseded | EndOutcome::Stale => {}
            },
            MediaEvent::Failed { handoff, reason } => {
                if let Some((stage_id, err)) = self.media.on_failed(handoff, &reason) {
                    tracing::warn!(stage = %stage_id, error = %err, "media failure");
                    self.host.media_failed(&stage_id, &err);
                }
            }
        }
    }
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("generation", &self.generation)
            .field("state", &self.state)
            .field("media", &self.media)
            .field("terminated", &self.terminated)
            .finish()
    }
}
