//! Double-buffered media handoff.
//!
//! Two backend slots exist; exactly one is on screen. A new stage is primed in
//! the hidden slot and only swapped in once the backend reports its first frame
//! is ready, so the old frame stays up until the new one can replace it.
//! Every handoff gets a fresh [`HandoffId`]; backend events carrying any other
//! id are stale and dropped, which is how superseded handoffs stay silent.

use crate::{
    assets::{MediaLibrary, MediaRequest},
    graph::{PlaybackMode, Stage},
    ImagicError, Result,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Slot {
    Primary,
    Secondary,
}

impl Slot {
    /// The opposite slot.
    pub fn other(self) -> Self {
        match self {
            Self::Primary => Self::Secondary,
            Self::Secondary => Self::Primary,
        }
    }
}

/// Which slot is visible. The hidden one is always the other.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SlotRoles {
    #[default]
    PrimaryActive,
    SecondaryActive,
}

impl SlotRoles {
    pub fn active(self) -> Slot {
        match self {
            Self::PrimaryActive => Slot::Primary,
            Self::SecondaryActive => Slot::Secondary,
        }
    }

    pub fn inactive(self) -> Slot {
        self.active().other()
    }

    /// Exchanges the active and inactive roles.
    pub fn swap(&mut self) {
        *self = match self {
            Self::PrimaryActive => Self::SecondaryActive,
            Self::SecondaryActive => Self::PrimaryActive,
        };
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct HandoffId(pub u64);

impl std::fmt::Display for HandoffId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Signals a backend reports back through the engine's control queue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MediaEvent {
    /// First frame of a primed slot is decoded and renderable.
    Ready(HandoffId),
    /// The visible media played to its natural end.
    Ended(HandoffId),
    Failed { handoff: HandoffId, reason: String },
}

/// Rendering collaborator owning the two player slots.
///
/// Calls return immediately. Readiness, natural end and asynchronous failures
/// are reported later as [`MediaEvent`]s tagged with the handoff id given to
/// [`MediaBackend::prime`].
pub trait MediaBackend: Send {
    /// Loads the request into the hidden `slot` and starts playing it in the
    /// background. Whether audio is muted while priming is up to the backend.
    fn prime(&mut self, slot: Slot, request: &MediaRequest, handoff: HandoffId) -> Result<()>;

    /// Shows `show` and, in the same step, hides, stops and releases `retire`.
    fn present(&mut self, show: Slot, retire: Option<Slot>);

    /// Seeks `slot` back to the start and keeps playing.
    fn restart(&mut self, slot: Slot);

    /// Stops and releases `slot` without showing it.
    fn release(&mut self, slot: Slot);
}

/// What a natural-end event amounts to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EndOutcome {
    Looped,
    /// One-shot media finished; the engine fires `auto`.
    Finished,
    /// A newer handoff is in flight, so the end no longer speaks for the stage.
    Superseded,
    Stale,
}

#[derive(Debug, Clone)]
struct Loaded {
    handoff: HandoffId,
    stage_id: String,
    locator: String,
    mode: PlaybackMode,
    finished: bool,
}

pub struct MediaTransitionController {
    backend: Box<dyn MediaBackend>,
    library: MediaLibrary,
    roles: SlotRoles,
    shown: Option<Loaded>,
    pending: Option<Loaded>,
    next_handoff: u64,
}

impl MediaTransitionController {
    pub fn new(backend: Box<dyn MediaBackend>, library: MediaLibrary) -> Self {
        Self {
            backend,
            library,
            roles: SlotRoles::default(),
            shown: None,
            pending: None,
            next_handoff: 1,
        }
    }

    /// Starts a handoff to `stage`, abandoning any handoff still in flight.
    ///
    /// On error nothing was primed and the current frame stays on screen.
    pub fn begin(&mut self, stage: &Stage) -> Result<HandoffId> {
        self.abandon_pending();

        let request = self.library.resolve(stage)?;
        let handoff = HandoffId(self.next_handoff);
        self.next_handoff += 1;

        let slot = self.roles.inactive();
        if let Err(err) = self.backend.prime(slot, &request, handoff) {
            self.backend.release(slot);
            return Err(err);
        }

        tracing::debug!(stage = %stage.id, %handoff, ?slot, "priming media");
        self.pending = Some(Loaded {
            handoff,
            stage_id: stage.id.clone(),
            locator: request.locator.to_string(),
            mode: request.mode,
            finished: false,
        });
        Ok(handoff)
    }

    /// Completes the swap if `handoff` is the one in flight. Returns the stage
    /// id that is now visible.
    pub fn on_ready(&mut self, handoff: HandoffId) -> Option<String> {
        if self.pending.as_ref().map(|p| p.handoff) != Some(handoff) {
            tracing::debug!(%handoff, "ignoring stale ready signal");
            return None;
        }
        let loaded = self.pending.take()?;

        let retire = self.shown.as_ref().map(|_| self.roles.active());
        self.backend.present(self.roles.inactive(), retire);
        self.roles.swap();

        let stage_id = loaded.stage_id.clone();
        self.shown = Some(loaded);
        Some(stage_id)
    }

    /// Classifies an end-of-playback callback for `handoff`.
    pub fn on_ended(&mut self, handoff: HandoffId) -> EndOutcome {
        let superseded = self.pending.is_some();
        let active = self.roles.active();
        let Some(shown) = self.shown.as_mut().filter(|s| s.handoff == handoff) else {
            tracing::debug!(%handoff, "ignoring stale end of playback");
            return EndOutcome::Stale;
        };

        match shown.mode {
            PlaybackMode::Loop => {
                self.backend.restart(active);
                EndOutcome::Looped
            }
            PlaybackMode::OneShot if shown.finished => EndOutcome::Stale,
            PlaybackMode::OneShot => {
                shown.finished = true;
                if superseded {
                    EndOutcome::Superseded
                } else {
                    EndOutcome::Finished
                }
            }
        }
    }

    /// Handles an asynchronous backend failure. A failed pending handoff is
    /// dropped; the previous frame remains visible.
    pub fn on_failed(&mut self, handoff: HandoffId, reason: &str) -> Option<(String, ImagicError)> {
        if self.pending.as_ref().map(|p| p.handoff) == Some(handoff) {
            let loaded = self.pending.take()?;
            self.backend.release(self.roles.inactive());
            let err = ImagicError::media(loaded.locator, reason);
            return Some((loaded.stage_id, err));
        }
        if let Some(shown) = self.shown.as_ref().filter(|s| s.handoff == handoff) {
            return Some((shown.stage_id.clone(), ImagicError::media(&shown.locator, reason)));
        }
        tracing::debug!(%handoff, "ignoring stale media failure");
        None
    }

    /// Releases both slots, leaving nothing on screen.
    pub fn clear(&mut self) {
        self.abandon_pending();
        if self.shown.take().is_some() {
            self.backend.release(self.roles.active());
        }
    }

    pub fn shown_stage(&self) -> Option<&str> {
        self.shown.as_ref().map(|s| s.stage_id.as_str())
    }

    pub fn pending_stage(&self) -> Option<&str> {
        self.pending.as_ref().map(|p| p.stage_id.as_str())
    }

    pub fn active_slot(&self) -> Slot {
        self.roles.active()
    }

    fn abandon_pending(&mut self) {
        if let Some(abandoned) = self.pending.take() {
            tracing::debug!(stage = %abandoned.stage_id, handoff = %abandoned.handoff, "abandoning handoff");
            self.backend.release(self.roles.inactive());
        }
    }
}

impl std::fmt::Debug for MediaTransitionController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MediaTransitionController")
            .field("roles", &self.roles)
            .field("shown", &self.shown_stage())
            .field("pending", &self.pending_stage())
            .field("next_handoff", &self.next_handoff)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        graph::MediaKind,
        testing::{BackendCall, RecordingBackend},
    };

    fn stage(id: &str, mode: PlaybackMode) -> Stage {
        Stage {
            id: id.to_string(),
            media_kind: MediaKind::Video,
            source: format!("mem://{id}"),
            playback_mode: mode,
            triggers: Vec::new(),
            show_clock: false,
            description: String::new(),
        }
    }

    fn controller() -> (MediaTransitionController, RecordingBackend) {
        let backend = RecordingBackend::default();
        let controller =
            MediaTransitionController::new(Box::new(backend.clone()), MediaLibrary::unchecked());
        (controller, backend)
    }

    #[test]
    fn swaps_only_after_ready() {
        let (mut media, backend) = controller();
        let first = media.begin(&stage("A", PlaybackMode::Loop)).unwrap();
        assert_eq!(media.shown_stage(), None);
        assert_eq!(media.on_ready(first).as_deref(), Some("A"));
        assert_eq!(media.active_slot(), Slot::Secondary);

        let second = media.begin(&stage("B", PlaybackMode::OneShot)).unwrap();
        assert_eq!(media.shown_stage(), Some("A"));
        media.on_ready(second);
        assert_eq!(media.shown_stage(), Some("B"));
        assert_eq!(media.active_slot(), Slot::Primary);

        assert_eq!(
            backend.calls(),
            vec![
                BackendCall::Prime { slot: Slot::Secondary, stage_id: "A".into(), handoff: first },
                BackendCall::Present { show: Slot::Secondary, retire: None },
                BackendCall::Prime { slot: Slot::Primary, stage_id: "B".into(), handoff: second },
                BackendCall::Present { show: Slot::Primary, retire: Some(Slot::Secondary) },
            ]
        );
    }

    #[test]
    fn newer_handoff_cancels_pending_one() {
        let (mut media, backend) = controller();
        let x = media.begin(&stage("X", PlaybackMode::OneShot)).unwrap();
        let y = media.begin(&stage("Y", PlaybackMode::OneShot)).unwrap();

        assert_eq!(media.on_ready(x), None);
        assert_eq!(media.on_ended(x), EndOutcome::Stale);
        assert!(media.on_failed(x, "late").is_none());
        assert_eq!(media.on_ready(y).as_deref(), Some("Y"));

        let calls = backend.calls();
        assert_eq!(calls[1], BackendCall::Release(Slot::Secondary));
        let presents = calls
            .iter()
            .filter(|call| matches!(call, BackendCall::Present { .. }))
            .count();
        assert_eq!(presents, 1);
    }

    #[test]
    fn loop_restarts_and_one_shot_finishes_once() {
        let (mut media, backend) = controller();
        let looped = media.begin(&stage("L", PlaybackMode::Loop)).unwrap();
        media.on_ready(looped);
        assert_eq!(media.on_ended(looped), EndOutcome::Looped);
        assert_eq!(media.on_ended(looped), EndOutcome::Looped);
        assert_eq!(backend.calls().last(), Some(&BackendCall::Restart(Slot::Secondary)));

        let once = media.begin(&stage("O", PlaybackMode::OneShot)).unwrap();
        media.on_ready(once);
        assert_eq!(media.on_ended(once), EndOutcome::Finished);
        assert_eq!(media.on_ended(once), EndOutcome::Stale);
        assert_eq!(media.on_ended(looped), EndOutcome::Stale);
    }

    #[test]
    fn end_during_handoff_is_superseded() {
        let (mut media, _backend) = controller();
        let a = media.begin(&stage("A", PlaybackMode::OneShot)).unwrap();
        media.on_ready(a);
        media.begin(&stage("B", PlaybackMode::OneShot)).unwrap();
        assert_eq!(media.on_ended(a), EndOutcome::Superseded);
    }

    #[test]
    fn failed_prime_keeps_previous_frame() {
        let (mut media, backend) = controller();
        let a = media.begin(&stage("A", PlaybackMode::Loop)).unwrap();
        media.on_ready(a);
        let b = media.begin(&stage("B", PlaybackMode::Loop)).unwrap();

        let (stage_id, err) = media.on_failed(b, "corrupt").unwrap();
        assert_eq!(stage_id, "B");
        assert!(matches!(err, ImagicError::MediaLoad { .. }));
        assert_eq!(media.shown_stage(), Some("A"));
        assert_eq!(media.pending_stage(), None);
        assert_eq!(backend.calls().last(), Some(&BackendCall::Release(Slot::Primary)));
    }

    #[test]
    fn unresolvable_source_primes_nothing() {
        let (mut media, backend) = controller();
        let mut broken = stage("A", PlaybackMode::Loop);
        broken.source.clear();
        assert!(media.begin(&broken).is_err());
        assert!(backend.calls().is_empty());
    }

    #[test]
    fn clear_releases_everything() {
        let (mut media, backend) = controller();
        let a = media.begin(&stage("A", PlaybackMode::Loop)).unwrap();
        media.on_ready(a);
        media.begin(&stage("B", PlaybackMode::Loop)).unwrap();
        media.clear();
        assert_eq!(media.shown_stage(), None);
        assert_eq!(media.pending_stage(), None);
        let calls = backend.calls();
        assert_eq!(
            &calls[calls.len() - 2..],
            &[BackendCall::Release(Slot::Primary), BackendCall::Release(Slot::Secondary)]
        );
    }
}
