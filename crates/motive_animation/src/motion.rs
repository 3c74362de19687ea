//! Motion composition
//!
//! A [`Motion`] is a node in a tree of effects. Leaves drive a single
//! animation handle; sequential and parallel composites coordinate their
//! children. Every node, whatever its kind, answers `play`, `pause` and
//! `reverse` the same way:
//!
//! - `play()` starts a fresh run from idle or finished, resumes from
//!   paused, and while running hands back the in-flight [`Completion`]
//!   without restarting anything.
//! - `pause()` halts whatever is currently executing below the node; it
//!   is a silent no-op unless the node is running.
//! - `reverse()` builds a new, mirrored tree and never touches the
//!   receiver.
//!
//! # Example
//!
//! ```ignore
//! let fade = ctx.leaf(target, frames, None)?;
//! let grow = ctx.leaf(target, other_frames, Some(PartialTiming::duration(300)))?;
//!
//! let intro = fade.chain(&grow);
//! let outro = intro.reverse();
//!
//! let done = intro.chain(&outro).play();
//! // ... drive the scheduler, then
//! done.await?;
//! ```

use crate::completion::{Completion, Resolver};
use crate::leaf::LeafMotion;
use crate::parallel::ParallelMotion;
use crate::scheduler::Scheduler;
use crate::sequential::SequentialMotion;
use futures::FutureExt;
use motive_core::{
    normalize_keyframes, AnimationDriver, KeyframeSequence, KeyframeSource, MotionError, MotionId,
    PartialTiming, PlayState, PlayTrigger, Result, TargetId, Timing,
};
use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

/// Everything a leaf needs from the outside world
#[derive(Clone)]
pub struct MotionContext {
    driver: Rc<dyn AnimationDriver>,
    source: Rc<dyn KeyframeSource>,
    scheduler: Scheduler,
    default_timing: Timing,
}

impl MotionContext {
    pub fn new(
        driver: Rc<dyn AnimationDriver>,
        source: Rc<dyn KeyframeSource>,
        scheduler: Scheduler,
    ) -> Self {
        Self {
            driver,
            source,
            scheduler,
            default_timing: Timing::default(),
        }
    }

    /// Use one backend as both the driver and the keyframe source
    pub fn from_backend<B>(backend: Rc<B>, scheduler: Scheduler) -> Self
    where
        B: AnimationDriver + KeyframeSource + 'static,
    {
        Self::new(backend.clone(), backend, scheduler)
    }

    /// Builder: timing used for fields a leaf leaves unspecified
    pub fn with_default_timing(mut self, timing: Timing) -> Self {
        self.default_timing = timing;
        self
    }

    pub(crate) fn driver(&self) -> &dyn AnimationDriver {
        self.driver.as_ref()
    }

    /// Build a leaf motion for `target`
    ///
    /// Keyframes are validated and normalized here, once: they are sorted
    /// by offset and, when nothing sits at offset 0, a starting keyframe
    /// is read from the keyframe source and prepended.
    pub fn leaf(
        &self,
        target: TargetId,
        keyframes: impl Into<KeyframeSequence>,
        timing: Option<PartialTiming>,
    ) -> Result<Motion> {
        let timing = timing.unwrap_or_default().resolve(&self.default_timing);
        timing.validate()?;

        let keyframes = normalize_keyframes(target, &keyframes.into(), self.source.as_ref())?;
        let leaf = LeafMotion::new(self.clone(), target, keyframes, timing);

        Ok(Motion::from_kind(self.scheduler.clone(), MotionKind::Leaf(leaf)))
    }
}

impl fmt::Debug for MotionContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MotionContext")
            .field("default_timing", &self.default_timing)
            .finish_non_exhaustive()
    }
}

/// Closed set of node shapes
pub(crate) enum MotionKind {
    Leaf(LeafMotion),
    Sequential(SequentialMotion),
    Parallel(ParallelMotion),
}

/// Shared node state: identity, play state, and the bookkeeping of the
/// run currently in flight
pub(crate) struct MotionNode {
    pub(crate) id: MotionId,
    pub(crate) scheduler: Scheduler,
    pub(crate) kind: MotionKind,
    state: Cell<PlayState>,
    /// Bumped on every fresh run; continuations carry the run they belong to
    run: Cell<u64>,
    pending: RefCell<Option<Completion>>,
    resolver: RefCell<Option<Resolver>>,
}

impl MotionNode {
    pub(crate) fn play_state(&self) -> PlayState {
        self.state.get()
    }

    pub(crate) fn current_run(&self) -> u64 {
        self.run.get()
    }

    pub(crate) fn is_current_run(&self, run: u64) -> bool {
        self.run.get() == run && self.state.get().is_active()
    }

    fn kind_name(&self) -> &'static str {
        match self.kind {
            MotionKind::Leaf(_) => "leaf",
            MotionKind::Sequential(_) => "sequential",
            MotionKind::Parallel(_) => "parallel",
        }
    }

    /// Apply `trigger`; false when the transition table says no-op
    pub(crate) fn transition(&self, trigger: PlayTrigger) -> bool {
        let from = self.state.get();
        let Some(to) = from.on(trigger) else {
            return false;
        };

        self.state.set(to);
        tracing::trace!(
            motion = %self.id,
            kind = self.kind_name(),
            %from,
            %to,
            "play state transition"
        );
        true
    }

    /// Completion of the run in flight
    fn pending_completion(&self) -> Completion {
        self.pending.borrow().clone().unwrap_or_else(|| {
            Completion::failed(MotionError::scheduler("active motion has no completion"))
        })
    }

    /// Enter `running` with a fresh completion
    fn begin_run(&self) -> (u64, Completion) {
        let run = self.run.get() + 1;
        self.run.set(run);
        self.transition(PlayTrigger::Play);

        let (resolver, completion) = Completion::channel();
        *self.pending.borrow_mut() = Some(completion.clone());
        *self.resolver.borrow_mut() = Some(resolver);

        tracing::debug!(motion = %self.id, kind = self.kind_name(), run, "run started");
        (run, completion)
    }

    /// Settle run `run`; stale runs are ignored
    pub(crate) fn finish_run(&self, run: u64, result: Result<()>) {
        if !self.is_current_run(run) {
            tracing::trace!(motion = %self.id, run, "ignoring result of a stale run");
            return;
        }

        match &result {
            Ok(()) => {
                self.transition(PlayTrigger::Complete);
                tracing::debug!(motion = %self.id, kind = self.kind_name(), run, "run finished");
            }
            Err(err) => {
                self.transition(PlayTrigger::Fail);
                tracing::warn!(
                    motion = %self.id,
                    kind = self.kind_name(),
                    run,
                    error = %err,
                    "run failed"
                );
            }
        }

        self.pending.borrow_mut().take();
        if let Some(resolver) = self.resolver.borrow_mut().take() {
            resolver.resolve(result);
        }
    }

    /// Called by a continuation when child `index` of run `run` settles
    pub(crate) fn child_settled(self: &Rc<Self>, run: u64, index: usize, result: Result<()>) {
        match &self.kind {
            MotionKind::Sequential(seq) => seq.child_settled(self, run, index, result),
            MotionKind::Parallel(par) => par.child_settled(self, run, index, result),
            MotionKind::Leaf(_) => {}
        }
    }
}

/// A node in a motion tree
///
/// Cloning is cheap and yields another handle to the same node.
#[derive(Clone)]
pub struct Motion(pub(crate) Rc<MotionNode>);

impl Motion {
    pub(crate) fn from_kind(scheduler: Scheduler, kind: MotionKind) -> Self {
        Motion(Rc::new(MotionNode {
            id: MotionId::next(),
            scheduler,
            kind,
            state: Cell::new(PlayState::Idle),
            run: Cell::new(0),
            pending: RefCell::new(None),
            resolver: RefCell::new(None),
        }))
    }

    /// Run `children` one after another
    pub fn sequence(children: impl IntoIterator<Item = Motion>) -> Result<Motion> {
        let children: Vec<Motion> = children.into_iter().collect();
        let Some(first) = children.first() else {
            return Err(MotionError::configuration(
                "a sequential motion needs at least one child",
            ));
        };

        let scheduler = first.0.scheduler.clone();
        Ok(Motion::from_kind(
            scheduler,
            MotionKind::Sequential(SequentialMotion::new(children)),
        ))
    }

    /// Run `children` concurrently, completing when all have completed
    pub fn parallel(children: impl IntoIterator<Item = Motion>) -> Result<Motion> {
        let children: Vec<Motion> = children.into_iter().collect();
        let Some(first) = children.first() else {
            return Err(MotionError::configuration(
                "a parallel motion needs at least one child",
            ));
        };

        let scheduler = first.0.scheduler.clone();
        Ok(Motion::from_kind(
            scheduler,
            MotionKind::Parallel(ParallelMotion::new(children)),
        ))
    }

    /// New sequential motion `[self, next]`; neither operand is modified
    pub fn chain(&self, next: &Motion) -> Motion {
        Motion::from_kind(
            self.0.scheduler.clone(),
            MotionKind::Sequential(SequentialMotion::new(vec![self.clone(), next.clone()])),
        )
    }

    /// Structurally mirrored copy of this tree
    pub fn reverse(&self) -> Motion {
        let scheduler = self.0.scheduler.clone();
        let kind = match &self.0.kind {
            MotionKind::Leaf(leaf) => MotionKind::Leaf(leaf.reversed()),
            MotionKind::Sequential(seq) => MotionKind::Sequential(seq.reversed()),
            MotionKind::Parallel(par) => MotionKind::Parallel(par.reversed()),
        };

        let reversed = Motion::from_kind(scheduler, kind);
        tracing::trace!(source = %self.id(), reversed = %reversed.id(), "reversed motion");
        reversed
    }

    /// Start, resume, or join the current run
    pub fn play(&self) -> Completion {
        let node = &self.0;

        match node.play_state() {
            PlayState::Running => node.pending_completion(),
            PlayState::Paused => {
                node.transition(PlayTrigger::Play);
                match &node.kind {
                    MotionKind::Leaf(leaf) => leaf.resume(),
                    MotionKind::Sequential(seq) => seq.resume(node),
                    MotionKind::Parallel(par) => par.resume(),
                }
                node.pending_completion()
            }
            PlayState::Idle | PlayState::Finished => {
                let (run, completion) = node.begin_run();
                match &node.kind {
                    MotionKind::Leaf(leaf) => leaf.start(node, run),
                    MotionKind::Sequential(seq) => seq.start(node, run),
                    MotionKind::Parallel(par) => par.start(node, run),
                }

                // Poll the completion eagerly so its result is observable
                // even when the caller never awaits it.
                if let Err(err) = node.scheduler.spawn(completion.clone().map(|_| ())) {
                    tracing::warn!(motion = %node.id, error = %err, "could not watch run completion");
                }
                completion
            }
        }
    }

    /// Halt whatever is currently executing below this node
    pub fn pause(&self) {
        let node = &self.0;

        match &node.kind {
            MotionKind::Leaf(leaf) => leaf.pause(node),
            MotionKind::Sequential(seq) => {
                if node.transition(PlayTrigger::Pause) {
                    seq.pause_current();
                }
            }
            MotionKind::Parallel(par) => {
                if node.transition(PlayTrigger::Pause) {
                    par.pause_running();
                }
            }
        }
    }

    pub fn id(&self) -> MotionId {
        self.0.id
    }

    pub fn play_state(&self) -> PlayState {
        self.0.play_state()
    }

    /// `"leaf"`, `"sequential"`, or `"parallel"`
    pub fn kind_name(&self) -> &'static str {
        self.0.kind_name()
    }

    /// Direct children, empty for a leaf
    pub fn children(&self) -> &[Motion] {
        match &self.0.kind {
            MotionKind::Leaf(_) => &[],
            MotionKind::Sequential(seq) => seq.children(),
            MotionKind::Parallel(par) => par.children(),
        }
    }

    /// Normalized keyframes of a leaf
    pub fn keyframes(&self) -> Option<&KeyframeSequence> {
        match &self.0.kind {
            MotionKind::Leaf(leaf) => Some(leaf.keyframes()),
            _ => None,
        }
    }

    pub fn timing(&self) -> Option<&Timing> {
        match &self.0.kind {
            MotionKind::Leaf(leaf) => Some(leaf.timing()),
            _ => None,
        }
    }

    pub fn target(&self) -> Option<TargetId> {
        match &self.0.kind {
            MotionKind::Leaf(leaf) => Some(leaf.target()),
            _ => None,
        }
    }

    /// Whether a leaf currently owns a driver handle
    pub fn has_driver_handle(&self) -> bool {
        match &self.0.kind {
            MotionKind::Leaf(leaf) => leaf.has_handle(),
            _ => false,
        }
    }

    /// Whether both handles point at the same node
    pub fn is_same(&self, other: &Motion) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl fmt::Debug for Motion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Motion")
            .field("id", &self.id())
            .field("kind", &self.kind_name())
            .field("state", &self.play_state())
            .field("children", &self.children())
            .finish()
    }
}
