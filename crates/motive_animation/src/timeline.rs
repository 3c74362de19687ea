//! Tick-driven timeline driver
//!
//! A self-contained [`AnimationDriver`] for headless use and tests. Targets
//! are registered with their committed property values; every handle owns
//! one timeline that advances only when [`TimelineDriver::tick`] is called.
//! Rendered values are the committed values with every live timeline's
//! sample layered on top, oldest first.

use futures::channel::oneshot;
use futures::future::{self, FutureExt, LocalBoxFuture};
use indexmap::IndexMap;
use motive_core::{
    AnimatableProperty, AnimationDriver, AnimationHandle, Easing, Keyframe, KeyframeSequence,
    KeyframeSource, MotionError, PlayState, PropertyValue, Result, TargetId, Timing,
};
use rustc_hash::FxHashMap;
use slotmap::{new_key_type, SlotMap};
use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};

new_key_type! {
    /// Identifier for a timeline inside the driver
    pub struct TimelineKey;
}

/// Property values of one target
pub type PropertyMap = IndexMap<AnimatableProperty, PropertyValue>;

/// One keyframe value on a single property's track
#[derive(Clone, Debug)]
struct TrackPoint {
    offset: f32,
    value: PropertyValue,
    /// Easing of the segment starting here
    easing: Easing,
}

struct Timeline {
    target: TargetId,
    /// Creation order, used to layer samples
    seq: u64,
    tracks: IndexMap<AnimatableProperty, Vec<TrackPoint>>,
    timing: Timing,
    state: PlayState,
    current_time: f32,
    /// Values rendered when the timeline first started, the implicit start frame
    start_values: PropertyMap,
    outcome: Option<Result<()>>,
    waiters: Vec<oneshot::Sender<Result<()>>>,
}

impl Timeline {
    fn new(target: TargetId, seq: u64, keyframes: &KeyframeSequence, timing: Timing) -> Self {
        let mut tracks: IndexMap<AnimatableProperty, Vec<TrackPoint>> = IndexMap::new();

        for (frame, offset) in keyframes.iter().zip(keyframes.computed_offsets()) {
            let easing = frame.easing.unwrap_or_default();
            for (property, value) in &frame.properties {
                tracks.entry(*property).or_default().push(TrackPoint {
                    offset,
                    value: value.clone(),
                    easing,
                });
            }
        }

        for points in tracks.values_mut() {
            points.sort_by(|a, b| a.offset.total_cmp(&b.offset));
        }

        Self {
            target,
            seq,
            tracks,
            timing,
            state: PlayState::Idle,
            current_time: 0.0,
            start_values: PropertyMap::new(),
            outcome: None,
            waiters: Vec::new(),
        }
    }

    /// Progress within the current iteration (0.0 to 1.0)
    fn iteration_progress(&self) -> f32 {
        let duration = self.timing.duration_ms as f32;
        if duration <= 0.0 {
            return 1.0;
        }

        match self.timing.active_duration_ms() {
            Some(end) if self.current_time >= end => {
                let total = end / duration;
                let fraction = total.fract();
                // Ending exactly on an iteration boundary shows that iteration's last frame
                if fraction == 0.0 && total > 0.0 {
                    1.0
                } else {
                    fraction
                }
            }
            _ => (self.current_time / duration).fract(),
        }
    }

    fn sample(&self) -> PropertyMap {
        let progress = self.iteration_progress();
        self.tracks
            .iter()
            .map(|(property, points)| {
                let start = self.start_values.get(property);
                (*property, sample_track(points, start, progress))
            })
            .collect()
    }

    /// Whether the timeline contributes to the rendered values right now
    fn in_effect(&self) -> bool {
        match self.state {
            PlayState::Running | PlayState::Paused => true,
            PlayState::Idle => self.timing.fill.fills_backwards(),
            PlayState::Finished => self.timing.fill.fills_forwards(),
        }
    }

    fn settle(&mut self, result: Result<()>) {
        for waiter in self.waiters.drain(..) {
            let _ = waiter.send(result.clone());
        }
        self.outcome = Some(result);
    }
}

/// Sample one property track at `progress`
///
/// Before the first point the value blends from the implicit start value
/// (when there is one); after the last point it holds.
fn sample_track(
    points: &[TrackPoint],
    start: Option<&PropertyValue>,
    progress: f32,
) -> PropertyValue {
    let first = &points[0];
    if progress < first.offset {
        return match start {
            Some(start) => start.interpolate(&first.value, progress / first.offset),
            None => first.value.clone(),
        };
    }

    let prev_idx = points
        .iter()
        .rposition(|point| point.offset <= progress)
        .unwrap_or(0);
    let prev = &points[prev_idx];
    let Some(next) = points.get(prev_idx + 1) else {
        return prev.value.clone();
    };

    let span = next.offset - prev.offset;
    if span <= f32::EPSILON {
        return next.value.clone();
    }

    let local = (progress - prev.offset) / span;
    prev.value.interpolate(&next.value, prev.easing.apply(local))
}

#[derive(Default)]
struct DriverState {
    /// Committed values per target
    store: FxHashMap<TargetId, PropertyMap>,
    timelines: SlotMap<TimelineKey, Timeline>,
    created: u64,
}

impl DriverState {
    fn rendered_values(
        &self,
        target: TargetId,
        exclude: Option<TimelineKey>,
    ) -> Option<PropertyMap> {
        let mut values = self.store.get(&target)?.clone();

        let mut live: Vec<&Timeline> = self
            .timelines
            .iter()
            .filter(|(key, tl)| Some(*key) != exclude && tl.target == target && tl.in_effect())
            .map(|(_, tl)| tl)
            .collect();
        live.sort_by_key(|tl| tl.seq);

        for tl in live {
            values.extend(tl.sample());
        }
        Some(values)
    }
}

/// Headless driver advanced by explicit ticks
#[derive(Clone, Default)]
pub struct TimelineDriver {
    state: Rc<RefCell<DriverState>>,
}

impl TimelineDriver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make `target` animatable, seeding its committed values
    pub fn register(
        &self,
        target: TargetId,
        values: impl IntoIterator<Item = (AnimatableProperty, PropertyValue)>,
    ) {
        let mut state = self.state.borrow_mut();
        state.store.entry(target).or_default().extend(values);
    }

    /// Overwrite one committed value
    pub fn set_value(
        &self,
        target: TargetId,
        property: AnimatableProperty,
        value: impl Into<PropertyValue>,
    ) -> Result<()> {
        let mut state = self.state.borrow_mut();
        let values = state
            .store
            .get_mut(&target)
            .ok_or_else(|| unknown_target(target))?;
        values.insert(property, value.into());
        Ok(())
    }

    /// Remove `target`; timelines still running on it fail
    pub fn detach(&self, target: TargetId) -> bool {
        let mut state = self.state.borrow_mut();
        let existed = state.store.remove(&target).is_some();

        for (_, tl) in state.timelines.iter_mut() {
            if tl.target == target && tl.outcome.is_none() {
                tl.state = PlayState::Idle;
                tl.settle(Err(MotionError::driver(format!(
                    "{target} was detached mid-animation"
                ))));
            }
        }

        if existed {
            tracing::debug!(%target, "detached target");
        }
        existed
    }

    /// Committed value, ignoring any running timeline
    pub fn committed_value(
        &self,
        target: TargetId,
        property: AnimatableProperty,
    ) -> Option<PropertyValue> {
        let state = self.state.borrow();
        state.store.get(&target)?.get(&property).cloned()
    }

    /// What the target currently shows for `property`
    pub fn rendered_value(
        &self,
        target: TargetId,
        property: AnimatableProperty,
    ) -> Option<PropertyValue> {
        let values = self.rendered_values(target)?;
        Some(
            values
                .get(&property)
                .cloned()
                .unwrap_or_else(|| property.initial_value()),
        )
    }

    pub fn rendered_values(&self, target: TargetId) -> Option<PropertyMap> {
        self.state.borrow().rendered_values(target, None)
    }

    /// Advance every running timeline by `dt_ms`
    ///
    /// Timelines that reach their natural end resolve their completions
    /// here; the awaiting continuations run the next time the executor
    /// is polled.
    pub fn tick(&self, dt_ms: f32) {
        let mut state = self.state.borrow_mut();

        for (key, tl) in state.timelines.iter_mut() {
            if tl.state != PlayState::Running {
                continue;
            }

            tl.current_time += dt_ms;

            let Some(end) = tl.timing.active_duration_ms() else {
                continue;
            };
            if tl.current_time >= end {
                tl.current_time = end;
                tl.state = PlayState::Finished;
                tl.settle(Ok(()));
                tracing::trace!(?key, target = %tl.target, "timeline finished");
            }
        }
    }

    /// Handles ever created
    pub fn created_count(&self) -> u64 {
        self.state.borrow().created
    }

    /// Timelines whose handles are still alive
    pub fn live_count(&self) -> usize {
        self.state.borrow().timelines.len()
    }

    pub fn running_count(&self) -> usize {
        self.state
            .borrow()
            .timelines
            .values()
            .filter(|tl| tl.state == PlayState::Running)
            .count()
    }

    /// Running timelines on `target`
    pub fn running_on(&self, target: TargetId) -> usize {
        self.state
            .borrow()
            .timelines
            .values()
            .filter(|tl| tl.target == target && tl.state == PlayState::Running)
            .count()
    }
}

impl fmt::Debug for TimelineDriver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.borrow();
        f.debug_struct("TimelineDriver")
            .field("targets", &state.store.len())
            .field("timelines", &state.timelines.len())
            .field("created", &state.created)
            .finish()
    }
}

fn unknown_target(target: TargetId) -> MotionError {
    MotionError::driver(format!("{target} is not registered"))
}

impl AnimationDriver for TimelineDriver {
    fn create_handle(
        &self,
        target: TargetId,
        keyframes: &KeyframeSequence,
        timing: &Timing,
    ) -> Result<Rc<dyn AnimationHandle>> {
        let mut state = self.state.borrow_mut();

        if !state.store.contains_key(&target) {
            return Err(unknown_target(target));
        }
        if keyframes.is_empty() {
            return Err(MotionError::driver("cannot animate an empty keyframe sequence"));
        }
        timing
            .validate()
            .map_err(|e| MotionError::driver(e.to_string()))?;

        state.created += 1;
        let seq = state.created;
        let key = state
            .timelines
            .insert(Timeline::new(target, seq, keyframes, *timing));

        tracing::trace!(?key, %target, duration_ms = timing.duration_ms, "created timeline");
        Ok(Rc::new(TimelineHandle {
            key,
            state: Rc::downgrade(&self.state),
        }))
    }
}

impl KeyframeSource for TimelineDriver {
    fn starting_keyframe(
        &self,
        target: TargetId,
        properties: &indexmap::IndexSet<AnimatableProperty>,
    ) -> Result<Keyframe> {
        let rendered = self
            .rendered_values(target)
            .ok_or_else(|| unknown_target(target))?;

        Ok(properties.iter().fold(Keyframe::at(0.0), |frame, property| {
            let value = rendered
                .get(property)
                .cloned()
                .unwrap_or_else(|| property.initial_value());
            frame.set(*property, value)
        }))
    }
}

/// Handle to one timeline; dropping it removes the timeline
pub struct TimelineHandle {
    key: TimelineKey,
    state: Weak<RefCell<DriverState>>,
}

impl AnimationHandle for TimelineHandle {
    fn play(&self) {
        let Some(shared) = self.state.upgrade() else {
            return;
        };
        let mut state = shared.borrow_mut();

        let Some((target, current)) = state
            .timelines
            .get(self.key)
            .map(|tl| (tl.target, tl.state))
        else {
            return;
        };

        let start_values = if current.starts_fresh_run() {
            state.rendered_values(target, Some(self.key))
        } else {
            None
        };

        let Some(tl) = state.timelines.get_mut(self.key) else {
            return;
        };

        match current {
            PlayState::Running => {}
            PlayState::Paused => tl.state = PlayState::Running,
            PlayState::Idle | PlayState::Finished => {
                tl.current_time = 0.0;
                tl.outcome = None;
                tl.start_values = start_values.unwrap_or_default();
                tl.state = PlayState::Running;
            }
        }
    }

    fn pause(&self) {
        let Some(shared) = self.state.upgrade() else {
            return;
        };
        let mut state = shared.borrow_mut();
        if let Some(tl) = state.timelines.get_mut(self.key) {
            if tl.state == PlayState::Running {
                tl.state = PlayState::Paused;
            }
        }
    }

    fn play_state(&self) -> PlayState {
        let Some(shared) = self.state.upgrade() else {
            return PlayState::Idle;
        };
        let state = shared.borrow();
        state
            .timelines
            .get(self.key)
            .map(|tl| tl.state)
            .unwrap_or_default()
    }

    fn completion(&self) -> LocalBoxFuture<'static, Result<()>> {
        let Some(shared) = self.state.upgrade() else {
            return future::ready(Err(MotionError::driver("timeline driver was dropped")))
                .boxed_local();
        };
        let mut state = shared.borrow_mut();
        let Some(tl) = state.timelines.get_mut(self.key) else {
            return future::ready(Err(MotionError::driver("timeline no longer exists")))
                .boxed_local();
        };

        if let Some(outcome) = &tl.outcome {
            return future::ready(outcome.clone()).boxed_local();
        }

        let (tx, rx) = oneshot::channel();
        tl.waiters.push(tx);
        async move {
            rx.await.unwrap_or_else(|_| {
                Err(MotionError::driver("timeline was removed before it finished"))
            })
        }
        .boxed_local()
    }

    fn commit_final_state(&self) -> Result<()> {
        let shared = self
            .state
            .upgrade()
            .ok_or_else(|| MotionError::driver("timeline driver was dropped"))?;
        let mut state = shared.borrow_mut();

        let tl = state
            .timelines
            .get(self.key)
            .ok_or_else(|| MotionError::driver("timeline no longer exists"))?;
        let target = tl.target;
        let values = tl.sample();

        let committed = state
            .store
            .get_mut(&target)
            .ok_or_else(|| unknown_target(target))?;
        committed.extend(values);

        tracing::trace!(key = ?self.key, %target, "committed final values");
        Ok(())
    }
}

impl Drop for TimelineHandle {
    fn drop(&mut self) {
        let Some(shared) = self.state.upgrade() else {
            return;
        };
        // the driver never drops handles while its state is borrowed;
        // if a caller does, the timeline stays in the driver
        match shared.try_borrow_mut() {
            Ok(mut state) => {
                state.timelines.remove(self.key);
            }
            Err(_) => {
                tracing::trace!(key = ?self.key, "driver state busy, timeline left behind")
            }
        };
    }
}
