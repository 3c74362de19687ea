//! Animation driver contracts
//!
//! The composition engine never renders anything itself. A driver turns a
//! target plus a keyframe sequence into a controllable handle, and a
//! keyframe source reports what a target currently looks like so implicit
//! starting keyframes can be filled in.

use crate::error::Result;
use crate::keyframe::{AnimatableProperty, Keyframe, KeyframeSequence, TargetId};
use crate::state::PlayState;
use crate::timing::Timing;
use futures::future::LocalBoxFuture;
use indexmap::IndexSet;
use std::rc::Rc;

/// Creates controllable effect handles
pub trait AnimationDriver {
    /// Build a paused handle for `keyframes` on `target`
    ///
    /// Fails with [`MotionError::Driver`](crate::MotionError::Driver) when
    /// the target or the sequence cannot be animated.
    fn create_handle(
        &self,
        target: TargetId,
        keyframes: &KeyframeSequence,
        timing: &Timing,
    ) -> Result<Rc<dyn AnimationHandle>>;
}

/// A running (or runnable) effect owned by exactly one leaf motion
pub trait AnimationHandle {
    /// Start or resume; a no-op when already running
    fn play(&self);

    /// Halt in place; a no-op when not running
    fn pause(&self);

    fn play_state(&self) -> PlayState;

    /// Resolves once, when the timeline reaches its natural end
    fn completion(&self) -> LocalBoxFuture<'static, Result<()>>;

    /// Write the terminal computed values onto the target permanently
    fn commit_final_state(&self) -> Result<()>;
}

/// Reads the currently rendered state of a target
pub trait KeyframeSource {
    /// Keyframe at offset 0 holding the rendered value of each property
    fn starting_keyframe(
        &self,
        target: TargetId,
        properties: &IndexSet<AnimatableProperty>,
    ) -> Result<Keyframe>;
}

impl<T: AnimationDriver + ?Sized> AnimationDriver for Rc<T> {
    fn create_handle(
        &self,
        target: TargetId,
        keyframes: &KeyframeSequence,
        timing: &Timing,
    ) -> Result<Rc<dyn AnimationHandle>> {
        (**self).create_handle(target, keyframes, timing)
    }
}

impl<T: KeyframeSource + ?Sized> KeyframeSource for Rc<T> {
    fn starting_keyframe(
        &self,
        target: TargetId,
        properties: &IndexSet<AnimatableProperty>,
    ) -> Result<Keyframe> {
        (**self).starting_keyframe(target, properties)
    }
}

/// Sort `frames` and make sure they start at offset 0
///
/// Runs once when a leaf is built. The sequence is validated, stably
/// sorted by offset, and if the first frame is not pinned at exactly 0 a
/// starting frame covering every referenced property is read from
/// `source` and prepended.
pub fn normalize_keyframes(
    target: TargetId,
    frames: &KeyframeSequence,
    source: &dyn KeyframeSource,
) -> Result<KeyframeSequence> {
    frames.validate()?;

    let sorted = frames.sorted_by_offset();
    if sorted.has_start_frame() {
        return Ok(sorted);
    }

    let mut start = source.starting_keyframe(target, &sorted.properties())?;
    start.offset = Some(0.0);
    tracing::trace!(%target, properties = start.properties.len(), "derived implicit start keyframe");

    Ok(sorted.with_start_frame(start))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keyframe::{AnimatableProperty::*, PropertyValue};
    use crate::MotionError;

    /// Reports a fixed rendered value for every property
    struct FixedSource;

    impl KeyframeSource for FixedSource {
        fn starting_keyframe(
            &self,
            _target: TargetId,
            properties: &IndexSet<AnimatableProperty>,
        ) -> Result<Keyframe> {
            Ok(properties
                .iter()
                .fold(Keyframe::at(0.0), |frame, prop| frame.set(*prop, 1.0)))
        }
    }

    struct BrokenSource;

    impl KeyframeSource for BrokenSource {
        fn starting_keyframe(
            &self,
            target: TargetId,
            _properties: &IndexSet<AnimatableProperty>,
        ) -> Result<Keyframe> {
            Err(MotionError::driver(format!("{target} is not mounted")))
        }
    }

    #[test]
    fn test_normalize_prepends_derived_start() {
        let frames = KeyframeSequence::new(vec![Keyframe::at(0.5).set(Opacity, 0.5)]);
        let normalized = normalize_keyframes(TargetId(1), &frames, &FixedSource).unwrap();

        assert_eq!(normalized.len(), 2);
        assert_eq!(normalized.frames()[0].offset, Some(0.0));
        assert_eq!(
            normalized.frames()[0].get(Opacity),
            Some(&PropertyValue::Number(1.0))
        );
        assert_eq!(normalized.frames()[1], frames.frames()[0]);
    }

    #[test]
    fn test_normalize_keeps_explicit_start() {
        let frames = KeyframeSequence::new(vec![
            Keyframe::at(1.0).set(Width, "300px"),
            Keyframe::at(0.0).set(Width, "100px"),
        ]);
        // BrokenSource proves the source is never consulted
        let normalized = normalize_keyframes(TargetId(1), &frames, &BrokenSource).unwrap();

        assert_eq!(normalized.len(), 2);
        assert_eq!(normalized.frames()[0].offset, Some(0.0));
        assert_eq!(normalized.frames()[1].offset, Some(1.0));
    }

    #[test]
    fn test_normalize_treats_missing_first_offset_as_unpinned() {
        let frames = KeyframeSequence::new(vec![Keyframe::implicit().set(Height, 10.0)]);
        let normalized = normalize_keyframes(TargetId(1), &frames, &FixedSource).unwrap();

        assert_eq!(normalized.len(), 2);
        assert_eq!(normalized.frames()[0].offset, Some(0.0));
        assert_eq!(normalized.frames()[1].offset, None);
    }

    #[test]
    fn test_normalize_surfaces_errors() {
        let empty = KeyframeSequence::default();
        assert!(matches!(
            normalize_keyframes(TargetId(1), &empty, &FixedSource),
            Err(MotionError::Configuration(_))
        ));

        let frames = KeyframeSequence::new(vec![Keyframe::at(0.5).set(Opacity, 0.5)]);
        assert!(matches!(
            normalize_keyframes(TargetId(1), &frames, &BrokenSource),
            Err(MotionError::Driver(_))
        ));
    }
}
