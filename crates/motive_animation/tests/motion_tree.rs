//! Integration tests for motion trees on the timeline driver
//!
//! Every test drives time explicitly: `advance` ticks the driver and then
//! runs the local executor until no continuation can make progress.

use futures::executor::LocalPool;
use motive_animation::{Motion, MotionContext, Scheduler, TimelineDriver};
use motive_core::{
    AnimatableProperty::Opacity, Keyframe, MotionError, PartialTiming, PlayState, PropertyValue,
    TargetId,
};
use std::rc::Rc;

const A: TargetId = TargetId(1);
const B: TargetId = TargetId(2);

struct Harness {
    pool: LocalPool,
    driver: Rc<TimelineDriver>,
    ctx: MotionContext,
}

impl Harness {
    fn new() -> Self {
        let pool = LocalPool::new();
        let driver = Rc::new(TimelineDriver::new());
        for target in [A, B] {
            driver.register(target, [(Opacity, PropertyValue::Number(1.0))]);
        }

        let ctx = MotionContext::from_backend(driver.clone(), Scheduler::new(pool.spawner()));
        Self { pool, driver, ctx }
    }

    fn settle(&mut self) {
        self.pool.run_until_stalled();
    }

    fn advance(&mut self, ms: f32) {
        self.driver.tick(ms);
        self.settle();
    }

    fn fade(&self, target: TargetId, to: f32, duration_ms: u32) -> Motion {
        self.ctx
            .leaf(
                target,
                vec![
                    Keyframe::at(0.0).set(Opacity, 1.0),
                    Keyframe::at(1.0).set(Opacity, to),
                ],
                Some(PartialTiming::duration(duration_ms)),
            )
            .unwrap()
    }
}

#[test]
fn test_leaf_runs_to_finished_and_commits() {
    let mut h = Harness::new();
    let fade = h.fade(A, 0.0, 100);

    let done = fade.play();
    h.settle();
    assert_eq!(fade.play_state(), PlayState::Running);
    assert!(fade.has_driver_handle());

    h.advance(50.0);
    assert!(!done.is_resolved());

    h.advance(50.0);
    assert_eq!(fade.play_state(), PlayState::Finished);
    assert_eq!(done.peek(), Some(&Ok(())));

    // handle released, terminal values written through
    assert!(!fade.has_driver_handle());
    assert_eq!(h.driver.live_count(), 0);
    assert_eq!(h.driver.committed_value(A, Opacity), Some(PropertyValue::Number(0.0)));
}

#[test]
fn test_chain_pause_before_first_child_completes() {
    let mut h = Harness::new();
    let first = h
        .ctx
        .leaf(A, vec![Keyframe::at(0.5).set(Opacity, 0.5)], None)
        .unwrap();
    let second = h.fade(B, 0.0, 100);
    let root = first.chain(&second);

    let _done = root.play();
    root.pause();
    h.settle();

    assert_eq!(root.play_state(), PlayState::Paused);
    assert_eq!(first.play_state(), PlayState::Paused);
    assert_eq!(second.play_state(), PlayState::Idle);
}

#[test]
fn test_chain_never_starts_next_child_early() {
    let mut h = Harness::new();
    let first = h.fade(A, 0.0, 100);
    let second = h.fade(B, 0.0, 100);
    let root = first.chain(&second);

    let done = root.play();
    h.advance(99.0);
    assert!(!second.has_driver_handle());
    assert_eq!(h.driver.created_count(), 1);

    h.advance(1.0);
    assert_eq!(first.play_state(), PlayState::Finished);
    assert_eq!(second.play_state(), PlayState::Running);
    assert_eq!(h.driver.created_count(), 2);

    h.advance(100.0);
    assert_eq!(root.play_state(), PlayState::Finished);
    assert_eq!(done.peek(), Some(&Ok(())));
}

#[test]
fn test_paused_chain_defers_next_child() {
    let mut h = Harness::new();
    let first = h.fade(A, 0.0, 100);
    let second = h.fade(B, 0.0, 100);
    let root = first.chain(&second);

    let done = root.play();
    h.settle();

    // the first child reaches its end, then the chain is paused before
    // the continuation gets to run
    h.driver.tick(100.0);
    root.pause();
    h.settle();

    assert_eq!(first.play_state(), PlayState::Finished);
    assert_eq!(second.play_state(), PlayState::Idle);
    assert_eq!(root.play_state(), PlayState::Paused);

    h.advance(1000.0);
    assert_eq!(second.play_state(), PlayState::Idle);

    let resumed = root.play();
    assert!(resumed.ptr_eq(&done));
    assert_eq!(second.play_state(), PlayState::Running);

    h.advance(100.0);
    assert_eq!(root.play_state(), PlayState::Finished);
}

#[test]
fn test_resume_continues_from_where_it_halted() {
    let mut h = Harness::new();
    let fade = h.fade(A, 0.0, 100);

    let _done = fade.play();
    h.advance(40.0);
    fade.pause();
    h.advance(500.0);
    assert_eq!(fade.play_state(), PlayState::Paused);

    fade.play();
    h.advance(59.0);
    assert_eq!(fade.play_state(), PlayState::Running);
    h.advance(1.0);
    assert_eq!(fade.play_state(), PlayState::Finished);
}

#[test]
fn test_parallel_children_start_together_and_join() {
    let mut h = Harness::new();
    let x = h.fade(A, 0.0, 100);
    let y = h.fade(B, 0.0, 100);
    let root = Motion::parallel([x.clone(), y.clone()]).unwrap();

    let done = root.play();
    assert_eq!(h.driver.running_count(), 2);
    assert_eq!(x.play_state(), PlayState::Running);
    assert_eq!(y.play_state(), PlayState::Running);

    h.advance(100.0);
    assert_eq!(x.play_state(), PlayState::Finished);
    assert_eq!(y.play_state(), PlayState::Finished);
    assert_eq!(root.play_state(), PlayState::Finished);
    assert_eq!(done.peek(), Some(&Ok(())));
}

#[test]
fn test_parallel_waits_for_slowest_child() {
    let mut h = Harness::new();
    let quick = h.fade(A, 0.0, 100);
    let slow = h.fade(B, 0.0, 300);
    let root = Motion::parallel([quick.clone(), slow.clone()]).unwrap();

    let done = root.play();
    h.advance(100.0);
    assert_eq!(quick.play_state(), PlayState::Finished);
    assert_eq!(root.play_state(), PlayState::Running);
    assert!(!done.is_resolved());

    h.advance(199.0);
    assert!(!done.is_resolved());

    h.advance(1.0);
    assert_eq!(root.play_state(), PlayState::Finished);
    assert!(done.is_resolved());
}

#[test]
fn test_parallel_resume_skips_finished_children() {
    let mut h = Harness::new();
    let quick = h.fade(A, 0.0, 100);
    let slow = h.fade(B, 0.0, 300);
    let root = Motion::parallel([quick.clone(), slow.clone()]).unwrap();

    let _done = root.play();
    h.advance(100.0);
    root.pause();
    assert_eq!(slow.play_state(), PlayState::Paused);
    assert_eq!(quick.play_state(), PlayState::Finished);

    h.advance(1000.0);
    root.play();
    assert_eq!(quick.play_state(), PlayState::Finished);
    assert_eq!(h.driver.created_count(), 2);

    h.advance(200.0);
    assert_eq!(root.play_state(), PlayState::Finished);
}

#[test]
fn test_play_while_running_returns_same_completion() {
    let mut h = Harness::new();
    let root = h.fade(A, 0.0, 100).chain(&h.fade(B, 0.0, 100));

    let first = root.play();
    let second = root.play();
    assert!(first.ptr_eq(&second));
    assert_eq!(h.driver.created_count(), 1);

    h.settle();
    assert!(root.play().ptr_eq(&first));
    assert_eq!(h.driver.created_count(), 1);
}

#[test]
fn test_replay_after_finished_gets_fresh_completion() {
    let mut h = Harness::new();
    let fade = h.fade(A, 0.0, 100);

    let first = fade.play();
    h.advance(100.0);
    assert_eq!(fade.play_state(), PlayState::Finished);

    let second = fade.play();
    assert!(!second.ptr_eq(&first));
    assert_eq!(fade.play_state(), PlayState::Running);
    assert_eq!(h.driver.created_count(), 2);

    h.advance(100.0);
    assert_eq!(second.peek(), Some(&Ok(())));
}

#[test]
fn test_pause_outside_running_is_a_no_op() {
    let mut h = Harness::new();
    let fade = h.fade(A, 0.0, 100);
    let root = fade.chain(&h.fade(B, 0.0, 100));

    root.pause();
    fade.pause();
    assert_eq!(root.play_state(), PlayState::Idle);
    assert_eq!(fade.play_state(), PlayState::Idle);

    let _done = root.play();
    h.advance(100.0);
    h.advance(100.0);
    assert_eq!(root.play_state(), PlayState::Finished);

    root.pause();
    assert_eq!(root.play_state(), PlayState::Finished);
}

#[test]
fn test_same_child_twice_in_a_chain() {
    let mut h = Harness::new();
    let fade = h.fade(A, 0.0, 100);
    let root = Motion::sequence([fade.clone(), fade.clone()]).unwrap();

    let done = root.play();
    h.advance(100.0);
    // second slot replays the same node
    assert_eq!(fade.play_state(), PlayState::Running);
    assert_eq!(root.play_state(), PlayState::Running);
    assert_eq!(h.driver.created_count(), 2);

    h.advance(100.0);
    assert_eq!(root.play_state(), PlayState::Finished);
    assert_eq!(done.peek(), Some(&Ok(())));
}

#[test]
fn test_empty_composites_are_rejected() {
    assert!(matches!(
        Motion::sequence(Vec::new()),
        Err(MotionError::Configuration(_))
    ));
    assert!(matches!(
        Motion::parallel(Vec::new()),
        Err(MotionError::Configuration(_))
    ));
}

#[test]
fn test_leaf_normalizes_from_rendered_state() {
    let h = Harness::new();
    h.driver.set_value(A, Opacity, 0.2).unwrap();

    let leaf = h
        .ctx
        .leaf(A, vec![Keyframe::at(0.5).set(Opacity, 0.5)], None)
        .unwrap();

    let frames = leaf.keyframes().unwrap().frames();
    assert_eq!(frames.len(), 2);
    assert_eq!(frames[0].offset, Some(0.0));
    assert_eq!(frames[0].get(Opacity), Some(&PropertyValue::Number(0.2)));
    assert_eq!(frames[1].offset, Some(0.5));
    assert_eq!(frames[1].get(Opacity), Some(&PropertyValue::Number(0.5)));

    // omitted timing falls back to the defaults
    let timing = leaf.timing().unwrap();
    assert_eq!(timing.duration_ms, 5000);
    assert_eq!(timing.iterations, 1.0);

    let reversed = leaf.reverse();
    let frames = reversed.keyframes().unwrap().frames();
    assert_eq!(frames[0].offset, Some(0.5));
    assert_eq!(frames[0].get(Opacity), Some(&PropertyValue::Number(0.5)));
    assert_eq!(frames[1].offset, Some(1.0));
    assert_eq!(frames[1].get(Opacity), Some(&PropertyValue::Number(0.2)));
}

#[test]
fn test_reverse_mirrors_offsets_and_keeps_duration() {
    let h = Harness::new();
    let leaf = h
        .ctx
        .leaf(
            A,
            vec![
                Keyframe::at(0.0).set(Opacity, 0.0),
                Keyframe::at(0.25).set(Opacity, 0.5),
                Keyframe::at(1.0).set(Opacity, 1.0),
            ],
            Some(PartialTiming::duration(300)),
        )
        .unwrap();

    let reversed = leaf.reverse();
    let offsets: Vec<_> = reversed
        .keyframes()
        .unwrap()
        .iter()
        .map(|frame| frame.offset)
        .collect();
    assert_eq!(offsets, vec![Some(0.0), Some(0.75), Some(1.0)]);
    assert_eq!(reversed.timing(), leaf.timing());
    assert_eq!(reversed.target(), Some(A));

    // the receiver is untouched
    assert_eq!(leaf.keyframes().unwrap().frames()[1].offset, Some(0.25));
    assert!(!reversed.is_same(&leaf));
}

#[test]
fn test_reversed_chain_runs_back_to_front() {
    let mut h = Harness::new();
    let first = h.fade(A, 0.0, 100);
    let second = h.fade(B, 0.0, 200);
    let root = first.chain(&second);

    let reversed = root.reverse();
    assert_eq!(reversed.kind_name(), "sequential");
    assert_eq!(reversed.children()[0].target(), Some(B));
    assert_eq!(reversed.children()[1].target(), Some(A));

    let _done = reversed.play();
    h.settle();
    assert_eq!(h.driver.running_on(B), 1);
    assert_eq!(h.driver.running_on(A), 0);

    h.advance(200.0);
    assert_eq!(h.driver.running_on(A), 1);

    h.advance(100.0);
    assert_eq!(reversed.play_state(), PlayState::Finished);
    // the unreversed tree never ran
    assert_eq!(root.play_state(), PlayState::Idle);
}

#[test]
fn test_reversed_parallel_reverses_child_list() {
    let h = Harness::new();
    let root = Motion::parallel([h.fade(A, 0.0, 100), h.fade(B, 0.0, 100)]).unwrap();

    let reversed = root.reverse();
    assert_eq!(reversed.kind_name(), "parallel");
    assert_eq!(reversed.children()[0].target(), Some(B));
    assert_eq!(reversed.children()[1].target(), Some(A));
}

#[test]
fn test_nested_tree_completes() {
    let mut h = Harness::new();
    let intro = h.fade(A, 0.5, 100).chain(&h.fade(A, 0.0, 100));
    let side = h.fade(B, 0.0, 150);
    let root = Motion::parallel([intro.clone(), side.clone()]).unwrap();

    let done = root.play();
    h.advance(150.0);
    assert_eq!(side.play_state(), PlayState::Finished);
    assert_eq!(intro.play_state(), PlayState::Running);

    root.pause();
    assert_eq!(intro.play_state(), PlayState::Paused);
    assert_eq!(intro.children()[1].play_state(), PlayState::Paused);

    root.play();
    h.advance(100.0);
    assert_eq!(root.play_state(), PlayState::Finished);
    assert_eq!(done.peek(), Some(&Ok(())));
    assert_eq!(h.driver.committed_value(A, Opacity), Some(PropertyValue::Number(0.0)));
}

#[test]
fn test_ids_are_unique_and_increasing() {
    let h = Harness::new();
    let first = h.fade(A, 0.0, 100);
    let second = h.fade(A, 0.0, 100);
    let chained = first.chain(&second);

    assert!(first.id() < second.id());
    assert!(second.id() < chained.id());
    assert!(chained.id() < chained.reverse().id());
}
