//! Sequential motions: children run strictly one after another
//!
//! Progress is tracked by index, never by looking a child up by identity,
//! so the same node may appear more than once in a chain.

use crate::motion::{Motion, MotionNode};
use motive_core::{PlayState, Result};
use smallvec::SmallVec;
use std::cell::Cell;
use std::rc::Rc;

pub(crate) struct SequentialMotion {
    children: SmallVec<[Motion; 4]>,
    /// Index of the child currently executing
    current: Cell<Option<usize>>,
    /// `current` was reached while paused and has not been started yet
    deferred: Cell<bool>,
}

impl SequentialMotion {
    pub(crate) fn new(children: impl IntoIterator<Item = Motion>) -> Self {
        Self {
            children: children.into_iter().collect(),
            current: Cell::new(None),
            deferred: Cell::new(false),
        }
    }

    pub(crate) fn children(&self) -> &[Motion] {
        &self.children
    }

    /// Children in reverse order, each one reversed
    pub(crate) fn reversed(&self) -> SequentialMotion {
        SequentialMotion::new(self.children.iter().rev().map(Motion::reverse))
    }

    pub(crate) fn start(&self, node: &Rc<MotionNode>, run: u64) {
        self.current.set(None);
        self.start_child(node, run, 0);
    }

    fn start_child(&self, node: &Rc<MotionNode>, run: u64, index: usize) {
        self.current.set(Some(index));
        self.deferred.set(false);

        let completion = self.children[index].play();

        let task_node = Rc::clone(node);
        let spawned = node.scheduler.spawn(async move {
            let result = completion.await;
            task_node.child_settled(run, index, result);
        });

        if let Err(err) = spawned {
            self.current.set(None);
            node.finish_run(run, Err(err));
        }
    }

    pub(crate) fn child_settled(
        &self,
        node: &Rc<MotionNode>,
        run: u64,
        index: usize,
        result: Result<()>,
    ) {
        if !node.is_current_run(run) {
            return;
        }

        if let Err(err) = result {
            self.current.set(None);
            node.finish_run(run, Err(err));
            return;
        }

        let next = index + 1;
        if next >= self.children.len() {
            self.current.set(None);
            node.finish_run(run, Ok(()));
        } else if node.play_state() == PlayState::Paused {
            tracing::trace!(motion = %node.id, next, "paused between children, deferring next child");
            self.current.set(Some(next));
            self.deferred.set(true);
        } else {
            self.start_child(node, run, next);
        }
    }

    /// Resume only the current child; later children are untouched
    pub(crate) fn resume(&self, node: &Rc<MotionNode>) {
        let Some(index) = self.current.get() else {
            return;
        };

        let child = &self.children[index];
        if self.deferred.get() {
            self.start_child(node, node.current_run(), index);
        } else if child.play_state().is_active() {
            // A child that finished while we were paused must not be replayed;
            // its settle continuation is already queued.
            let _ = child.play();
        }
    }

    pub(crate) fn pause_current(&self) {
        if self.deferred.get() {
            return;
        }
        if let Some(index) = self.current.get() {
            self.children[index].pause();
        }
    }
}
