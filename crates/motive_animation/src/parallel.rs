//! Parallel motions: all children start together, the group completes
//! once every child has

use crate::motion::{Motion, MotionNode};
use motive_core::Result;
use rustc_hash::FxHashSet;
use smallvec::SmallVec;
use std::cell::RefCell;
use std::rc::Rc;

pub(crate) struct ParallelMotion {
    children: SmallVec<[Motion; 4]>,
    /// Indices of children still executing in the current run
    running: RefCell<FxHashSet<usize>>,
}

impl ParallelMotion {
    pub(crate) fn new(children: impl IntoIterator<Item = Motion>) -> Self {
        Self {
            children: children.into_iter().collect(),
            running: RefCell::new(FxHashSet::default()),
        }
    }

    pub(crate) fn children(&self) -> &[Motion] {
        &self.children
    }

    /// Reversed list of per-child reversals. The list order has no
    /// scheduling effect since every child starts at once.
    pub(crate) fn reversed(&self) -> ParallelMotion {
        ParallelMotion::new(self.children.iter().rev().map(Motion::reverse))
    }

    pub(crate) fn start(&self, node: &Rc<MotionNode>, run: u64) {
        *self.running.borrow_mut() = (0..self.children.len()).collect();

        for (index, child) in self.children.iter().enumerate() {
            let completion = child.play();

            let task_node = Rc::clone(node);
            let spawned = node.scheduler.spawn(async move {
                let result = completion.await;
                task_node.child_settled(run, index, result);
            });

            if let Err(err) = spawned {
                self.running.borrow_mut().clear();
                node.finish_run(run, Err(err));
                return;
            }
        }
    }

    /// Join: the first failure rejects the group at once, siblings keep
    /// playing on their own
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
            self.running.borrow_mut().clear();
            node.finish_run(run, Err(err));
            return;
        }

        let remaining = {
            let mut running = self.running.borrow_mut();
            running.remove(&index);
            running.len()
        };

        if remaining == 0 {
            node.finish_run(run, Ok(()));
        }
    }

    fn running_children(&self) -> Vec<Motion> {
        self.running
            .borrow()
            .iter()
            .map(|&index| self.children[index].clone())
            .collect()
    }

    pub(crate) fn resume(&self) {
        for child in self.running_children() {
            if child.play_state().is_active() {
                let _ = child.play();
            }
        }
    }

    pub(crate) fn pause_running(&self) {
        for child in self.running_children() {
            child.pause();
        }
    }
}
