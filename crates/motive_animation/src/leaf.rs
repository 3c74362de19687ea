//! Leaf motions: one target, one keyframe sequence, one driver handle

use crate::motion::{MotionContext, MotionKind, MotionNode};
use motive_core::{
    AnimationHandle, KeyframeSequence, PlayState, PlayTrigger, Result, TargetId, Timing,
};
use std::cell::RefCell;
use std::rc::Rc;

pub(crate) struct LeafMotion {
    ctx: MotionContext,
    target: TargetId,
    /// Already normalized
    keyframes: KeyframeSequence,
    timing: Timing,
    /// Created on the first play of a run, released when the run ends
    handle: RefCell<Option<Rc<dyn AnimationHandle>>>,
}

impl LeafMotion {
    pub(crate) fn new(
        ctx: MotionContext,
        target: TargetId,
        keyframes: KeyframeSequence,
        timing: Timing,
    ) -> Self {
        Self {
            ctx,
            target,
            keyframes,
            timing,
            handle: RefCell::new(None),
        }
    }

    pub(crate) fn target(&self) -> TargetId {
        self.target
    }

    pub(crate) fn keyframes(&self) -> &KeyframeSequence {
        &self.keyframes
    }

    pub(crate) fn timing(&self) -> &Timing {
        &self.timing
    }

    pub(crate) fn has_handle(&self) -> bool {
        self.handle.borrow().is_some()
    }

    /// Same target and timing, keyframes traversed back to front with
    /// mirrored offsets. The result is not normalized again.
    pub(crate) fn reversed(&self) -> LeafMotion {
        LeafMotion::new(
            self.ctx.clone(),
            self.target,
            self.keyframes.reversed(),
            self.timing,
        )
    }

    fn current_handle(&self) -> Option<Rc<dyn AnimationHandle>> {
        self.handle.borrow().clone()
    }

    fn ensure_handle(&self) -> Result<Rc<dyn AnimationHandle>> {
        if let Some(handle) = self.current_handle() {
            return Ok(handle);
        }

        let handle = self
            .ctx
            .driver()
            .create_handle(self.target, &self.keyframes, &self.timing)?;
        *self.handle.borrow_mut() = Some(handle.clone());
        Ok(handle)
    }

    /// Begin run `run`: create the handle if needed, start it, and wait
    /// for the driver to report the natural end
    pub(crate) fn start(&self, node: &Rc<MotionNode>, run: u64) {
        let handle = match self.ensure_handle() {
            Ok(handle) => handle,
            Err(err) => {
                node.finish_run(run, Err(err));
                return;
            }
        };

        handle.play();
        let completion = handle.completion();

        let task_node = Rc::clone(node);
        let spawned = node.scheduler.spawn(async move {
            let result = completion.await;
            if let MotionKind::Leaf(leaf) = &task_node.kind {
                leaf.settle(&task_node, run, result);
            }
        });

        if let Err(err) = spawned {
            self.handle.borrow_mut().take();
            node.finish_run(run, Err(err));
        }
    }

    /// Driver reported the end of run `run`: commit, release, finish
    fn settle(&self, node: &MotionNode, run: u64, result: Result<()>) {
        if !node.is_current_run(run) {
            return;
        }

        let handle = self.handle.borrow_mut().take();
        let result = match (result, handle) {
            (Ok(()), Some(handle)) => handle.commit_final_state(),
            (result, _) => result,
        };

        node.finish_run(run, result);
    }

    pub(crate) fn resume(&self) {
        if let Some(handle) = self.current_handle() {
            handle.play();
        }
    }

    /// Pauses only while the driver itself reports running
    pub(crate) fn pause(&self, node: &MotionNode) {
        if node.play_state() != PlayState::Running {
            return;
        }

        let Some(handle) = self.current_handle() else {
            return;
        };

        if handle.play_state() == PlayState::Running {
            handle.pause();
            node.transition(PlayTrigger::Pause);
        }
    }
}
