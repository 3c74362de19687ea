//! Cooperative scheduler
//!
//! Motion continuations (a child finished, start the next one) run as
//! local tasks on a single-threaded executor. Nothing here is `Send`:
//! every node is mutated from the one scheduler thread.

use futures::task::{LocalSpawn, LocalSpawnExt};
use motive_core::{MotionError, Result};
use std::fmt;
use std::future::Future;
use std::rc::Rc;

/// Handle used by motion nodes to spawn their continuations
#[derive(Clone)]
pub struct Scheduler {
    spawner: Rc<dyn LocalSpawn>,
}

impl Scheduler {
    /// Wrap any local spawner, typically `LocalPool::spawner()`
    pub fn new(spawner: impl LocalSpawn + 'static) -> Self {
        Self {
            spawner: Rc::new(spawner),
        }
    }

    /// Queue a continuation; fails once the executor has shut down
    pub fn spawn(&self, task: impl Future<Output = ()> + 'static) -> Result<()> {
        self.spawner
            .as_ref()
            .spawn_local(task)
            .map_err(|e| MotionError::scheduler(e.to_string()))
    }
}

impl fmt::Debug for Scheduler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Scheduler").finish_non_exhaustive()
    }
}
