//! Completion futures
//!
//! One `Completion` stands for one run of one motion node. Clones share the
//! same underlying future, so every awaiter observes the same result, and
//! `ptr_eq` tells whether two completions belong to the same run.

use futures::channel::oneshot;
use futures::future::{self, FutureExt, LocalBoxFuture, Shared};
use motive_core::{MotionError, Result};
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

/// Single-resolution signal for "this run of this node has finished"
#[derive(Clone)]
pub struct Completion {
    inner: Shared<LocalBoxFuture<'static, Result<()>>>,
}

/// Sending half of a run's completion, held by the node until the run ends
pub(crate) struct Resolver(oneshot::Sender<Result<()>>);

impl Completion {
    /// Create a pending completion and the resolver that settles it
    pub(crate) fn channel() -> (Resolver, Completion) {
        let (tx, rx) = oneshot::channel();
        let fut = async move {
            rx.await.unwrap_or_else(|_| {
                Err(MotionError::scheduler(
                    "motion run was dropped before it finished",
                ))
            })
        };

        let completion = Completion {
            inner: fut.boxed_local().shared(),
        };
        (Resolver(tx), completion)
    }

    /// An already-rejected completion
    pub fn failed(err: MotionError) -> Self {
        Completion {
            inner: future::ready(Err(err)).boxed_local().shared(),
        }
    }

    /// Whether both completions belong to the same run
    pub fn ptr_eq(&self, other: &Completion) -> bool {
        self.inner.ptr_eq(&other.inner)
    }

    /// The result, if the run has settled and the future has been polled
    pub fn peek(&self) -> Option<&Result<()>> {
        self.inner.peek()
    }

    pub fn is_resolved(&self) -> bool {
        self.peek().is_some()
    }
}

impl Future for Completion {
    type Output = Result<()>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        self.inner.poll_unpin(cx)
    }
}

impl fmt::Debug for Completion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Completion")
            .field("result", &self.peek())
            .finish()
    }
}

impl Resolver {
    pub(crate) fn resolve(self, result: Result<()>) {
        // Nobody awaiting is fine: the result is simply dropped
        let _ = self.0.send(result);
    }
}
