//! Motion identity assignment

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// Process-wide counter, starts at zero when the process starts and only
/// ever moves forward.
static NEXT_MOTION_ID: AtomicU64 = AtomicU64::new(0);

/// Unique identifier for a motion node, never reused within a process
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct MotionId(u64);

impl MotionId {
    /// Allocate the next id (the first id handed out is 1)
    pub fn next() -> Self {
        Self(NEXT_MOTION_ID.fetch_add(1, Ordering::Relaxed) + 1)
    }

    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for MotionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}
