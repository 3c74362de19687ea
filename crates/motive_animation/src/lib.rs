//! Motive Animation System
//!
//! Composable motion trees with uniform play, pause, and reverse.
//!
//! # Features
//!
//! - **Leaf Motions**: one keyframe sequence on one target, run by a driver handle
//! - **Sequences**: children run strictly one after another
//! - **Parallel Groups**: children run together, the group ends with the last
//! - **Reversal**: any tree can be mirrored into a new, independent tree
//! - **Timeline Driver**: a headless, tick-driven backend for tools and tests
//!
//! Everything runs on one thread. Continuations are spawned on a local
//! executor through [`Scheduler`]; drive it (for instance with
//! `LocalPool::run_until_stalled`) after every tick of the driver.

pub mod completion;
mod leaf;
pub mod motion;
mod parallel;
pub mod scheduler;
mod sequential;
pub mod timeline;

pub use completion::Completion;
pub use motion::{Motion, MotionContext};
pub use scheduler::Scheduler;
pub use timeline::{PropertyMap, TimelineDriver, TimelineHandle};
