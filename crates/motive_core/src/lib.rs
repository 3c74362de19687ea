//! Motive Core
//!
//! This crate provides the foundational pieces of the Motive motion
//! composition system:
//!
//! - **Play States**: the shared idle/running/paused/finished state machine
//! - **Keyframes**: offset-tagged property snapshots and their reordering rules
//! - **Timing**: duration, iteration count, and fill policy
//! - **Driver Contracts**: the traits an animation backend implements
//!
//! # Example
//!
//! ```rust
//! use motive_core::{AnimatableProperty, Keyframe, KeyframeSequence};
//!
//! let frames = KeyframeSequence::new(vec![
//!     Keyframe::at(0.0).set(AnimatableProperty::Opacity, 1.0),
//!     Keyframe::at(0.25).set(AnimatableProperty::Opacity, 0.5),
//! ]);
//!
//! let reversed = frames.reversed();
//! assert_eq!(reversed.frames()[0].offset, Some(0.75));
//! assert_eq!(reversed.frames()[1].offset, Some(1.0));
//! ```

pub mod driver;
pub mod easing;
pub mod error;
pub mod id;
pub mod keyframe;
pub mod state;
pub mod timing;

pub use driver::{normalize_keyframes, AnimationDriver, AnimationHandle, KeyframeSource};
pub use easing::Easing;
pub use error::{MotionError, Result};
pub use id::MotionId;
pub use keyframe::{AnimatableProperty, Keyframe, KeyframeSequence, PropertyValue, TargetId};
pub use state::{PlayState, PlayTrigger};
pub use timing::{FillMode, PartialTiming, Timing};
