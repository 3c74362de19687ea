//! Motive CLI
//!
//! Scene files and headless playback behind the `motive` binary.

pub mod player;
pub mod scene;

pub use player::{play, FrameSnapshot, Outcome, PlaybackOptions, PlaybackReport};
pub use scene::{Composition, MotionSummary, Scene, SceneConfig};
