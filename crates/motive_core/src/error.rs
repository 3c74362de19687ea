//! Motion error types

use thiserror::Error;

/// Errors raised while building or running motions
///
/// `Clone` so a single failure can be observed by every holder of a
/// shared completion future.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MotionError {
    /// Invalid construction input (empty composite, empty or malformed keyframes)
    #[error("Invalid motion configuration: {0}")]
    Configuration(String),

    /// The animation driver failed to create or run a handle
    #[error("Animation driver failed: {0}")]
    Driver(String),

    /// The cooperative scheduler refused work or went away mid-run
    #[error("Scheduler error: {0}")]
    Scheduler(String),
}

impl MotionError {
    pub fn configuration(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }

    pub fn driver(msg: impl Into<String>) -> Self {
        Self::Driver(msg.into())
    }

    pub fn scheduler(msg: impl Into<String>) -> Self {
        Self::Scheduler(msg.into())
    }
}

/// Result type for motion operations
pub type Result<T> = std::result::Result<T, MotionError>;
