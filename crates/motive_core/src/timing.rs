//! Timing specification for leaf motions

use crate::error::{MotionError, Result};
use serde::{Deserialize, Serialize};

pub const DEFAULT_DURATION_MS: u32 = 5000;
pub const DEFAULT_ITERATIONS: f32 = 1.0;

/// Fill mode determines which values are rendered outside the active interval
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FillMode {
    /// Nothing is rendered outside the active interval
    None,
    /// Hold the terminal values after completion
    #[default]
    Forwards,
    /// Apply the first keyframe before the timeline starts
    Backwards,
    /// Forwards and backwards
    Both,
}

impl FillMode {
    pub fn fills_forwards(self) -> bool {
        matches!(self, FillMode::Forwards | FillMode::Both)
    }

    pub fn fills_backwards(self) -> bool {
        matches!(self, FillMode::Backwards | FillMode::Both)
    }
}

/// Duration, iteration count, and fill policy of one effect
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Timing {
    pub duration_ms: u32,
    /// Number of iterations, `f32::INFINITY` repeats forever
    pub iterations: f32,
    pub fill: FillMode,
}

impl Default for Timing {
    fn default() -> Self {
        Self {
            duration_ms: DEFAULT_DURATION_MS,
            iterations: DEFAULT_ITERATIONS,
            fill: FillMode::Forwards,
        }
    }
}

impl Timing {
    pub fn new(duration_ms: u32) -> Self {
        Self {
            duration_ms,
            ..Default::default()
        }
    }

    /// Builder: set iteration count
    pub fn iterations(mut self, iterations: f32) -> Self {
        self.iterations = iterations;
        self
    }

    /// Builder: set fill mode
    pub fn fill(mut self, fill: FillMode) -> Self {
        self.fill = fill;
        self
    }

    pub fn is_infinite(&self) -> bool {
        self.iterations.is_infinite()
    }

    /// Total active time in milliseconds, `None` when infinite
    pub fn active_duration_ms(&self) -> Option<f32> {
        if self.is_infinite() {
            None
        } else {
            Some(self.duration_ms as f32 * self.iterations)
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.iterations.is_nan() || self.iterations < 0.0 {
            return Err(MotionError::configuration(format!(
                "iteration count must be a non-negative number, got {}",
                self.iterations
            )));
        }
        Ok(())
    }
}

/// Caller-supplied timing where every field may be omitted
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PartialTiming {
    pub duration_ms: Option<u32>,
    pub iterations: Option<f32>,
    pub fill: Option<FillMode>,
}

impl PartialTiming {
    pub fn duration(duration_ms: u32) -> Self {
        Self {
            duration_ms: Some(duration_ms),
            ..Default::default()
        }
    }

    /// Fill the omitted fields from `defaults`
    pub fn resolve(&self, defaults: &Timing) -> Timing {
        Timing {
            duration_ms: self.duration_ms.unwrap_or(defaults.duration_ms),
            iterations: self.iterations.unwrap_or(defaults.iterations),
            fill: self.fill.unwrap_or(defaults.fill),
        }
    }
}
