//! Headless scene playback
//!
//! Plays a scene's root motion on the timeline driver at a fixed frame
//! step, optionally pausing and resuming it, and records what every
//! target renders after each frame.

use crate::scene::{Scene, SceneConfig};
use anyhow::Result;
use futures::executor::LocalPool;
use indexmap::IndexMap;
use motive_animation::{PropertyMap, Scheduler};
use motive_core::PlayState;
use serde::Serialize;
use std::fmt;

/// Playback options
#[derive(Clone, Debug)]
pub struct PlaybackOptions {
    /// Time advanced per frame
    pub frame_ms: f32,
    pub pause_at_ms: Option<f32>,
    pub resume_at_ms: Option<f32>,
    /// Stop after this much time even if the root has not finished
    pub max_ms: f32,
}

impl Default for PlaybackOptions {
    fn default() -> Self {
        Self {
            frame_ms: 16.0,
            pause_at_ms: None,
            resume_at_ms: None,
            max_ms: 60_000.0,
        }
    }
}

impl PlaybackOptions {
    pub fn validate(&self) -> Result<()> {
        if self.frame_ms.is_nan() || self.frame_ms <= 0.0 {
            anyhow::bail!("Frame step must be positive, got {}", self.frame_ms);
        }
        if self.max_ms.is_nan() || self.max_ms < 0.0 {
            anyhow::bail!("Time limit must not be negative, got {}", self.max_ms);
        }
        match (self.pause_at_ms, self.resume_at_ms) {
            (None, Some(_)) => anyhow::bail!("Cannot resume without pausing first"),
            (Some(pause), Some(resume)) if resume <= pause => {
                anyhow::bail!("Resume time {resume} must come after pause time {pause}")
            }
            _ => Ok(()),
        }
    }
}

/// What every target renders at one point in time
#[derive(Debug, Serialize)]
pub struct FrameSnapshot {
    pub time_ms: f32,
    pub state: PlayState,
    pub targets: IndexMap<String, PropertyMap>,
}

impl fmt::Display for FrameSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:>8.1}ms  {:<8}", self.time_ms, self.state.to_string())?;
        for (name, values) in &self.targets {
            write!(f, "  {name}:")?;
            for (property, value) in values {
                write!(f, " {property}={value}")?;
            }
        }
        Ok(())
    }
}

/// How playback ended
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Outcome {
    Finished,
    Failed { error: String },
    TimedOut,
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Outcome::Finished => f.write_str("finished"),
            Outcome::Failed { error } => write!(f, "failed: {error}"),
            Outcome::TimedOut => f.write_str("timed out"),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct PlaybackReport {
    pub outcome: Outcome,
    pub elapsed_ms: f32,
    /// Driver handles created over the whole playback
    pub handles_created: u64,
    pub frames: Vec<FrameSnapshot>,
}

impl PlaybackReport {
    pub fn last_frame(&self) -> Option<&FrameSnapshot> {
        self.frames.last()
    }
}

/// Play `config`'s root until it settles or the time limit runs out
pub fn play(config: &SceneConfig, options: &PlaybackOptions) -> Result<PlaybackReport> {
    options.validate()?;

    let mut pool = LocalPool::new();
    let scene = Scene::build(config, Scheduler::new(pool.spawner()))?;

    let done = scene.root.play();
    pool.run_until_stalled();

    let mut time = 0.0_f32;
    let mut frames = vec![snapshot(&scene, time)];
    let mut pause_at = options.pause_at_ms;
    let mut resume_at = options.resume_at_ms;

    while !done.is_resolved() && time < options.max_ms {
        let dt = options.frame_ms.min(options.max_ms - time);
        scene.driver.tick(dt);
        pool.run_until_stalled();
        time += dt;

        if pause_at.is_some_and(|at| time >= at) {
            tracing::info!(time_ms = time, "pausing root");
            scene.root.pause();
            pause_at = None;
        } else if pause_at.is_none() && resume_at.is_some_and(|at| time >= at) {
            tracing::info!(time_ms = time, "resuming root");
            let _ = scene.root.play();
            pool.run_until_stalled();
            resume_at = None;
        }

        frames.push(snapshot(&scene, time));
    }

    let outcome = match done.peek() {
        Some(Ok(())) => Outcome::Finished,
        Some(Err(err)) => Outcome::Failed {
            error: err.to_string(),
        },
        None => Outcome::TimedOut,
    };
    tracing::debug!(%outcome, elapsed_ms = time, frames = frames.len(), "playback ended");

    Ok(PlaybackReport {
        outcome,
        elapsed_ms: time,
        handles_created: scene.driver.created_count(),
        frames,
    })
}

fn snapshot(scene: &Scene, time_ms: f32) -> FrameSnapshot {
    let targets = scene
        .targets
        .iter()
        .map(|(name, &id)| {
            let values = scene.driver.rendered_values(id).unwrap_or_default();
            (name.clone(), values)
        })
        .collect();

    FrameSnapshot {
        time_ms,
        state: scene.root.play_state(),
        targets,
    }
}
