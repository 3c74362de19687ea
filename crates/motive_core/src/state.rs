//! Play-State Machine
//!
//! Every motion node, whatever its shape, moves through the same four
//! states. The transition table lives here so leaves and composites agree
//! on what each trigger means:
//!
//! | From            | Trigger  | To       |
//! |-----------------|----------|----------|
//! | Idle, Finished  | Play     | Running  |
//! | Paused          | Play     | Running  |
//! | Running         | Pause    | Paused   |
//! | Running, Paused | Complete | Finished |
//! | Running, Paused | Fail     | Idle     |
//!
//! Any other pair is a silent no-op, not an error.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Observable play state of a motion node or a driver handle
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlayState {
    #[default]
    Idle,
    Running,
    Paused,
    Finished,
}

/// Something that asks a node to change state
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PlayTrigger {
    Play,
    Pause,
    /// The node and all of its descendants reached their natural end
    Complete,
    /// The current run was rejected
    Fail,
}

impl PlayState {
    /// Look up the transition for `trigger`, `None` if the pair is a no-op
    pub fn on(self, trigger: PlayTrigger) -> Option<PlayState> {
        use PlayState::*;
        use PlayTrigger::*;

        match (self, trigger) {
            (Idle | Finished, Play) => Some(Running),
            (Paused, Play) => Some(Running),
            (Running, Pause) => Some(Paused),
            (Running | Paused, Complete) => Some(Finished),
            (Running | Paused, Fail) => Some(Idle),
            _ => None,
        }
    }

    /// Whether `Play` from this state begins a brand new run
    pub fn starts_fresh_run(self) -> bool {
        matches!(self, PlayState::Idle | PlayState::Finished)
    }

    /// Running or paused: a run is in flight
    pub fn is_active(self) -> bool {
        matches!(self, PlayState::Running | PlayState::Paused)
    }
}

impl fmt::Display for PlayState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PlayState::Idle => "idle",
            PlayState::Running => "running",
            PlayState::Paused => "paused",
            PlayState::Finished => "finished",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL_STATES: [PlayState; 4] = [
        PlayState::Idle,
        PlayState::Running,
        PlayState::Paused,
        PlayState::Finished,
    ];

    #[test]
    fn test_play_cycle() {
        let mut state = PlayState::default();
        assert_eq!(state, PlayState::Idle);

        state = state.on(PlayTrigger::Play).unwrap();
        assert_eq!(state, PlayState::Running);

        state = state.on(PlayTrigger::Pause).unwrap();
        assert_eq!(state, PlayState::Paused);

        state = state.on(PlayTrigger::Play).unwrap();
        assert_eq!(state, PlayState::Running);

        state = state.on(PlayTrigger::Complete).unwrap();
        assert_eq!(state, PlayState::Finished);

        // Finished is not terminal: play again replays
        assert_eq!(state.on(PlayTrigger::Play), Some(PlayState::Running));
    }

    #[test]
    fn test_pause_outside_running_is_noop() {
        for state in ALL_STATES {
            if state != PlayState::Running {
                assert_eq!(state.on(PlayTrigger::Pause), None, "pause from {state}");
            }
        }
    }

    #[test]
    fn test_play_while_running_is_noop() {
        assert_eq!(PlayState::Running.on(PlayTrigger::Play), None);
    }

    #[test]
    fn test_fail_returns_to_idle() {
        assert_eq!(PlayState::Running.on(PlayTrigger::Fail), Some(PlayState::Idle));
        assert_eq!(PlayState::Paused.on(PlayTrigger::Fail), Some(PlayState::Idle));
        assert_eq!(PlayState::Idle.on(PlayTrigger::Fail), None);
    }

    #[test]
    fn test_fresh_run_states() {
        let fresh: Vec<_> = ALL_STATES
            .into_iter()
            .filter(|s| s.starts_fresh_run())
            .collect();
        assert_eq!(fresh, vec![PlayState::Idle, PlayState::Finished]);
    }
}
