//! Consecutive outcome runs per (player, game)

use serde::{Deserialize, Serialize};
use std::fmt;

/// Streaks are displayed from the second same-polarity outcome onwards
pub const STREAK_ACTIVATION_THRESHOLD: u32 = 2;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Polarity {
    #[default]
    Win,
    Loss,
}

impl Polarity {
    fn of(is_win: bool) -> Self {
        if is_win {
            Polarity::Win
        } else {
            Polarity::Loss
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct StreakState {
    pub length: u32,
    pub polarity: Polarity,
    pub threshold: u32,
}

impl Default for StreakState {
    fn default() -> Self {
        Self {
            length: 0,
            polarity: Polarity::Win,
            threshold: STREAK_ACTIVATION_THRESHOLD,
        }
    }
}

impl fmt::Display for StreakState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.polarity {
            Polarity::Win => write!(f, "{} wins", self.length),
            Polarity::Loss => write!(f, "{} losses", self.length),
        }
    }
}

pub struct StreakTracker;

impl StreakTracker {
    pub fn record(previous: StreakState, is_win: bool) -> StreakState {
        let polarity = Polarity::of(is_win);
        if polarity == previous.polarity {
            StreakState {
                length: previous.length.saturating_add(1),
                ..previous
            }
        } else {
            StreakState {
                length: 1,
                polarity,
                ..previous
            }
        }
    }

    pub fn is_active(state: &StreakState) -> bool {
        state.length >= state.threshold
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn replay(outcomes: &[bool]) -> StreakState {
        outcomes
            .iter()
            .fold(StreakState::default(), |state, &win| StreakTracker::record(state, win))
    }

    #[test]
    fn test_mixed_sequence() {
        let state = replay(&[true, true, false, true]);
        assert_eq!(state.length, 1);
        assert_eq!(state.polarity, Polarity::Win);
    }

    #[test]
    fn test_activation() {
        assert!(!StreakTracker::is_active(&replay(&[true])));
        assert!(StreakTracker::is_active(&replay(&[true, true])));
        assert!(StreakTracker::is_active(&replay(&[true, false, false])));
        assert!(!StreakTracker::is_active(&StreakState::default()));
    }

    #[test]
    fn test_first_loss_flips_polarity() {
        let state = replay(&[false]);
        assert_eq!(state.length, 1);
        assert_eq!(state.polarity, Polarity::Loss);
        assert_eq!(state.to_string(), "1 losses");
    }
}
