//! Stake resolution
//!
//! Pure payout arithmetic. Randomness is an input, never generated here, so a
//! given `(bet, base_rate, multiplier, random)` always resolves to the same
//! payout.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Classification of a finished round, decided by the game's rules
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Outcome {
    Win,
    Loss,
    Tie,
    Jackpot,
}

impl Outcome {
    /// Win or jackpot
    pub fn is_win(self) -> bool {
        matches!(self, Outcome::Win | Outcome::Jackpot)
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Outcome::Win => write!(f, "win"),
            Outcome::Loss => write!(f, "loss"),
            Outcome::Tie => write!(f, "tie"),
            Outcome::Jackpot => write!(f, "jackpot"),
        }
    }
}

/// Inputs to one resolution
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct StakeInput {
    pub bet: u64,
    pub base_rate: f64,
    /// Player multiplier as a fraction (0.25 = +25%)
    pub multiplier: f64,
    /// Random draw in [0, 1) scaled by the game
    pub random: f64,
}

/// Resolved stake of a finished round
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct StakeOutcome {
    pub input: StakeInput,
    /// Amount credited (win/jackpot) or debited (loss); zero for a tie
    pub payout: u64,
    pub outcome: Outcome,
}

impl StakeOutcome {
    /// Signed wallet change this outcome stands for
    pub fn wallet_delta(&self) -> i128 {
        match self.outcome {
            Outcome::Win | Outcome::Jackpot => self.payout as i128,
            Outcome::Loss => -(self.payout as i128),
            Outcome::Tie => 0,
        }
    }
}

pub struct StakeResolutionEngine;

impl StakeResolutionEngine {
    /// `bet * base_rate * (1 + multiplier) * (1 + random)`, rounded half away
    /// from zero and floored at zero.
    pub fn resolve(bet: u64, base_rate: f64, multiplier: f64, random: f64) -> u64 {
        if bet == 0 {
            return 0;
        }

        let raw = bet as f64 * base_rate * (1.0 + multiplier) * (1.0 + random);
        if !raw.is_finite() || raw <= 0.0 {
            return 0;
        }

        // f64 -> u64 casts saturate at u64::MAX
        raw.round() as u64
    }

    /// Resolve and classify. Losses debit the bet, ties move nothing.
    pub fn settle(input: StakeInput, outcome: Outcome) -> StakeOutcome {
        let payout = match outcome {
            Outcome::Win | Outcome::Jackpot => {
                Self::resolve(input.bet, input.base_rate, input.multiplier, input.random)
            }
            Outcome::Loss => input.bet,
            Outcome::Tie => 0,
        };

        StakeOutcome {
            input,
            payout,
            outcome,
        }
    }
}
