//! Player economy record

use super::booster::BoosterState;
use crate::config::{EconomyConfig, EnergyConfig};
use crate::energy::{EnergyRegulator, EnergyState};
use crate::games::GameKind;
use crate::session::ActorId;
use crate::stake::{Outcome, StakeOutcome};
use crate::streak::{StreakState, StreakTracker};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Per (player, game) statistics
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameStats {
    pub played: u64,
    pub wins: u64,
    pub losses: u64,
    pub ties: u64,
    pub coins_won: u64,
    pub coins_lost: u64,
    pub highest_win: u64,
    pub last_played_ms: u64,
    pub streak: StreakState,
}

impl GameStats {
    /// Fold one settled round into the stats. Ties leave the streak alone.
    pub fn record(&mut self, settled: &StakeOutcome, now_ms: u64) {
        self.played += 1;
        self.last_played_ms = now_ms;

        match settled.outcome {
            Outcome::Win | Outcome::Jackpot => {
                self.wins += 1;
                self.coins_won = self.coins_won.saturating_add(settled.payout);
                self.highest_win = self.highest_win.max(settled.payout);
                self.streak = StreakTracker::record(self.streak, true);
            }
            Outcome::Loss => {
                self.losses += 1;
                self.coins_lost = self.coins_lost.saturating_add(settled.payout);
                self.streak = StreakTracker::record(self.streak, false);
            }
            Outcome::Tie => self.ties += 1,
        }
    }

    pub fn win_rate(&self) -> f64 {
        if self.played == 0 {
            return 0.0;
        }
        self.wins as f64 / self.played as f64
    }

    pub fn profit(&self) -> i128 {
        self.coins_won as i128 - self.coins_lost as i128
    }

    /// The current streak, if it is long enough to show
    pub fn active_streak(&self) -> Option<StreakState> {
        StreakTracker::is_active(&self.streak).then_some(self.streak)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerRecord {
    pub player: ActorId,
    pub wallet: u64,
    pub bank_space: u64,
    pub bet: u64,
    /// Bonus multiplier as a fraction
    pub multiplier: f64,
    pub tier: u8,
    pub energy: EnergyState,
    pub stats: BTreeMap<GameKind, GameStats>,
    pub last_game: Option<GameKind>,
    /// Booster holdings keyed by booster id
    #[serde(default)]
    pub boosters: BTreeMap<String, BoosterState>,
}

impl PlayerRecord {
    /// A fresh player with the configured starting balances
    pub fn new(player: ActorId, economy: &EconomyConfig, energy: &EnergyConfig) -> Self {
        Self {
            player,
            wallet: economy.starting_wallet,
            bank_space: 0,
            bet: economy.starting_bet,
            multiplier: 0.0,
            tier: 0,
            energy: EnergyState::new(energy.starting_charge),
            stats: BTreeMap::new(),
            last_game: None,
            boosters: BTreeMap::new(),
        }
    }

    pub fn stats(&self, game: GameKind) -> GameStats {
        self.stats.get(&game).cloned().unwrap_or_default()
    }

    pub fn booster(&self, id: &str) -> BoosterState {
        self.boosters.get(id).copied().unwrap_or_default()
    }

    /// Apply a settled round: balances, stars, then stats.
    ///
    /// A loss never takes the wallet below zero.
    pub fn apply_settlement(&mut self, game: GameKind, settled: &StakeOutcome, now_ms: u64) {
        match settled.outcome {
            Outcome::Win | Outcome::Jackpot => {
                self.wallet = self.wallet.saturating_add(settled.payout);
                self.bank_space = self.bank_space.saturating_add(settled.payout);
                self.energy = EnergyRegulator::award_star(self.energy);
            }
            Outcome::Loss => {
                self.wallet = self.wallet.saturating_sub(settled.payout);
                self.energy = EnergyRegulator::revoke_star(self.energy);
            }
            Outcome::Tie => {}
        }

        self.stats.entry(game).or_default().record(settled, now_ms);
    }
}
