//! Energy: the regenerating resource that gates play
//!
//! A player may start rounds while the current recharge window is open
//! (`now < expires_at_ms`). Once it lapses, one unit of charge buys a new
//! window whose length depends on the player's upgrade tier. Stars are earned
//! by wins and can be converted into charge.

use crate::config::EnergyConfig;
use crate::errors::EnergyError;
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct EnergyState {
    /// Units of charge available for recharges
    pub charge: u32,
    /// End of the current recharge window (unix ms)
    pub expires_at_ms: u64,
    pub stars: u64,
}

impl EnergyState {
    pub fn new(charge: u32) -> Self {
        Self {
            charge,
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone)]
pub struct EnergyRegulator {
    regen_by_tier: Vec<Duration>,
    max_charge: u32,
    stars_per_charge: u64,
}

impl EnergyRegulator {
    pub fn new(config: &EnergyConfig) -> Self {
        Self {
            regen_by_tier: config
                .regen_minutes_by_tier
                .iter()
                // Windows last at least a minute
                .map(|minutes| Duration::from_secs((*minutes).max(1).saturating_mul(60)))
                .collect(),
            max_charge: config.max_charge,
            stars_per_charge: config.stars_per_charge.max(1),
        }
    }

    pub fn is_expired(state: &EnergyState, now_ms: u64) -> bool {
        now_ms >= state.expires_at_ms
    }

    /// Recharge window length for `tier`. Tiers past the table reuse its last entry.
    pub fn regen_duration(&self, tier: u8) -> Duration {
        self.regen_by_tier
            .get(tier as usize)
            .or_else(|| self.regen_by_tier.last())
            .copied()
            .unwrap_or_default()
    }

    pub fn spend(&self, state: EnergyState, amount: u32) -> Result<EnergyState, EnergyError> {
        if amount > state.charge {
            return Err(EnergyError::InsufficientEnergy {
                requested: amount,
                available: state.charge,
            });
        }

        Ok(EnergyState {
            charge: state.charge - amount,
            ..state
        })
    }

    /// Open a new recharge window from `now_ms`. Never moves the expiry backwards.
    pub fn recharge(&self, state: EnergyState, tier: u8, now_ms: u64) -> EnergyState {
        let window_ms = u64::try_from(self.regen_duration(tier).as_millis()).unwrap_or(u64::MAX);
        let window_end = now_ms.saturating_add(window_ms);

        EnergyState {
            expires_at_ms: state.expires_at_ms.max(window_end),
            ..state
        }
    }

    /// Spend one charge and recharge; the energize action of the prompts
    pub fn energize(&self, state: EnergyState, tier: u8, now_ms: u64) -> Result<EnergyState, EnergyError> {
        let spent = self.spend(state, 1)?;
        Ok(self.recharge(spent, tier, now_ms))
    }

    /// Add charge up to the cap
    pub fn grant(&self, state: EnergyState, amount: u32) -> EnergyState {
        EnergyState {
            charge: state.charge.saturating_add(amount).min(self.max_charge.max(state.charge)),
            ..state
        }
    }

    pub fn award_star(state: EnergyState) -> EnergyState {
        EnergyState {
            stars: state.stars.saturating_add(1),
            ..state
        }
    }

    pub fn revoke_star(state: EnergyState) -> EnergyState {
        EnergyState {
            stars: state.stars.saturating_sub(1),
            ..state
        }
    }

    /// Convert whole batches of stars into charge, bounded by the cap.
    /// Returns the new state and the charge gained.
    pub fn convert_stars(&self, state: EnergyState) -> (EnergyState, u32) {
        let room = self.max_charge.saturating_sub(state.charge) as u64;
        let affordable = state.stars / self.stars_per_charge;
        let gained = affordable.min(room);

        let next = EnergyState {
            charge: state.charge + gained as u32,
            stars: state.stars - gained * self.stars_per_charge,
            ..state
        };
        (next, gained as u32)
    }

    pub fn max_charge(&self) -> u32 {
        self.max_charge
    }
}
