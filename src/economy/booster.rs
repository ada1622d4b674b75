//! Boosters: timed or counted perks bought with coins, energy charge or stars

use super::record::PlayerRecord;
use crate::errors::BoosterError;
use rand::rngs::StdRng;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;

const MINUTE_MS: u64 = 60 * 1_000;

/// What an offer is paid with
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentUnit {
    Coins,
    /// Units of energy charge
    Energy,
    Stars,
}

impl PaymentUnit {
    /// How much of this unit the player holds
    pub fn balance(self, record: &PlayerRecord) -> u64 {
        match self {
            PaymentUnit::Coins => record.wallet,
            PaymentUnit::Energy => u64::from(record.energy.charge),
            PaymentUnit::Stars => record.energy.stars,
        }
    }
}

impl fmt::Display for PaymentUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PaymentUnit::Coins => write!(f, "coins"),
            PaymentUnit::Energy => write!(f, "energy"),
            PaymentUnit::Stars => write!(f, "stars"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OfferKind {
    /// The value is milliseconds of active time
    Duration,
    /// The value is a number of uses
    Quantity,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "value", rename_all = "snake_case")]
pub enum OfferValue {
    Fixed { amount: u64 },
    /// Drawn uniformly from `min..=max` at purchase time
    Random { min: u64, max: u64 },
}

impl OfferValue {
    pub fn draw(self, rng: &mut StdRng) -> u64 {
        match self {
            OfferValue::Fixed { amount } => amount,
            OfferValue::Random { min, max } => rng.gen_range(min.min(max)..=max.max(min)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoosterOffer {
    pub id: String,
    pub unit: PaymentUnit,
    pub cost: u64,
    pub kind: OfferKind,
    pub value: OfferValue,
}

impl BoosterOffer {
    pub fn new(id: impl Into<String>, unit: PaymentUnit, cost: u64, kind: OfferKind, value: OfferValue) -> Self {
        Self {
            id: id.into(),
            unit,
            cost,
            kind,
            value,
        }
    }

    pub fn check_affordable(&self, record: &PlayerRecord) -> Result<(), BoosterError> {
        let balance = self.unit.balance(record);
        if balance < self.cost {
            return Err(BoosterError::CannotAfford {
                unit: self.unit,
                cost: self.cost,
                balance,
            });
        }
        Ok(())
    }

    /// Take the price and grant `granted` of `booster`.
    ///
    /// Affordability is checked by the caller; payment saturates at zero.
    pub fn apply(&self, booster: &str, granted: u64, record: &mut PlayerRecord, now_ms: u64) {
        match self.unit {
            PaymentUnit::Coins => record.wallet = record.wallet.saturating_sub(self.cost),
            PaymentUnit::Energy => {
                let cost = u32::try_from(self.cost).unwrap_or(u32::MAX);
                record.energy.charge = record.energy.charge.saturating_sub(cost);
            }
            PaymentUnit::Stars => record.energy.stars = record.energy.stars.saturating_sub(self.cost),
        }

        let state = record.boosters.entry(booster.to_string()).or_default();
        match self.kind {
            OfferKind::Duration => {
                state.expires_at_ms = state.expires_at_ms.max(now_ms.saturating_add(granted))
            }
            OfferKind::Quantity => state.quantity = state.quantity.saturating_add(granted),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Booster {
    pub id: String,
    pub name: String,
    pub description: String,
    pub offers: Vec<BoosterOffer>,
}

impl Booster {
    pub fn offer(&self, id: &str) -> Option<&BoosterOffer> {
        self.offers.iter().find(|offer| offer.id == id)
    }
}

/// A player's holdings of one booster
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoosterState {
    pub expires_at_ms: u64,
    pub quantity: u64,
}

impl BoosterState {
    pub fn is_active(&self, now_ms: u64) -> bool {
        now_ms < self.expires_at_ms || self.quantity > 0
    }
}

/// The boosters on sale
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoosterCatalog {
    boosters: Vec<Booster>,
}

impl BoosterCatalog {
    pub fn new(boosters: Vec<Booster>) -> Self {
        Self { boosters }
    }

    pub fn boosters(&self) -> &[Booster] {
        &self.boosters
    }

    pub fn get(&self, id: &str) -> Option<&Booster> {
        self.boosters.iter().find(|booster| booster.id == id)
    }

    /// Look up a booster and one of its offers
    pub fn find(&self, booster: &str, offer: &str) -> Result<(&Booster, &BoosterOffer), BoosterError> {
        let found = self
            .get(booster)
            .ok_or_else(|| BoosterError::UnknownBooster(booster.to_string()))?;
        let offer = found.offer(offer).ok_or_else(|| BoosterError::UnknownOffer {
            booster: booster.to_string(),
            offer: offer.to_string(),
        })?;
        Ok((found, offer))
    }
}

impl Default for BoosterCatalog {
    fn default() -> Self {
        use OfferKind::{Duration, Quantity};
        use PaymentUnit::{Coins, Energy, Stars};

        Self::new(vec![
            Booster {
                id: "lucky-charm".to_string(),
                name: "Lucky Charm".to_string(),
                description: "Better payouts while it lasts".to_string(),
                offers: vec![
                    BoosterOffer::new("lucky-charm-coins", Coins, 50_000, Duration, OfferValue::Fixed { amount: 60 * MINUTE_MS }),
                    BoosterOffer::new("lucky-charm-stars", Stars, 20, Duration, OfferValue::Fixed { amount: 180 * MINUTE_MS }),
                    BoosterOffer::new(
                        "lucky-charm-energy",
                        Energy,
                        1,
                        Duration,
                        OfferValue::Random {
                            min: 30 * MINUTE_MS,
                            max: 120 * MINUTE_MS,
                        },
                    ),
                ],
            },
            Booster {
                id: "safety-net".to_string(),
                name: "Safety Net".to_string(),
                description: "Each use refunds one lost bet".to_string(),
                offers: vec![
                    BoosterOffer::new("safety-net-coins", Coins, 100_000, Quantity, OfferValue::Fixed { amount: 1 }),
                    BoosterOffer::new("safety-net-stars", Stars, 30, Quantity, OfferValue::Random { min: 1, max: 3 }),
                ],
            },
        ])
    }
}
