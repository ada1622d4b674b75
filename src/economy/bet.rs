//! Bet amounts: parsing shorthand and validating against limits

use super::ledger::{commit, Ledger};
use super::record::PlayerRecord;
use crate::config::EconomyConfig;
use crate::errors::{BetError, StakehouseResult};

/// Validates and applies bet changes
#[derive(Debug, Clone)]
pub struct BetPolicy {
    min_bet: u64,
    max_bet: u64,
}

impl BetPolicy {
    pub fn new(economy: &EconomyConfig) -> Self {
        Self {
            min_bet: economy.min_bet,
            max_bet: economy.max_bet,
        }
    }

    /// Resolve a bet written by a player.
    ///
    /// Accepts plain numbers with `_` or `,` separators, `k`/`m`/`b`/`t`
    /// suffixes, a percentage of the max bet (`30%`), and the keywords `min`,
    /// `max`, `half` and `full` (of the wallet). The result must be a whole
    /// number of coins.
    pub fn parse_amount(&self, input: &str, record: &PlayerRecord) -> Result<u64, BetError> {
        let unparseable = || BetError::Unparseable(input.to_string());
        let cleaned: String = input
            .trim()
            .to_ascii_lowercase()
            .chars()
            .filter(|c| *c != '_' && *c != ',')
            .collect();

        match cleaned.as_str() {
            "min" => return Ok(self.min_bet),
            "max" => return Ok(self.max_bet),
            "half" => return Ok(record.wallet / 2),
            "full" | "all" => return Ok(record.wallet),
            _ => {}
        }

        // Scale as a fraction so that decimals like `1.005k` stay exact
        let (digits, numerator, denominator) = match cleaned.char_indices().last() {
            Some((at, '%')) => (&cleaned[..at], self.max_bet as u128, 100),
            Some((at, 'k')) => (&cleaned[..at], 1_000, 1),
            Some((at, 'm')) => (&cleaned[..at], 1_000_000, 1),
            Some((at, 'b')) => (&cleaned[..at], 1_000_000_000, 1),
            Some((at, 't')) => (&cleaned[..at], 1_000_000_000_000, 1),
            Some(_) => (cleaned.as_str(), 1, 1),
            None => return Err(unparseable()),
        };

        let (mantissa, places) = parse_decimal(digits).ok_or_else(unparseable)?;
        let denominator = 10u128
            .checked_pow(places)
            .and_then(|power| power.checked_mul(denominator))
            .ok_or_else(unparseable)?;
        let scaled = mantissa.checked_mul(numerator).ok_or_else(unparseable)?;
        if scaled % denominator != 0 {
            return Err(unparseable());
        }
        u64::try_from(scaled / denominator).map_err(|_| unparseable())
    }

    pub fn validate(&self, record: &PlayerRecord, amount: u64) -> Result<u64, BetError> {
        if amount == 0 {
            return Err(BetError::Zero);
        }
        if amount == record.bet {
            return Err(BetError::Unchanged(amount));
        }
        if amount < self.min_bet {
            return Err(BetError::BelowMinimum {
                amount,
                minimum: self.min_bet,
            });
        }
        if amount > self.max_bet {
            return Err(BetError::AboveMaximum {
                amount,
                maximum: self.max_bet,
            });
        }
        if amount > record.wallet {
            return Err(BetError::ExceedsWallet {
                amount,
                wallet: record.wallet,
            });
        }
        Ok(amount)
    }

    /// Validate `amount` and persist it as the player's bet
    pub async fn set_bet<L: Ledger + ?Sized>(
        &self,
        ledger: &L,
        record: &mut PlayerRecord,
        amount: u64,
    ) -> StakehouseResult<u64> {
        let amount = self.validate(record, amount)?;
        commit(ledger, record, |record| record.bet = amount).await?;
        tracing::info!("Player {} now bets {}", record.player, amount);
        Ok(amount)
    }
}

/// `12.345` as `(12345, 3)`; `None` unless it is plain digits with at most one point
fn parse_decimal(digits: &str) -> Option<(u128, u32)> {
    let (whole, fraction) = digits.split_once('.').unwrap_or((digits, ""));
    if whole.is_empty() && fraction.is_empty() {
        return None;
    }
    if !whole.chars().chain(fraction.chars()).all(|c| c.is_ascii_digit()) {
        return None;
    }

    let mut mantissa: u128 = 0;
    for digit in whole.bytes().chain(fraction.bytes()) {
        mantissa = mantissa
            .checked_mul(10)?
            .checked_add(u128::from(digit - b'0'))?;
    }
    Some((mantissa, u32::try_from(fraction.len()).ok()?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StakehouseConfig;
    use crate::economy::ledger::MemoryLedger;
    use crate::session::ActorId;

    fn setup() -> (BetPolicy, PlayerRecord) {
        let config = StakehouseConfig::default();
        let record = PlayerRecord::new(ActorId::new("p1"), &config.economy, &config.energy);
        (BetPolicy::new(&config.economy), record)
    }

    #[test]
    fn test_parse_shorthand() {
        let (policy, record) = setup();

        assert_eq!(policy.parse_amount("2500", &record), Ok(2_500));
        assert_eq!(policy.parse_amount("250_000", &record), Ok(250_000));
        assert_eq!(policy.parse_amount("124,000", &record), Ok(124_000));
        assert_eq!(policy.parse_amount("10k", &record), Ok(10_000));
        assert_eq!(policy.parse_amount("1.5K", &record), Ok(1_500));
        assert_eq!(policy.parse_amount("2m", &record), Ok(2_000_000));
        assert_eq!(policy.parse_amount("30%", &record), Ok(150_000));
        assert_eq!(policy.parse_amount("min", &record), Ok(500));
        assert_eq!(policy.parse_amount("max", &record), Ok(500_000));
        assert_eq!(policy.parse_amount("half", &record), Ok(5_000));
        assert_eq!(policy.parse_amount("full", &record), Ok(10_000));
    }

    #[test]
    fn test_parse_exact_decimals() {
        let (policy, record) = setup();

        assert_eq!(policy.parse_amount("1.005k", &record), Ok(1_005));
        assert_eq!(policy.parse_amount("33.3m", &record), Ok(33_300_000));
        assert_eq!(policy.parse_amount("0.07%", &record), Ok(350));
        assert_eq!(policy.parse_amount("2.50k", &record), Ok(2_500));
        assert_eq!(policy.parse_amount(".5k", &record), Ok(500));
        assert_eq!(policy.parse_amount("18446744073709551615", &record), Ok(u64::MAX));
        assert!(matches!(
            policy.parse_amount("18446744073709551616", &record),
            Err(BetError::Unparseable(_))
        ));
    }

    #[test]
    fn test_parse_rejects_garbage_and_fractions() {
        let (policy, record) = setup();

        for input in ["", "abc", "12.5", "-3", "k", "1.0001k", ".", "1.2.3k", "+5", "1e3"] {
            assert!(
                matches!(policy.parse_amount(input, &record), Err(BetError::Unparseable(_))),
                "{input} should not parse"
            );
        }
    }

    #[test]
    fn test_validate_limits() {
        let (policy, record) = setup();

        assert_eq!(policy.validate(&record, 0), Err(BetError::Zero));
        assert_eq!(policy.validate(&record, 1_000), Err(BetError::Unchanged(1_000)));
        assert!(matches!(policy.validate(&record, 100), Err(BetError::BelowMinimum { .. })));
        assert!(matches!(
            policy.validate(&record, 600_000),
            Err(BetError::AboveMaximum { .. })
        ));
        assert!(matches!(
            policy.validate(&record, 20_000),
            Err(BetError::ExceedsWallet { .. })
        ));
        assert_eq!(policy.validate(&record, 2_000), Ok(2_000));
    }

    #[tokio::test]
    async fn test_set_bet_persists() {
        let (policy, _) = setup();
        let ledger = MemoryLedger::new(StakehouseConfig::default());
        let player = ActorId::new("p1");
        let mut record = ledger.fetch(&player).await.unwrap();

        policy.set_bet(&ledger, &mut record, 4_000).await.unwrap();
        assert_eq!(record.bet, 4_000);
        assert_eq!(ledger.get(&player).unwrap().bet, 4_000);

        assert!(policy.set_bet(&ledger, &mut record, 4_000).await.is_err());
        assert_eq!(ledger.persist_count(), 1);
    }
}
