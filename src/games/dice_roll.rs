//! Dice roll: the player and the house each roll a die, highest wins

use super::GameKind;
use crate::action_id::Control;
use crate::economy::PlayerRecord;
use crate::round::{Game, TimeoutPolicy, Verdict};
use rand::rngs::StdRng;
use rand::Rng;
use serde_json::json;
use std::cmp::Ordering;

const WIN_BASE: f64 = 0.1;
const WIN_RANDOM_SPREAD: f64 = 1.8;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DiceRollControl {
    Roll,
}

impl Control for DiceRollControl {
    const ALL: &'static [Self] = &[DiceRollControl::Roll];

    fn label(self) -> &'static str {
        "roll"
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DiceRollRound {
    pub player: Option<u8>,
    pub house: Option<u8>,
}

impl DiceRollRound {
    pub fn has_both_rolled(&self) -> bool {
        self.player.is_some() && self.house.is_some()
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct DiceRoll;

impl DiceRoll {
    /// Judge two rolls from the player's side
    pub fn judge(player: u8, house: u8, record: &PlayerRecord, rng: &mut StdRng) -> Verdict {
        match player.cmp(&house) {
            Ordering::Greater => Verdict::win(
                WIN_BASE,
                record.multiplier,
                rng.gen::<f64>() * WIN_RANDOM_SPREAD,
            ),
            Ordering::Equal => Verdict::tie(),
            Ordering::Less => Verdict::loss(),
        }
    }
}

impl Game for DiceRoll {
    type Control = DiceRollControl;
    type Logic = DiceRollRound;

    fn kind(&self) -> GameKind {
        GameKind::DiceRoll
    }

    fn deal(&self, _rng: &mut StdRng) -> DiceRollRound {
        DiceRollRound::default()
    }

    fn act(
        &self,
        round: &mut DiceRollRound,
        _control: DiceRollControl,
        record: &PlayerRecord,
        rng: &mut StdRng,
    ) -> Option<Verdict> {
        if round.has_both_rolled() {
            return None;
        }

        let player = rng.gen_range(1..=6);
        let house = rng.gen_range(1..=6);
        round.player = Some(player);
        round.house = Some(house);

        Some(Self::judge(player, house, record, rng))
    }

    fn on_timeout(&self) -> TimeoutPolicy {
        TimeoutPolicy::KeepStake
    }

    fn view(&self, round: &DiceRollRound) -> serde_json::Value {
        json!({ "player": round.player, "house": round.house })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StakehouseConfig;
    use crate::session::ActorId;
    use crate::stake::Outcome;
    use rand::SeedableRng;

    fn record() -> PlayerRecord {
        let config = StakehouseConfig::default();
        PlayerRecord::new(ActorId::new("p1"), &config.economy, &config.energy)
    }

    #[test]
    fn test_judge() {
        let mut rng = StdRng::seed_from_u64(3);
        let record = record();

        let win = DiceRoll::judge(6, 2, &record, &mut rng);
        assert_eq!(win.outcome, Outcome::Win);
        assert_eq!(win.base_rate, 0.1);
        assert!((0.0..1.8).contains(&win.random));

        assert_eq!(DiceRoll::judge(3, 3, &record, &mut rng), Verdict::tie());
        assert_eq!(DiceRoll::judge(1, 4, &record, &mut rng), Verdict::loss());
    }

    #[test]
    fn test_roll_once() {
        let game = DiceRoll;
        let mut round = game.deal(&mut StdRng::seed_from_u64(0));
        let mut rng = StdRng::seed_from_u64(11);
        assert_eq!(game.view(&round), json!({ "player": null, "house": null }));

        assert!(game.act(&mut round, DiceRollControl::Roll, &record(), &mut rng).is_some());
        assert!(round.has_both_rolled());
        assert!((1..=6).contains(&round.player.unwrap()));
        assert!(game.act(&mut round, DiceRollControl::Roll, &record(), &mut rng).is_none());
    }

    #[test]
    fn test_timeout_keeps_stake() {
        assert_eq!(DiceRoll.on_timeout(), TimeoutPolicy::KeepStake);
    }
}
