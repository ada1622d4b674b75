//! High-low: guess whether a secret number is above or below a hint, or
//! call the jackpot when they are equal

use super::GameKind;
use crate::action_id::Control;
use crate::economy::PlayerRecord;
use crate::round::{Game, TimeoutPolicy, Verdict};
use crate::stake::Outcome;
use rand::rngs::StdRng;
use rand::Rng;
use serde_json::json;

const JACKPOT_BASE: f64 = 10.0;
const WIN_BASE: f64 = 0.75;
const WIN_RANDOM_SPREAD: f64 = 0.5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HighlowControl {
    Lower,
    Jackpot,
    Higher,
}

impl Control for HighlowControl {
    const ALL: &'static [Self] = &[
        HighlowControl::Lower,
        HighlowControl::Jackpot,
        HighlowControl::Higher,
    ];

    fn label(self) -> &'static str {
        match self {
            HighlowControl::Lower => "lower",
            HighlowControl::Jackpot => "jackpot",
            HighlowControl::Higher => "higher",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HighlowRound {
    pub min: u32,
    pub max: u32,
    pub hint: u32,
    secret: u32,
    guess: Option<HighlowControl>,
}

impl HighlowRound {
    pub fn new(min: u32, max: u32, hint: u32, secret: u32) -> Self {
        Self {
            min,
            max,
            hint,
            secret,
            guess: None,
        }
    }

    pub fn guess(&self) -> Option<HighlowControl> {
        self.guess
    }

    /// `None` until the player has guessed
    pub fn outcome(&self) -> Option<Outcome> {
        let won = match self.guess? {
            HighlowControl::Jackpot if self.secret == self.hint => return Some(Outcome::Jackpot),
            HighlowControl::Jackpot => false,
            HighlowControl::Higher => self.secret > self.hint,
            HighlowControl::Lower => self.secret < self.hint,
        };
        Some(if won { Outcome::Win } else { Outcome::Loss })
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Highlow {
    min: u32,
    max: u32,
}

impl Default for Highlow {
    fn default() -> Self {
        Self { min: 1, max: 10 }
    }
}

impl Game for Highlow {
    type Control = HighlowControl;
    type Logic = HighlowRound;

    fn kind(&self) -> GameKind {
        GameKind::Highlow
    }

    fn deal(&self, rng: &mut StdRng) -> HighlowRound {
        HighlowRound::new(
            self.min,
            self.max,
            rng.gen_range(self.min..=self.max),
            rng.gen_range(self.min..=self.max),
        )
    }

    fn act(
        &self,
        round: &mut HighlowRound,
        control: HighlowControl,
        record: &PlayerRecord,
        rng: &mut StdRng,
    ) -> Option<Verdict> {
        if round.guess.is_some() {
            return None;
        }
        round.guess = Some(control);

        match round.outcome()? {
            // The jackpot pays a flat rate regardless of the player's multiplier
            Outcome::Jackpot => Some(Verdict::jackpot(JACKPOT_BASE, 0.0, 0.0)),
            Outcome::Win => Some(Verdict::win(
                WIN_BASE,
                record.multiplier,
                rng.gen::<f64>() * WIN_RANDOM_SPREAD,
            )),
            Outcome::Loss | Outcome::Tie => Some(Verdict::loss()),
        }
    }

    fn on_timeout(&self) -> TimeoutPolicy {
        TimeoutPolicy::Forfeit
    }

    fn view(&self, round: &HighlowRound) -> serde_json::Value {
        json!({
            "min": round.min,
            "max": round.max,
            "hint": round.hint,
            "guess": round.guess.map(HighlowControl::label),
            "secret": round.guess.map(|_| round.secret),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StakehouseConfig;
    use crate::session::ActorId;
    use rand::SeedableRng;

    fn record() -> PlayerRecord {
        let config = StakehouseConfig::default();
        PlayerRecord::new(ActorId::new("p1"), &config.economy, &config.energy)
    }

    fn play(hint: u32, secret: u32, guess: HighlowControl) -> (HighlowRound, Option<Verdict>) {
        let mut round = HighlowRound::new(1, 10, hint, secret);
        let mut rng = StdRng::seed_from_u64(7);
        let verdict = Highlow::default().act(&mut round, guess, &record(), &mut rng);
        (round, verdict)
    }

    #[test]
    fn test_higher_and_lower() {
        assert_eq!(play(4, 9, HighlowControl::Higher).1.unwrap().outcome, Outcome::Win);
        assert_eq!(play(4, 9, HighlowControl::Lower).1.unwrap().outcome, Outcome::Loss);
        assert_eq!(play(4, 2, HighlowControl::Lower).1.unwrap().outcome, Outcome::Win);
        // Equal numbers lose both directional guesses
        assert_eq!(play(5, 5, HighlowControl::Higher).1.unwrap().outcome, Outcome::Loss);
        assert_eq!(play(5, 5, HighlowControl::Lower).1.unwrap().outcome, Outcome::Loss);
    }

    #[test]
    fn test_jackpot_pays_flat_rate() {
        let verdict = play(6, 6, HighlowControl::Jackpot).1.unwrap();
        assert_eq!(verdict, Verdict::jackpot(10.0, 0.0, 0.0));

        let miss = play(6, 7, HighlowControl::Jackpot).1.unwrap();
        assert_eq!(miss.outcome, Outcome::Loss);
    }

    #[test]
    fn test_win_random_within_spread() {
        let verdict = play(1, 8, HighlowControl::Higher).1.unwrap();
        assert_eq!(verdict.base_rate, 0.75);
        assert!((0.0..0.5).contains(&verdict.random));
    }

    #[test]
    fn test_secret_hidden_until_guess() {
        let game = Highlow::default();
        let round = HighlowRound::new(1, 10, 3, 8);
        assert_eq!(game.view(&round)["secret"], serde_json::Value::Null);

        let (round, _) = play(3, 8, HighlowControl::Higher);
        assert_eq!(game.view(&round)["secret"], 8);
        assert_eq!(game.view(&round)["guess"], "higher");
        assert!(game
            .act(&mut round.clone(), HighlowControl::Lower, &record(), &mut StdRng::seed_from_u64(1))
            .is_none());
    }

    #[test]
    fn test_deal_stays_in_range() {
        let game = Highlow::default();
        let mut rng = StdRng::seed_from_u64(99);
        for _ in 0..100 {
            let round = game.deal(&mut rng);
            assert!((1..=10).contains(&round.hint));
            assert!((1..=10).contains(&round.secret));
        }
    }
}
