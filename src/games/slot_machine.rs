//! Slot machine: three reels, a triple pays the symbol's jackpot rate and a
//! pair pays its win rate

use super::GameKind;
use crate::action_id::Control;
use crate::economy::PlayerRecord;
use crate::round::{Game, TimeoutPolicy, Verdict};
use rand::rngs::StdRng;
use rand::Rng;
use serde_json::json;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Symbol {
    pub name: &'static str,
    pub jackpot: f64,
    pub win: f64,
}

pub const SYMBOLS: [Symbol; 10] = [
    Symbol { name: "dollar", jackpot: 100.0, win: 10.0 },
    Symbol { name: "money-bag", jackpot: 90.0, win: 9.0 },
    Symbol { name: "banknote", jackpot: 80.0, win: 8.0 },
    Symbol { name: "crown", jackpot: 70.0, win: 7.0 },
    Symbol { name: "trident", jackpot: 60.0, win: 6.0 },
    Symbol { name: "ring", jackpot: 50.0, win: 5.0 },
    Symbol { name: "burger", jackpot: 40.0, win: 4.0 },
    Symbol { name: "cheese", jackpot: 30.0, win: 3.0 },
    Symbol { name: "bread", jackpot: 20.0, win: 2.0 },
    Symbol { name: "clown", jackpot: 10.0, win: 1.0 },
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SlotMachineControl {
    Spin,
}

impl Control for SlotMachineControl {
    const ALL: &'static [Self] = &[SlotMachineControl::Spin];

    fn label(self) -> &'static str {
        "spin"
    }
}

/// Reels are drawn when the round is dealt and revealed by the spin
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SlotMachineRound {
    reels: [usize; 3],
    pub revealed: bool,
}

impl SlotMachineRound {
    pub fn new(reels: [usize; 3]) -> Self {
        Self {
            reels: reels.map(|reel| reel % SYMBOLS.len()),
            revealed: false,
        }
    }

    pub fn symbols(&self) -> [Symbol; 3] {
        self.reels.map(|reel| SYMBOLS[reel])
    }

    /// Triple pays the jackpot rate, any pair pays the pair's win rate
    pub fn verdict(&self, multiplier: f64) -> Verdict {
        let [a, b, c] = self.reels;
        if a == b && b == c {
            return Verdict::jackpot(SYMBOLS[a].jackpot, multiplier, 0.0);
        }

        let pair = if a == b || a == c {
            Some(a)
        } else if b == c {
            Some(b)
        } else {
            None
        };
        match pair {
            Some(reel) => Verdict::win(SYMBOLS[reel].win, multiplier, 0.0),
            None => Verdict::loss(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SlotMachine;

impl Game for SlotMachine {
    type Control = SlotMachineControl;
    type Logic = SlotMachineRound;

    fn kind(&self) -> GameKind {
        GameKind::SlotMachine
    }

    fn deal(&self, rng: &mut StdRng) -> SlotMachineRound {
        SlotMachineRound::new([
            rng.gen_range(0..SYMBOLS.len()),
            rng.gen_range(0..SYMBOLS.len()),
            rng.gen_range(0..SYMBOLS.len()),
        ])
    }

    fn act(
        &self,
        round: &mut SlotMachineRound,
        _control: SlotMachineControl,
        record: &PlayerRecord,
        _rng: &mut StdRng,
    ) -> Option<Verdict> {
        if round.revealed {
            return None;
        }
        round.revealed = true;
        Some(round.verdict(record.multiplier))
    }

    fn on_timeout(&self) -> TimeoutPolicy {
        TimeoutPolicy::Forfeit
    }

    fn view(&self, round: &SlotMachineRound) -> serde_json::Value {
        let reels: Vec<&str> = round
            .symbols()
            .iter()
            .map(|symbol| if round.revealed { symbol.name } else { "?" })
            .collect();
        json!({ "reels": reels, "revealed": round.revealed })
    }
}
