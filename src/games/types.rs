use serde::{Deserialize, Serialize};
use std::fmt;

/// Supported games
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum GameKind {
    Highlow,
    DiceRoll,
    SlotMachine,
}

impl GameKind {
    pub const ALL: [GameKind; 3] = [GameKind::Highlow, GameKind::DiceRoll, GameKind::SlotMachine];

    /// Stable id, used as the picker option value
    pub fn id(self) -> &'static str {
        match self {
            GameKind::Highlow => "highlow",
            GameKind::DiceRoll => "diceroll",
            GameKind::SlotMachine => "slotmachine",
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            GameKind::Highlow => "Highlow",
            GameKind::DiceRoll => "Dice Roll",
            GameKind::SlotMachine => "Slot Machine",
        }
    }

    pub fn from_id(id: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.id() == id)
    }
}

impl fmt::Display for GameKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ids_round_trip() {
        for kind in GameKind::ALL {
            assert_eq!(GameKind::from_id(kind.id()), Some(kind));
        }
        assert_eq!(GameKind::from_id("poker"), None);
    }

    #[test]
    fn test_serde_matches_id() {
        let json = serde_json::to_string(&GameKind::SlotMachine).unwrap();
        assert_eq!(json, "\"slotmachine\"");
    }
}
