//! The games a player can pick

pub mod dice_roll;
pub mod highlow;
pub mod slot_machine;
pub mod types;

pub use dice_roll::{DiceRoll, DiceRollControl};
pub use highlow::{Highlow, HighlowControl};
pub use slot_machine::{SlotMachine, SlotMachineControl};
pub use types::GameKind;
