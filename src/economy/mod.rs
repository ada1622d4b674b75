//! Player economy: records, the ledger contract, bet limits and boosters

pub mod bet;
pub mod booster;
pub mod ledger;
pub mod record;

pub use bet::BetPolicy;
pub use booster::{
    Booster, BoosterCatalog, BoosterOffer, BoosterState, OfferKind, OfferValue, PaymentUnit,
};
pub use ledger::{commit, mutate, Ledger, MemoryLedger};
pub use record::{GameStats, PlayerRecord};
