//! Stakehouse - session-driven wagering core
//!
//! Timed, actor-filtered interaction sessions drive short games of chance.
//! Each round settles a bet at most once against a player ledger, while
//! energy gates how often a player may start a round.

pub mod action_id;
pub mod clock;
pub mod config;
pub mod economy;
pub mod energy;
pub mod errors;
pub mod games;
pub mod house;
pub mod menus;
pub mod render;
pub mod round;
pub mod session;
pub mod stake;
pub mod streak;
pub mod telemetry;

pub use action_id::{ActionId, ActionIdGenerator, Control};
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::StakehouseConfig;
pub use economy::{BetPolicy, BoosterCatalog, Ledger, MemoryLedger, PlayerRecord};
pub use energy::{EnergyRegulator, EnergyState};
pub use errors::{StakehouseError, StakehouseResult};
pub use games::GameKind;
pub use house::{GameHouse, PlayOutcome};
pub use render::{Frame, RecordingRenderer, Renderer};
pub use round::{Game, RoundReport, RoundRunner, Verdict};
pub use session::{
    ActorEvent, ActorId, EventHub, EventSource, SessionCollector, SessionHandle, StopReason,
    SurfaceId,
};
pub use stake::{Outcome, StakeOutcome, StakeResolutionEngine};
pub use streak::{StreakState, StreakTracker};
