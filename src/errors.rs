//! Error types for the stakehouse session and economy core
//!
//! Every concern has its own enum; `StakehouseError` is the root that
//! handlers, end callbacks and the play flow return.

use crate::action_id::ActionId;
use crate::economy::PaymentUnit;

/// Root error type for all stakehouse operations
#[derive(Debug, thiserror::Error)]
pub enum StakehouseError {
    /// Session lifecycle errors
    #[error("Session error: {0}")]
    Session(#[from] SessionError),

    /// Energy gating errors
    #[error("Energy error: {0}")]
    Energy(#[from] EnergyError),

    /// Ledger fetch/persist errors
    #[error("Ledger error: {0}")]
    Ledger(#[from] LedgerError),

    /// Round orchestration errors
    #[error("Round error: {0}")]
    Round(#[from] RoundError),

    /// Bet validation errors
    #[error("Bet error: {0}")]
    Bet(#[from] BetError),

    /// Booster purchase errors
    #[error("Booster error: {0}")]
    Booster(#[from] BoosterError),

    /// Renderer errors
    #[error("Render error: {0}")]
    Render(#[from] RenderError),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Configuration(#[from] ConfigError),
}

/// Expected misses while dispatching an inbound event.
///
/// These never leave the collector; they are logged at trace level and the
/// event is dropped.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DispatchMiss {
    #[error("Event from {actor} rejected by the actor filter")]
    FilterRejected { actor: String },

    #[error("No handler bound to action id {action_id}")]
    NoHandlerMatched { action_id: String },
}

/// Session lifecycle errors
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// A handler failed; the session was stopped and torn down
    #[error("Handler for {action} failed: {source}")]
    Handler {
        action: ActionId,
        #[source]
        source: Box<StakehouseError>,
    },

    /// The end callback failed after teardown
    #[error("End callback failed: {0}")]
    End(#[source] Box<StakehouseError>),

    /// The event source refused the subscription
    #[error("Subscription to surface {surface} failed: {reason}")]
    Subscribe { surface: String, reason: String },
}

/// Energy gating errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EnergyError {
    #[error("Insufficient energy: requested {requested}, available {available}")]
    InsufficientEnergy { requested: u32, available: u32 },
}

/// Ledger errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LedgerError {
    #[error("Player {0} not found")]
    PlayerNotFound(String),

    /// The record could not be persisted; the mutation is not applied
    #[error("Persist failed for player {player}: {reason}")]
    PersistFailed { player: String, reason: String },
}

/// Round orchestration errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RoundError {
    #[error("Insufficient funds: bet {bet}, wallet {wallet}")]
    InsufficientFunds { bet: u64, wallet: u64 },

    #[error("Round {0} was already settled")]
    AlreadySettled(String),

    #[error("Unknown game: {0}")]
    UnknownGame(String),
}

/// Bet validation errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BetError {
    #[error("Not a whole number of coins: {0}")]
    Unparseable(String),

    #[error("Bet must be a positive amount")]
    Zero,

    #[error("Bet is already {0}")]
    Unchanged(u64),

    #[error("Bet {amount} is below the minimum {minimum}")]
    BelowMinimum { amount: u64, minimum: u64 },

    #[error("Bet {amount} is above the maximum {maximum}")]
    AboveMaximum { amount: u64, maximum: u64 },

    #[error("Bet {amount} exceeds wallet balance {wallet}")]
    ExceedsWallet { amount: u64, wallet: u64 },
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BoosterError {
    #[error("Unknown booster: {0}")]
    UnknownBooster(String),

    #[error("Booster {booster} has no offer {offer}")]
    UnknownOffer { booster: String, offer: String },

    #[error("Cannot afford {cost} {unit}, only {balance} held")]
    CannotAfford {
        unit: PaymentUnit,
        cost: u64,
        balance: u64,
    },
}

/// Renderer errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RenderError {
    #[error("Surface {0} is gone")]
    SurfaceGone(String),

    #[error("Render failed: {0}")]
    Failed(String),
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid configuration value: {0}")]
    InvalidValue(String),

    #[error("Configuration logical inconsistency: {0}")]
    LogicalInconsistency(String),

    #[error("Failed to read configuration: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse configuration: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Convenience type alias for Results
pub type StakehouseResult<T> = Result<T, StakehouseError>;

/// Ledger result alias
pub type LedgerResult<T> = Result<T, LedgerError>;

/// Session result alias
pub type SessionResult<T> = Result<T, SessionError>;

impl StakehouseError {
    /// Whether this is the recoverable "not enough energy" business error
    pub fn is_insufficient_energy(&self) -> bool {
        matches!(self, StakehouseError::Energy(EnergyError::InsufficientEnergy { .. }))
    }

    /// Find the ledger error behind this error, looking through handler failures
    pub fn ledger_error(&self) -> Option<&LedgerError> {
        match self {
            StakehouseError::Ledger(e) => Some(e),
            StakehouseError::Session(SessionError::Handler { source, .. })
            | StakehouseError::Session(SessionError::End(source)) => source.ledger_error(),
            _ => None,
        }
    }
}
