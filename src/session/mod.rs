//! Timed, identity-filtered, action-routed sessions
//!
//! A session subscribes to the events of one surface, routes the originating
//! actor's events to the handler bound to their action id, and stops on the
//! first of: a handler's `stop()`, the max event count, an external stop, the
//! TTL, or a handler failure. The end callback then runs exactly once, after
//! the subscription is gone.

pub mod collector;
pub mod event;

pub use collector::{
    origin_only, ActionContext, ActionHandler, ActorFilter, EndContext, EndHandler,
    SessionCollector, SessionHandle,
};
pub use event::{
    ActorEvent, ActorId, EventHub, EventKind, EventSource, Subscription, SubscriptionId, SurfaceId,
};

use serde::{Deserialize, Serialize};
use std::fmt;

/// Why a session stopped
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "reason", content = "detail", rename_all = "kebab-case")]
pub enum StopReason {
    /// A handler called `stop()`, or the max event count was reached
    Action(String),
    /// Stopped through the session handle, or the event source went away
    ExternalStop,
    Timeout,
    /// A handler failed
    Error,
}

impl StopReason {
    /// The stop came from a handled action rather than the clock or the outside
    pub fn was_internally_stopped(&self) -> bool {
        matches!(self, StopReason::Action(_))
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, StopReason::Timeout)
    }
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StopReason::Action(reason) => write!(f, "action ({})", reason),
            StopReason::ExternalStop => write!(f, "external-stop"),
            StopReason::Timeout => write!(f, "timeout"),
            StopReason::Error => write!(f, "error"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionPhase {
    Idle,
    Active,
    Stopped(StopReason),
}

/// What a finished session hands back to its caller
#[derive(Debug)]
pub struct SessionReport<S> {
    pub reason: StopReason,
    /// Events that reached a handler
    pub processed: usize,
    pub state: S,
}
