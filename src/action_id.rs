//! Session-scoped action identifiers
//!
//! Every control a session renders carries an id of the form
//! `<origin_ms>.<nonce>:<label>`. The origin timestamp and nonce are fixed for
//! the lifetime of the generator, so the same label always maps to the same id
//! within a session while two sessions never share ids, even when they render
//! identical controls.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::hash::Hash;

/// A typed set of controls a session can render.
///
/// Implemented by small enums (one per game or menu) so handlers dispatch on a
/// variant rather than on free-form strings.
pub trait Control: Copy + Eq + Hash + fmt::Debug + Send + Sync + 'static {
    /// Every control of this kind, in render order
    const ALL: &'static [Self];

    /// Short label embedded in the action id
    fn label(self) -> &'static str;

    fn from_label(label: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|control| control.label() == label)
    }
}

/// Immutable identifier of one control inside one session
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ActionId {
    origin_ms: u64,
    nonce: u32,
    label: String,
}

impl ActionId {
    pub fn new(origin_ms: u64, nonce: u32, label: impl Into<String>) -> Self {
        Self {
            origin_ms,
            nonce,
            label: label.into(),
        }
    }

    /// Parse the wire form produced by `Display`
    pub fn parse(raw: &str) -> Option<Self> {
        let (seed, label) = raw.split_once(':')?;
        let (origin, nonce) = seed.split_once('.')?;
        if label.is_empty() {
            return None;
        }

        Some(Self {
            origin_ms: origin.parse().ok()?,
            nonce: u32::from_str_radix(nonce, 16).ok()?,
            label: label.to_string(),
        })
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn origin_ms(&self) -> u64 {
        self.origin_ms
    }
}

impl fmt::Display for ActionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{:08x}:{}", self.origin_ms, self.nonce, self.label)
    }
}

/// Produces the action ids of a single session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActionIdGenerator {
    origin_ms: u64,
    nonce: u32,
}

impl ActionIdGenerator {
    /// Create a generator seeded with the session origin and a random nonce
    pub fn new(origin_ms: u64) -> Self {
        Self::with_nonce(origin_ms, rand::random())
    }

    /// Create a generator with an explicit nonce (deterministic, for tests)
    pub fn with_nonce(origin_ms: u64, nonce: u32) -> Self {
        Self { origin_ms, nonce }
    }

    pub fn origin_ms(&self) -> u64 {
        self.origin_ms
    }

    pub fn create(&self, label: &str) -> ActionId {
        ActionId::new(self.origin_ms, self.nonce, label)
    }

    pub fn create_control<C: Control>(&self, control: C) -> ActionId {
        self.create(control.label())
    }

    /// Return the label of `raw` if it was issued by this generator
    pub fn matches(&self, raw: &str) -> Option<String> {
        ActionId::parse(raw)
            .filter(|id| self.owns(id))
            .map(|id| id.label)
    }

    /// Resolve `raw` to a control of kind `C` issued by this generator
    pub fn resolve<C: Control>(&self, raw: &str) -> Option<C> {
        self.matches(raw).and_then(|label| C::from_label(&label))
    }

    pub fn owns(&self, id: &ActionId) -> bool {
        id.origin_ms == self.origin_ms && id.nonce == self.nonce
    }
}
