//! Ledger contract: fetch, mutate, persist
//!
//! Every economy change goes through `commit`, which mutates a copy of the
//! record, persists the copy and only then replaces the caller's record. A
//! failed persist leaves the caller holding the old, unmodified record.

use super::record::PlayerRecord;
use crate::config::StakehouseConfig;
use crate::errors::{LedgerError, LedgerResult};
use crate::session::ActorId;
use async_trait::async_trait;
use dashmap::DashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

#[async_trait]
pub trait Ledger: Send + Sync {
    async fn fetch(&self, player: &ActorId) -> LedgerResult<PlayerRecord>;

    async fn persist(&self, record: &PlayerRecord) -> LedgerResult<()>;
}

/// Apply `mutation` to a copy of `record`
pub fn mutate<F>(record: &PlayerRecord, mutation: F) -> PlayerRecord
where
    F: FnOnce(&mut PlayerRecord),
{
    let mut next = record.clone();
    mutation(&mut next);
    next
}

/// Mutate then persist; `record` is replaced only once the persist succeeded
pub async fn commit<L, F>(ledger: &L, record: &mut PlayerRecord, mutation: F) -> LedgerResult<()>
where
    L: Ledger + ?Sized,
    F: FnOnce(&mut PlayerRecord) + Send,
{
    let next = mutate(record, mutation);
    ledger.persist(&next).await?;
    *record = next;
    Ok(())
}

/// In-memory ledger
#[derive(Debug)]
pub struct MemoryLedger {
    records: DashMap<ActorId, PlayerRecord>,
    config: StakehouseConfig,
    /// Create unknown players from the configured defaults on fetch
    register_on_fetch: bool,
    fail_persist: AtomicBool,
    persists: AtomicU64,
}

impl MemoryLedger {
    pub fn new(config: StakehouseConfig) -> Self {
        Self {
            records: DashMap::new(),
            config,
            register_on_fetch: true,
            fail_persist: AtomicBool::new(false),
            persists: AtomicU64::new(0),
        }
    }

    /// Unknown players are an error instead of being created
    pub fn without_registration(mut self) -> Self {
        self.register_on_fetch = false;
        self
    }

    pub fn insert(&self, record: PlayerRecord) {
        self.records.insert(record.player.clone(), record);
    }

    pub fn get(&self, player: &ActorId) -> Option<PlayerRecord> {
        self.records.get(player).map(|record| record.clone())
    }

    /// Make every later persist fail (or succeed again)
    pub fn fail_persists(&self, fail: bool) {
        self.fail_persist.store(fail, Ordering::SeqCst);
    }

    /// Successful persists so far
    pub fn persist_count(&self) -> u64 {
        self.persists.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Ledger for MemoryLedger {
    async fn fetch(&self, player: &ActorId) -> LedgerResult<PlayerRecord> {
        if let Some(record) = self.get(player) {
            return Ok(record);
        }
        if !self.register_on_fetch {
            return Err(LedgerError::PlayerNotFound(player.to_string()));
        }

        let record = PlayerRecord::new(player.clone(), &self.config.economy, &self.config.energy);
        tracing::debug!("Registered new player {}", player);
        Ok(self
            .records
            .entry(player.clone())
            .or_insert(record)
            .clone())
    }

    async fn persist(&self, record: &PlayerRecord) -> LedgerResult<()> {
        if self.fail_persist.load(Ordering::SeqCst) {
            tracing::warn!("Persist rejected for player {}", record.player);
            return Err(LedgerError::PersistFailed {
                player: record.player.to_string(),
                reason: "ledger unavailable".to_string(),
            });
        }

        self.records.insert(record.player.clone(), record.clone());
        self.persists.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
