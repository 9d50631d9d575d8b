//! In-memory store.
//!
//! A transaction holds the table lock for its whole lifetime, so concurrent
//! units of work are fully serialised. Writes go to a staged copy that is
//! published on commit and discarded on rollback or drop.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::ports::{AccessStore, HistoryStore, Result, StatsStore, StoreTransaction};
use crate::types::{HistoryRecord, Stats};

#[derive(Debug, Clone, Default)]
struct Tables {
    stats: BTreeMap<String, Stats>,
    history: BTreeMap<String, BTreeMap<DateTime<Utc>, bool>>,
}

#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    tables: Arc<Mutex<Tables>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl AccessStore for MemoryStore {
    type Tx = MemoryTransaction;

    async fn begin(&self) -> Result<MemoryTransaction> {
        let guard = Arc::clone(&self.tables).lock_owned().await;
        let staged = guard.clone();
        Ok(MemoryTransaction { guard, staged })
    }
}

pub struct MemoryTransaction {
    guard: OwnedMutexGuard<Tables>,
    staged: Tables,
}

#[async_trait]
impl StatsStore for MemoryTransaction {
    async fn get_stats(&mut self, person: &str) -> Result<Stats> {
        Ok(self
            .staged
            .stats
            .get(person)
            .cloned()
            .unwrap_or_else(|| Stats::empty(person)))
    }

    async fn upsert_stats(&mut self, stats: &Stats) -> Result<()> {
        self.staged.stats.insert(stats.name.clone(), stats.clone());
        Ok(())
    }

    async fn delete_stats(&mut self, person: &str) -> Result<()> {
        self.staged.stats.remove(person);
        Ok(())
    }
}

#[async_trait]
impl HistoryStore for MemoryTransaction {
    async fn append_history(&mut self, record: &HistoryRecord) -> Result<Option<bool>> {
        Ok(self
            .staged
            .history
            .entry(record.person.clone())
            .or_default()
            .insert(record.timestamp, record.granted))
    }

    async fn list_history(&mut self, person: &str) -> Result<Vec<HistoryRecord>> {
        let Some(rows) = self.staged.history.get(person) else {
            return Ok(Vec::new());
        };
        Ok(rows
            .iter()
            .map(|(timestamp, granted)| HistoryRecord {
                timestamp: *timestamp,
                person: person.to_string(),
                granted: *granted,
            })
            .collect())
    }
}

#[async_trait]
impl StoreTransaction for MemoryTransaction {
    async fn commit(self) -> Result<()> {
        let Self { mut guard, staged } = self;
        *guard = staged;
        Ok(())
    }

    async fn rollback(self) -> Result<()> {
        Ok(())
    }
}
