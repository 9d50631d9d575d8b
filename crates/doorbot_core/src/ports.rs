//! Storage and notification port traits.
//! Implemented by `MemoryStore` here and by `doorbot_sqlite`. The coordinator
//! depends only on these traits.
//!
//! Every storage method runs against an explicit transaction handle: callers
//! open a [`StoreTransaction`] with [`AccessStore::begin`] and pass it down.
//! Dropping a transaction without committing rolls it back.

use async_trait::async_trait;

use crate::error::DoorbotError;
use crate::types::{HistoryRecord, Stats};

pub type Result<T> = std::result::Result<T, DoorbotError>;

/// Per-person aggregate storage.
#[async_trait]
pub trait StatsStore: Send {
    /// Stored aggregate, or the zero aggregate for `person` when none exists.
    async fn get_stats(&mut self, person: &str) -> Result<Stats>;

    /// Insert or fully overwrite the row keyed by `stats.name`.
    async fn upsert_stats(&mut self, stats: &Stats) -> Result<()>;

    async fn delete_stats(&mut self, person: &str) -> Result<()>;
}

/// Access history storage, keyed by `(timestamp, person)`.
#[async_trait]
pub trait HistoryStore: Send {
    /// Idempotent upsert. An existing key only has its `granted` flag
    /// overwritten; the previous flag is returned (`None` for a new key).
    async fn append_history(&mut self, record: &HistoryRecord) -> Result<Option<bool>>;

    /// Every record for `person`, ascending by timestamp. Empty for an
    /// unknown person.
    async fn list_history(&mut self, person: &str) -> Result<Vec<HistoryRecord>>;
}

/// One atomic unit of work spanning both stores.
#[async_trait]
pub trait StoreTransaction: StatsStore + HistoryStore {
    async fn commit(self) -> Result<()>;

    async fn rollback(self) -> Result<()>;
}

/// Entry point of a storage backend.
#[async_trait]
pub trait AccessStore: Send + Sync + 'static {
    type Tx: StoreTransaction + 'static;

    async fn begin(&self) -> Result<Self::Tx>;

    /// Read accessor outside any caller transaction.
    async fn get_stats(&self, person: &str) -> Result<Stats> {
        let mut tx = self.begin().await?;
        let stats = tx.get_stats(person).await?;
        tx.rollback().await?;
        Ok(stats)
    }

    /// Read accessor outside any caller transaction.
    async fn list_history(&self, person: &str) -> Result<Vec<HistoryRecord>> {
        let mut tx = self.begin().await?;
        let history = tx.list_history(person).await?;
        tx.rollback().await?;
        Ok(history)
    }
}

/// Outbound announcement of a person's updated stats (chat channel,
/// external integration). Invoked by adapters, never by the core.
#[async_trait]
pub trait Notifier: Send + Sync {
    fn name(&self) -> &str;

    async fn post(&self, stats: &Stats) -> anyhow::Result<()>;
}
