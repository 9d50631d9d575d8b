//! StatsService, the record coordinator.
//!
//! Holds an explicitly constructed [`AccessStore`] and runs every operation as
//! one storage transaction. Any `?` between `begin` and `commit` drops the
//! transaction, which rolls it back.

use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, error, info};

use crate::aggregate::{bump, replay};
use crate::calendar::Calendar;
use crate::error::DoorbotError;
use crate::ports::{AccessStore, HistoryStore, Result, StatsStore, StoreTransaction};
use crate::types::{AccessEvent, HistoryRecord, RecordOutcome, Stats};

// ── StatsService trait ────────────────────────────────────────

/// The interface ingestion adapters and admin tooling call into.
#[async_trait]
pub trait StatsService: Send + Sync {
    /// Append `event` to history and, when granted, fold it into the
    /// person's stats. Atomic: on error nothing is recorded.
    async fn add_record(&self, event: &AccessEvent) -> Result<RecordOutcome>;

    /// Rebuild a person's stats from their full history.
    async fn recompute(&self, person: &str) -> Result<Stats>;

    async fn get(&self, person: &str) -> Result<Stats>;

    async fn list_history(&self, person: &str) -> Result<Vec<HistoryRecord>>;

    fn calendar(&self) -> &Calendar;
}

// ── StatsServiceImpl ──────────────────────────────────────────

pub struct StatsServiceImpl<S> {
    store: S,
    calendar: Calendar,
    timeout: Option<Duration>,
}

/// How an appended event moves the stored aggregate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Plan {
    Unchanged,
    Bump,
    Replay,
}

impl Plan {
    fn for_event(previous: &Stats, event: &AccessEvent, previous_flag: Option<bool>) -> Self {
        if event.granted() {
            match previous.last {
                Some(last) if event.timestamp() < last => Self::Replay,
                _ => Self::Bump,
            }
        } else if previous_flag == Some(true) {
            // A counted visit was withdrawn.
            Self::Replay
        } else {
            Self::Unchanged
        }
    }
}

impl<S: AccessStore> StatsServiceImpl<S> {
    pub fn new(store: S, calendar: Calendar) -> Self {
        Self {
            store,
            calendar,
            timeout: None,
        }
    }

    /// Bound every operation by `limit`. An expired operation rolls back and
    /// returns [`DoorbotError::Timeout`].
    pub fn with_timeout(mut self, limit: Duration) -> Self {
        self.timeout = Some(limit);
        self
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    async fn bounded<T, F>(&self, op: F) -> Result<T>
    where
        F: Future<Output = Result<T>> + Send,
    {
        match self.timeout {
            None => op.await,
            Some(limit) => tokio::time::timeout(limit, op)
                .await
                .map_err(|_| DoorbotError::Timeout(limit))?,
        }
    }

    async fn record(&self, event: &AccessEvent) -> Result<RecordOutcome> {
        let person = event.person();
        let mut tx = self.store.begin().await?;

        // The history write comes first so the store takes its write lock
        // before stats are read.
        let previous_flag = tx.append_history(&HistoryRecord::from(event)).await?;
        let previous = tx.get_stats(person).await?;

        let plan = Plan::for_event(&previous, event, previous_flag);
        debug!(person, ?plan, ?previous_flag, "applying access event");

        let stats = match plan {
            Plan::Unchanged => previous.clone(),
            Plan::Bump => {
                let next = bump(&self.calendar, &previous, event.timestamp());
                tx.upsert_stats(&next).await?;
                next
            }
            Plan::Replay => {
                let history = tx.list_history(person).await?;
                let next = replay(&self.calendar, person, &history);
                if next.is_empty() {
                    tx.delete_stats(person).await?;
                } else {
                    tx.upsert_stats(&next).await?;
                }
                next
            }
        };

        tx.commit().await?;

        Ok(RecordOutcome {
            bumped: stats.total != previous.total,
            stats,
        })
    }

    async fn rebuild(&self, person: &str) -> Result<Stats> {
        let mut tx = self.store.begin().await?;
        tx.delete_stats(person).await?;

        let history = tx.list_history(person).await?;
        let stats = replay(&self.calendar, person, &history);
        if !stats.is_empty() {
            tx.upsert_stats(&stats).await?;
        }

        tx.commit().await?;
        info!(
            person,
            records = history.len(),
            total = stats.total,
            streak = stats.streak,
            "recomputed stats"
        );
        Ok(stats)
    }
}

#[async_trait]
impl<S: AccessStore> StatsService for StatsServiceImpl<S> {
    async fn add_record(&self, event: &AccessEvent) -> Result<RecordOutcome> {
        if event.person().trim().is_empty() {
            return Err(DoorbotError::InvalidInput("access event has no person".into()));
        }

        let outcome = self.bounded(self.record(event)).await.inspect_err(|e| {
            error!(person = event.person(), error = %e, "failed to record access event");
        })?;

        info!(
            person = event.person(),
            granted = event.granted(),
            bumped = outcome.bumped,
            total = outcome.stats.total,
            streak = outcome.stats.streak,
            "recorded access event"
        );
        Ok(outcome)
    }

    async fn recompute(&self, person: &str) -> Result<Stats> {
        self.bounded(self.rebuild(person)).await.inspect_err(|e| {
            error!(person, error = %e, "failed to recompute stats");
        })
    }

    async fn get(&self, person: &str) -> Result<Stats> {
        self.bounded(self.store.get_stats(person)).await
    }

    async fn list_history(&self, person: &str) -> Result<Vec<HistoryRecord>> {
        self.bounded(self.store.list_history(person)).await
    }

    fn calendar(&self) -> &Calendar {
        &self.calendar
    }
}
