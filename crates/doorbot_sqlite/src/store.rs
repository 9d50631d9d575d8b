//! SQLite implementation of the core storage ports.
//!
//! Every write transaction issues a write before it reads stats, so SQLite's
//! single write lock serialises concurrent read-modify-write sequences.
//! Writers that find the lock taken wait up to the configured busy timeout.

use anyhow::anyhow;
use async_trait::async_trait;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::{Sqlite, SqlitePool, Transaction};
use tracing::info;

use doorbot_core::error::DoorbotError;
use doorbot_core::ports::{AccessStore, HistoryStore, Result, StatsStore, StoreTransaction};
use doorbot_core::types::{HistoryRecord, Stats};

use crate::sqlx_types::{to_unix, HistoryRow, StatsRow};
use crate::SqliteConfig;

const SCHEMA: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS stats (
        name   TEXT    NOT NULL PRIMARY KEY,
        total  INTEGER NOT NULL CHECK (total >= 0),
        streak INTEGER NOT NULL CHECK (streak >= 0),
        last   INTEGER
    ) STRICT
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS history (
        timestamp      INTEGER NOT NULL,
        name           TEXT    NOT NULL,
        access_granted INTEGER NOT NULL CHECK (access_granted IN (0, 1)),
        PRIMARY KEY (timestamp, name)
    ) STRICT
    "#,
    "CREATE INDEX IF NOT EXISTS history_name_timestamp ON history (name, timestamp)",
];

// ── SqliteStore ───────────────────────────────────────────────

/// Durable stats and history store. Cheap to clone; clones share the pool.
#[derive(Debug, Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Open (creating if missing) the database at `config.path` and apply the
    /// schema.
    pub async fn connect(config: &SqliteConfig) -> Result<Self> {
        let options = SqliteConnectOptions::new()
            .filename(&config.path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .busy_timeout(config.busy_timeout);

        let pool = SqlitePoolOptions::new()
            .max_connections(config.max_connections)
            .connect_with(options)
            .await
            .map_err(|e| anyhow!(e).context(format!("opening {}", config.path.display())))?;

        let store = Self { pool };
        store.migrate().await?;
        info!(path = %config.path.display(), "sqlite store ready");
        Ok(store)
    }

    /// Create the tables if they do not exist yet. Idempotent.
    pub async fn migrate(&self) -> Result<()> {
        let mut tx = self.pool.begin().await.map_err(|e| anyhow!(e))?;
        for statement in SCHEMA {
            sqlx::query(statement)
                .execute(&mut *tx)
                .await
                .map_err(|e| anyhow!(e))?;
        }
        tx.commit().await.map_err(|e| anyhow!(e))?;
        Ok(())
    }

    /// Wait for checked-out connections and close the pool.
    pub async fn close(&self) {
        self.pool.close().await;
    }
}

#[async_trait]
impl AccessStore for SqliteStore {
    type Tx = SqliteTransaction;

    async fn begin(&self) -> Result<SqliteTransaction> {
        let tx = self.pool.begin().await.map_err(|e| anyhow!(e))?;
        Ok(SqliteTransaction { tx })
    }
}

// ── SqliteTransaction ─────────────────────────────────────────

/// An open SQLite transaction. Rolled back when dropped uncommitted.
pub struct SqliteTransaction {
    tx: Transaction<'static, Sqlite>,
}

fn corrupt(e: String) -> DoorbotError {
    DoorbotError::Storage(anyhow!(e).context("corrupt row"))
}

#[async_trait]
impl StatsStore for SqliteTransaction {
    async fn get_stats(&mut self, person: &str) -> Result<Stats> {
        let row = sqlx::query_as::<_, StatsRow>(
            "SELECT name, total, streak, last FROM stats WHERE name = ?",
        )
        .bind(person)
        .fetch_optional(&mut *self.tx)
        .await
        .map_err(|e| anyhow!(e))?;

        match row {
            Some(row) => Stats::try_from(row).map_err(corrupt),
            None => Ok(Stats::empty(person)),
        }
    }

    async fn upsert_stats(&mut self, stats: &Stats) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO stats (name, total, streak, last)
            VALUES (?, ?, ?, ?)
            ON CONFLICT (name) DO UPDATE
            SET total = excluded.total,
                streak = excluded.streak,
                last = excluded.last
            "#,
        )
        .bind(&stats.name)
        .bind(i64::from(stats.total))
        .bind(i64::from(stats.streak))
        .bind(stats.last.map(to_unix))
        .execute(&mut *self.tx)
        .await
        .map_err(|e| anyhow!(e))?;
        Ok(())
    }

    async fn delete_stats(&mut self, person: &str) -> Result<()> {
        sqlx::query("DELETE FROM stats WHERE name = ?")
            .bind(person)
            .execute(&mut *self.tx)
            .await
            .map_err(|e| anyhow!(e))?;
        Ok(())
    }
}

#[async_trait]
impl HistoryStore for SqliteTransaction {
    async fn append_history(&mut self, record: &HistoryRecord) -> Result<Option<bool>> {
        let timestamp = to_unix(record.timestamp);

        // Insert first so the write lock is held before anything is read.
        let inserted = sqlx::query(
            r#"
            INSERT INTO history (timestamp, name, access_granted)
            VALUES (?, ?, ?)
            ON CONFLICT (timestamp, name) DO NOTHING
            "#,
        )
        .bind(timestamp)
        .bind(&record.person)
        .bind(record.granted)
        .execute(&mut *self.tx)
        .await
        .map_err(|e| anyhow!(e))?;

        if inserted.rows_affected() == 1 {
            return Ok(None);
        }

        let previous = sqlx::query_scalar::<_, bool>(
            "SELECT access_granted FROM history WHERE timestamp = ? AND name = ?",
        )
        .bind(timestamp)
        .bind(&record.person)
        .fetch_one(&mut *self.tx)
        .await
        .map_err(|e| anyhow!(e))?;

        if previous != record.granted {
            sqlx::query("UPDATE history SET access_granted = ? WHERE timestamp = ? AND name = ?")
                .bind(record.granted)
                .bind(timestamp)
                .bind(&record.person)
                .execute(&mut *self.tx)
                .await
                .map_err(|e| anyhow!(e))?;
        }

        Ok(Some(previous))
    }

    async fn list_history(&mut self, person: &str) -> Result<Vec<HistoryRecord>> {
        let rows = sqlx::query_as::<_, HistoryRow>(
            r#"
            SELECT timestamp, name, access_granted
            FROM history
            WHERE name = ?
            ORDER BY timestamp ASC
            "#,
        )
        .bind(person)
        .fetch_all(&mut *self.tx)
        .await
        .map_err(|e| anyhow!(e))?;

        rows.into_iter()
            .map(|row| HistoryRecord::try_from(row).map_err(corrupt))
            .collect()
    }
}

#[async_trait]
impl StoreTransaction for SqliteTransaction {
    async fn commit(self) -> Result<()> {
        self.tx.commit().await.map_err(|e| anyhow!(e))?;
        Ok(())
    }

    async fn rollback(self) -> Result<()> {
        self.tx.rollback().await.map_err(|e| anyhow!(e))?;
        Ok(())
    }
}
