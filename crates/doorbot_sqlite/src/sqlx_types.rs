//! Row types read back from SQLite and their conversion into core types.
//!
//! Instants are stored as UNIX seconds; counters as INTEGER.

use chrono::{DateTime, Utc};

use doorbot_core::types::{HistoryRecord, Stats};

#[derive(Debug, sqlx::FromRow)]
pub(crate) struct StatsRow {
    pub name: String,
    pub total: i64,
    pub streak: i64,
    pub last: Option<i64>,
}

#[derive(Debug, sqlx::FromRow)]
pub(crate) struct HistoryRow {
    pub timestamp: i64,
    pub name: String,
    pub access_granted: bool,
}

pub(crate) fn to_unix(instant: DateTime<Utc>) -> i64 {
    instant.timestamp()
}

pub(crate) fn from_unix(secs: i64) -> Result<DateTime<Utc>, String> {
    DateTime::from_timestamp(secs, 0).ok_or_else(|| format!("timestamp {secs} out of range"))
}

fn counter(column: &str, value: i64) -> Result<u32, String> {
    u32::try_from(value).map_err(|_| format!("{column} = {value} is not a valid counter"))
}

impl TryFrom<StatsRow> for Stats {
    type Error = String;

    fn try_from(row: StatsRow) -> Result<Self, Self::Error> {
        Ok(Stats {
            total: counter("total", row.total)?,
            streak: counter("streak", row.streak)?,
            last: row.last.map(from_unix).transpose()?,
            name: row.name,
        })
    }
}

impl TryFrom<HistoryRow> for HistoryRecord {
    type Error = String;

    fn try_from(row: HistoryRow) -> Result<Self, Self::Error> {
        Ok(HistoryRecord {
            timestamp: from_unix(row.timestamp)?,
            person: row.name,
            granted: row.access_granted,
        })
    }
}
