//! Domain types shared by the stores, the aggregation engine and the adapters.

use chrono::{DateTime, SubsecRound, Utc};
use serde::{Deserialize, Serialize};

/// A badge scan reported by an ingestion adapter.
///
/// Instants are truncated to whole seconds: history rows are keyed on
/// `(timestamp, person)` at second granularity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessEvent {
    timestamp: DateTime<Utc>,
    person: String,
    granted: bool,
}

impl AccessEvent {
    pub fn new(timestamp: DateTime<Utc>, person: impl Into<String>, granted: bool) -> Self {
        Self {
            timestamp: timestamp.trunc_subsecs(0),
            person: person.into(),
            granted,
        }
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    pub fn person(&self) -> &str {
        &self.person
    }

    pub fn granted(&self) -> bool {
        self.granted
    }
}

/// One row of the access history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryRecord {
    pub timestamp: DateTime<Utc>,
    #[serde(rename = "name")]
    pub person: String,
    #[serde(rename = "access_granted")]
    pub granted: bool,
}

impl From<&AccessEvent> for HistoryRecord {
    fn from(event: &AccessEvent) -> Self {
        Self {
            timestamp: event.timestamp,
            person: event.person.clone(),
            granted: event.granted,
        }
    }
}

/// Per-person visit aggregate.
///
/// `last == None` is the zero aggregate: no granted visit has been applied.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stats {
    pub name: String,
    pub total: u32,
    pub streak: u32,
    pub last: Option<DateTime<Utc>>,
}

impl Stats {
    /// Zero aggregate scoped to `name`.
    pub fn empty(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            total: 0,
            streak: 0,
            last: None,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.last.is_none()
    }
}

/// Result of recording one access event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordOutcome {
    pub stats: Stats,
    /// The event advanced `total`; adapters announce only bumped visits.
    pub bumped: bool,
}
