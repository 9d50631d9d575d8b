//! Doorbot SQLite adapter
//!
//! Implements the `doorbot_core` storage ports on an embedded SQLite file via
//! sqlx. All SQL is runtime-checked (`sqlx::query`, not `sqlx::query!`), so
//! building needs no database.

mod sqlx_types;
mod store;

use std::path::PathBuf;
use std::time::Duration;

pub use store::{SqliteStore, SqliteTransaction};

pub const DEFAULT_DB_PATH: &str = "access.sqlite";

/// Store tuning.
#[derive(Debug, Clone)]
pub struct SqliteConfig {
    pub path: PathBuf,
    pub max_connections: u32,
    /// How long a writer waits for SQLite's write lock before failing.
    pub busy_timeout: Duration,
}

impl SqliteConfig {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            ..Self::default()
        }
    }
}

impl Default for SqliteConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from(DEFAULT_DB_PATH),
            max_connections: 4,
            busy_timeout: Duration::from_secs(5),
        }
    }
}
