//! Doorbot core
//!
//! Turns a stream of badge scans into per-person visit statistics: total
//! distinct days visited, the current run of consecutive days, and the last
//! visit. Storage is reached only through the port traits in [`ports`];
//! `doorbot_sqlite` provides the durable backend and [`store::MemoryStore`]
//! the in-process one.
//!
//! ```rust,no_run
//! use doorbot_core::{AccessEvent, Calendar, MemoryStore, StatsService, StatsServiceImpl};
//!
//! # async fn demo() -> doorbot_core::Result<()> {
//! let service = StatsServiceImpl::new(MemoryStore::new(), Calendar::default());
//! let outcome = service
//!     .add_record(&AccessEvent::new(chrono::Utc::now(), "Johnny Melavo", true))
//!     .await?;
//! assert!(outcome.bumped);
//! # Ok(())
//! # }
//! ```

pub mod aggregate;
pub mod calendar;
pub mod error;
pub mod ports;
pub mod service;
pub mod store;
pub mod types;

pub use calendar::{Calendar, DEFAULT_TIME_ZONE};
pub use error::DoorbotError;
pub use ports::{AccessStore, HistoryStore, Notifier, Result, StatsStore, StoreTransaction};
pub use service::{StatsService, StatsServiceImpl};
pub use store::MemoryStore;
pub use types::{AccessEvent, HistoryRecord, RecordOutcome, Stats};
