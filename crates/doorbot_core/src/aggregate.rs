//! Aggregation engine.
//!
//! Pure functions turning a previous aggregate plus a visit instant into the
//! next aggregate. `total` counts distinct calendar days with a granted visit,
//! `streak` the run of consecutive such days ending at `last`.

use chrono::{DateTime, Utc};
use tracing::debug;

use crate::calendar::Calendar;
use crate::types::{HistoryRecord, Stats};

/// Apply one granted visit at `at` to `previous`.
pub fn bump(calendar: &Calendar, previous: &Stats, at: DateTime<Utc>) -> Stats {
    let mut next = previous.clone();

    match previous.last {
        None => {
            next.total = 1;
            next.streak = 1;
        }
        Some(last) => {
            let last_visit = calendar.date_of(last);
            let this_visit = calendar.date_of(at);
            let day_before = calendar.day_before(at);
            debug!(%last_visit, %this_visit, ?day_before, "bumping stats");

            if this_visit != last_visit {
                next.total = next.total.saturating_add(1);
                next.streak = if day_before == Some(last_visit) {
                    next.streak.saturating_add(1)
                } else {
                    1
                };
            }
        }
    }

    next.last = Some(at);
    next
}

/// Fold a person's history, in the order given, into a fresh aggregate.
///
/// Denied records are skipped. Callers pass history sorted by ascending
/// timestamp; that is the order recomputation is defined over.
pub fn replay<'a, I>(calendar: &Calendar, person: &str, history: I) -> Stats
where
    I: IntoIterator<Item = &'a HistoryRecord>,
{
    history
        .into_iter()
        .filter(|record| record.granted)
        .fold(Stats::empty(person), |stats, record| {
            bump(calendar, &stats, record.timestamp)
        })
}
