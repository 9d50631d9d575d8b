//! Outbound notifications.
//!
//! Notifiers run after the event has been committed. Their failures are
//! logged and never reach the caller.

pub mod badges;
pub mod doord;
pub mod slack;

use std::sync::Arc;

use tracing::warn;

use doorbot_core::{AccessEvent, Notifier, RecordOutcome, Stats};

pub use doord::DoordNotifier;
pub use slack::SlackNotifier;

/// Routes a recorded event to the configured notifiers.
#[derive(Clone, Default)]
pub struct Dispatcher {
    /// Told only when the visit advanced the member's total.
    on_bump: Vec<Arc<dyn Notifier>>,
    /// Told about every granted visit.
    on_grant: Vec<Arc<dyn Notifier>>,
}

impl Dispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_bump(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.on_bump.push(notifier);
        self
    }

    pub fn on_grant(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.on_grant.push(notifier);
        self
    }

    /// Chat notifiers see the stored aggregate. Grant notifiers see it
    /// stamped with the event's own instant, which differs from `last` when
    /// a late scan was replayed into history.
    pub async fn dispatch(&self, event: &AccessEvent, outcome: &RecordOutcome) {
        if !event.granted() {
            return;
        }

        if outcome.bumped {
            notify_all(&self.on_bump, &outcome.stats).await;
        }

        let visit = Stats {
            last: Some(event.timestamp()),
            ..outcome.stats.clone()
        };
        notify_all(&self.on_grant, &visit).await;
    }
}

async fn notify_all(notifiers: &[Arc<dyn Notifier>], stats: &Stats) {
    for notifier in notifiers {
        if let Err(e) = notifier.post(stats).await {
            warn!(
                notifier = notifier.name(),
                person = %stats.name,
                error = %e,
                "notification failed"
            );
        }
    }
}
