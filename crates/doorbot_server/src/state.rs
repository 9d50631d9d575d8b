//! Shared state handed to every ingestion adapter.

use std::sync::Arc;

use doorbot_core::{AccessEvent, DoorbotError, RecordOutcome, StatsService};

use crate::notify::Dispatcher;

#[derive(Clone)]
pub struct AppState {
    pub service: Arc<dyn StatsService>,
    pub notifiers: Arc<Dispatcher>,
}

impl AppState {
    pub fn new(service: Arc<dyn StatsService>, notifiers: Dispatcher) -> Self {
        Self {
            service,
            notifiers: Arc::new(notifiers),
        }
    }

    /// Record `event`, then notify. Notifiers run only once the event is
    /// durably stored.
    pub async fn record(&self, event: &AccessEvent) -> Result<RecordOutcome, DoorbotError> {
        let outcome = self.service.add_record(event).await?;
        self.notifiers.dispatch(event, &outcome).await;
        Ok(outcome)
    }
}
