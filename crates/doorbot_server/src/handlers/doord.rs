//! POST /doord: door daemon webhook.
//!
//! Timestamps are zone-local wall-clock times as produced by Python's
//! `datetime.isoformat()`.

use axum::body::Bytes;
use axum::{Extension, Json};
use chrono::NaiveDateTime;
use serde::Deserialize;
use tracing::{debug, warn};

use doorbot_core::{AccessEvent, Calendar, DoorbotError, RecordOutcome};

use crate::error::AppError;
use crate::state::AppState;

const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.f";

#[derive(Debug, Deserialize)]
pub struct DoordMessage {
    pub timestamp: String,
    pub name: String,
    pub access_granted: bool,
}

impl DoordMessage {
    pub fn into_event(self, calendar: &Calendar) -> Result<AccessEvent, DoorbotError> {
        if self.name.trim().is_empty() {
            return Err(DoorbotError::InvalidInput("doord message has no name".into()));
        }
        let local = NaiveDateTime::parse_from_str(&self.timestamp, TIMESTAMP_FORMAT)
            .map_err(|e| {
                DoorbotError::InvalidInput(format!(
                    "couldn't parse timestamp {:?}: {e}",
                    self.timestamp
                ))
            })?;
        let at = calendar.from_local(local)?;
        Ok(AccessEvent::new(at, self.name, self.access_granted))
    }
}

pub async fn doord(
    Extension(state): Extension<AppState>,
    body: Bytes,
) -> Result<Json<RecordOutcome>, AppError> {
    debug!(payload = %String::from_utf8_lossy(&body), "doord request received");

    let calendar = *state.service.calendar();
    let event = serde_json::from_slice::<DoordMessage>(&body)
        .map_err(|e| DoorbotError::InvalidInput(format!("malformed doord payload: {e}")))
        .and_then(|msg| msg.into_event(&calendar))
        .inspect_err(|e| warn!(error = %e, "doord request rejected"))?;

    let outcome = state.record(&event).await?;
    Ok(Json(outcome))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn msg(timestamp: &str, name: &str) -> DoordMessage {
        DoordMessage {
            timestamp: timestamp.into(),
            name: name.into(),
            access_granted: true,
        }
    }

    #[test]
    fn local_timestamp_is_zone_local() {
        let event = msg("2025-01-20T00:20:09", "Johnny Melavo")
            .into_event(&Calendar::default())
            .unwrap();
        assert_eq!(
            event.timestamp(),
            Utc.with_ymd_and_hms(2025, 1, 20, 5, 20, 9).unwrap()
        );
    }

    #[test]
    fn fractional_seconds_are_dropped() {
        let event = msg("2025-01-20T00:20:09.532100", "X")
            .into_event(&Calendar::default())
            .unwrap();
        assert_eq!(
            event.timestamp(),
            Utc.with_ymd_and_hms(2025, 1, 20, 5, 20, 9).unwrap()
        );
    }

    #[test]
    fn bad_timestamps_are_invalid() {
        for ts in ["2025-01-20 00:20:09", "yesterday", "2025-03-09T02:30:00"] {
            let err = msg(ts, "X").into_event(&Calendar::default()).unwrap_err();
            assert!(matches!(err, DoorbotError::InvalidInput(_)), "{ts}");
        }
    }

    #[test]
    fn empty_name_is_invalid() {
        let err = msg("2025-01-20T00:20:09", " ")
            .into_event(&Calendar::default())
            .unwrap_err();
        assert!(matches!(err, DoorbotError::InvalidInput(_)));
    }
}
