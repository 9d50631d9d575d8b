//! POST /udm: UniFi Access webhook.

use axum::body::Bytes;
use axum::{Extension, Json};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use tracing::{debug, warn};

use doorbot_core::{AccessEvent, DoorbotError, RecordOutcome};

use crate::error::AppError;
use crate::state::AppState;

const GRANTED: &str = "Access Granted";

/// The parts of a UniFi Access webhook the recorder reads. Location, device,
/// credential and policy details are accepted and ignored.
#[derive(Debug, Deserialize)]
pub struct UdmMessage {
    data: UdmData,
    /// Replaces the receive time; used by integration tests.
    #[serde(default)]
    time_for_testing: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
struct UdmData {
    #[serde(default)]
    actor: Option<UdmActor>,
    #[serde(default)]
    object: Option<UdmObject>,
}

#[derive(Debug, Deserialize)]
struct UdmActor {
    #[serde(default)]
    name: String,
}

#[derive(Debug, Deserialize)]
struct UdmObject {
    #[serde(default)]
    result: String,
}

impl UdmMessage {
    /// Canonical event, stamped `now` unless the payload carries a test time.
    pub fn into_event(self, now: DateTime<Utc>) -> Result<AccessEvent, DoorbotError> {
        let actor = self
            .data
            .actor
            .ok_or_else(|| DoorbotError::InvalidInput("udm payload has no actor".into()))?;
        let object = self
            .data
            .object
            .ok_or_else(|| DoorbotError::InvalidInput("udm payload has no object".into()))?;
        if actor.name.trim().is_empty() {
            return Err(DoorbotError::InvalidInput("udm actor has no name".into()));
        }

        Ok(AccessEvent::new(
            self.time_for_testing.unwrap_or(now),
            actor.name,
            object.result == GRANTED,
        ))
    }
}

pub async fn udm(
    Extension(state): Extension<AppState>,
    body: Bytes,
) -> Result<Json<RecordOutcome>, AppError> {
    debug!(payload = %String::from_utf8_lossy(&body), "udm request received");

    let event = serde_json::from_slice::<UdmMessage>(&body)
        .map_err(|e| DoorbotError::InvalidInput(format!("malformed udm payload: {e}")))
        .and_then(|msg| msg.into_event(Utc::now()))
        .inspect_err(|e| warn!(error = %e, "udm request rejected"))?;

    let outcome = state.record(&event).await?;
    Ok(Json(outcome))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn parse(json: &str) -> UdmMessage {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn full_payload_decodes() {
        let msg = parse(
            r#"{
                "event": "access.door.unlock",
                "event_object_id": "4a98ed8c",
                "data": {
                    "location": { "id": "1", "name": "Front door" },
                    "device": { "id": "2" },
                    "actor": { "id": "3", "name": "Johnny Melavo", "type": "user" },
                    "object": {
                        "authentication_type": "NFC",
                        "authentication_value": "ABCD",
                        "policy_id": "p",
                        "policy_name": "members",
                        "reader_id": "r",
                        "result": "Access Granted"
                    }
                },
                "time_for_testing": "2025-01-20T00:20:09-05:00"
            }"#,
        );
        let event = msg.into_event(Utc::now()).unwrap();
        assert_eq!(event.person(), "Johnny Melavo");
        assert!(event.granted());
        assert_eq!(
            event.timestamp(),
            Utc.with_ymd_and_hms(2025, 1, 20, 5, 20, 9).unwrap()
        );
    }

    #[test]
    fn other_results_are_denied() {
        let msg = parse(
            r#"{ "data": { "actor": { "name": "X" }, "object": { "result": "Access Denied" } } }"#,
        );
        let now = Utc.with_ymd_and_hms(2025, 1, 20, 5, 0, 0).unwrap();
        let event = msg.into_event(now).unwrap();
        assert!(!event.granted());
        assert_eq!(event.timestamp(), now);
    }

    #[test]
    fn missing_actor_or_object_is_invalid() {
        for json in [
            r#"{ "data": { "object": { "result": "Access Granted" } } }"#,
            r#"{ "data": { "actor": { "name": "X" } } }"#,
            r#"{ "data": { "actor": { "name": "" }, "object": {} } }"#,
        ] {
            let err = parse(json).into_event(Utc::now()).unwrap_err();
            assert!(matches!(err, DoorbotError::InvalidInput(_)), "{json}");
        }
    }
}
