//! Websocket subscriber for the access controller's notification stream.
//!
//! Frames on the stream are heterogeneous; only `access.logs.add` frames for
//! a named member with a granted result are recorded, stamped with the
//! receive time. Dropped connections are retried until shutdown.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context};
use chrono::Utc;
use futures_util::StreamExt;
use serde::Deserialize;
use tokio::sync::watch;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::{header::AUTHORIZATION, HeaderValue, Request};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async_tls_with_config, Connector};
use tracing::{debug, info, warn};
use url::Url;

use doorbot_core::AccessEvent;

use crate::state::AppState;

pub const NOTIFICATIONS_PATH: &str = "/api/v1/developer/devices/notifications";

const ACCESS_EVENT: &str = "access.logs.add";
const GRANTED: &str = "ACCESS";
const RECONNECT_DELAY: Duration = Duration::from_secs(5);

#[derive(Debug, Clone)]
pub struct WsConfig {
    /// Controller host[:port].
    pub host: String,
    pub token: String,
    /// PEM bundle to trust instead of the web PKI roots.
    pub ca_cert: Option<PathBuf>,
}

// ── Frames ────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct Frame {
    #[serde(default)]
    event: String,
    #[serde(default)]
    data: Option<FrameData>,
}

#[derive(Debug, Deserialize)]
struct FrameData {
    #[serde(rename = "_source")]
    source: FrameSource,
}

#[derive(Debug, Deserialize)]
struct FrameSource {
    #[serde(default)]
    actor: FrameActor,
    #[serde(default)]
    event: FrameEvent,
}

#[derive(Debug, Default, Deserialize)]
struct FrameActor {
    #[serde(default)]
    display_name: String,
}

#[derive(Debug, Default, Deserialize)]
struct FrameEvent {
    #[serde(default)]
    result: String,
}

/// The member named by a granted access frame, or `None` for any frame
/// that should not be recorded.
pub fn granted_member(text: &str) -> Option<String> {
    let frame: Frame = serde_json::from_str(text).ok()?;
    if frame.event != ACCESS_EVENT {
        return None;
    }
    let source = frame.data?.source;
    let name = source.actor.display_name;
    if name.is_empty() || name == "N/A" || source.event.result != GRANTED {
        debug!(%name, result = %source.event.result, "ignoring access frame");
        return None;
    }
    Some(name)
}

// ── Subscriber ────────────────────────────────────────────────

pub struct WsSubscriber {
    config: WsConfig,
    connector: Option<Connector>,
    state: AppState,
}

impl WsSubscriber {
    pub fn new(config: WsConfig, state: AppState) -> anyhow::Result<Self> {
        let connector = config.ca_cert.as_deref().map(load_connector).transpose()?;
        Ok(Self {
            config,
            connector,
            state,
        })
    }

    pub fn endpoint(&self) -> anyhow::Result<Url> {
        endpoint(&self.config.host)
    }

    /// Run until `shutdown` flips to true or its sender is dropped.
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) {
        info!(host = %self.config.host, "websocket subscriber started");

        loop {
            if *shutdown.borrow() {
                break;
            }

            match self.session(&mut shutdown).await {
                Ok(()) => info!("websocket closed"),
                Err(e) => warn!(error = %e, "websocket error"),
            }

            if *shutdown.borrow() {
                break;
            }
            tokio::select! {
                _ = tokio::time::sleep(RECONNECT_DELAY) => {}
                changed = shutdown.changed() => {
                    if changed.is_err() {
                        break;
                    }
                }
            }
        }

        info!("websocket subscriber shutting down");
    }

    fn request(&self) -> anyhow::Result<Request<()>> {
        let mut request = self.endpoint()?.as_str().into_client_request()?;
        let bearer = HeaderValue::from_str(&format!("Bearer {}", self.config.token))
            .context("websocket token is not a valid header value")?;
        request.headers_mut().insert(AUTHORIZATION, bearer);
        Ok(request)
    }

    /// One connection, read until the stream ends or shutdown is signalled.
    async fn session(&self, shutdown: &mut watch::Receiver<bool>) -> anyhow::Result<()> {
        let request = self.request()?;
        info!(url = %request.uri(), "connecting to websocket");

        let connect = connect_async_tls_with_config(request, None, false, self.connector.clone());
        let (mut stream, _) = tokio::select! {
            res = tokio::time::timeout(RECONNECT_DELAY, connect) => {
                res.context("websocket connect timed out")??
            }
            _ = shutdown.changed() => return Ok(()),
        };

        loop {
            tokio::select! {
                frame = stream.next() => match frame {
                    Some(Ok(Message::Text(text))) => self.handle_frame(&text).await,
                    Some(Ok(Message::Close(_))) | None => return Ok(()),
                    Some(Ok(_)) => {}
                    Some(Err(e)) => return Err(e.into()),
                },
                _ = shutdown.changed() => {
                    let _ = stream.close(None).await;
                    return Ok(());
                }
            }
        }
    }

    /// Record a granted access frame. Failures are logged; the stream goes on.
    pub async fn handle_frame(&self, text: &str) {
        let Some(name) = granted_member(text) else {
            return;
        };
        let event = AccessEvent::new(Utc::now(), name, true);
        if let Err(e) = self.state.record(&event).await {
            warn!(person = event.person(), error = %e, "failed to record websocket event");
        }
    }
}

pub fn endpoint(host: &str) -> anyhow::Result<Url> {
    Url::parse(&format!("wss://{host}{NOTIFICATIONS_PATH}"))
        .with_context(|| format!("invalid websocket host {host:?}"))
}

fn load_connector(path: &Path) -> anyhow::Result<Connector> {
    let pem = std::fs::read(path).with_context(|| format!("reading {}", path.display()))?;

    let mut roots = rustls::RootCertStore::empty();
    for cert in rustls_pemfile::certs(&mut pem.as_slice()) {
        roots.add(cert?)?;
    }
    if roots.is_empty() {
        bail!("no certificates found in {}", path.display());
    }

    let config = rustls::ClientConfig::builder_with_provider(Arc::new(
        rustls::crypto::ring::default_provider(),
    ))
    .with_safe_default_protocol_versions()?
    .with_root_certificates(roots)
    .with_no_client_auth();
    Ok(Connector::Rustls(Arc::new(config)))
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use doorbot_core::{Calendar, MemoryStore, StatsService, StatsServiceImpl};

    use super::*;
    use crate::notify::Dispatcher;

    fn frame(event: &str, name: &str, result: &str) -> String {
        serde_json::json!({
            "event": event,
            "data": {
                "_source": {
                    "actor": { "id": "1", "display_name": name, "alternate_id": "" },
                    "event": { "type": "access.door.unlock", "result": result }
                }
            }
        })
        .to_string()
    }

    #[test]
    fn granted_frame_names_member() {
        assert_eq!(
            granted_member(&frame(ACCESS_EVENT, "Johnny Melavo", "ACCESS")).as_deref(),
            Some("Johnny Melavo")
        );
    }

    #[test]
    fn other_frames_are_ignored() {
        for text in [
            "not json".to_string(),
            r#"{"event":"access.logs.add"}"#.to_string(),
            frame("access.device.dps_status", "Johnny Melavo", "ACCESS"),
            frame(ACCESS_EVENT, "Johnny Melavo", "BLOCKED"),
            frame(ACCESS_EVENT, "", "ACCESS"),
            frame(ACCESS_EVENT, "N/A", "ACCESS"),
        ] {
            assert_eq!(granted_member(&text), None, "{text}");
        }
    }

    #[test]
    fn endpoint_targets_notifications_path() {
        assert_eq!(
            endpoint("10.0.0.1:12445").unwrap().as_str(),
            "wss://10.0.0.1:12445/api/v1/developer/devices/notifications"
        );
    }

    #[test]
    fn request_carries_bearer_token() {
        let state = AppState::new(
            Arc::new(StatsServiceImpl::new(MemoryStore::new(), Calendar::default())),
            Dispatcher::new(),
        );
        let ws = WsSubscriber::new(
            WsConfig {
                host: "controller.local".into(),
                token: "s3cret".into(),
                ca_cert: None,
            },
            state,
        )
        .unwrap();

        let request = ws.request().unwrap();
        assert_eq!(request.headers()[AUTHORIZATION], "Bearer s3cret");
    }

    #[test]
    fn ca_file_without_certificates_is_rejected() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "not a certificate").unwrap();
        let err = load_connector(file.path()).err().unwrap();
        assert!(err.to_string().contains("no certificates"));
    }

    #[tokio::test]
    async fn granted_frame_is_recorded() {
        let service = Arc::new(StatsServiceImpl::new(MemoryStore::new(), Calendar::default()));
        let state = AppState::new(service.clone(), Dispatcher::new());
        let ws = WsSubscriber::new(
            WsConfig {
                host: "controller.local".into(),
                token: "t".into(),
                ca_cert: None,
            },
            state,
        )
        .unwrap();

        ws.handle_frame(&frame(ACCESS_EVENT, "Johnny Melavo", "ACCESS"))
            .await;
        ws.handle_frame(&frame(ACCESS_EVENT, "Johnny Melavo", "BLOCKED"))
            .await;

        let stats = service.get("Johnny Melavo").await.unwrap();
        assert_eq!((stats.total, stats.streak), (1, 1));
        assert_eq!(service.list_history("Johnny Melavo").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn run_stops_on_shutdown() {
        let state = AppState::new(
            Arc::new(StatsServiceImpl::new(MemoryStore::new(), Calendar::default())),
            Dispatcher::new(),
        );
        // Nothing listens on port 9; every attempt fails fast.
        let ws = WsSubscriber::new(
            WsConfig {
                host: "127.0.0.1:9".into(),
                token: "t".into(),
                ca_cert: None,
            },
            state,
        )
        .unwrap();

        let (tx, rx) = watch::channel(false);
        let task = tokio::spawn(async move { ws.run(rx).await });
        tx.send(true).unwrap();
        tokio::time::timeout(Duration::from_secs(10), task)
            .await
            .unwrap()
            .unwrap();
    }
}
