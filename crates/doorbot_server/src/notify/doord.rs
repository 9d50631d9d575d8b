//! Door daemon notifier: pushes granted visits as one CSV line.

use std::time::Duration;

use anyhow::{bail, Context};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::StatusCode;
use tracing::debug;
use url::Url;

use doorbot_core::{Calendar, Notifier, Stats};

/// `MM/DD/YYYY,HH:MM:SS,name,granted` with the instant in `calendar`'s zone.
pub fn csv_line(calendar: &Calendar, at: DateTime<Utc>, name: &str, granted: bool) -> String {
    format!(
        "{},{},{}",
        calendar.localize(at).format("%m/%d/%Y,%H:%M:%S"),
        name,
        u8::from(granted)
    )
}

pub struct DoordNotifier {
    client: reqwest::Client,
    url: Url,
    calendar: Calendar,
}

impl DoordNotifier {
    pub fn new(url: Url, calendar: Calendar) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()?;
        Ok(Self {
            client,
            url,
            calendar,
        })
    }
}

#[async_trait]
impl Notifier for DoordNotifier {
    fn name(&self) -> &str {
        "doord"
    }

    async fn post(&self, stats: &Stats) -> anyhow::Result<()> {
        let Some(last) = stats.last else {
            bail!("no visit recorded for {}", stats.name);
        };
        let line = csv_line(&self.calendar, last, &stats.name, true);

        let resp = self
            .client
            .post(self.url.clone())
            .body(line.clone())
            .send()
            .await
            .context("error sending doord request")?;

        if resp.status() != StatusCode::OK {
            bail!("doord request returned: {}", resp.status());
        }
        debug!(%line, "doord notified");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use axum::http::StatusCode as AxumStatus;
    use axum::routing::post;
    use axum::Router;
    use chrono::{SubsecRound, TimeZone};

    use super::*;

    const NAME: &str = "Johnny Melavo";

    async fn fake_doord(status: AxumStatus) -> (Url, Arc<Mutex<Vec<String>>>) {
        let seen: Arc<Mutex<Vec<String>>> = Arc::default();
        let captured = Arc::clone(&seen);
        let app = Router::new().route(
            "/",
            post(move |body: String| {
                let captured = Arc::clone(&captured);
                async move {
                    captured.lock().unwrap().push(body);
                    status
                }
            }),
        );
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move { axum::serve(listener, app).await.unwrap() });
        (Url::parse(&format!("http://{addr}/")).unwrap(), seen)
    }

    fn stats(last: DateTime<Utc>) -> Stats {
        Stats {
            name: NAME.into(),
            total: 1,
            streak: 1,
            last: Some(last),
        }
    }

    #[test]
    fn csv_line_uses_zone_local_time() {
        let cal = Calendar::default();
        let at = Utc.with_ymd_and_hms(2025, 1, 21, 17, 4, 9).unwrap();
        assert_eq!(
            csv_line(&cal, at, NAME, true),
            "01/21/2025,12:04:09,Johnny Melavo,1"
        );
        assert_eq!(
            csv_line(&"UTC".parse().unwrap(), at, NAME, false),
            "01/21/2025,17:04:09,Johnny Melavo,0"
        );
    }

    #[test]
    fn csv_line_hides_subseconds() {
        let at = Utc.with_ymd_and_hms(2025, 1, 21, 17, 4, 9).unwrap()
            + chrono::Duration::nanoseconds(1_235_858);
        assert_ne!(at, at.trunc_subsecs(0));
        assert_eq!(
            csv_line(&Calendar::default(), at, NAME, true),
            "01/21/2025,12:04:09,Johnny Melavo,1"
        );
    }

    #[tokio::test]
    async fn posts_csv_line() {
        let (url, seen) = fake_doord(AxumStatus::OK).await;
        let doord = DoordNotifier::new(url, Calendar::default()).unwrap();
        let at = Utc.with_ymd_and_hms(2025, 1, 21, 17, 0, 0).unwrap();

        doord.post(&stats(at)).await.unwrap();
        assert_eq!(
            seen.lock().unwrap().as_slice(),
            ["01/21/2025,12:00:00,Johnny Melavo,1"]
        );
    }

    #[tokio::test]
    async fn non_ok_status_is_an_error() {
        let (url, _) = fake_doord(AxumStatus::BAD_REQUEST).await;
        let doord = DoordNotifier::new(url, Calendar::default()).unwrap();
        let at = Utc.with_ymd_and_hms(2025, 1, 21, 17, 0, 0).unwrap();

        let err = doord.post(&stats(at)).await.unwrap_err();
        assert!(err.to_string().contains("doord request returned: 400"));
    }

    #[tokio::test]
    async fn stats_without_visit_are_rejected() {
        let doord =
            DoordNotifier::new(Url::parse("http://127.0.0.1:9/").unwrap(), Calendar::default())
                .unwrap();
        assert!(doord.post(&Stats::empty(NAME)).await.is_err());
    }
}
