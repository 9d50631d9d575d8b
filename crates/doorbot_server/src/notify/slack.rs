//! Slack notifier: posts visit announcements with `chat.postMessage`.

use std::time::Duration;

use anyhow::{anyhow, Context};
use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, info};
use url::Url;

use doorbot_core::{Notifier, Stats};

use super::badges::announcement;

const POST_MESSAGE_URL: &str = "https://slack.com/api/chat.postMessage";

const GREETING: &str = "Primordial abyss abandoned. Initiating connection to Slack. \
                        Resuming sentinel duty. New arrivals shall be announced once more.";

pub struct SlackNotifier {
    client: reqwest::Client,
    endpoint: Url,
    token: String,
    channel: String,
}

#[derive(Debug, Deserialize)]
struct PostMessageResponse {
    ok: bool,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    channel: Option<String>,
    #[serde(default)]
    ts: Option<String>,
}

impl SlackNotifier {
    pub fn new(token: impl Into<String>, channel: impl Into<String>) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()?;
        Ok(Self {
            client,
            endpoint: Url::parse(POST_MESSAGE_URL)?,
            token: token.into(),
            channel: channel.into(),
        })
    }

    /// Post to a different API endpoint.
    pub fn with_endpoint(mut self, endpoint: Url) -> Self {
        self.endpoint = endpoint;
        self
    }

    /// Announce that the bot is back on duty.
    pub async fn greet(&self) -> anyhow::Result<()> {
        self.post_text(GREETING).await
    }

    async fn post_text(&self, text: &str) -> anyhow::Result<()> {
        let resp = self
            .client
            .post(self.endpoint.clone())
            .bearer_auth(&self.token)
            .json(&serde_json::json!({
                "channel": self.channel,
                "text": text,
            }))
            .send()
            .await
            .context("error posting msg to slack")?
            .error_for_status()?
            .json::<PostMessageResponse>()
            .await?;

        if !resp.ok {
            return Err(anyhow!(
                "slack rejected message: {}",
                resp.error.as_deref().unwrap_or("unknown error")
            ));
        }

        debug!(
            channel = resp.channel.as_deref().unwrap_or(&self.channel),
            ts = resp.ts.as_deref().unwrap_or_default(),
            "slack message posted"
        );
        Ok(())
    }
}

#[async_trait]
impl Notifier for SlackNotifier {
    fn name(&self) -> &str {
        "slack"
    }

    async fn post(&self, stats: &Stats) -> anyhow::Result<()> {
        self.post_text(&announcement(stats)).await?;
        info!(person = %stats.name, channel = %self.channel, "visit announced on slack");
        Ok(())
    }
}
