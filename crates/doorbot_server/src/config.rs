//! Command line and environment configuration.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::bail;
use clap::{Args, Parser, Subcommand};
use url::Url;

use doorbot_core::{Calendar, DEFAULT_TIME_ZONE};
use doorbot_sqlite::{SqliteConfig, DEFAULT_DB_PATH};

use crate::ws::WsConfig;

#[derive(Debug, Parser)]
#[command(name = "doorbot", version)]
#[command(about = "Door access bot: records badge scans and announces visit streaks")]
pub struct Cli {
    #[command(flatten)]
    pub store: StoreArgs,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Args)]
pub struct StoreArgs {
    /// SQLite database file
    #[arg(long, global = true, env = "DOORBOT_DB_PATH", default_value = DEFAULT_DB_PATH)]
    pub db_path: PathBuf,

    /// IANA time zone that decides where a day starts and ends
    #[arg(long, global = true, env = "DOORBOT_TIMEZONE", default_value = DEFAULT_TIME_ZONE)]
    pub timezone: Calendar,

    /// Deadline for each storage operation
    #[arg(
        long,
        global = true,
        env = "DOORBOT_STORAGE_TIMEOUT_SECS",
        default_value_t = 10
    )]
    pub storage_timeout_secs: u64,
}

impl StoreArgs {
    pub fn sqlite_config(&self) -> SqliteConfig {
        SqliteConfig::new(&self.db_path)
    }

    pub fn storage_timeout(&self) -> Duration {
        Duration::from_secs(self.storage_timeout_secs)
    }
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Serve webhooks and follow the access controller's websocket
    Start(ServerArgs),

    /// Serve webhooks only
    Http(ServerArgs),

    /// Follow the access controller's websocket only
    Ws(ServerArgs),

    /// Inspect or repair a member's records
    #[command(subcommand)]
    Admin(AdminCommand),
}

#[derive(Debug, Subcommand)]
pub enum AdminCommand {
    /// Print the member's access history as CSV
    Dump(MemberArg),

    /// Rebuild the member's stats from their history
    Recompute(MemberArg),

    /// Print the member's current stats
    Stats(MemberArg),
}

#[derive(Debug, Args)]
pub struct MemberArg {
    /// Member name to act on
    #[arg(long)]
    pub name: String,
}

#[derive(Debug, Clone, Args)]
pub struct ServerArgs {
    /// Address the webhook server listens on
    #[arg(long, env = "DOORBOT_HTTP_ADDR", default_value = "0.0.0.0:8443")]
    pub addr: SocketAddr,

    #[arg(long, env = "DOORBOT_SLACK_TOKEN", hide_env_values = true)]
    pub slack_token: Option<String>,

    #[arg(long, env = "DOORBOT_SLACK_CHANNEL")]
    pub slack_channel: Option<String>,

    /// Door daemon integration endpoint
    #[arg(long, env = "DOORBOT_DOORD_URL")]
    pub doord_url: Option<Url>,

    /// Access controller host[:port]
    #[arg(long, env = "DOORBOT_WS_URL")]
    pub ws_url: Option<String>,

    #[arg(long, env = "DOORBOT_WS_TOKEN", hide_env_values = true)]
    pub ws_token: Option<String>,

    /// PEM bundle trusted for the controller's certificate instead of the web PKI roots
    #[arg(long, env = "DOORBOT_WS_CA_CERT")]
    pub ws_ca_cert: Option<PathBuf>,
}

impl ServerArgs {
    /// Slack credentials, when configured. Half a configuration is an error.
    pub fn slack(&self) -> anyhow::Result<Option<(String, String)>> {
        match (&self.slack_token, &self.slack_channel) {
            (Some(token), Some(channel)) => Ok(Some((token.clone(), channel.clone()))),
            (None, None) => Ok(None),
            _ => bail!("--slack-token and --slack-channel must be given together"),
        }
    }

    pub fn ws_config(&self) -> anyhow::Result<WsConfig> {
        let (Some(host), Some(token)) = (&self.ws_url, &self.ws_token) else {
            bail!("--ws-url and --ws-token are required to follow the websocket");
        };
        Ok(WsConfig {
            host: host.clone(),
            token: token.clone(),
            ca_cert: self.ws_ca_cert.clone(),
        })
    }
}
