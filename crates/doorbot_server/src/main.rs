//! doorbot: records badge scans and announces visit streaks.
//!
//! Configuration comes from flags or `DOORBOT_*` environment variables; a
//! `.env` file in the working directory is loaded first.

use clap::Parser;

use doorbot_server::app;
use doorbot_server::config::Cli;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,doorbot_server=debug".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    // The websocket client builds rustls configs from the process default provider.
    let _ = rustls::crypto::ring::default_provider().install_default();

    app::run(Cli::parse()).await
}
