//! Process wiring: open the store, build the service, run the chosen command.

use std::sync::Arc;

use anyhow::Context;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use doorbot_core::{Calendar, StatsService, StatsServiceImpl};
use doorbot_sqlite::SqliteStore;

use crate::admin;
use crate::config::{Cli, Command, ServerArgs};
use crate::notify::{Dispatcher, DoordNotifier, SlackNotifier};
use crate::router::build_router;
use crate::state::AppState;
use crate::ws::WsSubscriber;

pub async fn run(cli: Cli) -> anyhow::Result<()> {
    let store = SqliteStore::connect(&cli.store.sqlite_config()).await?;

    let service: Arc<dyn StatsService> = Arc::new(
        StatsServiceImpl::new(store.clone(), cli.store.timezone)
            .with_timeout(cli.store.storage_timeout()),
    );

    let result = match cli.command {
        Command::Admin(command) => admin::run(service.as_ref(), command).await.map(|out| {
            if !out.is_empty() {
                println!("{out}");
            }
        }),
        Command::Start(args) => serve(service, args, true, true).await,
        Command::Http(args) => serve(service, args, true, false).await,
        Command::Ws(args) => serve(service, args, false, true).await,
    };

    store.close().await;
    result
}

/// Run the webhook server and/or the websocket subscriber until Ctrl-C.
async fn serve(
    service: Arc<dyn StatsService>,
    args: ServerArgs,
    http: bool,
    ws: bool,
) -> anyhow::Result<()> {
    let calendar = *service.calendar();
    let state = AppState::new(service, notifiers(&args, calendar).await?);

    // Fail on bad websocket settings before anything starts listening.
    let subscriber = ws
        .then(|| WsSubscriber::new(args.ws_config()?, state.clone()))
        .transpose()?;

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let mut tasks: Vec<JoinHandle<anyhow::Result<()>>> = Vec::new();

    if http {
        let listener = TcpListener::bind(args.addr)
            .await
            .with_context(|| format!("binding {}", args.addr))?;
        info!(addr = %args.addr, "doorbot listening");

        let app = build_router(state.clone());
        let mut shutdown = shutdown_rx.clone();
        tasks.push(tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async move {
                    let _ = shutdown.wait_for(|stop| *stop).await;
                })
                .await
                .context("http server")
        }));
    }

    if let Some(subscriber) = subscriber {
        let shutdown = shutdown_rx.clone();
        tasks.push(tokio::spawn(async move {
            subscriber.run(shutdown).await;
            Ok(())
        }));
    }

    tokio::signal::ctrl_c()
        .await
        .context("waiting for ctrl-c")?;
    info!("shutdown requested");
    let _ = shutdown_tx.send(true);

    for task in tasks {
        task.await.context("server task panicked")??;
    }
    info!("doorbot stopped");
    Ok(())
}

async fn notifiers(args: &ServerArgs, calendar: Calendar) -> anyhow::Result<Dispatcher> {
    let mut dispatcher = Dispatcher::new();

    if let Some((token, channel)) = args.slack()? {
        let slack = SlackNotifier::new(token, channel)?;
        if let Err(e) = slack.greet().await {
            warn!(error = %e, "slack greeting failed");
        }
        dispatcher = dispatcher.on_bump(Arc::new(slack));
    }

    if let Some(url) = &args.doord_url {
        info!(%url, "forwarding granted visits to doord");
        dispatcher = dispatcher.on_grant(Arc::new(DoordNotifier::new(url.clone(), calendar)?));
    }

    Ok(dispatcher)
}
