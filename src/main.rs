//! Dicecast - live dice-round prediction service.
//!
//! Usage: `dicecast [CONFIG_PATH]`. Without a path the project config
//! directory is searched; `DICECAST__*` environment variables override both.

use anyhow::Context;
use dicecast::config::{LoggingConfig, log_dir};
use dicecast::server::{self, QueryService};
use dicecast::{Config, ConsensusAggregator, FeedClient, OutcomeStore, Pipeline, SignalRConnector, StrategyRegistry};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

fn init_logging(config: &LoggingConfig) -> anyhow::Result<Option<WorkerGuard>> {
    let (file_layer, guard) = if config.file_logging {
        let dir = log_dir()?;
        let appender = tracing_appender::rolling::daily(dir, "dicecast.log");
        let (writer, guard) = tracing_appender::non_blocking(appender);
        let layer = tracing_subscriber::fmt::layer()
            .with_writer(writer)
            .with_ansi(false);
        (Some(layer), Some(guard))
    } else {
        (None, None)
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| config.filter.as_str().into()),
        )
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .with(file_layer)
        .init();

    Ok(guard)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load configuration
    let config = match std::env::args_os().nth(1) {
        Some(path) => Config::load(Some(PathBuf::from(path))),
        None => Config::load_or_default(),
    }
    .context("failed to load configuration")?;

    // Initialize logging; the guard flushes the file writer on exit
    let _log_guard = init_logging(&config.logging).context("failed to initialise logging")?;
    info!(
        hub = %config.feed.hub_name,
        capacity = config.store.capacity,
        window = config.store.window_size,
        "dicecast starting"
    );

    let store = Arc::new(OutcomeStore::from_config(&config.store));
    let aggregator = ConsensusAggregator::new(StrategyRegistry::with_defaults());
    info!(strategies = ?aggregator.registry().names(), "strategies registered");
    let strategies = aggregator.registry().metadata();
    let pipeline = Arc::new(Pipeline::from_config(
        Arc::clone(&store),
        aggregator,
        &config.store,
    ));

    let connector =
        SignalRConnector::new(config.feed.clone()).context("failed to build feed connector")?;
    let feed = FeedClient::new(connector, pipeline, &config.feed);
    let feed_state = feed.subscribe();

    let cancel = CancellationToken::new();
    let feed_task = tokio::spawn(feed.run(cancel.clone()));

    let shutdown = cancel.clone();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => info!("shutdown requested"),
            Err(e) => error!(error = %e, "failed to listen for ctrl-c, shutting down"),
        }
        shutdown.cancel();
    });

    let listener = TcpListener::bind(config.server.bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.server.bind_addr))?;
    let app = server::router(QueryService::new(store), feed_state, strategies);
    let served = server::serve(listener, app, cancel.clone()).await;

    cancel.cancel();
    feed_task.await.context("feed task panicked")?;
    served.context("query server failed")?;

    info!("dicecast stopped");
    Ok(())
}
