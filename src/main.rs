//! # Tempo
//!
//! Entry point for the task timer server.
//!
//! ## Initialization Sequence
//!
//! 1. **Configuration** - defaults, TOML file, `TEMPO_*` environment, CLI flags
//! 2. **Timer Store** - connect to SurrealDB and verify health
//! 3. **Timer Service** - wire the store, clock and event channel
//! 4. **Registry** - reload Running and Paused timers from the store
//! 5. **Reconciliation Loop** - advance and complete live timers every tick
//! 6. **Dispatcher** - forward timer events to the connection gateway
//! 7. **Axum API** - REST endpoints and the push channel
//!
//! ## Shutdown
//!
//! Ctrl+C drains the HTTP server, then stops the loop through its stop
//! handle. Timers not yet completed stay Running or Paused in the store and
//! are reloaded on the next start.

#![forbid(unsafe_code)]
#![forbid(clippy::unwrap_used)]
#![forbid(clippy::panic)]
#![deny(clippy::expect_used)]

mod cli;

use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::net::TcpListener;
use tokio::signal;
use tracing::{error, info, warn};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use tempo_core::{SurrealTimerStore, SystemClock};
use tempo_reconciler::{LoopConfig, Reconciler, ReconciliationLoop, TimerService};
use tempo_web::{
    AppState, ConnectionGateway, ServerConfig, SignedTokenVerifier, create_app, serve,
    spawn_dispatcher,
};

use crate::cli::{Cli, Commands};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Serve { config, bind } => {
            init_tracing();
            run_server(config.as_deref(), bind).await
        }
        Commands::IssueToken { user, config } => {
            let config = load_config(config.as_deref(), None)?;
            println!("{}", SignedTokenVerifier::new(config.token_secret).issue(&user));
            Ok(())
        }
    }
}

/// Initialize tracing subscriber with environment filter.
fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,tempo_web=debug,tower_http=debug")),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

fn load_config(path: Option<&Path>, bind: Option<String>) -> Result<ServerConfig> {
    let config = ServerConfig::load(path).context("Failed to load configuration")?;
    match bind {
        Some(bind) => config
            .bind_address(bind)
            .validated()
            .context("Invalid bind address"),
        None => Ok(config),
    }
}

async fn run_server(path: Option<&Path>, bind: Option<String>) -> Result<()> {
    let start_time = Instant::now();
    info!("Tempo starting...");

    let config = load_config(path, bind)?;
    if config.uses_dev_secret() {
        warn!("Using the development token secret; set TEMPO_TOKEN_SECRET in production");
    }

    let store = init_store(&config).await.context(
        "Timer store initialization failed. Please check the store URL and credentials",
    )?;
    info!(url = %config.store.url, "Timer store connected and healthy");

    let (events, stream) = tempo_events::channel();
    let service = TimerService::new(Arc::new(store), Arc::new(SystemClock), events);
    let live = service
        .load_live()
        .await
        .context("Failed to reload live timers")?;
    info!(live, "Registry rebuilt from store");

    let mut reconciliation = ReconciliationLoop::new(
        Arc::new(Reconciler::new(service.clone())),
        LoopConfig::with_interval(config.tick_interval()),
    )
    .context("Invalid reconciliation loop configuration")?;
    let stopper = reconciliation.stopper();
    let loop_handle = tokio::spawn(async move { reconciliation.run().await });

    let gateway = Arc::new(ConnectionGateway::new());
    let dispatcher = spawn_dispatcher(gateway.clone(), stream);

    let verifier = Arc::new(SignedTokenVerifier::new(config.token_secret.clone()));
    let router = create_app(AppState::new(service, gateway, verifier), &config)
        .context("Failed to build router")?;
    let listener = TcpListener::bind(config.socket_addr()?)
        .await
        .with_context(|| format!("Failed to bind {}", config.bind_address))?;

    info!("Tempo started in {:?}", start_time.elapsed());
    info!("Press Ctrl+C to stop.");

    let served = serve(listener, router, wait_for_shutdown()).await;

    info!("Stopping reconciliation loop...");
    stopper.stop();
    match loop_handle.await {
        Ok(ticks) => info!(ticks, "Reconciliation loop stopped"),
        Err(err) => error!("Reconciliation loop task failed: {}", err),
    }

    // Open sockets keep the event channel alive.
    dispatcher.abort();
    if let Err(err) = dispatcher.await {
        if !err.is_cancelled() {
            error!("Dispatcher task failed: {}", err);
        }
    }

    served.context("HTTP server failed")?;
    info!("Tempo stopped gracefully");
    Ok(())
}

async fn init_store(config: &ServerConfig) -> Result<SurrealTimerStore> {
    let store = SurrealTimerStore::connect(config.store.clone())
        .await
        .context("Failed to connect to SurrealDB")?;

    store
        .health_check()
        .await
        .context("SurrealDB health check failed")?;

    Ok(store)
}

/// Wait for shutdown signal (Ctrl+C).
async fn wait_for_shutdown() {
    match signal::ctrl_c().await {
        Ok(()) => info!("Received Ctrl+C, initiating graceful shutdown"),
        Err(err) => error!("Failed to listen for shutdown signal: {}", err),
    }
}
