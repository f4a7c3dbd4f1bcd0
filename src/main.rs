//! Pink Sesame - unified CLI.

#![warn(missing_docs)]

mod cli;
mod console;

use anyhow::Result;
use clap::Parser;
use cli::{Cli, Command};
use console::ConsoleObserver;
use pink_sesame::{Config, HttpStore, MatchCoordinator, MemoryStore, RoomStore};
use std::sync::Arc;
use tracing::{info, instrument};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    let default_filter = match cli.command {
        Command::Serve { .. } => "info,pink_sesame=debug",
        _ => "warn",
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)),
        )
        .with_writer(std::io::stderr)
        .init();

    let config = Config::load(&cli.config)?;

    match cli.command {
        Command::Local => run_local().await,
        Command::Host { store_url } => run_host(config.with_store_url(store_url)).await,
        Command::Join { code, store_url } => {
            run_join(config.with_store_url(store_url), code).await
        }
        Command::Serve { host, port } => run_service(config, host, port).await,
    }
}

/// Play both symbols on this terminal
async fn run_local() -> Result<()> {
    let observer = Arc::new(ConsoleObserver::default());
    let mut coordinator = MatchCoordinator::local_only(observer);
    coordinator.start_local();
    console::run(&mut coordinator).await
}

/// Create a room and play PP
#[instrument(skip_all)]
async fn run_host(config: Config) -> Result<()> {
    let observer = Arc::new(ConsoleObserver::default());
    let mut coordinator = MatchCoordinator::new(connect_store(&config)?, observer.clone());

    observer.set_role(Some(pink_sesame::rules::Symbol::Pp));
    match coordinator.create_room().await {
        Ok(code) => println!("Room created. Share this code: {}", code),
        Err(e) => {
            println!("{}", e);
            return Ok(());
        }
    }
    console::run(&mut coordinator).await
}

/// Join a room and play SMS
#[instrument(skip(config))]
async fn run_join(config: Config, code: String) -> Result<()> {
    let observer = Arc::new(ConsoleObserver::default());
    let mut coordinator = MatchCoordinator::new(connect_store(&config)?, observer.clone());

    observer.set_role(Some(pink_sesame::rules::Symbol::Sms));
    match coordinator.join_room(&code).await {
        Ok(code) => println!("Joined room {}. You are SMS.", code),
        Err(e) => {
            println!("{}", e);
            return Ok(());
        }
    }
    console::run(&mut coordinator).await
}

/// Builds the HTTP store client, or `None` when no store URL is configured.
fn connect_store(config: &Config) -> Result<Option<Arc<dyn RoomStore>>> {
    let Some(url) = config.store_url() else {
        return Ok(None);
    };
    let store = HttpStore::new(url.clone(), config.request_timeout(), config.poll_interval())?;
    Ok(Some(Arc::new(store)))
}

/// Run the room service
#[instrument(skip(config))]
async fn run_service(config: Config, host: Option<String>, port: Option<u16>) -> Result<()> {
    let host = host.unwrap_or_else(|| config.bind_host().clone());
    let port = port.unwrap_or(*config.bind_port());

    let app = pink_sesame::router(MemoryStore::new());
    let listener = tokio::net::TcpListener::bind((host.as_str(), port)).await?;
    info!(%host, port, "Room service listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("Shutting down room service");
        })
        .await?;
    Ok(())
}
