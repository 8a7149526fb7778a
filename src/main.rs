//! lazykv server entry point.
//!
//! Parses the command line, sets up logging, and serves RESP clients until
//! Ctrl+C.

use anyhow::Context;
use lazykv::commands::CommandHandler;
use lazykv::config::{help_text, CliAction, ServerConfig};
use lazykv::connection::{handle_connection, ConnectionStats};
use lazykv::storage::Store;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::signal;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = match ServerConfig::from_args(std::env::args().skip(1)) {
        Ok(CliAction::Run(config)) => config,
        Ok(CliAction::Help) => {
            println!("{}", help_text());
            return Ok(());
        }
        Ok(CliAction::Version) => {
            println!("lazykv version {}", lazykv::VERSION);
            return Ok(());
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            eprintln!("{}", help_text());
            std::process::exit(1);
        }
    };

    // RUST_LOG wins over --log-level
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(&config.log_level)
            .with_context(|| format!("invalid log filter: {}", config.log_level))?,
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .init();

    let store = Arc::new(Store::new());
    let stats = Arc::new(ConnectionStats::new());

    let listener = TcpListener::bind(config.bind_address())
        .await
        .with_context(|| format!("failed to bind {}", config.bind_address()))?;
    info!(
        version = lazykv::VERSION,
        address = %config.bind_address(),
        "lazykv listening"
    );

    let shutdown = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
        info!("Shutdown signal received, stopping server...");
    };

    tokio::select! {
        _ = accept_loop(listener, Arc::clone(&store), Arc::clone(&stats)) => {}
        _ = shutdown => {}
    }

    let storage = store.stats();
    info!(
        keys = storage.keys,
        connections = stats.connections_accepted.load(Ordering::Relaxed),
        commands = stats.commands_processed.load(Ordering::Relaxed),
        "Server shutdown complete"
    );
    Ok(())
}

/// Accepts clients forever, one task each.
async fn accept_loop(listener: TcpListener, store: Arc<Store>, stats: Arc<ConnectionStats>) {
    loop {
        match listener.accept().await {
            Ok((stream, addr)) => {
                let handler = CommandHandler::new(Arc::clone(&store));
                let stats = Arc::clone(&stats);

                tokio::spawn(async move {
                    handle_connection(stream, addr, handler, stats).await;
                });
            }
            Err(e) => {
                error!("Failed to accept connection: {}", e);
            }
        }
    }
}
