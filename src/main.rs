//! respkv server
//!
//! Sets up the TCP listener, the shared evaluator and its expiry ticker, and
//! hands each incoming connection to its own task.

use clap::Parser;
use respkv::commands::Evaluator;
use respkv::config::ServerConfig;
use respkv::connection::{handle_connection, ConnectionStats};
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::signal;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

fn print_banner(config: &ServerConfig) {
    println!(
        r#"
respkv v{} - miniature in-memory key-value database
────────────────────────────────────────────────────
Server started on {}
One expiry tick every {} ms.

Use Ctrl+C to shutdown gracefully.
"#,
        respkv::VERSION,
        config.bind_address(),
        config.tick_ms
    );
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = ServerConfig::parse();

    // RUST_LOG overrides the default level
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    print_banner(&config);

    // One evaluator shared by every connection
    let evaluator = Evaluator::new();
    let _ticker = evaluator.spawn_ticker(config.expiry_config());

    let stats = Arc::new(ConnectionStats::new());

    let listener = TcpListener::bind(config.bind_address()).await?;
    info!("Listening on {}", config.bind_address());

    let shutdown = async {
        match signal::ctrl_c().await {
            Ok(()) => info!("Shutdown signal received, stopping server..."),
            Err(e) => error!("Failed to listen for Ctrl+C: {}", e),
        }
    };

    tokio::select! {
        _ = accept_loop(listener, evaluator.clone(), Arc::clone(&stats)) => {}
        _ = shutdown => {}
    }

    info!(
        keys = evaluator.store().len(),
        pending_expiries = evaluator.scheduler().pending(),
        connections = stats.connections_accepted.load(Ordering::Relaxed),
        commands = stats.commands_processed.load(Ordering::Relaxed),
        "Server shutdown complete"
    );
    Ok(())
}

/// Accepts connections forever, one task per client.
async fn accept_loop(listener: TcpListener, evaluator: Evaluator, stats: Arc<ConnectionStats>) {
    loop {
        match listener.accept().await {
            Ok((stream, addr)) => {
                let evaluator = evaluator.clone();
                let stats = Arc::clone(&stats);

                tokio::spawn(async move {
                    handle_connection(stream, addr, evaluator, stats).await;
                });
            }
            Err(e) => {
                error!("Failed to accept connection: {}", e);
            }
        }
    }
}
