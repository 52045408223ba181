mod app;
mod handlers;
mod models;
mod services;
mod utils;

#[cfg(test)]
mod test_support;

use anyhow::Context;
use app::config::Config;
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Relays card payments to the Wompi processor.
#[derive(Debug, Parser)]
#[command(name = "wompi-relay", version)]
struct Args {
    /// Optional TOML file; environment variables override its values.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Port to listen on, overriding PORT.
    #[arg(short, long)]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();
    let mut config = Config::load(args.config.as_deref()).context("invalid configuration")?;
    if let Some(port) = args.port {
        config.server_port = port;
    }

    info!(
        environment = ?config.environment,
        client_id = %config.client_id,
        transactions_url = %config.transactions_url,
        "Starting wompi-relay on port {}",
        config.server_port
    );

    let service = Arc::new(app::build_service(&config).context("failed to build HTTP client")?);
    let app = app::router(service);

    let addr = format!("0.0.0.0:{}", config.server_port);
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    info!("Server listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received");
}
