//! Granary server binary.

use anyhow::{Context, Result};
use clap::Parser;
use figment::Figment;
use figment::providers::{Env, Format, Toml};
use granary_core::config::AppConfig;
use granary_server::{build_state, create_router};
use std::future::IntoFuture;
use std::net::SocketAddr;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Granary - a distributed file store frontend
#[derive(Parser, Debug)]
#[command(name = "granaryd")]
#[command(version, about, long_about = None)]
struct Args {
    /// Path to configuration file
    #[arg(
        short,
        long,
        env = "GRANARY_CONFIG",
        default_value = "config/server.toml"
    )]
    config: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Granary v{}", env!("CARGO_PKG_VERSION"));

    // Load configuration (file is optional, env vars can provide/override everything)
    let config_path = std::path::Path::new(&args.config);
    let mut figment = Figment::new();
    if config_path.exists() {
        tracing::info!(config_path = %args.config, "Loading configuration from file");
        figment = figment.merge(Toml::file(&args.config));
    } else {
        tracing::info!("No config file found at {}, using environment variables", args.config);
    }

    let config: AppConfig = figment
        .merge(Env::prefixed("GRANARY_").split("__"))
        .extract()
        .context("failed to load configuration")?;

    let shutdown_timeout = config.server.shutdown_timeout();
    let bind = config.server.bind.clone();

    let state = build_state(config).await?;
    tracing::info!("Storage, metadata, and balancer initialized");

    let app = create_router(state);

    let addr: SocketAddr = bind.parse().context("invalid bind address")?;
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind to {addr}"))?;
    tracing::info!("Listening on {}", addr);

    let server = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .into_future();
    tokio::pin!(server);

    tokio::select! {
        result = &mut server => result.context("server error")?,
        () = drain_deadline(shutdown_timeout) => {
            tracing::warn!(
                timeout_secs = shutdown_timeout.as_secs(),
                "graceful shutdown timed out, aborting open connections"
            );
        }
    }

    Ok(())
}

/// Resolves when the process receives a shutdown signal.
async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_err() {
        tracing::error!("failed to install shutdown signal handler");
        return;
    }
    tracing::info!("graceful shutdown of server");
}

/// Resolves one shutdown-timeout after the shutdown signal, bounding how
/// long connection draining may take.
async fn drain_deadline(timeout: Duration) {
    // A second ctrl-c listener; both complete on the same signal.
    let _ = tokio::signal::ctrl_c().await;
    tokio::time::sleep(timeout).await;
}
