//! statrelay: re-exports StatHat time-series statistics over HTTP.
//!
//! Single-binary Tokio application that:
//! 1. Resolves and fetches stats from the StatHat export API
//! 2. Caches datasets for a bounded time window
//! 3. Serves stat and derived-rate endpoints in CSV, JSON or text

mod config;
mod server;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use statcache::{spawn_sweeper, StatCache};
use stathat_client::StatHatClient;
use tracing::{error, info};

/// StatHat stats relay server.
#[derive(Parser)]
#[command(name = "statrelay", version, about = "Re-export StatHat statistics over HTTP")]
struct Cli {
    /// Config file path.
    #[arg(long, default_value = "config.toml")]
    config: PathBuf,

    /// Bind address override (e.g. 127.0.0.1:6070).
    #[arg(long)]
    listen: Option<String>,
}

#[tokio::main]
async fn main() {
    // Initialize logging.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "statrelay=info,statcache=info,stathat_client=info".into()),
        )
        .with_target(true)
        .init();

    let cli = Cli::parse();

    info!("statrelay starting up...");

    let cfg = match config::load_config(&cli.config, cli.listen.as_deref()) {
        Ok(c) => c,
        Err(e) => {
            error!("Configuration error: {}", e);
            std::process::exit(1);
        }
    };

    info!("Listen address: {}", cfg.listen_addr);
    info!(
        "Cache: ttl={}s, sweep every {}s",
        cfg.cache.ttl_secs, cfg.cache.sweep_interval_secs
    );
    info!(
        "Upstream request timeout: {}s",
        cfg.upstream.request_timeout_secs
    );

    let fetcher = Arc::new(StatHatClient::new(
        &cfg.access_token,
        Duration::from_secs(cfg.upstream.request_timeout_secs),
    ));
    let cache = Arc::new(StatCache::new(fetcher, &cfg.cache));
    let sweeper = spawn_sweeper(cache.clone());

    let app = server::app_router(cache);

    let listener = match tokio::net::TcpListener::bind(&cfg.listen_addr).await {
        Ok(l) => l,
        Err(e) => {
            error!("Failed to bind {}: {}", cfg.listen_addr, e);
            std::process::exit(1);
        }
    };

    info!("statrelay is running on {}. Press Ctrl+C to stop.", cfg.listen_addr);

    let serve = axum::serve(listener, app).with_graceful_shutdown(async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for shutdown signal: {}", e);
        }
    });

    if let Err(e) = serve.await {
        error!("Server error: {}", e);
    }

    sweeper.stop().await;
    info!("statrelay shut down.");
}
