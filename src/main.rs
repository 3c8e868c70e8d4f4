//! Locale gateway
//!
//! Serves a single-language origin application as a multilingual site.
//!
//! # Architecture Overview
//!
//! ```text
//!                      ┌──────────────────────────────────────────────────────┐
//!                      │                   LOCALE GATEWAY                      │
//!                      │                                                       │
//!   Client Request     │  ┌─────────┐    ┌────────────┐    ┌──────────────┐   │
//!   ───────────────────┼─▶│  http   │───▶│   locale   │───▶│    links     │   │
//!                      │  │ server  │    │  resolver  │    │  + keywords  │   │
//!                      │  └─────────┘    └────────────┘    └──────┬───────┘   │
//!                      │                                          │           │
//!                      │                                          ▼           │
//!   Client Response    │  ┌─────────┐    ┌────────────┐    ┌──────────────┐   │
//!   ◀──────────────────┼──│ rewrite │◀───│   origin   │◀───│   forward    │◀──┼── Origin
//!                      │  │pipeline │    │  response  │    │   (hyper)    │   │   App
//!                      │  └────┬────┘    └────────────┘    └──────────────┘   │
//!                      │       │                                               │
//!                      │       ├──▶ page cache (disk)                          │
//!                      │       └──▶ render service ◀── health monitor          │
//!                      │                                                       │
//!                      │  site metadata store ◀── metadata API (+ cache file)  │
//!                      └──────────────────────────────────────────────────────┘
//! ```

use std::path::PathBuf;

use clap::Parser;
use tokio::net::TcpListener;

use locale_proxy::config::load_config;
use locale_proxy::lifecycle::{wait_for_signal, Shutdown};
use locale_proxy::observability::{logging, metrics};
use locale_proxy::{Gateway, HandlerRegistry, HttpServer};

#[derive(Parser)]
#[command(name = "locale-proxy")]
#[command(about = "Locale gateway in front of a single origin application", long_about = None)]
struct Args {
    /// Path to the TOML configuration file.
    #[arg(short, long, default_value = "locale-proxy.toml")]
    config: PathBuf,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    let config = load_config(&args.config)?;

    logging::init(&config.observability.log_level);
    tracing::info!("locale-proxy v{} starting", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        site_id = %config.site.site_id,
        bind_address = %config.listener.bind_address,
        origin = %config.origin.address,
        seo = config.seo.enabled,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(e) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                error = %e,
                "Failed to parse metrics address"
            ),
        }
    }

    let bind_address = config.listener.bind_address.clone();
    let gateway = Gateway::new(config, HandlerRegistry::new())?;
    let listener = TcpListener::bind(&bind_address).await?;
    let server = HttpServer::new(gateway.clone())?;

    gateway.spawn_bootstrap();

    let shutdown = Shutdown::new();
    let trigger = shutdown.clone();
    tokio::spawn(async move {
        wait_for_signal().await;
        trigger.trigger();
    });

    server.run(listener, &shutdown).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
