//! StatsD operator console
//!
//! Usage:
//!   statsd-console [config.toml]
//!
//! Listens on 0.0.0.0:8126 by default; see `ConsoleConfig` for the
//! `STATSD_CONSOLE_*` environment overrides. Connect with `telnet` or `nc`
//! and type `help`.

#[cfg(not(target_env = "msvc"))]
use tikv_jemallocator::Jemalloc;

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: Jemalloc = Jemalloc;

use statsd_console::console::{ConsoleConfig, ConsoleServer};
use statsd_console::observability::init_tracing;
use statsd_console::stats::{FlushStatsTracker, ReceiverStatsTracker};
use statsd_console::Dispatcher;
use std::path::PathBuf;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config_path = std::env::args().nth(1).map(PathBuf::from);
    let config = ConsoleConfig::load(config_path.as_deref())?;
    init_tracing(config.log_json);

    info!(
        workers = config.worker_count(),
        result_buffer = config.result_buffer,
        "Starting statsd console"
    );

    let dispatcher = Dispatcher::new(config.worker_count());
    let receiver = Arc::new(ReceiverStatsTracker::new());
    let flusher = Arc::new(FlushStatsTracker::new());
    let server = ConsoleServer::new(config, dispatcher, receiver, flusher);

    let shutdown = CancellationToken::new();
    let on_signal = shutdown.clone();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("Received Ctrl-C, shutting down");
                on_signal.cancel();
            }
            Err(e) => error!("Failed to listen for Ctrl-C: {}", e),
        }
    });

    server.listen_and_serve(shutdown).await?;
    Ok(())
}
