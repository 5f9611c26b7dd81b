mod config;
mod hid;
mod paths;
mod scanner;
mod status;
mod worker;

use std::path::Path;

use tokio::sync::watch;
use tracing::info;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() {
    // ── Shared data directory ─────────────────────────────────────────────────
    let data_dir = paths::data_dir();
    if let Err(e) = std::fs::create_dir_all(&data_dir) {
        eprintln!("Failed to create data directory {}: {e}", data_dir.display());
        std::process::exit(1);
    }

    // ── Logging ───────────────────────────────────────────────────────────────
    init_logging(&paths::log_file_path());

    // ── Shutdown signal ───────────────────────────────────────────────────────
    let (stop_tx, stop_rx) = watch::channel(false);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            let _ = stop_tx.send(true);
        }
    });

    info!("rateshift-daemon v{} started", env!("CARGO_PKG_VERSION"));

    // ── Polling loop ──────────────────────────────────────────────────────────
    let channel = hid::DeviceChannel::new();
    let polling = worker::PollingLoop::new(
        channel,
        paths::config_file_path(),
        paths::status_file_path(),
    );
    polling.run(stop_rx).await;

    info!("rateshift-daemon stopped");
}

/// Logs to stderr and appends to the shared log file so the GUI's log viewer
/// has something to show. Filter via RUST_LOG, default `info`.
fn init_logging(log_path: &Path) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let file_layer = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_path)
        .ok()
        .map(|file| {
            fmt::layer()
                .with_ansi(false)
                .with_writer(std::sync::Mutex::new(file))
        });
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(file_layer)
        .init();
}
