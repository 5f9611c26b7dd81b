//! The polling loop: decide the target rate, push it to the mouse, publish
//! status, repeat. One logical task owns the whole lifecycle; every wait in
//! here is cancellable through the stop signal so shutdown is prompt.

use std::path::PathBuf;
use std::time::{Duration, Instant};

use tokio::sync::watch;
use tracing::{error, info, warn};

use crate::config::{self, Config};
use crate::hid::RateChannel;
use crate::scanner::ProcessScanner;
use crate::status::{self, Status};

/// Config older than this is reloaded on the next tick.
const CONFIG_STALE_AFTER: Duration = Duration::from_secs(30);
/// Wait between device-open attempts at startup.
const OPEN_RETRY_DELAY: Duration = Duration::from_secs(5);
/// Wait after a failed tick before the next one.
const TICK_ERROR_BACKOFF: Duration = Duration::from_secs(5);

/// The daemon's state machine. Idle and Gaming are distinguished only by
/// which rate is being targeted; the only persisted machine state is the
/// last applied rate and the last config load time.
pub struct PollingLoop<C: RateChannel> {
    channel: C,
    scanner: ProcessScanner,
    config: Config,
    config_path: PathBuf,
    status_path: PathBuf,
    last_applied: Option<u16>,
    last_config_load: Instant,
}

impl<C: RateChannel> PollingLoop<C> {
    /// Loads the config (built-in defaults if the store is unreadable) and
    /// assembles the loop. Does not touch the device yet.
    pub fn new(channel: C, config_path: PathBuf, status_path: PathBuf) -> Self {
        let config = match config::load_or_init(&config_path) {
            Ok(config) => config,
            Err(e) => {
                warn!("failed to load config, using defaults: {e:#}");
                Config::default()
            }
        };
        Self {
            channel,
            scanner: ProcessScanner::new(),
            config,
            config_path,
            status_path,
            last_applied: None,
            last_config_load: Instant::now(),
        }
    }

    /// Runs until `stop` flips. Returns after shutdown cleanup completes.
    pub async fn run(mut self, mut stop: watch::Receiver<bool>) {
        self.connect_with_retry(&mut stop).await;
        self.apply(self.config.idle_rate_hz, "startup", false, "");

        while !*stop.borrow() {
            let delay = match self.tick() {
                Ok(()) => Duration::from_secs(self.config.scan_interval_secs),
                Err(e) => {
                    error!("error in polling loop: {e:#}");
                    TICK_ERROR_BACKOFF
                }
            };
            if sleep_cancellable(delay, &mut stop).await {
                break;
            }
        }

        self.shutdown();
    }

    /// Opens the device, retrying every [`OPEN_RETRY_DELAY`] until it
    /// succeeds or `stop` flips. The mouse being absent is expected (the
    /// vendor's own software may be holding it), so this never gives up on
    /// its own.
    async fn connect_with_retry(&mut self, stop: &mut watch::Receiver<bool>) {
        if self.channel.open().is_ok() {
            info!("HID connection opened");
            return;
        }
        error!(
            "could not open HID connection to the mouse, retrying every {}s; \
             is the vendor software holding the device?",
            OPEN_RETRY_DELAY.as_secs()
        );
        loop {
            if sleep_cancellable(OPEN_RETRY_DELAY, stop).await {
                return;
            }
            if self.channel.open().is_ok() {
                info!("HID connection opened");
                return;
            }
        }
    }

    /// One pass of reload → scan → decide → publish/apply.
    fn tick(&mut self) -> anyhow::Result<()> {
        if self.last_config_load.elapsed() > CONFIG_STALE_AFTER {
            self.reload_config();
        }

        let detected = self.scanner.scan(&self.config.games).cloned();
        match detected {
            Some(game) => self.apply(
                self.config.gaming_rate_hz,
                &game.display_name,
                true,
                &game.display_name,
            ),
            None => self.apply(self.config.idle_rate_hz, "No game detected", false, ""),
        }
        Ok(())
    }

    fn reload_config(&mut self) {
        match config::load_or_init(&self.config_path) {
            Ok(config) => {
                self.config = config;
                self.last_config_load = Instant::now();
            }
            // Keep the in-memory config; the stale timestamp makes the next
            // tick try again.
            Err(e) => warn!("failed to reload config, keeping current settings: {e:#}"),
        }
    }

    /// Publishes status for this tick and pushes `hz` to the device if it
    /// differs from the last applied rate. A failed write gets exactly one
    /// reconnect attempt; after that the device is presumed disconnected
    /// until the next tick re-derives a differing target.
    fn apply(&mut self, hz: u16, reason: &str, is_gaming: bool, game_name: &str) {
        // Published every tick, changed or not, so observers can tell a
        // quiet daemon from a dead one by the timestamp.
        let snapshot = Status::new(is_gaming, hz, game_name, reason);
        status::write_status(&self.status_path, &snapshot);

        if self.last_applied == Some(hz) {
            return;
        }

        info!("-> {hz} Hz ({reason})");
        match self.channel.set_rate(hz) {
            Ok(()) => {
                self.last_applied = Some(hz);
                info!("set {hz} Hz ok");
            }
            Err(e) => {
                warn!("failed to set {hz} Hz, attempting reconnect: {e}");
                if self.channel.open().is_ok() && self.channel.set_rate(hz).is_ok() {
                    self.last_applied = Some(hz);
                    info!("reconnected and set {hz} Hz ok");
                } else {
                    error!("could not set polling rate, mouse disconnected?");
                }
            }
        }
    }

    /// Best-effort restore of the idle rate, then channel close and status
    /// removal so no stale "gaming" state survives the process.
    fn shutdown(&mut self) {
        info!("stopping, restoring idle rate");
        if let Err(e) = self.channel.set_rate(self.config.idle_rate_hz) {
            warn!("could not restore idle rate: {e}");
        }
        self.channel.close();
        status::remove_status(&self.status_path);
    }
}

/// Sleeps for `dur` unless `stop` flips first. Returns true when stopped.
async fn sleep_cancellable(dur: Duration, stop: &mut watch::Receiver<bool>) -> bool {
    tokio::select! {
        _ = tokio::time::sleep(dur) => false,
        _ = stop.changed() => true,
    }
}
