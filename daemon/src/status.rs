use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::warn;

/// A status older than this is treated the same as a missing one: the daemon
/// is presumed not to be running.
pub const STALE_AFTER_SECS: i64 = 30;

/// Runtime status written by the daemon to %ProgramData%\RateShift\status.toml.
/// The GUI and tray icon read this file (read-only) to display daemon state;
/// the daemon deletes it on shutdown so a stale "gaming" state can never
/// outlive the process.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct Status {
    /// Whether a watched game is currently detected.
    pub is_gaming: bool,
    /// The polling rate the daemon last decided to apply.
    pub current_rate_hz: u16,
    /// Display name of the detected game, empty when idle.
    pub game_name: String,
    /// Human-readable reason for the current rate.
    pub reason: String,
    /// RFC 3339 UTC timestamp of the last update.
    pub updated_at: String,
}

impl Status {
    /// Constructs a status stamped with the current time.
    pub fn new(is_gaming: bool, current_rate_hz: u16, game_name: &str, reason: &str) -> Self {
        Self {
            is_gaming,
            current_rate_hz,
            game_name: game_name.to_string(),
            reason: reason.to_string(),
            updated_at: Utc::now().to_rfc3339(),
        }
    }
}

/// Serializes `status` to TOML and publishes it at `path` atomically: the
/// document is written to a sibling temp file and renamed into place, so a
/// concurrent reader sees either the old document or the new one, never a
/// truncated mix. Creates the parent directory if it does not exist.
/// Logs errors rather than returning them — a status write failure must
/// never affect the decision loop.
pub fn write_status(path: &Path, status: &Status) {
    if let Some(parent) = path.parent() {
        if let Err(e) = std::fs::create_dir_all(parent) {
            warn!("failed to create directory {}: {e}", parent.display());
            return;
        }
    }
    let content = match toml::to_string_pretty(status) {
        Ok(content) => content,
        Err(e) => {
            warn!("failed to serialize status: {e}");
            return;
        }
    };
    let tmp = path.with_extension("tmp");
    if let Err(e) = std::fs::write(&tmp, content) {
        warn!("failed to write status file: {e}");
        return;
    }
    if let Err(e) = std::fs::rename(&tmp, path) {
        warn!("failed to publish status file: {e}");
    }
}

/// Reads the status at `path` for external observers.
///
/// A missing file, an unparsable document, and a timestamp older than
/// [`STALE_AFTER_SECS`] all read as `None` — by convention each means "the
/// daemon is not actively running."
pub fn read_status(path: &Path) -> Option<Status> {
    let content = std::fs::read_to_string(path).ok()?;
    let status: Status = toml::from_str(&content).ok()?;
    let updated_at = DateTime::parse_from_rfc3339(&status.updated_at).ok()?;
    let age = Utc::now().signed_duration_since(updated_at.with_timezone(&Utc));
    if age.num_seconds() > STALE_AFTER_SECS {
        return None;
    }
    Some(status)
}

/// Deletes the status file. Best effort: a missing file or a failed delete
/// is ignored.
pub fn remove_status(path: &Path) {
    let _ = std::fs::remove_file(path);
}
