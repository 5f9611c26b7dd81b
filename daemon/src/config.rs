use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::warn;

pub const DEFAULT_IDLE_RATE_HZ: u16 = 1000;
pub const DEFAULT_GAMING_RATE_HZ: u16 = 4000;
pub const DEFAULT_SCAN_INTERVAL_SECS: u64 = 5;

/// Root configuration structure. Persisted as %ProgramData%\RateShift\config.toml.
///
/// The GUI owns edits to this document; the daemon only reads it (and writes
/// it once to seed the defaults on first run). `show_tray_icon` and
/// `start_on_startup` are GUI concerns carried in the same document — the
/// daemon ignores them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Polling rate applied while no watched game is running.
    #[serde(default = "default_idle_rate")]
    pub idle_rate_hz: u16,
    /// Polling rate applied while a watched game is running.
    #[serde(default = "default_gaming_rate")]
    pub gaming_rate_hz: u16,
    /// Seconds between process scans.
    #[serde(default = "default_scan_interval")]
    pub scan_interval_secs: u64,
    #[serde(default = "default_true")]
    pub show_tray_icon: bool,
    #[serde(default)]
    pub start_on_startup: bool,
    /// Watched games in priority order: the first entry whose executable is
    /// running wins when several are running at once.
    #[serde(default = "default_games")]
    pub games: Vec<GameEntry>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            idle_rate_hz: DEFAULT_IDLE_RATE_HZ,
            gaming_rate_hz: DEFAULT_GAMING_RATE_HZ,
            scan_interval_secs: DEFAULT_SCAN_INTERVAL_SECS,
            show_tray_icon: true,
            start_on_startup: false,
            games: default_games(),
        }
    }
}

/// A single watched game.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameEntry {
    /// Executable filename (e.g. "cs2.exe") used for process detection,
    /// matched case-insensitively.
    pub executable_name: String,
    /// Human-readable name shown in the GUI and the status file.
    pub display_name: String,
}

impl GameEntry {
    fn new(executable_name: &str, display_name: &str) -> Self {
        Self {
            executable_name: executable_name.to_string(),
            display_name: display_name.to_string(),
        }
    }
}

/// Loads the config file at `path`.
///
/// A missing file is seeded with the defaults (so the file always exists
/// after first load and the GUI has something to edit). A file that exists
/// but does not parse falls back to the defaults without overwriting the
/// document. Only an I/O failure is an error — the caller keeps whatever
/// config it already has in that case.
pub fn load_or_init(path: &Path) -> Result<Config> {
    if !path.exists() {
        let config = Config::default();
        save(path, &config)?;
        return Ok(config);
    }
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;
    match toml::from_str(&content) {
        Ok(config) => Ok(config),
        Err(e) => {
            warn!("config file {} does not parse, using defaults: {e}", path.display());
            Ok(Config::default())
        }
    }
}

/// Serializes `config` and overwrites the document at `path`.
///
/// Plain overwrite, no temp-file dance: config writes are infrequent and
/// readers tolerate a momentarily missing file.
pub fn save(path: &Path, config: &Config) -> Result<()> {
    let content = toml::to_string_pretty(config)
        .context("Failed to serialize config")?;
    std::fs::write(path, content)
        .with_context(|| format!("Failed to write config file: {}", path.display()))
}

fn default_idle_rate() -> u16 {
    DEFAULT_IDLE_RATE_HZ
}

fn default_gaming_rate() -> u16 {
    DEFAULT_GAMING_RATE_HZ
}

fn default_scan_interval() -> u64 {
    DEFAULT_SCAN_INTERVAL_SECS
}

fn default_true() -> bool {
    true
}

fn default_games() -> Vec<GameEntry> {
    vec![
        GameEntry::new("VALORANT-Win64-Shipping.exe", "Valorant"),
        GameEntry::new("cs2.exe", "Counter-Strike 2"),
        GameEntry::new("FortniteClient-Win64-Shipping.exe", "Fortnite"),
        GameEntry::new("r5apex.exe", "Apex Legends"),
        GameEntry::new("overwatch.exe", "Overwatch 2"),
        GameEntry::new("cod.exe", "Call of Duty"),
        GameEntry::new("PioneerGame.exe", "Arc Raiders"),
        GameEntry::new("FLClient-Win64-Shipping.exe", "The Finals"),
        GameEntry::new("FPSAimTrainer-Win64-Shipping.exe", "KovaaK's"),
        GameEntry::new("AimLab_tb.exe", "Aim Lab"),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    // ── defaults ──────────────────────────────────────────────────────────────

    #[test]
    fn default_rates_and_interval() {
        let c = Config::default();
        assert_eq!(c.idle_rate_hz, 1000);
        assert_eq!(c.gaming_rate_hz, 4000);
        assert_eq!(c.scan_interval_secs, 5);
        assert!(c.show_tray_icon);
        assert!(!c.start_on_startup);
    }

    #[test]
    fn default_games_populated_in_order() {
        let games = Config::default().games;
        assert_eq!(games.len(), 10);
        assert_eq!(games[0].display_name, "Valorant");
        assert_eq!(games[1].executable_name, "cs2.exe");
        assert_eq!(games[9].display_name, "Aim Lab");
    }

    // ── load_or_init ──────────────────────────────────────────────────────────

    #[test]
    fn missing_file_is_seeded_with_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");

        let config = load_or_init(&path).unwrap();

        assert_eq!(config, Config::default());
        assert!(path.exists(), "first load must persist the defaults");
    }

    #[test]
    fn invalid_toml_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "this is not valid toml ][[[").unwrap();

        let config = load_or_init(&path).unwrap();

        assert_eq!(config, Config::default());
        // The broken document is left alone for the user to inspect.
        assert_eq!(
            std::fs::read_to_string(&path).unwrap(),
            "this is not valid toml ][[["
        );
    }

    #[test]
    fn partial_toml_uses_field_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "gaming_rate_hz = 8000\n").unwrap();

        let config = load_or_init(&path).unwrap();
        assert_eq!(config.gaming_rate_hz, 8000);
        assert_eq!(config.idle_rate_hz, DEFAULT_IDLE_RATE_HZ);
        assert_eq!(config.scan_interval_secs, DEFAULT_SCAN_INTERVAL_SECS);
        assert_eq!(config.games.len(), 10);
    }

    #[test]
    fn game_list_parses_in_document_order() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            r#"
[[games]]
executable_name = "b.exe"
display_name = "B"

[[games]]
executable_name = "a.exe"
display_name = "A"
"#,
        )
        .unwrap();

        let config = load_or_init(&path).unwrap();
        assert_eq!(config.games[0].display_name, "B");
        assert_eq!(config.games[1].display_name, "A");
    }

    // ── save / round-trip ─────────────────────────────────────────────────────

    #[test]
    fn save_then_load_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");

        let mut original = Config::default();
        original.idle_rate_hz = 500;
        original.gaming_rate_hz = 2000;
        original.games = vec![GameEntry::new("game.exe", "Game")];

        save(&path, &original).unwrap();
        let loaded = load_or_init(&path).unwrap();

        assert_eq!(loaded, original);
    }

    #[test]
    fn seeded_defaults_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");

        let first = load_or_init(&path).unwrap();
        let second = load_or_init(&path).unwrap();

        assert_eq!(first, second);
    }
}
