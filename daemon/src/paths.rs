/// Canonical file paths for RateShift data files on Windows.
///
/// All three files live under %ProgramData%\RateShift\ so that the daemon
/// (running as a service) and the configuration UI (running as the logged-in
/// user) see the same documents regardless of where either is installed:
///   - config.toml     Written by the GUI, read by the daemon.
///   - status.toml     Written by the daemon, read by the GUI and tray icon.
///   - rateshift.log   Appended to by the daemon.
use std::path::PathBuf;

const APP_DIR_NAME: &str = "RateShift";
pub const CONFIG_FILE_NAME: &str = "config.toml";
pub const STATUS_FILE_NAME: &str = "status.toml";
pub const LOG_FILE_NAME: &str = "rateshift.log";

/// Returns the RateShift shared data directory: %ProgramData%\RateShift\
pub fn data_dir() -> PathBuf {
    let programdata =
        std::env::var("PROGRAMDATA").expect("PROGRAMDATA environment variable not set");
    PathBuf::from(programdata).join(APP_DIR_NAME)
}

/// Returns the full path to the config file: %ProgramData%\RateShift\config.toml
pub fn config_file_path() -> PathBuf {
    data_dir().join(CONFIG_FILE_NAME)
}

/// Returns the full path to the status file: %ProgramData%\RateShift\status.toml
pub fn status_file_path() -> PathBuf {
    data_dir().join(STATUS_FILE_NAME)
}

/// Returns the full path to the log file: %ProgramData%\RateShift\rateshift.log
pub fn log_file_path() -> PathBuf {
    data_dir().join(LOG_FILE_NAME)
}
