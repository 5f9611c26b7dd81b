use std::collections::HashSet;
use sysinfo::{ProcessesToUpdate, System};

use crate::config::GameEntry;

/// Scans the OS process table for watched game executables.
///
/// The `System` is reused across scans so only the process list is refreshed
/// each tick. Matching is case-insensitive on the executable image name
/// (with extension), and when several watched games are running at once the
/// first entry in the configured list wins.
pub struct ProcessScanner {
    sys: System,
}

impl ProcessScanner {
    pub fn new() -> Self {
        Self { sys: System::new() }
    }

    /// Returns the first configured game that is currently running, in the
    /// order given by `games`. `None` when nothing matches — including when
    /// the refresh produced no processes at all, which is indistinguishable
    /// from (and treated the same as) no game running.
    pub fn scan<'a>(&mut self, games: &'a [GameEntry]) -> Option<&'a GameEntry> {
        self.sys.refresh_processes(ProcessesToUpdate::All, true);

        let running: HashSet<String> = self
            .sys
            .processes()
            .values()
            .map(|p| p.name().to_string_lossy().to_lowercase())
            .collect();

        first_running(&running, games)
    }
}

/// Order-deterministic first match of `games` against a set of lowercased
/// running process names.
fn first_running<'a>(running: &HashSet<String>, games: &'a [GameEntry]) -> Option<&'a GameEntry> {
    games
        .iter()
        .find(|game| running.contains(&game.executable_name.to_lowercase()))
}
