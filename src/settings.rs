use std::path::{Path, PathBuf};
use std::{env, fs};

use chrono::Duration as ChronoDuration;
use log::warn;
use serde::{Deserialize, Serialize};
use tokio::time::Duration;

/// Environment variable naming the settings file. Falls back to
/// `footfall.json` in the working directory.
pub const CONFIG_ENV_VAR: &str = "FOOTFALL_CONFIG";
const DEFAULT_CONFIG_PATH: &str = "footfall.json";

const DEFAULT_SCAN_PERIOD_SECS: u64 = 60;
const DEFAULT_SCAN_WINDOW_SECS: u64 = 15;
const DEFAULT_MEMORY_HORIZON_SECS: u64 = 600;
const DEFAULT_SHUTDOWN_GRACE_SECS: u64 = 5;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Settings {
    pub database_path: PathBuf,
    pub ignore_list_path: PathBuf,
    /// Seconds between scan window openings.
    pub scan_period_secs: u64,
    /// Seconds the radio listens per period. Must be shorter than the
    /// period so idle time always exists.
    pub scan_window_secs: u64,
    /// Seconds a seen digest stays suppressed (sliding).
    pub memory_horizon_secs: u64,
    /// Seconds to let queued writes drain on shutdown.
    pub shutdown_grace_secs: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            database_path: PathBuf::from("footfall.sqlite3"),
            ignore_list_path: PathBuf::from("ignored_addresses.txt"),
            scan_period_secs: DEFAULT_SCAN_PERIOD_SECS,
            scan_window_secs: DEFAULT_SCAN_WINDOW_SECS,
            memory_horizon_secs: DEFAULT_MEMORY_HORIZON_SECS,
            shutdown_grace_secs: DEFAULT_SHUTDOWN_GRACE_SECS,
        }
    }
}

impl Settings {
    /// Load from `FOOTFALL_CONFIG` or `footfall.json`. Missing file means
    /// defaults; a malformed file or invalid timing values fall back to
    /// defaults with a warning. Configuration is never fatal.
    pub fn load() -> Self {
        let path = env::var(CONFIG_ENV_VAR)
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(DEFAULT_CONFIG_PATH));
        Self::load_from(&path)
    }

    pub fn load_from(path: &Path) -> Self {
        let settings = if path.exists() {
            match fs::read_to_string(path) {
                Ok(contents) => serde_json::from_str(&contents).unwrap_or_else(|err| {
                    warn!(
                        "settings file {} is malformed ({err}); using defaults",
                        path.display()
                    );
                    Settings::default()
                }),
                Err(err) => {
                    warn!(
                        "failed to read settings from {} ({err}); using defaults",
                        path.display()
                    );
                    Settings::default()
                }
            }
        } else {
            Settings::default()
        };

        settings.validated()
    }

    /// Clamp invalid timing values back to defaults. A window that is zero
    /// or not strictly shorter than the period would leave the radio
    /// permanently on (or never on), so both are rejected together.
    pub fn validated(mut self) -> Self {
        if self.scan_window_secs == 0
            || self.scan_period_secs == 0
            || self.scan_window_secs >= self.scan_period_secs
        {
            warn!(
                "invalid scan timing (period {}s, window {}s); using defaults {}s/{}s",
                self.scan_period_secs,
                self.scan_window_secs,
                DEFAULT_SCAN_PERIOD_SECS,
                DEFAULT_SCAN_WINDOW_SECS
            );
            self.scan_period_secs = DEFAULT_SCAN_PERIOD_SECS;
            self.scan_window_secs = DEFAULT_SCAN_WINDOW_SECS;
        }
        if self.memory_horizon_secs == 0 {
            warn!(
                "memory horizon of 0s disables dedup; using default {}s",
                DEFAULT_MEMORY_HORIZON_SECS
            );
            self.memory_horizon_secs = DEFAULT_MEMORY_HORIZON_SECS;
        }
        self
    }

    pub fn scan_period(&self) -> Duration {
        Duration::from_secs(self.scan_period_secs)
    }

    pub fn scan_window(&self) -> Duration {
        Duration::from_secs(self.scan_window_secs)
    }

    pub fn memory_horizon(&self) -> ChronoDuration {
        ChronoDuration::seconds(self.memory_horizon_secs as i64)
    }

    pub fn shutdown_grace(&self) -> Duration {
        Duration::from_secs(self.shutdown_grace_secs)
    }
}
