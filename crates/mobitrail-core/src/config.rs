//! Persistent configuration for mobitrail.
//!
//! Stores harness settings in `~/.mobitrail/config.json`: default wait
//! timing, where reports are written, and the working-directory root that
//! relative application paths are resolved against.
//!
//! # Example
//!
//! ```no_run
//! use mobitrail_core::config::HarnessConfig;
//!
//! // Load (returns defaults if file doesn't exist)
//! let config = HarnessConfig::load();
//! let wait = config.wait();
//! println!("waiting up to {:?}, reports in {}", wait.timeout(), config.report_dir().display());
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::wait::{Wait, DEFAULT_POLL_INTERVAL, DEFAULT_TIMEOUT};

const CONFIG_FILENAME: &str = "config.json";

/// Returns the mobitrail state directory (`~/.mobitrail/`).
///
/// Falls back to the system temp directory when no home directory is known.
/// Creates the directory if it doesn't exist.
pub fn mobitrail_dir() -> PathBuf {
    let dir = dirs::home_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join(".mobitrail");
    std::fs::create_dir_all(&dir).ok();
    dir
}

fn default_timeout_ms() -> u64 {
    DEFAULT_TIMEOUT.as_millis() as u64
}

fn default_poll_interval_ms() -> u64 {
    DEFAULT_POLL_INTERVAL.as_millis() as u64
}

/// Persistent harness configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HarnessConfig {
    /// Default upper bound for condition waits, in milliseconds.
    #[serde(default = "default_timeout_ms")]
    pub wait_timeout_ms: u64,

    /// Delay between condition polls, in milliseconds.
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    /// Where JSON Lines reports are written. Defaults to `~/.mobitrail/reports`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub report_dir: Option<PathBuf>,

    /// Root for relative app paths. Defaults to the process working directory.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub workdir: Option<PathBuf>,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            wait_timeout_ms: default_timeout_ms(),
            poll_interval_ms: default_poll_interval_ms(),
            report_dir: None,
            workdir: None,
        }
    }
}

impl HarnessConfig {
    /// Load config from `~/.mobitrail/config.json`.
    ///
    /// Returns [`Default`] if the file does not exist or cannot be parsed.
    pub fn load() -> Self {
        Self::load_from(&mobitrail_dir().join(CONFIG_FILENAME))
    }

    /// Load config from an explicit path, with the same fallback as [`load`](Self::load).
    pub fn load_from(path: &Path) -> Self {
        std::fs::read_to_string(path)
            .ok()
            .and_then(|s| serde_json::from_str(&s).ok())
            .unwrap_or_default()
    }

    /// Save config to `~/.mobitrail/config.json`.
    pub fn save(&self) -> std::io::Result<()> {
        self.save_to(&mobitrail_dir().join(CONFIG_FILENAME))
    }

    pub fn save_to(&self, path: &Path) -> std::io::Result<()> {
        let json = serde_json::to_string_pretty(self)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e))?;
        std::fs::write(path, json)
    }

    /// Default wait built from the configured timing.
    pub fn wait(&self) -> Wait {
        Wait::new(
            Duration::from_millis(self.wait_timeout_ms),
            Duration::from_millis(self.poll_interval_ms),
        )
    }

    pub fn report_dir(&self) -> PathBuf {
        self.report_dir
            .clone()
            .unwrap_or_else(|| mobitrail_dir().join("reports"))
    }

    pub fn workdir(&self) -> PathBuf {
        self.workdir
            .clone()
            .or_else(|| std::env::current_dir().ok())
            .unwrap_or_else(|| PathBuf::from("."))
    }
}
