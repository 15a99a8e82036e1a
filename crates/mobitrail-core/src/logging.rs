//! Tracing subscriber setup for test binaries.
//!
//! The filter is read from `MOBITRAIL_LOG` (e.g. `mobitrail_core=debug`) and
//! defaults to `info`. Installing twice is harmless: the second call is a
//! no-op, which matters because every integration test may call [`init`].

use std::path::PathBuf;

use tracing_subscriber::EnvFilter;

pub const LOG_ENV: &str = "MOBITRAIL_LOG";

/// Where log output goes.
#[derive(Debug, Clone)]
pub enum LogTarget {
    Stderr,
    /// Append to `<dir>/<file_name>`, without ANSI colours.
    File { dir: PathBuf, file_name: String },
}

fn filter() -> EnvFilter {
    EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("info"))
}

/// Install the global subscriber. Returns false if one was already set.
pub fn init(target: LogTarget) -> bool {
    match target {
        LogTarget::Stderr => tracing_subscriber::fmt()
            .with_env_filter(filter())
            .with_writer(std::io::stderr)
            .try_init()
            .is_ok(),
        LogTarget::File { dir, file_name } => {
            std::fs::create_dir_all(&dir).ok();
            let file_appender = tracing_appender::rolling::never(&dir, file_name);
            tracing_subscriber::fmt()
                .with_env_filter(filter())
                .with_writer(file_appender)
                .with_ansi(false)
                .try_init()
                .is_ok()
        }
    }
}
