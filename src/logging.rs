//! Diagnostic logging to stderr.
//!
//! Filter precedence: `RFACELOG_LOG` env var, then `log_level` from the config file.

use tracing_subscriber::EnvFilter;

pub const LOG_ENV: &str = "RFACELOG_LOG";

/// Install the global fmt subscriber. Calling it twice is harmless.
pub fn init(default_level: &str) {
    let filter = EnvFilter::try_from_env(LOG_ENV)
        .or_else(|_| EnvFilter::try_new(default_level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}
