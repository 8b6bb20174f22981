//! Logging setup for the bridge.
//!
//! The configured level is the default; a `RUST_LOG` directive in the
//! environment takes precedence so a single module can be turned up
//! without touching the config file.

use tracing_subscriber::EnvFilter;
use tracing_subscriber::filter::LevelFilter;

/// Map a configured level name onto a filter. Unknown names fall back to `info`.
pub fn level_from_name(name: &str) -> LevelFilter {
    match name.trim().to_lowercase().as_str() {
        "off" => LevelFilter::OFF,
        "error" => LevelFilter::ERROR,
        "warn" | "warning" => LevelFilter::WARN,
        "debug" => LevelFilter::DEBUG,
        "trace" => LevelFilter::TRACE,
        _ => LevelFilter::INFO,
    }
}

/// Install the global fmt subscriber.
///
/// Uses `try_init` so the binary and the test harness can both call this.
pub fn init(default_level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::default().add_directive(level_from_name(default_level).into())
    });

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init();
}
