//! Tracing bootstrap shared by the binaries and integration tests.

use tracing_subscriber::EnvFilter;

use crate::config::LoggingSettings;

/// Install a stderr `fmt` subscriber. `RUST_LOG` takes precedence over the
/// configured level. Returns `false` when a global subscriber already exists.
pub fn init_tracing(settings: &LoggingSettings) -> bool {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&settings.level))
        .unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_ansi(settings.ansi)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init()
        .is_ok()
}
