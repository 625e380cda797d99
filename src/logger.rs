//! Logging setup
//!
//! The crate only emits `tracing` events. Applications embedding the
//! coordinator usually install their own subscriber; `init_logging` is a
//! convenience for tools and tests.

use tracing_subscriber::EnvFilter;

use crate::config::MigrationConfig;

/// Install a formatting subscriber filtered at `level`.
///
/// `RUST_LOG` takes precedence over `level` when set. Calling this more than
/// once is harmless; later calls leave the first subscriber in place and
/// return `false`.
pub fn init_logging(level: &str) -> bool {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .try_init()
        .is_ok()
}

/// Install the subscriber at the configured `log_level`
pub fn init_logging_from(config: &MigrationConfig) -> bool {
    init_logging(&config.log_level)
}
