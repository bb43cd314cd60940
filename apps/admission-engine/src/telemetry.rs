//! Tracing Setup
//!
//! Console tracing with an environment filter.
//!
//! # Configuration
//!
//! - `RUST_LOG`: Filter directives; overrides `logging.level` when set
//!
//! # Usage
//!
//! ```rust,ignore
//! use admission_engine::telemetry::init_tracing;
//!
//! init_tracing(&config.logging);
//! ```

use tracing_subscriber::EnvFilter;

use crate::config::LoggingConfig;

/// Build the filter: `RUST_LOG` if set, else the configured level.
#[must_use]
pub fn env_filter(config: &LoggingConfig) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level))
}

/// Initialize the global tracing subscriber.
///
/// Calling it again after a subscriber is installed is a no-op.
pub fn init_tracing(config: &LoggingConfig) {
    let installed = tracing_subscriber::fmt()
        .with_env_filter(env_filter(config))
        .with_target(config.with_target)
        .with_ansi(config.ansi)
        .try_init()
        .is_ok();

    if installed {
        tracing::debug!(level = %config.level, "Tracing initialized");
    }
}
