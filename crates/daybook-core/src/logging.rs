//! Tracing subscriber setup for hosts embedding the core.

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Environment variable that overrides the configured filter.
pub const LOG_ENV: &str = "DAYBOOK_LOG";

/// The filter to install: `DAYBOOK_LOG` when set and valid, else `level`,
/// else `info`.
pub fn env_filter(level: &str) -> EnvFilter {
    EnvFilter::try_from_env(LOG_ENV)
        .or_else(|_| EnvFilter::try_new(level))
        .unwrap_or_else(|_| EnvFilter::new("info"))
}

/// Install a global fmt subscriber.
///
/// Returns false if a global subscriber was already set; calling this twice
/// is harmless.
pub fn init_tracing(level: &str) -> bool {
    tracing_subscriber::registry()
        .with(fmt::layer().with_target(true).with_level(true))
        .with(env_filter(level))
        .try_init()
        .is_ok()
}
