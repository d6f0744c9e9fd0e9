//! Process-wide `tracing` subscriber setup.
//!
//! Library code only emits through the `tracing` macros; hosts that want the
//! output call [`try_init`] once at startup.

use tracing_subscriber::EnvFilter;

/// Filter variable checked before `RUST_LOG`.
pub const LOG_ENV: &str = "ASSIST_LOG";

const DEFAULT_FILTER: &str = "warn";

/// Installs a fmt subscriber filtered by `ASSIST_LOG`, then `RUST_LOG`, then `warn`.
///
/// Returns false when a global subscriber is already installed.
pub fn try_init() -> bool {
    tracing_subscriber::fmt()
        .with_env_filter(env_filter())
        .with_target(true)
        .try_init()
        .is_ok()
}

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_env(LOG_ENV)
        .or_else(|_| EnvFilter::try_from_default_env())
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))
}
