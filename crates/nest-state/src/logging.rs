//! Tracing subscriber setup.

use tracing_subscriber::EnvFilter;

/// Initializes the global tracing subscriber.
///
/// Filtering is controlled by `NEST_LOG` (standard `EnvFilter` syntax),
/// defaulting to `info`. Safe to call more than once; later calls are no-ops.
pub fn init() {
    let filter = EnvFilter::try_from_env("NEST_LOG").unwrap_or_else(|_| EnvFilter::new("info"));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init();
}
