//! Logging initialization.

use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Default filter used when `RUST_LOG` is not set.
const DEFAULT_FILTER: &str = "info,ember=debug";

/// Install the global tracing subscriber.
///
/// Honours `RUST_LOG`; falls back to [`DEFAULT_FILTER`]. Calling this twice
/// is harmless, the second registration is ignored.
///
/// # Example
/// ```
/// ember_core::init_logging();
/// tracing::info!("Engine starting");
/// ```
pub fn init_logging() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(true).with_thread_ids(true))
        .try_init();
}
