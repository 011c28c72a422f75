//! Development-time tracing.
//!
//! Diagnostics go to stderr and are controlled by `RUST_LOG`. They are separate
//! from the notices the CLI prints for the user, which are always shown.

use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Initialize the tracing subscriber.
///
/// Reads `RUST_LOG`; defaults to `warn`. Output: stderr, compact format.
///
/// # Example
/// ```bash
/// RUST_LOG=probe=debug probe --dictionary facts.xml get /age
/// ```
pub fn init() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr).compact())
        .init();
}
