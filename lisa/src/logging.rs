//! Diagnostic tracing for the `lisa` binary.
//!
//! Events go to stderr so that stdout stays reserved for JSON tool results and
//! hook directives. The loop tags its events with `service = "lisa"` so a host
//! that captures stderr can attribute them.

use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Default filter when `RUST_LOG` is unset: quiet dependencies, report loop
/// transitions.
const DEFAULT_FILTER: &str = "warn,lisa=info";

/// Initialize the tracing subscriber.
///
/// # Example
/// ```bash
/// RUST_LOG=lisa=debug lisa available my-epic
/// ```
pub fn init() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr).compact())
        .init();
}
