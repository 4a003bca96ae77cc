//! Subscriber installation for binaries embedding the queues.
//!
//! The queues only emit `tracing` events; nothing is printed unless the host
//! installs a subscriber. These helpers install a `tracing-subscriber`
//! registry filtered by `RUST_LOG`, falling back to the given directive.

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::{SubscriberInitExt, TryInitError};
use tracing_subscriber::EnvFilter;

/// Directive used when `RUST_LOG` is unset.
pub const DEFAULT_DIRECTIVE: &str = "info,airtime_queue=debug";

fn env_filter(default_directive: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directive))
}

/// Installs a human-readable subscriber as the global default.
///
/// # Errors
/// Returns [`TryInitError`] when a global subscriber is already installed.
pub fn init_tracing(default_directive: &str) -> Result<(), TryInitError> {
    tracing_subscriber::registry()
        .with(env_filter(default_directive))
        .with(tracing_subscriber::fmt::layer().with_target(true))
        .try_init()
}

/// Installs a JSON subscriber as the global default.
///
/// # Errors
/// Returns [`TryInitError`] when a global subscriber is already installed.
pub fn init_json_tracing(default_directive: &str) -> Result<(), TryInitError> {
    tracing_subscriber::registry()
        .with(env_filter(default_directive))
        .with(tracing_subscriber::fmt::layer().json().with_current_span(false))
        .try_init()
}

#[cfg(test)]
mod tests {
    //! Unit tests for observability.
    use super::*;

    /// Validates `init_tracing` behavior for the repeated installation
    /// scenario.
    ///
    /// Assertions:
    /// - Ensures a second installation reports an error instead of panicking.
    #[test]
    fn test_second_init_is_an_error() {
        let first = init_tracing(DEFAULT_DIRECTIVE);
        let second = init_json_tracing(DEFAULT_DIRECTIVE);
        assert!(first.is_err() || second.is_err());
    }
}
