//! Per-test log capture.
//!
//! Each test installs its own subscriber for the lifetime of the returned
//! guard, so output from concurrently running tests never shares a global
//! logger. Output goes through libtest's capture.

use tracing::subscriber::DefaultGuard;
use tracing_subscriber::EnvFilter;

/// Filter used when `RUST_LOG` is unset.
pub const DEFAULT_FILTER: &str = "env_tests=info";

/// Install a thread-scoped subscriber for the current test.
///
/// Keep the guard alive for the whole test body:
///
/// ```rust,ignore
/// let _logs = env_tests::logging::init_test_logging();
/// ```
pub fn init_test_logging() -> DefaultGuard {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_test_writer()
        .with_target(true)
        .finish();

    tracing::subscriber::set_default(subscriber)
}
