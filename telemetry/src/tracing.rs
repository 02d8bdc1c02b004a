use std::sync::Once;

use tracing_subscriber::EnvFilter;

static TEST_TRACING: Once = Once::new();

/// Default directive applied when `RUST_LOG` is not set.
const DEFAULT_DIRECTIVE: &str = "info";

/// Initializes tracing for a long-running binary.
///
/// The filter is taken from `RUST_LOG` when present, otherwise `info`. Panics if a
/// global subscriber was already installed, since binaries must call this exactly once.
pub fn init_tracing(service_name: &str) {
    tracing_subscriber::fmt()
        .with_env_filter(env_filter())
        .init();

    ::tracing::info!("tracing initialized for {service_name}");
}

/// Initializes tracing for tests.
///
/// Safe to call from every test: initialization happens once per process and test
/// output is routed through the libtest capture writer.
pub fn init_test_tracing() {
    TEST_TRACING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(env_filter())
            .with_test_writer()
            .try_init();
    });
}

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_DIRECTIVE))
}
