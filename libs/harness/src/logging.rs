//! Tracing setup for binaries and tests.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::HarnessError;

/// Install the global subscriber. Prefers `RUST_LOG`, falling back to
/// `default_level`.
pub fn init(default_level: &str, json: bool) -> Result<(), HarnessError> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_level))
        .map_err(|e| HarnessError::Config(format!("invalid log level '{default_level}': {e}")))?;

    let registry = tracing_subscriber::registry().with(filter);
    let installed = if json {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .try_init()
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .try_init()
    };

    installed.map_err(|e| HarnessError::Config(format!("failed to install tracing subscriber: {e}")))
}

/// Route harness logs through the test writer. Safe to call from every test.
pub fn init_test_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,plfm_harness=debug,plfm_converge=debug".into()),
        )
        .with_test_writer()
        .try_init();
}
