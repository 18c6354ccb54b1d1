//! Subscriber initialization.
//!
//! Every test binary calls [`init_tracing`] from its fixture, usually more
//! than once per process, so a second call is a no-op.

use crate::config::HarnessConfig;
use tracing::debug;
use tracing_subscriber::EnvFilter;

/// Install the global subscriber
///
/// `RUST_LOG` takes precedence; otherwise `LOG_LEVEL` applies to this crate.
/// Returns `false` when a subscriber was already installed.
pub fn init_tracing(config: &HarnessConfig) -> bool {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        format!(
            "broker_operator_testkit={}",
            config.log_level.to_lowercase()
        )
        .into()
    });

    let installed = if config.log_format.eq_ignore_ascii_case("json") {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_test_writer()
            .try_init()
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .try_init()
    };

    match installed {
        Ok(()) => {
            debug!(
                "Tracing initialized (level={}, format={})",
                config.log_level,
                config.log_format
            );
            true
        }
        Err(_) => false,
    }
}
