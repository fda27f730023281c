//! Structured logging.
//!
//! # Responsibilities
//! - Initialize the tracing subscriber once per process
//! - Honour `RUST_LOG` when set, otherwise the configured log level
//!
//! # Design Decisions
//! - Uses tracing crate for structured logging
//! - Events carry key/value fields (request id, path, sql, params) rather
//!   than preformatted strings

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::ObservabilityConfig;

/// Filter used when `RUST_LOG` is not set.
pub fn default_filter(config: &ObservabilityConfig) -> String {
    format!("safe_blog={},tower_http=info", config.log_level)
}

/// Install the global subscriber.
///
/// Calling it twice (e.g. from several tests) is harmless; later calls are ignored.
pub fn init_logging(config: &ObservabilityConfig) {
    let _ = tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(default_filter(config))),
        )
        .with(tracing_subscriber::fmt::layer())
        .try_init();
}
