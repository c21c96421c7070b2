//! tracing-subscriber setup. `RUST_LOG` wins over `LOG_LEVEL`.

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::config::Settings;

/// Install the global subscriber. Safe to call more than once; later calls
/// are ignored.
pub fn init(settings: &Settings) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&settings.log_level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let registry = tracing_subscriber::registry().with(filter);
    let res = if settings.log_json {
        registry
            .with(fmt::layer().json().with_current_span(false))
            .try_init()
    } else {
        registry.with(fmt::layer().compact()).try_init()
    };
    if res.is_ok() {
        tracing::debug!(json = settings.log_json, level = %settings.log_level, "logging initialised");
    }
}
