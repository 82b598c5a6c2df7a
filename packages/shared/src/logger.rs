//! Tracing subscriber setup.

use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Initialize the global tracing subscriber.
///
/// `RUST_LOG` wins when set; otherwise `crate_name` (with `-` replaced by `_`)
/// and `tower_http` are logged at `default_level`, everything else at `warn`.
pub fn setup_logger(crate_name: &str, default_level: &str) {
    let target = crate_name.replace('-', "_");
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "warn,{target}={default_level},tower_http={default_level}"
        ))
    });

    // A second call (tests spinning up several servers) is not an error.
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(true))
        .try_init();
}
